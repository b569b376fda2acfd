//! Hour-granularity cron evaluation

use thiserror::Error;
use time::{OffsetDateTime, UtcOffset};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronError {
    #[error("Cron expression '{0}' needs at least minute and hour fields")]
    MissingHour(String),
    #[error("Invalid hour field '{0}'")]
    InvalidHour(String),
}

/// Parsed hour field of a `minute hour day month weekday` expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourSpec {
    hours: [bool; 24],
}

impl HourSpec {
    pub fn parse(expression: &str) -> Result<Self, CronError> {
        let field = expression
            .split_whitespace()
            .nth(1)
            .ok_or_else(|| CronError::MissingHour(expression.to_string()))?;

        let mut hours = [false; 24];
        for part in field.split(',') {
            mark(part, &mut hours).ok_or_else(|| CronError::InvalidHour(field.to_string()))?;
        }
        Ok(Self { hours })
    }

    pub fn matches(&self, hour: u8) -> bool {
        self.hours.get(usize::from(hour)).copied().unwrap_or(false)
    }

    /// Whether the expression is due at `now` in the given timezone
    pub fn is_due(&self, now: OffsetDateTime, offset: UtcOffset) -> bool {
        self.matches(now.to_offset(offset).hour())
    }
}

fn mark(part: &str, hours: &mut [bool; 24]) -> Option<()> {
    let (range, step) = match part.split_once('/') {
        Some((range, step)) => (range, step.parse::<usize>().ok().filter(|s| *s > 0)?),
        None => (part, 1),
    };

    let (start, end) = if range == "*" {
        (0, 23)
    } else if let Some((a, b)) = range.split_once('-') {
        (parse_hour(a)?, parse_hour(b)?)
    } else {
        let hour = parse_hour(range)?;
        // `N/step` runs from N to the end of the day
        if step > 1 { (hour, 23) } else { (hour, hour) }
    };

    if start > end {
        return None;
    }
    for hour in (start..=end).step_by(step) {
        hours[hour] = true;
    }
    Some(())
}

fn parse_hour(s: &str) -> Option<usize> {
    s.parse::<usize>().ok().filter(|h| *h < 24)
}

/// `UTC`, `Z`, or a fixed `+HH:MM` / `-HH:MM` offset; anything else is `None`
pub fn parse_timezone(tz: &str) -> Option<UtcOffset> {
    let tz = tz.trim();
    if tz.is_empty() || tz.eq_ignore_ascii_case("utc") || tz.eq_ignore_ascii_case("z") {
        return Some(UtcOffset::UTC);
    }

    let tz = tz
        .strip_prefix("UTC")
        .or_else(|| tz.strip_prefix("GMT"))
        .unwrap_or(tz);
    let (sign, rest) = match tz.chars().next()? {
        '+' => (1i8, &tz[1..]),
        '-' => (-1i8, &tz[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h.parse::<i8>().ok()?, m.parse::<i8>().ok()?),
        None if rest.len() == 4 => (rest[..2].parse::<i8>().ok()?, rest[2..].parse::<i8>().ok()?),
        None => (rest.parse::<i8>().ok()?, 0),
    };
    if !(0..60).contains(&minutes) {
        return None;
    }
    UtcOffset::from_hms(sign * hours, sign * minutes, 0).ok()
}
