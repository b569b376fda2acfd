//! Cron evaluation over the trigger list

use std::sync::Arc;

use serde::Serialize;
use time::UtcOffset;

use crate::model::Schedule;
use crate::ports::{Clock, ScheduleStoreError};
use crate::usecases::cron::{HourSpec, parse_timezone};
use crate::usecases::generator::{GenerateOptions, Generator, Progress};
use crate::usecases::schedules::ScheduleBook;

/// Outcome of one cron invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CronSummary {
    /// Triggers that ran to completion
    pub ran: Vec<String>,
    /// One-shot triggers that completed
    pub completed: Vec<String>,
    /// One-shot triggers deactivated in storage
    pub cleaned_up: usize,
}

pub struct Scheduler {
    generator: Arc<Generator>,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    pub fn new(generator: Arc<Generator>, clock: Arc<dyn Clock>) -> Self {
        Self { generator, clock }
    }

    /// Run every due trigger once; returns ids of completed one-shot triggers.
    ///
    /// A failing trigger is logged and does not stop the others.
    pub async fn run_cron(&self, schedules: &[Schedule]) -> Vec<String> {
        self.run_due(schedules).await.completed
    }

    async fn run_due(&self, schedules: &[Schedule]) -> CronSummary {
        let now = self.clock.now();
        let mut summary = CronSummary::default();

        for schedule in schedules {
            if !schedule.enabled {
                tracing::debug!(schedule = %schedule.name, "Skipping disabled schedule");
                continue;
            }

            let spec = match HourSpec::parse(&schedule.cron) {
                Ok(spec) => spec,
                Err(e) => {
                    tracing::error!(schedule = %schedule.name, error = %e, "Invalid cron expression");
                    continue;
                }
            };
            if !spec.is_due(now, offset_for(schedule)) {
                tracing::debug!(schedule = %schedule.name, cron = %schedule.cron, "Schedule not due");
                continue;
            }

            let typology = self.generator.resolve(schedule.typology).await;
            tracing::info!(schedule = %schedule.name, typology = %typology, "Running schedule");

            let options = GenerateOptions {
                seo_level: schedule.seo_level,
                research_mode: schedule.research_mode,
                research_file: None,
                custom_context: schedule.custom_context.clone(),
                author: schedule.author.clone(),
            };
            match self
                .generator
                .generate(typology, &options, &Progress::silent())
                .await
            {
                Ok(post) => {
                    tracing::info!(schedule = %schedule.name, slug = %post.slug, "Schedule completed");
                    summary.ran.push(schedule.id.clone());
                    if schedule.one_shot && !summary.completed.contains(&schedule.id) {
                        summary.completed.push(schedule.id.clone());
                    }
                }
                Err(e) => {
                    tracing::error!(schedule = %schedule.name, error = %e, "Schedule failed");
                }
            }
        }

        summary
    }

    /// Load triggers, run the due ones, then persist one-shot deactivation
    pub async fn run_and_clean_up(
        &self,
        book: &ScheduleBook,
    ) -> Result<CronSummary, ScheduleStoreError> {
        let schedules = book.list().await?;
        let mut summary = self.run_due(&schedules).await;
        summary.cleaned_up = book.deactivate(&summary.completed).await?;
        Ok(summary)
    }
}

fn offset_for(schedule: &Schedule) -> UtcOffset {
    parse_timezone(&schedule.timezone).unwrap_or_else(|| {
        tracing::warn!(
            schedule = %schedule.name,
            timezone = %schedule.timezone,
            "Unsupported timezone, evaluating in UTC"
        );
        UtcOffset::UTC
    })
}
