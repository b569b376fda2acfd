//! Subcommand implementations

pub mod config;
pub mod cron;
pub mod doctor;
pub mod feeds;
pub mod generate;
pub mod posts;
pub mod research;
pub mod schedules;
pub mod serve;

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Read a file, or stdin for `-`
pub(crate) fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        return Ok(buffer);
    }

    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
