//! Cron command - run due schedules once

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::wiring::App;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let app = App::build(&config).await?;

    let summary = app
        .scheduler
        .run_and_clean_up(&app.schedules)
        .await
        .context("Failed to run schedules")?;

    tracing::info!(
        ran = summary.ran.len(),
        completed = summary.completed.len(),
        cleaned_up = summary.cleaned_up,
        "Cron run finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
