//! Schedules command - read or replace the trigger list

use anyhow::{Context, Result};
use autoblog_domain::Schedule;
use std::path::PathBuf;

use crate::args::{SchedulesArgs, SchedulesCommands};
use crate::commands::read_input;
use crate::config::AppConfig;
use crate::wiring::App;

pub async fn execute(args: SchedulesArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let app = App::build(&config).await?;

    let schedules = match args.command {
        SchedulesCommands::List => app.schedules.list().await?,
        SchedulesCommands::Set { file } => {
            let body = read_input(&file)?;
            let schedules: Vec<Schedule> = serde_json::from_str(&body)
                .with_context(|| format!("Invalid schedule JSON in {}", file.display()))?;
            app.schedules.replace(schedules).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&schedules)?);
    Ok(())
}
