//! Research command - out-of-band deep research worker

use anyhow::{Context, Result, bail};
use std::path::PathBuf;

use crate::args::ResearchArgs;
use crate::config::AppConfig;
use crate::wiring::App;

pub async fn execute(args: ResearchArgs, config_path: Option<PathBuf>) -> Result<()> {
    let topic = args.topic.trim();
    if topic.is_empty() {
        bail!("Research topic must not be empty");
    }

    let config = AppConfig::load(config_path.as_deref())?;
    let app = App::build(&config).await?;

    let report = app
        .researcher()?
        .conduct(topic)
        .await
        .with_context(|| format!("Deep research failed for '{}'", topic))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "report": report.name,
            "learnings": report.learnings.len(),
            "sources": report.sources,
        }))?
    );
    Ok(())
}
