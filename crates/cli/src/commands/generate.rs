//! Generate command - one run, streamed as NDJSON events

use anyhow::{Result, bail};
use autoblog_domain::{
    GenerationEvent,
    usecases::{GenerateOptions, RunRequest},
};
use std::path::PathBuf;

use crate::args::GenerateArgs;
use crate::config::AppConfig;
use crate::wiring::App;

pub async fn execute(args: GenerateArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let app = App::build(&config).await?;

    let request = RunRequest {
        typology: args.typology,
        options: GenerateOptions {
            seo_level: args.seo_level,
            research_mode: args.research_mode,
            research_file: args.research_file,
            custom_context: args.context,
            author: args.author,
        },
    };
    tracing::info!(typology = %request.typology, research_mode = %request.options.research_mode, "Starting run");

    let mut events = app.generator.spawn_run(request);
    let mut failure = None;
    while let Some(event) = events.recv().await {
        println!("{}", serde_json::to_string(&event)?);
        if let GenerationEvent::Error { message } = &event {
            failure = Some(message.clone());
        }
        if event.is_terminal() {
            break;
        }
    }

    if let Some(message) = failure {
        bail!("Generation failed: {}", message);
    }
    Ok(())
}
