//! autoblog CLI entry point

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod args;
mod commands;
mod config;
mod wiring;

use args::{Cli, Commands};
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging settings come from the file when it loads; commands report load errors
    let general = AppConfig::load(cli.config.as_deref())
        .map(|c| c.general)
        .unwrap_or_default();
    let log_level = cli.log_level.as_deref().unwrap_or(&general.log_level);
    init_logging(log_level, general.log_format == "json")?;

    match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, cli.config).await,
        Commands::Cron => commands::cron::execute(cli.config).await,
        Commands::Posts(args) => commands::posts::execute(args, cli.config).await,
        Commands::Schedules(args) => commands::schedules::execute(args, cli.config).await,
        Commands::Sitemap => commands::feeds::sitemap(cli.config).await,
        Commands::Rss => commands::feeds::rss(cli.config).await,
        Commands::Research(args) => commands::research::execute(args, cli.config).await,
        Commands::Serve(args) => commands::serve::execute(args, cli.config).await,
        Commands::Config(args) => commands::config::execute(args).await,
        Commands::Doctor(args) => commands::doctor::execute(args, cli.config).await,
    }
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
