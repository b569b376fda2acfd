//! CLI argument definitions

use autoblog_domain::{ResearchMode, SeoLevel, TypologySelection};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// autoblog: AI-driven blog generation pipeline
#[derive(Parser, Debug)]
#[command(name = "autoblog")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate one post, streaming progress events as NDJSON
    Generate(GenerateArgs),

    /// Run every due schedule once
    Cron,

    /// Manage stored posts
    Posts(PostsArgs),

    /// Read or replace the schedule list
    Schedules(SchedulesArgs),

    /// Print the sitemap
    Sitemap,

    /// Print the RSS feed
    Rss,

    /// Run deep research on a topic and write a report
    Research(ResearchArgs),

    /// Serve the HTTP API
    Serve(ServeArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Typology id, or AUTO to let the director choose
    #[arg(long, default_value = "AUTO")]
    pub typology: TypologySelection,

    /// Research mode (internal, web-lite, deep)
    #[arg(long, default_value = "internal")]
    pub research_mode: ResearchMode,

    /// SEO intensity (0-10 or RANDOM)
    #[arg(long = "seo", default_value = "5")]
    pub seo_level: SeoLevel,

    /// Research report to use in deep mode
    #[arg(long)]
    pub research_file: Option<String>,

    /// Extra instructions for the draft
    #[arg(long)]
    pub context: Option<String>,

    /// Author override
    #[arg(long)]
    pub author: Option<String>,
}

#[derive(Args, Debug)]
pub struct PostsArgs {
    #[command(subcommand)]
    pub command: PostsCommands,
}

#[derive(Subcommand, Debug)]
pub enum PostsCommands {
    /// List posts, newest first
    List {
        /// Only posts of this category
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Print one post as JSON
    Get { slug: String },

    /// Save a post from a JSON file (use - for stdin)
    Save { file: PathBuf },

    /// Delete a post
    Delete { slug: String },
}

#[derive(Args, Debug)]
pub struct SchedulesArgs {
    #[command(subcommand)]
    pub command: SchedulesCommands,
}

#[derive(Subcommand, Debug)]
pub enum SchedulesCommands {
    /// Print the schedule list as JSON
    List,

    /// Replace the schedule list from a JSON file (use - for stdin)
    Set { file: PathBuf },
}

#[derive(Args, Debug)]
pub struct ResearchArgs {
    /// Topic to research
    #[arg(long)]
    pub topic: String,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind (overrides general.bind)
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./autoblog.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
