//! autoblog adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `llm`: AI provider adapters (OpenAI, Anthropic, Gemini, Ollama, stub)
//! - `store`: layered file, SQLite and in-memory post stores
//! - `feeds`: HTTP RSS/Atom reader
//! - `research`: Firecrawl search and the report directory
//! - `remote`: GitHub commits and workflow dispatch
//! - `schedules`: JSON file trigger store

mod feed_http;
mod post_store_fs;
mod post_store_memory;
mod post_store_sqlite;
mod remote_github;
mod reports_fs;
mod research_firecrawl;
mod schedules_fs;

pub mod llm;

/// Re-exports for post store adapters
pub mod store {
    pub use crate::post_store_fs::{LayeredFileStore, WriteReport};
    pub use crate::post_store_memory::InMemoryPostStore;
    pub use crate::post_store_sqlite::SqlitePostStore;
}

/// Re-exports for feed adapters
pub mod feeds {
    pub use crate::feed_http::{HttpFeedReader, parse_feed};
}

/// Re-exports for research adapters
pub mod research {
    pub use crate::reports_fs::FsReportSource;
    pub use crate::research_firecrawl::FirecrawlResearch;
}

/// Re-exports for the remote store adapter
pub mod remote {
    pub use crate::remote_github::{GitHubConfig, GitHubRemote};
}

/// Re-exports for trigger storage
pub mod schedules {
    pub use crate::schedules_fs::FsScheduleStore;
}
