//! Application use cases / business logic

pub mod competitors;
pub mod cron;
pub mod deep_research;
pub mod director;
pub mod generator;
pub mod prompts;
pub mod render;
pub mod scheduler;
pub mod schedules;

#[cfg(test)]
pub(crate) mod testing;

pub use competitors::{BacklinkOutcome, CompetitorsManager};
pub use cron::{CronError, HourSpec, parse_timezone};
pub use deep_research::{DeepResearchError, DeepResearcher, ResearchReport};
pub use director::Director;
pub use generator::{
    Collaborators, GenerateError, GenerateOptions, Generator, Progress, RunRequest,
};
pub use render::FeedRenderer;
pub use scheduler::{CronSummary, Scheduler};
pub use schedules::ScheduleBook;
