//! Out-of-band deep research producing report files

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::ports::{
    AiError, AiProvider, Clock, PromptOptions, ReportError, ReportSource, ResearchSource,
    generate_object,
};
use crate::usecases::prompts::{
    learnings_prompt, learnings_schema, research_questions_prompt, research_questions_schema,
};

/// Search queries generated per topic
pub const QUESTIONS: usize = 3;

/// Sources scraped per query
pub const SOURCES_PER_QUESTION: usize = 2;

const MAX_LEARNINGS_PER_QUESTION: usize = 5;

#[derive(Debug, Error)]
pub enum DeepResearchError {
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("No learnings could be gathered for '{0}'")]
    NothingLearned(String),
}

#[derive(Deserialize)]
struct Questions {
    queries: Vec<String>,
}

#[derive(Deserialize)]
struct Learnings {
    learnings: Vec<String>,
}

/// Finished report
#[derive(Debug, Clone)]
pub struct ResearchReport {
    pub name: String,
    pub learnings: Vec<String>,
    pub sources: Vec<String>,
}

pub struct DeepResearcher {
    ai: Arc<dyn AiProvider>,
    research: Arc<dyn ResearchSource>,
    reports: Arc<dyn ReportSource>,
    clock: Arc<dyn Clock>,
}

impl DeepResearcher {
    pub fn new(
        ai: Arc<dyn AiProvider>,
        research: Arc<dyn ResearchSource>,
        reports: Arc<dyn ReportSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ai,
            research,
            reports,
            clock,
        }
    }

    /// Research `topic` and write `research-<unix-ms>.md`
    pub async fn conduct(&self, topic: &str) -> Result<ResearchReport, DeepResearchError> {
        let now = self.clock.now();
        tracing::info!(topic = %topic, "Starting deep research");

        let questions: Questions = generate_object(
            self.ai.as_ref(),
            &research_questions_prompt(topic, QUESTIONS, now),
            &research_questions_schema(),
            &PromptOptions::default(),
        )
        .await?;

        let mut learnings = Vec::new();
        let mut sources = Vec::new();
        for query in questions.queries.iter().take(QUESTIONS) {
            tracing::info!(query = %query, "Researching question");
            match self.investigate(query).await {
                Ok((found, urls)) => {
                    tracing::info!(query = %query, learnings = found.len(), "Extracted learnings");
                    learnings.extend(found);
                    for url in urls {
                        if !sources.contains(&url) {
                            sources.push(url);
                        }
                    }
                }
                Err(e) => tracing::warn!(query = %query, error = %e, "Research question failed"),
            }
        }

        if learnings.is_empty() {
            return Err(DeepResearchError::NothingLearned(topic.to_string()));
        }

        let millis = now.unix_timestamp_nanos() / 1_000_000;
        let name = format!("research-{}.md", millis);
        let report = ResearchReport {
            name,
            learnings,
            sources,
        };
        self.reports
            .write_report(&report.name, &render_report(topic, &report))
            .await?;
        tracing::info!(report = %report.name, "Deep research report written");
        Ok(report)
    }

    async fn investigate(&self, query: &str) -> Result<(Vec<String>, Vec<String>), String> {
        let context = self
            .research
            .search_and_scrape(query, SOURCES_PER_QUESTION)
            .await
            .map_err(|e| e.to_string())?;

        let extracted: Learnings = generate_object(
            self.ai.as_ref(),
            &learnings_prompt(query, &context.text),
            &learnings_schema(),
            &PromptOptions::default(),
        )
        .await
        .map_err(|e| e.to_string())?;

        let learnings = extracted
            .learnings
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .take(MAX_LEARNINGS_PER_QUESTION)
            .collect();
        Ok((learnings, context.sources))
    }
}

fn render_report(topic: &str, report: &ResearchReport) -> String {
    let mut md = format!("# Research Report: {}\n\n## Key Learnings\n", topic);
    for learning in &report.learnings {
        md.push_str(&format!("- {}\n", learning));
    }
    md.push_str("\n## Sources\n");
    if report.sources.is_empty() {
        md.push_str("- (none recorded)\n");
    }
    for source in &report.sources {
        md.push_str(&format!("- {}\n", source));
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::testing::{FakeAi, FakeReports, FakeResearch, FixedClock, NOW};

    fn researcher(ai: FakeAi, research: FakeResearch, reports: Arc<FakeReports>) -> DeepResearcher {
        DeepResearcher::new(
            Arc::new(ai),
            Arc::new(research),
            reports,
            Arc::new(FixedClock(NOW)),
        )
    }

    #[tokio::test]
    async fn test_writes_report_with_learnings_and_sources() {
        let ai = FakeAi::new()
            .on("research analyst", &[r#"{"queries": ["q1", "q2", "q3", "q4"]}"#])
            .on("Extract between 3 and 5", &[r#"{"learnings": ["Fact A", " ", "Fact B"]}"#]);
        let reports = Arc::new(FakeReports::default());
        let research = FakeResearch::ok("material", &["https://src.example/1"]);

        let report = researcher(ai, research, reports.clone())
            .conduct("Async Rust")
            .await
            .unwrap();

        let expected_name = format!("research-{}.md", NOW.unix_timestamp() * 1000);
        assert_eq!(report.name, expected_name);
        // three questions, two learnings each
        assert_eq!(report.learnings.len(), 6);
        assert_eq!(report.sources, ["https://src.example/1"]);

        let stored = reports.reports.lock().unwrap();
        let content = stored.get(&expected_name).unwrap();
        assert!(content.starts_with("# Research Report: Async Rust"));
        assert!(content.contains("- Fact A"));
        assert!(content.contains("- https://src.example/1"));
    }

    #[tokio::test]
    async fn test_failed_questions_are_skipped() {
        let ai = FakeAi::new()
            .on("research analyst", &[r#"{"queries": ["q1", "q2"]}"#])
            .on("Extract between 3 and 5", &["!ERR", r#"{"learnings": ["Only fact"]}"#]);
        let reports = Arc::new(FakeReports::default());

        let report = researcher(ai, FakeResearch::ok("material", &[]), reports)
            .conduct("Topic")
            .await
            .unwrap();
        assert_eq!(report.learnings, ["Only fact"]);
    }

    #[tokio::test]
    async fn test_nothing_learned_is_an_error() {
        let ai = FakeAi::new().on("research analyst", &[r#"{"queries": ["q1"]}"#]);
        let reports = Arc::new(FakeReports::default());

        let result = researcher(ai, FakeResearch::failing(), reports.clone())
            .conduct("Topic")
            .await;
        assert!(matches!(result, Err(DeepResearchError::NothingLearned(_))));
        assert!(reports.reports.lock().unwrap().is_empty());
    }
}
