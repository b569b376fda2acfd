//! Competitor overlap detection and friend backlinks

use std::sync::Arc;

use futures::future::join_all;

use crate::config::BlogConfig;
use crate::ports::{AiError, AiProvider, Dice, FeedReader, PromptOptions};
use crate::usecases::prompts::{OVERLAP_VERDICT, backlink_prompt, overlap_prompt};

/// Draft content after backlink insertion
#[derive(Debug, Clone, PartialEq)]
pub struct BacklinkOutcome {
    pub content: String,
    /// Base URLs of the friends linked
    pub backlinks: Vec<String>,
}

pub struct CompetitorsManager {
    config: Arc<BlogConfig>,
    ai: Arc<dyn AiProvider>,
    feeds: Arc<dyn FeedReader>,
    dice: Arc<dyn Dice>,
}

impl CompetitorsManager {
    pub fn new(
        config: Arc<BlogConfig>,
        ai: Arc<dyn AiProvider>,
        feeds: Arc<dyn FeedReader>,
        dice: Arc<dyn Dice>,
    ) -> Self {
        Self {
            config,
            ai,
            feeds,
            dice,
        }
    }

    /// Whether `title` is too close to what friends and enemies publish.
    ///
    /// Feed failures only drop that source; with no titles at all the answer
    /// is `false`.
    pub async fn check_overlap(&self, title: &str) -> Result<bool, AiError> {
        let competitors = &self.config.competitors;
        let sources: Vec<(&str, &str)> = competitors
            .friends
            .iter()
            .map(|f| (f.name.as_str(), f.rss_url.as_str()))
            .chain(
                competitors
                    .enemies
                    .iter()
                    .map(|e| (e.name.as_str(), e.rss_url.as_str())),
            )
            .collect();

        if sources.is_empty() {
            return Ok(false);
        }

        let fetches = sources.iter().map(|(_, url)| self.feeds.fetch_feed(url));
        let results = join_all(fetches).await;

        let mut titles = Vec::new();
        for ((name, _), result) in sources.iter().zip(results) {
            match result {
                Ok(items) => titles.extend(
                    items
                        .into_iter()
                        .map(|item| item.title)
                        .filter(|t| !t.trim().is_empty()),
                ),
                Err(e) => {
                    tracing::warn!(competitor = %name, error = %e, "Failed to fetch competitor feed");
                }
            }
        }

        if titles.is_empty() {
            tracing::debug!("No competitor titles available, treating topic as unique");
            return Ok(false);
        }

        let verdict = self
            .ai
            .generate_text(&overlap_prompt(title, &titles), &PromptOptions::default())
            .await?;
        Ok(verdict.contains(OVERLAP_VERDICT))
    }

    /// Append one link sentence per selected friend.
    ///
    /// Each friend is picked independently with probability
    /// `friendship_level / 10 * backlink_frequency`; the picks are then capped
    /// at `max_backlinks_per_post`.
    pub async fn insert_backlinks(&self, content: &str) -> Result<BacklinkOutcome, AiError> {
        let behavior = &self.config.competitors.behavior;
        let selected: Vec<_> = self
            .config
            .competitors
            .friends
            .iter()
            .filter(|friend| {
                let probability =
                    f64::from(friend.friendship_level) / 10.0 * f64::from(behavior.backlink_frequency);
                self.dice.unit() < probability
            })
            .take(behavior.max_backlinks_per_post)
            .collect();

        let mut outcome = BacklinkOutcome {
            content: content.to_string(),
            backlinks: vec![],
        };

        for friend in selected {
            let sentence = self
                .ai
                .generate_text(&backlink_prompt(content, friend), &PromptOptions::default())
                .await?;
            let sentence = sentence.trim();
            if sentence.is_empty() {
                tracing::warn!(friend = %friend.name, "Empty backlink sentence, skipping");
                continue;
            }
            outcome.content.push_str("\n\n");
            outcome.content.push_str(sentence);
            outcome.backlinks.push(friend.base_url.clone());
            tracing::info!(friend = %friend.name, url = %friend.base_url, "Inserted backlink");
        }

        Ok(outcome)
    }
}
