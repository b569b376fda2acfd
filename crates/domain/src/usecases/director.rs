//! Picks the next typology when the caller asks for `AUTO`

use std::sync::Arc;

use crate::config::BlogConfig;
use crate::model::Typology;
use crate::ports::{AiProvider, Dice, PromptOptions};
use crate::usecases::prompts::director_prompt;

pub struct Director {
    config: Arc<BlogConfig>,
    ai: Arc<dyn AiProvider>,
    dice: Arc<dyn Dice>,
}

impl Director {
    pub fn new(config: Arc<BlogConfig>, ai: Arc<dyn AiProvider>, dice: Arc<dyn Dice>) -> Self {
        Self { config, ai, dice }
    }

    /// Always returns a member of `available`; provider failures and
    /// unrecognised answers fall back to a uniform random pick.
    ///
    /// An empty `available` set is widened to the configured typologies.
    pub async fn decide_next_typology(
        &self,
        available: &[Typology],
        recent_titles: &[String],
    ) -> Typology {
        let configured;
        let available = if available.is_empty() {
            configured = self.config.available_typologies();
            configured.as_slice()
        } else {
            available
        };

        let prompt = director_prompt(&self.config, available, recent_titles);
        match self.ai.generate_text(&prompt, &PromptOptions::default()).await {
            Ok(answer) => {
                let cleaned = clean_answer(&answer);
                match cleaned.parse::<Typology>() {
                    Ok(typology) if available.contains(&typology) => {
                        tracing::info!(typology = %typology, "Director selected typology");
                        return typology;
                    }
                    _ => {
                        tracing::warn!(answer = %cleaned, "Director returned an invalid typology, picking at random");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Director failed to decide, picking at random");
            }
        }

        available
            .get(self.dice.index(available.len()))
            .copied()
            .unwrap_or(Typology::News)
    }
}

fn clean_answer(answer: &str) -> String {
    answer
        .trim()
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '`'))
        .collect::<String>()
        .trim()
        .trim_end_matches('.')
        .to_ascii_lowercase()
}
