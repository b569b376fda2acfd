//! Validated blog configuration consumed by the use cases

use crate::model::{Enemy, Friend, Typology, TypologyDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default target word count when a typology has none configured
pub const DEFAULT_LENGTH_TARGET: u32 = 800;

#[derive(Debug, Clone, Default)]
pub struct BlogConfig {
    pub site: SiteConfig,
    pub typologies: Vec<TypologyDefinition>,
    pub content: ContentConfig,
    pub sources: HashMap<Typology, SourceStrategy>,
    pub competitors: CompetitorsConfig,
    pub generation: GenerationConfig,
}

impl BlogConfig {
    /// Strategic brief for a typology
    pub fn intent_for(&self, typology: Typology) -> &str {
        self.definition(typology)
            .map(|d| d.intent.as_str())
            .unwrap_or("General blog post")
    }

    pub fn definition(&self, typology: Typology) -> Option<&TypologyDefinition> {
        self.typologies.iter().find(|d| d.id == typology)
    }

    pub fn length_target(&self, typology: Typology) -> u32 {
        self.content
            .length_targets
            .get(&typology)
            .copied()
            .unwrap_or(DEFAULT_LENGTH_TARGET)
    }

    /// Configured typology ids, or a small fallback set
    pub fn available_typologies(&self) -> Vec<Typology> {
        if self.typologies.is_empty() {
            Typology::FALLBACK.to_vec()
        } else {
            self.typologies.iter().map(|d| d.id).collect()
        }
    }

    pub fn sources_for(&self, typology: Typology) -> Option<&SourceStrategy> {
        self.sources.get(&typology)
    }

    /// Vector similarity above which a topic counts as a duplicate of our own work
    pub fn similarity_threshold(&self) -> f32 {
        1.0 - 0.3 * self.competitors.behavior.dedup_aggressiveness
    }
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub name: String,
    /// Absolute origin, e.g. `https://example.com`
    pub base_url: String,
    /// Path prefix of the blog section, e.g. `/blog`
    pub base_path: String,
    pub default_author: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Blog".to_string(),
            base_url: "http://localhost:3000".to_string(),
            base_path: "/blog".to_string(),
            default_author: None,
        }
    }
}

impl SiteConfig {
    /// Public URL of a post
    pub fn post_url(&self, slug: &str) -> String {
        format!("{}/{}", self.blog_url(), slug)
    }

    pub fn blog_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.base_path.trim_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContentConfig {
    pub length_targets: HashMap<Typology, u32>,
    pub slug_style: SlugStyle,
    pub language: Option<String>,
}

/// Word separator used in generated slugs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlugStyle {
    #[default]
    Hyphenated,
    Underscore,
}

impl SlugStyle {
    fn separator(self) -> char {
        match self {
            SlugStyle::Hyphenated => '-',
            SlugStyle::Underscore => '_',
        }
    }

    /// Lowercase ASCII alphanumerics joined by the configured separator
    pub fn slugify(self, input: &str) -> String {
        let sep = self.separator();
        let mut slug = String::with_capacity(input.len());
        let mut pending_sep = false;

        for c in input.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_sep && !slug.is_empty() {
                    slug.push(sep);
                }
                pending_sep = false;
                slug.push(c.to_ascii_lowercase());
            } else {
                pending_sep = true;
            }
        }

        slug
    }
}

/// Feeds and web-search hints for one typology
#[derive(Debug, Clone, Default)]
pub struct SourceStrategy {
    pub feeds: Vec<String>,
    pub allowed_domains: Vec<String>,
    /// Search query templates; `{topic}` is replaced with the topic title
    pub query_templates: Vec<String>,
}

impl SourceStrategy {
    /// Web search query for a topic
    pub fn query_for(&self, topic: &str) -> String {
        let mut query = match self.query_templates.first() {
            Some(template) => template.replace("{topic}", topic),
            None => topic.to_string(),
        };
        for domain in &self.allowed_domains {
            query.push_str(" site:");
            query.push_str(domain);
        }
        query
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompetitorsConfig {
    pub friends: Vec<Friend>,
    pub enemies: Vec<Enemy>,
    pub behavior: CompetitorBehavior,
}

#[derive(Debug, Clone)]
pub struct CompetitorBehavior {
    /// 0-1; higher means stricter deduplication
    pub dedup_aggressiveness: f32,
    /// 0-1; base probability of linking a friend
    pub backlink_frequency: f32,
    pub topic_avoidance_days: u32,
    pub max_backlinks_per_post: usize,
}

impl Default for CompetitorBehavior {
    fn default() -> Self {
        Self {
            dedup_aggressiveness: 0.5,
            backlink_frequency: 0.3,
            topic_avoidance_days: 30,
            max_backlinks_per_post: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Topic proposals tried before proceeding with the last one
    pub max_topic_attempts: u32,
    /// Results scraped per web-lite search
    pub web_lite_sources: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_topic_attempts: 3,
            web_lite_sources: 3,
        }
    }
}
