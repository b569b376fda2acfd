//! Configuration loading and management

use anyhow::{Context, Result};
use autoblog_domain::{
    BlogConfig, CompetitorBehavior, CompetitorsConfig, ContentConfig, Enemy, Friend,
    GenerationConfig, SiteConfig, SlugStyle, SourceStrategy, Typology, TypologyDefinition,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "./autoblog.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub blog: BlogSection,

    #[serde(default)]
    pub content: ContentSection,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub research: ResearchConfig,

    #[serde(default)]
    pub sources: HashMap<String, SourceSection>,

    #[serde(default)]
    pub friends_enemies: FriendsEnemiesConfig,

    #[serde(default)]
    pub schedules: SchedulesConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogSection {
    #[serde(default = "default_site_name")]
    pub name: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_base_path")]
    pub base_path: String,

    #[serde(default)]
    pub default_author: Option<String>,

    #[serde(default)]
    pub typologies: Vec<TypologyEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypologyEntry {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub intent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSection {
    #[serde(default)]
    pub length_targets: HashMap<String, u32>,

    #[serde(default)]
    pub slug_style: SlugStyle,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default = "default_max_topic_attempts")]
    pub max_topic_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// openai, anthropic, gemini, ollama, openai_compat, stub
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub embedding_model: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default)]
    pub top_p: Option<f64>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_llm_retries")]
    pub retries: u32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub anthropic: AnthropicConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    pub openai_compat: OpenAiCompatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default = "default_anthropic_api_key_env")]
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_api_key_env")]
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiCompatConfig {
    #[serde(default)]
    pub api_key_env: String,

    #[serde(default)]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// file, sqlite, memory
    #[serde(default = "default_storage_adapter")]
    pub adapter: String,

    #[serde(default = "default_durable_dir")]
    pub durable_dir: PathBuf,

    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub owner: String,

    #[serde(default)]
    pub repo: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default = "default_github_token_env")]
    pub token_env: String,

    #[serde(default = "default_content_prefix")]
    pub content_prefix: String,

    #[serde(default = "default_workflow")]
    pub workflow: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default = "default_firecrawl_api_key_env")]
    pub firecrawl_api_key_env: String,

    #[serde(default = "default_firecrawl_base_url")]
    pub firecrawl_base_url: String,

    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    #[serde(default = "default_web_lite_sources")]
    pub web_lite_sources: usize,

    #[serde(default = "default_research_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSection {
    #[serde(default)]
    pub feeds: Vec<String>,

    #[serde(default)]
    pub allowed_domains: Vec<String>,

    #[serde(default)]
    pub query_templates: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FriendsEnemiesConfig {
    #[serde(default)]
    pub friends: Vec<Friend>,

    #[serde(default)]
    pub enemies: Vec<Enemy>,

    #[serde(default)]
    pub behavior: BehaviorSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorSection {
    #[serde(default = "default_dedup_aggressiveness")]
    pub dedup_aggressiveness: f32,

    #[serde(default = "default_backlink_frequency")]
    pub backlink_frequency: f32,

    #[serde(default = "default_topic_avoidance_days")]
    pub topic_avoidance_days: u32,

    #[serde(default = "default_max_backlinks")]
    pub max_backlinks_per_post: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulesConfig {
    #[serde(default = "default_schedules_path")]
    pub path: PathBuf,

    /// Path of the mirrored file on the remote
    #[serde(default = "default_remote_schedules_path")]
    pub remote_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_admin_token_env")]
    pub admin_token_env: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_site_name() -> String {
    SiteConfig::default().name
}

fn default_base_url() -> String {
    SiteConfig::default().base_url
}

fn default_base_path() -> String {
    SiteConfig::default().base_path
}

fn default_max_topic_attempts() -> u32 {
    GenerationConfig::default().max_topic_attempts
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f64 {
    0.7
}

fn default_timeout() -> u64 {
    120
}

fn default_llm_retries() -> u32 {
    2
}

fn default_max_output_tokens() -> u32 {
    4096
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_gemini_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_storage_adapter() -> String {
    "file".to_string()
}

fn default_durable_dir() -> PathBuf {
    PathBuf::from("./content/posts")
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("autoblog").join("posts")
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./autoblog.sqlite")
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_github_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_content_prefix() -> String {
    "content/posts".to_string()
}

fn default_workflow() -> String {
    "deep-research.yml".to_string()
}

fn default_firecrawl_api_key_env() -> String {
    "FIRECRAWL_API_KEY".to_string()
}

fn default_firecrawl_base_url() -> String {
    "https://api.firecrawl.dev/v1".to_string()
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("./research")
}

fn default_web_lite_sources() -> usize {
    GenerationConfig::default().web_lite_sources
}

fn default_research_timeout() -> u64 {
    60
}

fn default_dedup_aggressiveness() -> f32 {
    CompetitorBehavior::default().dedup_aggressiveness
}

fn default_backlink_frequency() -> f32 {
    CompetitorBehavior::default().backlink_frequency
}

fn default_topic_avoidance_days() -> u32 {
    CompetitorBehavior::default().topic_avoidance_days
}

fn default_max_backlinks() -> usize {
    CompetitorBehavior::default().max_backlinks_per_post
}

fn default_schedules_path() -> PathBuf {
    PathBuf::from("./data/schedules.json")
}

fn default_remote_schedules_path() -> String {
    "data/schedules.json".to_string()
}

fn default_admin_token_env() -> String {
    "AUTOBLOG_ADMIN_TOKEN".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            bind: default_bind(),
        }
    }
}

impl Default for BlogSection {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            base_url: default_base_url(),
            base_path: default_base_path(),
            default_author: None,
            typologies: vec![],
        }
    }
}

impl Default for ContentSection {
    fn default() -> Self {
        Self {
            length_targets: HashMap::new(),
            slug_style: SlugStyle::default(),
            language: None,
            max_topic_attempts: default_max_topic_attempts(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            embedding_model: None,
            temperature: default_temperature(),
            top_p: None,
            timeout_secs: default_timeout(),
            retries: default_llm_retries(),
            max_output_tokens: default_max_output_tokens(),
            openai: OpenAiConfig::default(),
            anthropic: AnthropicConfig::default(),
            gemini: GeminiConfig::default(),
            ollama: OllamaConfig::default(),
            openai_compat: OpenAiCompatConfig::default(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openai_api_key_env(),
            base_url: default_openai_base_url(),
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_anthropic_api_key_env(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_gemini_api_key_env(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            adapter: default_storage_adapter(),
            durable_dir: default_durable_dir(),
            scratch_dir: default_scratch_dir(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            branch: default_branch(),
            token_env: default_github_token_env(),
            content_prefix: default_content_prefix(),
            workflow: default_workflow(),
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            firecrawl_api_key_env: default_firecrawl_api_key_env(),
            firecrawl_base_url: default_firecrawl_base_url(),
            reports_dir: default_reports_dir(),
            web_lite_sources: default_web_lite_sources(),
            timeout_secs: default_research_timeout(),
        }
    }
}

impl Default for BehaviorSection {
    fn default() -> Self {
        Self {
            dedup_aggressiveness: default_dedup_aggressiveness(),
            backlink_frequency: default_backlink_frequency(),
            topic_avoidance_days: default_topic_avoidance_days(),
            max_backlinks_per_post: default_max_backlinks(),
        }
    }
}

impl Default for SchedulesConfig {
    fn default() -> Self {
        Self {
            path: default_schedules_path(),
            remote_path: default_remote_schedules_path(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            admin_token_env: default_admin_token_env(),
        }
    }
}

fn parse_typology(id: &str, section: &str) -> Result<Typology> {
    id.parse()
        .with_context(|| format!("Invalid typology in [{}]", section))
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        builder = builder.add_source(
            config::Environment::with_prefix("AUTOBLOG")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate into the immutable domain configuration
    pub fn blog_config(&self) -> Result<BlogConfig> {
        let typologies = self
            .blog
            .typologies
            .iter()
            .map(|entry| {
                let id = parse_typology(&entry.id, "blog.typologies")?;
                Ok(TypologyDefinition {
                    id,
                    title: if entry.title.is_empty() {
                        entry.id.clone()
                    } else {
                        entry.title.clone()
                    },
                    intent: entry.intent.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let length_targets = self
            .content
            .length_targets
            .iter()
            .map(|(id, words)| Ok((parse_typology(id, "content.length_targets")?, *words)))
            .collect::<Result<HashMap<_, _>>>()?;

        let sources = self
            .sources
            .iter()
            .map(|(id, section)| {
                Ok((
                    parse_typology(id, "sources")?,
                    SourceStrategy {
                        feeds: section.feeds.clone(),
                        allowed_domains: section.allowed_domains.clone(),
                        query_templates: section.query_templates.clone(),
                    },
                ))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        let behavior = &self.friends_enemies.behavior;
        if !(0.0..=1.0).contains(&behavior.dedup_aggressiveness) {
            anyhow::bail!("friends_enemies.behavior.dedup_aggressiveness must be within 0.0-1.0");
        }
        if !(0.0..=1.0).contains(&behavior.backlink_frequency) {
            anyhow::bail!("friends_enemies.behavior.backlink_frequency must be within 0.0-1.0");
        }

        Ok(BlogConfig {
            site: SiteConfig {
                name: self.blog.name.clone(),
                base_url: self.blog.base_url.clone(),
                base_path: self.blog.base_path.clone(),
                default_author: self.blog.default_author.clone(),
            },
            typologies,
            content: ContentConfig {
                length_targets,
                slug_style: self.content.slug_style,
                language: self.content.language.clone(),
            },
            sources,
            competitors: CompetitorsConfig {
                friends: self.friends_enemies.friends.clone(),
                enemies: self.friends_enemies.enemies.clone(),
                behavior: CompetitorBehavior {
                    dedup_aggressiveness: behavior.dedup_aggressiveness,
                    backlink_frequency: behavior.backlink_frequency,
                    topic_avoidance_days: behavior.topic_avoidance_days,
                    max_backlinks_per_post: behavior.max_backlinks_per_post,
                },
            },
            generation: GenerationConfig {
                max_topic_attempts: self.content.max_topic_attempts,
                web_lite_sources: self.research.web_lite_sources,
            },
        })
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# autoblog configuration
# Every key is optional. Environment overrides use AUTOBLOG__SECTION__KEY.

[general]
log_level = "info"
log_format = "pretty"  # pretty, json
bind = "127.0.0.1:3000"

[blog]
name = "My Blog"
base_url = "https://example.com"
base_path = "/blog"
# default_author = "Editorial Team"

[[blog.typologies]]
id = "news"
title = "News"
intent = "Timely coverage of announcements and releases"

[[blog.typologies]]
id = "guide"
title = "Guide"
intent = "Evergreen how-to content for newcomers"

[[blog.typologies]]
id = "deep_dive"
title = "Deep Dive"
intent = "Long-form technical analysis"

[content]
slug_style = "hyphenated"  # hyphenated, underscore
# language = "English"
max_topic_attempts = 3

[content.length_targets]
news = 500
guide = 1200
deep_dive = 2000

[llm]
provider = "openai"  # openai, anthropic, gemini, ollama, openai_compat, stub
model = "gpt-4o-mini"
# embedding_model = "text-embedding-3-small"
temperature = 0.7
# top_p = 0.9
timeout_secs = 120
retries = 2
max_output_tokens = 4096

[llm.openai]
api_key_env = "OPENAI_API_KEY"
base_url = "https://api.openai.com/v1"

[llm.anthropic]
api_key_env = "ANTHROPIC_API_KEY"

[llm.gemini]
api_key_env = "GEMINI_API_KEY"

[llm.ollama]
base_url = "http://localhost:11434"

[llm.openai_compat]
api_key_env = "LLM_API_KEY"
base_url = "https://your-provider.com/v1"

[storage]
adapter = "file"  # file, sqlite, memory
durable_dir = "./content/posts"
scratch_dir = "/tmp/autoblog/posts"
sqlite_path = "./autoblog.sqlite"

[remote]
# Commits are mirrored to GitHub when owner, repo and the token are all set
owner = ""
repo = ""
branch = "main"
token_env = "GITHUB_TOKEN"
content_prefix = "content/posts"
workflow = "deep-research.yml"

[research]
firecrawl_api_key_env = "FIRECRAWL_API_KEY"
firecrawl_base_url = "https://api.firecrawl.dev/v1"
reports_dir = "./research"
web_lite_sources = 3
timeout_secs = 60

[sources.news]
feeds = ["https://blog.rust-lang.org/feed.xml"]
allowed_domains = ["rust-lang.org"]
query_templates = ["{topic} latest announcement"]

[friends_enemies.behavior]
dedup_aggressiveness = 0.5
backlink_frequency = 0.3
topic_avoidance_days = 30
max_backlinks_per_post = 2

# [[friends_enemies.friends]]
# name = "Friendly Site"
# base_url = "https://friend.example"
# rss_url = "https://friend.example/rss.xml"
# friendship_level = 7

# [[friends_enemies.enemies]]
# name = "Rival Site"
# base_url = "https://rival.example"
# rss_url = "https://rival.example/feed"

[schedules]
path = "./data/schedules.json"
remote_path = "data/schedules.json"

[server]
admin_token_env = "AUTOBLOG_ADMIN_TOKEN"
"#
        .to_string()
    }
}
