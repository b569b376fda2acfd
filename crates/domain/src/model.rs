//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// Default page size for post listings
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Number of recent titles handed to prompts for deduplication
pub const MEMORY_SIZE: usize = 50;

/// Lifecycle state of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
    Scheduled,
}

/// A published or draft article
///
/// `slug` is the only identity: saving a post whose slug already exists
/// overwrites the stored copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    /// Markdown body
    #[serde(default)]
    pub content: String,
    /// Typology id for generated posts, free-form for hand-written ones
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub status: PostStatus,
    /// Set on first save, never changed afterwards
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<OffsetDateTime>,
    /// Refreshed on every save
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<OffsetDateTime>,
    /// Research citations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_refs: Vec<String>,
    /// Friend URLs linked from the content during generation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backlinks: Vec<String>,
}

impl Post {
    /// Create a draft with the given identity and title, everything else empty
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            excerpt: String::new(),
            content: String::new(),
            category: String::new(),
            tags: vec![],
            author: None,
            cover_image: None,
            status: PostStatus::Draft,
            created_at: None,
            updated_at: None,
            published_at: None,
            source_refs: vec![],
            backlinks: vec![],
        }
    }

    /// Stamp timestamps for an upsert.
    ///
    /// `previous_created_at` is the creation time of the stored copy, if any;
    /// it wins over whatever the caller passed so identity stays stable.
    pub fn stamp(mut self, previous_created_at: Option<OffsetDateTime>, now: OffsetDateTime) -> Self {
        self.created_at = previous_created_at.or(self.created_at).or(Some(now));
        self.updated_at = Some(now);
        self
    }
}

/// Listing filter: category, pagination
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub category: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl PostFilter {
    /// Newest `limit` posts of any category
    pub fn recent(limit: usize) -> Self {
        Self {
            category: None,
            limit: Some(limit),
            offset: 0,
        }
    }

    /// Maximum number of posts returned
    pub fn page_size(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT)
    }

    /// Filter by category, sort newest-first by `created_at`, then paginate
    pub fn apply(&self, posts: impl IntoIterator<Item = Post>) -> Vec<Post> {
        let mut posts: Vec<Post> = posts
            .into_iter()
            .filter(|p| {
                self.category
                    .as_deref()
                    .is_none_or(|category| p.category == category)
            })
            .collect();

        posts.sort_by(|a, b| {
            let a = a.created_at.unwrap_or(OffsetDateTime::UNIX_EPOCH);
            let b = b.created_at.unwrap_or(OffsetDateTime::UNIX_EPOCH);
            b.cmp(&a)
        });

        posts
            .into_iter()
            .skip(self.offset)
            .take(self.page_size())
            .collect()
    }
}

/// Content category produced by the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Typology {
    News,
    Guide,
    Tutorial,
    DeepDive,
    Comparison,
    Opinion,
    PatchNotes,
    Spotlight,
}

impl Typology {
    pub const ALL: [Typology; 8] = [
        Typology::News,
        Typology::Guide,
        Typology::Tutorial,
        Typology::DeepDive,
        Typology::Comparison,
        Typology::Opinion,
        Typology::PatchNotes,
        Typology::Spotlight,
    ];

    /// Used when no typology definitions are configured
    pub const FALLBACK: [Typology; 3] = [Typology::News, Typology::Guide, Typology::Tutorial];

    pub fn id(self) -> &'static str {
        match self {
            Typology::News => "news",
            Typology::Guide => "guide",
            Typology::Tutorial => "tutorial",
            Typology::DeepDive => "deep_dive",
            Typology::Comparison => "comparison",
            Typology::Opinion => "opinion",
            Typology::PatchNotes => "patch_notes",
            Typology::Spotlight => "spotlight",
        }
    }
}

impl fmt::Display for Typology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Typology {
    type Err = UnknownTypology;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Typology::ALL
            .into_iter()
            .find(|t| t.id() == wanted)
            .ok_or_else(|| UnknownTypology(wanted.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown typology '{0}'")]
pub struct UnknownTypology(pub String);

/// A typology pinned by the caller, or `AUTO` to let the director choose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypologySelection {
    Auto,
    Specific(Typology),
}

impl TypologySelection {
    pub const AUTO: &'static str = "AUTO";
}

impl FromStr for TypologySelection {
    type Err = UnknownTypology;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(Self::AUTO) {
            Ok(Self::Auto)
        } else {
            s.parse().map(Self::Specific)
        }
    }
}

impl TryFrom<String> for TypologySelection {
    type Error = UnknownTypology;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypologySelection> for String {
    fn from(value: TypologySelection) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TypologySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str(Self::AUTO),
            Self::Specific(t) => t.fmt(f),
        }
    }
}

/// Human title and strategic brief for a typology
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypologyDefinition {
    pub id: Typology,
    pub title: String,
    /// Steers the director and the draft prompt
    pub intent: String,
}

/// SEO intensity: a fixed 0-10 value, or drawn at generation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SeoLevelRepr", into = "SeoLevelRepr")]
pub enum SeoLevel {
    Fixed(u8),
    Random,
}

impl SeoLevel {
    pub const MAX: u8 = 10;
    pub const RANDOM: &'static str = "RANDOM";
}

impl Default for SeoLevel {
    fn default() -> Self {
        Self::Fixed(5)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum SeoLevelRepr {
    Number(u8),
    Word(String),
}

impl TryFrom<SeoLevelRepr> for SeoLevel {
    type Error = String;

    fn try_from(value: SeoLevelRepr) -> Result<Self, Self::Error> {
        match value {
            SeoLevelRepr::Number(n) if n <= SeoLevel::MAX => Ok(SeoLevel::Fixed(n)),
            SeoLevelRepr::Number(n) => Err(format!("SEO level {} is out of range 0-10", n)),
            SeoLevelRepr::Word(word) => word.parse(),
        }
    }
}

impl From<SeoLevel> for SeoLevelRepr {
    fn from(value: SeoLevel) -> Self {
        match value {
            SeoLevel::Fixed(n) => SeoLevelRepr::Number(n),
            SeoLevel::Random => SeoLevelRepr::Word(SeoLevel::RANDOM.to_string()),
        }
    }
}

impl FromStr for SeoLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case(Self::RANDOM) {
            return Ok(Self::Random);
        }
        match s.parse::<u8>() {
            Ok(n) if n <= Self::MAX => Ok(Self::Fixed(n)),
            _ => Err(format!("Invalid SEO level '{}': expected 0-10 or RANDOM", s)),
        }
    }
}

/// Where draft research context comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ResearchMode {
    #[default]
    Internal,
    WebLite,
    Deep,
}

impl FromStr for ResearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "internal" => Ok(Self::Internal),
            "web-lite" => Ok(Self::WebLite),
            "deep" => Ok(Self::Deep),
            other => Err(format!(
                "Invalid research mode '{}': expected internal, web-lite or deep",
                other
            )),
        }
    }
}

impl fmt::Display for ResearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Internal => "internal",
            Self::WebLite => "web-lite",
            Self::Deep => "deep",
        })
    }
}

/// A cron-like generation trigger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(default = "new_schedule_id")]
    pub id: String,
    pub name: String,
    pub typology: TypologySelection,
    /// `minute hour day month weekday`; only the hour field is evaluated
    pub cron: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Disabled by the caller after its first successful run
    #[serde(default)]
    pub one_shot: bool,
    #[serde(default)]
    pub seo_level: SeoLevel,
    #[serde(default)]
    pub research_mode: ResearchMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_context: Option<String>,
}

fn new_schedule_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_true() -> bool {
    true
}

/// A peer site we link to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friend {
    pub name: String,
    pub base_url: String,
    pub rss_url: String,
    /// 1-10, scales backlink probability
    #[serde(default = "default_friendship_level")]
    pub friendship_level: u8,
}

fn default_friendship_level() -> u8 {
    5
}

/// A peer site we only avoid overlapping with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub name: String,
    pub base_url: String,
    pub rss_url: String,
}

/// Topic proposal returned by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicIdea {
    pub title: String,
    #[serde(default)]
    pub focus: String,
}

/// Article draft returned by the model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub slug: String,
}

/// One entry of a syndication feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub link: Option<String>,
}

/// Research material handed to the draft prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchContext {
    pub text: String,
    /// URLs the text was gathered from
    pub sources: Vec<String>,
}

impl ResearchContext {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: vec![],
        }
    }

    /// Instruction to rely on the model's own knowledge
    pub fn internal(topic: &str) -> Self {
        Self::new(format!(
            "Internal Knowledge Check for: {}. Focus on technical details and unique insights.",
            topic
        ))
    }
}

/// A file to write through the remote commit service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub content: String,
}

/// Result of a remote commit
#[derive(Debug, Clone, Default)]
pub struct CommitReceipt {
    pub sha: Option<String>,
}

/// Event emitted while a generation run progresses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    Progress { status: String },
    ResearchTriggered { topic: String },
    Complete { post: Post },
    Error { message: String },
}

impl GenerationEvent {
    /// Whether this event ends a stream
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}
