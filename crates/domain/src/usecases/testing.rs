//! Fake ports shared by the use case tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use time::macros::datetime;

use crate::model::{
    CommitReceipt, FeedItem, FileChange, Post, PostFilter, ResearchContext, Schedule,
};
use crate::ports::{
    AiError, AiProvider, Clock, Dice, Embedder, FeedError, FeedReader, PostStore, PromptOptions,
    RemoteError, RemoteStore, ReportError, ReportSource, ResearchError, ResearchSource,
    ScheduleStore, ScheduleStoreError, SemanticIndex, StoreError,
};

pub const NOW: OffsetDateTime = datetime!(2026-10-16 09:15 UTC);

/// Scripted model: the most recently added rule whose needle appears in the
/// prompt answers. A rule's replies are consumed in order and the last one repeats.
/// A reply of `"!ERR"` fails the call.
#[derive(Default)]
pub struct FakeAi {
    rules: Mutex<Vec<(String, Vec<String>)>>,
    pub prompts: Mutex<Vec<String>>,
    embedding: Option<Result<Vec<f32>, ()>>,
}

impl FakeAi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, needle: &str, replies: &[&str]) -> Self {
        self.rules.lock().unwrap().push((
            needle.to_string(),
            replies.iter().map(|r| r.to_string()).collect(),
        ));
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(Ok(embedding));
        self
    }

    pub fn with_failing_embedder(mut self) -> Self {
        self.embedding = Some(Err(()));
        self
    }

    /// Canned pipeline: one topic, one draft, unique verdicts
    pub fn pipeline() -> Self {
        Self::new()
            .on(
                "content strategist",
                &[r#"{"title": "Async Rust in Practice", "focus": "executors"}"#],
            )
            .on(
                "professional blog author",
                &[r#"{"title": "Async Rust in Practice", "excerpt": "A tour.", "content": "Body text.", "slug": "Async Rust In Practice"}"#],
            )
            .on("TOO_SIMILAR", &["UNIQUE"])
            .on("natural sentence", &["See [Friend](https://friend.example)."])
    }

    pub fn prompts_containing(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }
}

#[async_trait]
impl AiProvider for FakeAi {
    async fn generate_text(&self, prompt: &str, _options: &PromptOptions) -> Result<String, AiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut rules = self.rules.lock().unwrap();
        let rule = rules.iter_mut().rev().find(|(needle, _)| prompt.contains(needle.as_str()));
        let reply = match rule {
            Some((_, replies)) if replies.len() > 1 => replies.remove(0),
            Some((_, replies)) => replies.first().cloned().unwrap_or_default(),
            None => return Err(AiError::Provider("no scripted reply".to_string())),
        };
        if reply == "!ERR" {
            return Err(AiError::Provider("scripted failure".to_string()));
        }
        Ok(reply)
    }

    fn embedder(&self) -> Option<&dyn Embedder> {
        self.embedding.as_ref().map(|_| self as &dyn Embedder)
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

#[async_trait]
impl Embedder for FakeAi {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, AiError> {
        match &self.embedding {
            Some(Ok(v)) => Ok(v.clone()),
            _ => Err(AiError::Provider("embedding failed".to_string())),
        }
    }
}

/// In-memory post store with an optional scripted similarity index
#[derive(Default)]
pub struct FakeStore {
    pub posts: Mutex<HashMap<String, Post>>,
    pub(crate) index: Option<FakeIndex>,
    pub fail_saves: bool,
}

#[derive(Default)]
pub struct FakeIndex {
    /// Results of successive `find_similar` calls; empty once exhausted
    pub similar: Mutex<Vec<Vec<String>>>,
    pub saved: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn with_index(similar: Vec<Vec<String>>) -> Self {
        Self {
            index: Some(FakeIndex {
                similar: Mutex::new(similar),
                saved: Mutex::new(vec![]),
            }),
            ..Default::default()
        }
    }

    pub fn with_titles(titles: &[&str]) -> Self {
        let store = Self::default();
        for (i, title) in titles.iter().enumerate() {
            let mut post = Post::new(format!("post-{}", i), *title);
            post.created_at = Some(NOW - time::Duration::days(i as i64 + 1));
            store.posts.lock().unwrap().insert(post.slug.clone(), post);
        }
        store
    }

    pub fn indexed(&self) -> Vec<String> {
        self.index
            .as_ref()
            .map(|i| i.saved.lock().unwrap().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PostStore for FakeStore {
    async fn get_post(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        Ok(self.posts.lock().unwrap().get(slug).cloned())
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, StoreError> {
        let posts: Vec<Post> = self.posts.lock().unwrap().values().cloned().collect();
        Ok(filter.apply(posts))
    }

    async fn save_post(&self, post: &Post) -> Result<Post, StoreError> {
        if self.fail_saves {
            return Err(StoreError::Persistence("no writable location".to_string()));
        }
        let previous = self.get_post(&post.slug).await?.and_then(|p| p.created_at);
        let saved = post.clone().stamp(previous, NOW);
        self.posts
            .lock()
            .unwrap()
            .insert(saved.slug.clone(), saved.clone());
        Ok(saved)
    }

    async fn delete_post(&self, slug: &str) -> Result<bool, StoreError> {
        Ok(self.posts.lock().unwrap().remove(slug).is_some())
    }

    fn semantic_index(&self) -> Option<&dyn SemanticIndex> {
        self.index.as_ref().map(|i| i as &dyn SemanticIndex)
    }
}

#[async_trait]
impl SemanticIndex for FakeIndex {
    async fn save_embedding(&self, slug: &str, _embedding: &[f32]) -> Result<(), StoreError> {
        self.saved.lock().unwrap().push(slug.to_string());
        Ok(())
    }

    async fn find_similar(
        &self,
        _embedding: &[f32],
        _threshold: f32,
        _limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let mut similar = self.similar.lock().unwrap();
        if similar.is_empty() {
            Ok(vec![])
        } else {
            Ok(similar.remove(0))
        }
    }
}

/// Feeds keyed by URL; unknown URLs fail
#[derive(Default)]
pub struct FakeFeeds {
    pub feeds: HashMap<String, Vec<FeedItem>>,
}

impl FakeFeeds {
    pub fn with(mut self, url: &str, titles: &[&str]) -> Self {
        self.feeds.insert(
            url.to_string(),
            titles
                .iter()
                .map(|t| FeedItem {
                    title: t.to_string(),
                    link: None,
                })
                .collect(),
        );
        self
    }
}

#[async_trait]
impl FeedReader for FakeFeeds {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<FeedItem>, FeedError> {
        self.feeds
            .get(url)
            .cloned()
            .ok_or_else(|| FeedError::Network(format!("unreachable: {}", url)))
    }
}

pub struct FakeResearch {
    pub result: Result<ResearchContext, String>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeResearch {
    pub fn ok(text: &str, sources: &[&str]) -> Self {
        Self {
            result: Ok(ResearchContext {
                text: text.to_string(),
                sources: sources.iter().map(|s| s.to_string()).collect(),
            }),
            queries: Mutex::new(vec![]),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Err("search down".to_string()),
            queries: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl ResearchSource for FakeResearch {
    async fn search_and_scrape(
        &self,
        query: &str,
        _limit: usize,
    ) -> Result<ResearchContext, ResearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.result.clone().map_err(ResearchError::Network)
    }
}

#[derive(Default)]
pub struct FakeReports {
    pub reports: Mutex<HashMap<String, String>>,
    pub latest: Option<String>,
}

#[async_trait]
impl ReportSource for FakeReports {
    async fn latest_report(&self) -> Result<Option<String>, ReportError> {
        Ok(self
            .latest
            .as_ref()
            .and_then(|name| self.reports.lock().unwrap().get(name).cloned()))
    }

    async fn read_report(&self, name: &str) -> Result<String, ReportError> {
        self.reports
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| ReportError::NotFound(name.to_string()))
    }

    async fn write_report(&self, name: &str, content: &str) -> Result<(), ReportError> {
        self.reports
            .lock()
            .unwrap()
            .insert(name.to_string(), content.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRemote {
    pub workflows: Mutex<Vec<(String, String)>>,
    pub commits: Mutex<Vec<Vec<FileChange>>>,
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn commit_files(
        &self,
        files: &[FileChange],
        _message: &str,
    ) -> Result<CommitReceipt, RemoteError> {
        self.commits.lock().unwrap().push(files.to_vec());
        Ok(CommitReceipt {
            sha: Some("abc123".to_string()),
        })
    }

    async fn delete_file(&self, _path: &str, _message: &str) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn trigger_workflow(&self, topic: &str, typology: &str) -> Result<(), RemoteError> {
        self.workflows
            .lock()
            .unwrap()
            .push((topic.to_string(), typology.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeSchedules {
    pub schedules: Mutex<Vec<Schedule>>,
}

#[async_trait]
impl ScheduleStore for FakeSchedules {
    async fn load(&self) -> Result<Vec<Schedule>, ScheduleStoreError> {
        Ok(self.schedules.lock().unwrap().clone())
    }

    async fn save(&self, schedules: &[Schedule]) -> Result<(), ScheduleStoreError> {
        *self.schedules.lock().unwrap() = schedules.to_vec();
        Ok(())
    }
}

pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// Always draws the same values
pub struct FixedDice {
    pub unit: f64,
    pub index: usize,
}

impl Dice for FixedDice {
    fn unit(&self) -> f64 {
        self.unit
    }

    fn index(&self, len: usize) -> usize {
        self.index.min(len.saturating_sub(1))
    }
}

pub fn dice(unit: f64) -> Arc<FixedDice> {
    Arc::new(FixedDice { unit, index: 0 })
}
