//! Generation pipeline: topic, uniqueness, research, draft, backlinks, persistence

use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::config::BlogConfig;
use crate::model::{
    Draft, GenerationEvent, Post, PostStatus, ResearchContext, ResearchMode, SeoLevel, TopicIdea,
    Typology, TypologySelection,
};
use crate::ports::{
    AiError, AiProvider, Clock, Dice, FeedReader, PostStore, PromptOptions, RemoteStore,
    ReportSource, ResearchSource, StoreError, generate_object,
};
use crate::usecases::competitors::CompetitorsManager;
use crate::usecases::director::Director;
use crate::usecases::prompts::{DraftPrompt, TopicPrompt};

/// Feed headlines offered to topic selection
pub const MAX_HEADLINES: usize = 15;

/// Neighbours requested from the semantic index
const SIMILAR_LIMIT: usize = 5;

/// Error type for a generation run
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Remote error: {0}")]
    Remote(String),
    #[error("Model returned a draft without a title")]
    EmptyDraft,
}

/// Everything the generator talks to
#[derive(Clone)]
pub struct Collaborators {
    pub ai: Arc<dyn AiProvider>,
    pub store: Arc<dyn PostStore>,
    pub feeds: Arc<dyn FeedReader>,
    pub research: Option<Arc<dyn ResearchSource>>,
    pub reports: Option<Arc<dyn ReportSource>>,
    pub remote: Option<Arc<dyn RemoteStore>>,
    pub clock: Arc<dyn Clock>,
    pub dice: Arc<dyn Dice>,
}

/// Per-run overrides
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub seo_level: SeoLevel,
    pub research_mode: ResearchMode,
    /// Report to use in deep mode instead of the latest one
    pub research_file: Option<String>,
    pub custom_context: Option<String>,
    pub author: Option<String>,
}

/// A run requested through the streaming surface
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub typology: TypologySelection,
    pub options: GenerateOptions,
}

/// Progress sink; a silent instance drops every event
#[derive(Debug, Clone, Default)]
pub struct Progress {
    tx: Option<UnboundedSender<GenerationEvent>>,
}

impl Progress {
    pub fn silent() -> Self {
        Self { tx: None }
    }

    pub fn channel() -> (Self, UnboundedReceiver<GenerationEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Report a step boundary
    pub fn report(&self, status: impl Into<String>) {
        let status = status.into();
        tracing::info!(status = %status, "Generation progress");
        self.emit(GenerationEvent::Progress { status });
    }

    pub fn emit(&self, event: GenerationEvent) {
        if let Some(tx) = &self.tx {
            // A dropped receiver only means nobody is watching
            let _ = tx.send(event);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Unique,
    SimilarToOwn,
    OverlapsCompetitor,
}

pub struct Generator {
    config: Arc<BlogConfig>,
    deps: Collaborators,
    director: Director,
    competitors: CompetitorsManager,
}

impl Generator {
    pub fn new(config: Arc<BlogConfig>, deps: Collaborators) -> Self {
        let director = Director::new(
            Arc::clone(&config),
            Arc::clone(&deps.ai),
            Arc::clone(&deps.dice),
        );
        let competitors = CompetitorsManager::new(
            Arc::clone(&config),
            Arc::clone(&deps.ai),
            Arc::clone(&deps.feeds),
            Arc::clone(&deps.dice),
        );
        Self {
            config,
            deps,
            director,
            competitors,
        }
    }

    pub fn config(&self) -> &BlogConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn PostStore> {
        &self.deps.store
    }

    /// Turn `AUTO` into a concrete typology using the director and recent titles
    pub async fn resolve(&self, selection: TypologySelection) -> Typology {
        match selection {
            TypologySelection::Specific(typology) => typology,
            TypologySelection::Auto => {
                let memory = match self.deps.store.memory().await {
                    Ok(memory) => memory,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to load recent titles for director");
                        vec![]
                    }
                };
                self.director
                    .decide_next_typology(&self.config.available_typologies(), &memory)
                    .await
            }
        }
    }

    /// Run the full pipeline and persist the resulting post
    pub async fn generate(
        &self,
        typology: Typology,
        options: &GenerateOptions,
        progress: &Progress,
    ) -> Result<Post, GenerateError> {
        tracing::info!(typology = %typology, research_mode = %options.research_mode, "Starting generation");

        let topic = self.select_unique_topic(typology, progress).await?;
        tracing::info!(title = %topic.title, "Final topic");

        progress.report(format!("Researching ({})", options.research_mode));
        let research = self.research(&topic.title, typology, options).await;

        progress.report(format!("Drafting \"{}\"", topic.title));
        let draft = self.draft(typology, &topic, &research, options).await?;

        let (content, backlinks) = if draft.content.trim().is_empty() {
            (draft.content, vec![])
        } else {
            progress.report("Adding backlinks");
            let outcome = self.competitors.insert_backlinks(&draft.content).await?;
            (outcome.content, outcome.backlinks)
        };

        progress.report("Saving post");
        let now = self.deps.clock.now();
        let post = Post {
            excerpt: draft.excerpt,
            content,
            category: typology.id().to_string(),
            author: options
                .author
                .clone()
                .or_else(|| self.config.site.default_author.clone()),
            status: PostStatus::Published,
            published_at: Some(now),
            source_refs: research.sources,
            backlinks,
            ..Post::new(draft.slug, draft.title)
        };
        let saved = self.deps.store.save_post(&post).await?;
        tracing::info!(slug = %saved.slug, typology = %typology, "Post saved");

        self.index_embedding(&saved).await;

        Ok(saved)
    }

    /// Pick a topic and hand it to the out-of-band deep research workflow
    pub async fn initiate_deep_research(
        &self,
        typology: Typology,
        progress: &Progress,
    ) -> Result<String, GenerateError> {
        let remote = self
            .deps
            .remote
            .as_ref()
            .ok_or_else(|| GenerateError::Remote("No remote store configured".to_string()))?;

        let topic = self.select_unique_topic(typology, progress).await?;
        progress.report("Dispatching deep research");
        remote
            .trigger_workflow(&topic.title, typology.id())
            .await
            .map_err(|e| GenerateError::Remote(e.to_string()))?;
        tracing::info!(title = %topic.title, typology = %typology, "Deep research triggered");
        Ok(topic.title)
    }

    /// Resolve the typology, then either generate or dispatch deep research
    pub async fn run(
        &self,
        request: &RunRequest,
        progress: &Progress,
    ) -> Result<GenerationEvent, GenerateError> {
        progress.report("Choosing typology");
        let typology = self.resolve(request.typology).await;
        progress.report(format!("Typology: {}", typology));

        let dispatch = request.options.research_mode == ResearchMode::Deep
            && request.options.research_file.is_none()
            && self.deps.remote.is_some();
        if dispatch {
            let topic = self.initiate_deep_research(typology, progress).await?;
            return Ok(GenerationEvent::ResearchTriggered { topic });
        }

        let post = self.generate(typology, &request.options, progress).await?;
        Ok(GenerationEvent::Complete { post })
    }

    /// Run in the background and stream events.
    ///
    /// The stream always ends with a terminal event, even if the run panics.
    pub fn spawn_run(self: &Arc<Self>, request: RunRequest) -> UnboundedReceiver<GenerationEvent> {
        let (progress, rx) = Progress::channel();
        let generator = Arc::clone(self);
        let outer = progress.clone();

        tokio::spawn(async move {
            let inner =
                tokio::spawn(async move { generator.run(&request, &progress).await });
            let terminal = match inner.await {
                Ok(Ok(event)) => event,
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Generation failed");
                    GenerationEvent::Error {
                        message: e.to_string(),
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Generation task aborted");
                    GenerationEvent::Error {
                        message: format!("Generation task aborted: {}", e),
                    }
                }
            };
            outer.emit(terminal);
        });

        rx
    }

    /// Topic selection behind both uniqueness gates, sharing one attempt budget
    async fn select_unique_topic(
        &self,
        typology: Typology,
        progress: &Progress,
    ) -> Result<TopicIdea, GenerateError> {
        let max_attempts = self.config.generation.max_topic_attempts.max(1);
        let mut attempt = 1;

        loop {
            progress.report(format!(
                "Selecting topic (attempt {}/{})",
                attempt, max_attempts
            ));
            let topic = self.select_topic(typology).await?;
            let verdict = self.uniqueness(&topic.title).await?;

            if verdict == Verdict::Unique {
                return Ok(topic);
            }
            if attempt >= max_attempts {
                tracing::warn!(
                    title = %topic.title,
                    verdict = ?verdict,
                    "Topic attempts exhausted, proceeding with last topic"
                );
                return Ok(topic);
            }

            tracing::info!(title = %topic.title, verdict = ?verdict, "Topic rejected, retrying");
            attempt += 1;
        }
    }

    async fn select_topic(&self, typology: Typology) -> Result<TopicIdea, GenerateError> {
        let memory = self.deps.store.memory().await?;
        let headlines = self.headlines(typology).await;
        let prompt = TopicPrompt {
            config: &self.config,
            typology,
            memory: &memory,
            headlines: &headlines,
            now: self.deps.clock.now(),
        }
        .render();

        let mut topic: TopicIdea = generate_object(
            self.deps.ai.as_ref(),
            &prompt,
            &TopicPrompt::schema(),
            &PromptOptions::default(),
        )
        .await?;
        topic.title = topic.title.trim().to_string();
        Ok(topic)
    }

    /// Current headlines from the typology's feeds, best-effort
    async fn headlines(&self, typology: Typology) -> Vec<String> {
        let Some(strategy) = self.config.sources_for(typology) else {
            return vec![];
        };
        let results = join_all(strategy.feeds.iter().map(|url| self.deps.feeds.fetch_feed(url))).await;

        let mut headlines = Vec::new();
        for (url, result) in strategy.feeds.iter().zip(results) {
            match result {
                Ok(items) => headlines.extend(items.into_iter().map(|i| i.title)),
                Err(e) => tracing::warn!(feed = %url, error = %e, "Failed to fetch source feed"),
            }
        }
        headlines.truncate(MAX_HEADLINES);
        headlines
    }

    async fn uniqueness(&self, title: &str) -> Result<Verdict, GenerateError> {
        if self.similar_to_own(title).await {
            return Ok(Verdict::SimilarToOwn);
        }
        if self.competitors.check_overlap(title).await? {
            return Ok(Verdict::OverlapsCompetitor);
        }
        Ok(Verdict::Unique)
    }

    /// Semantic gate; any failure counts as unique
    async fn similar_to_own(&self, title: &str) -> bool {
        let (Some(index), Some(embedder)) =
            (self.deps.store.semantic_index(), self.deps.ai.embedder())
        else {
            return false;
        };

        let embedding = match embedder.embed(title).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::warn!(error = %e, "Embedding failed, skipping semantic check");
                return false;
            }
        };

        match index
            .find_similar(&embedding, self.config.similarity_threshold(), SIMILAR_LIMIT)
            .await
        {
            Ok(similar) if !similar.is_empty() => {
                tracing::info!(title = %title, similar = ?similar, "Semantic overlap detected");
                true
            }
            Ok(_) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Similarity search failed, skipping semantic check");
                false
            }
        }
    }

    async fn research(
        &self,
        topic: &str,
        typology: Typology,
        options: &GenerateOptions,
    ) -> ResearchContext {
        match options.research_mode {
            ResearchMode::Internal => ResearchContext::internal(topic),
            ResearchMode::WebLite => self.web_lite(topic, typology).await,
            ResearchMode::Deep => self.deep(topic, options.research_file.as_deref()).await,
        }
    }

    async fn web_lite(&self, topic: &str, typology: Typology) -> ResearchContext {
        let Some(research) = &self.deps.research else {
            tracing::warn!("No research source configured, falling back to internal knowledge");
            return ResearchContext::internal(topic);
        };

        let query = self
            .config
            .sources_for(typology)
            .map(|s| s.query_for(topic))
            .unwrap_or_else(|| topic.to_string());

        match research
            .search_and_scrape(&query, self.config.generation.web_lite_sources)
            .await
        {
            Ok(context) if !context.text.trim().is_empty() => {
                tracing::info!(query = %query, sources = context.sources.len(), "Web-lite research complete");
                context
            }
            Ok(_) => {
                tracing::warn!(query = %query, "Web-lite research returned nothing, falling back to internal knowledge");
                ResearchContext::internal(topic)
            }
            Err(e) => {
                tracing::warn!(query = %query, error = %e, "Web-lite research failed, falling back to internal knowledge");
                ResearchContext::internal(topic)
            }
        }
    }

    async fn deep(&self, topic: &str, research_file: Option<&str>) -> ResearchContext {
        let report = match &self.deps.reports {
            None => None,
            Some(reports) => {
                let result = match research_file {
                    Some(name) => reports.read_report(name).await.map(Some),
                    None => reports.latest_report().await,
                };
                result.unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Failed to read deep research report");
                    None
                })
            }
        };

        match report {
            Some(report) => ResearchContext::new(format!("[Deep Research Report]\n{}", report)),
            None => {
                tracing::warn!(topic = %topic, "No deep research report available, proceeding without one");
                ResearchContext::new(format!(
                    "[Deep Research Note] No deep research report is available yet. \
                     Context for: {}. Rely on internal knowledge.",
                    topic
                ))
            }
        }
    }

    async fn draft(
        &self,
        typology: Typology,
        topic: &TopicIdea,
        research: &ResearchContext,
        options: &GenerateOptions,
    ) -> Result<Draft, GenerateError> {
        let seo_intensity = match options.seo_level {
            SeoLevel::Fixed(level) => level.min(SeoLevel::MAX),
            SeoLevel::Random => self.deps.dice.index(usize::from(SeoLevel::MAX) + 1) as u8,
        };

        let prompt = DraftPrompt {
            config: &self.config,
            typology,
            title: &topic.title,
            focus: &topic.focus,
            research: &research.text,
            seo_intensity,
            custom_context: options.custom_context.as_deref(),
            now: self.deps.clock.now(),
        }
        .render();

        let mut draft: Draft = generate_object(
            self.deps.ai.as_ref(),
            &prompt,
            &DraftPrompt::schema(),
            &PromptOptions::default(),
        )
        .await?;

        draft.title = draft.title.trim().to_string();
        if draft.title.is_empty() {
            return Err(GenerateError::EmptyDraft);
        }

        let style = self.config.content.slug_style;
        let mut slug = style.slugify(&draft.slug);
        if slug.is_empty() {
            slug = style.slugify(&draft.title);
        }
        if slug.is_empty() {
            slug = format!("post-{}", self.deps.clock.now().unix_timestamp());
        }
        draft.slug = slug;

        Ok(draft)
    }

    /// Index title and excerpt; failures never undo the save
    async fn index_embedding(&self, post: &Post) {
        let (Some(index), Some(embedder)) =
            (self.deps.store.semantic_index(), self.deps.ai.embedder())
        else {
            return;
        };

        let text = format!("{} {}", post.title, post.excerpt);
        let result = match embedder.embed(&text).await {
            Ok(embedding) => index
                .save_embedding(&post.slug, &embedding)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(e) = result {
            tracing::warn!(slug = %post.slug, error = %e, "Failed to index post embedding");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceStrategy;
    use crate::model::Enemy;
    use crate::usecases::testing::{
        FakeAi, FakeFeeds, FakeRemote, FakeReports, FakeResearch, FakeStore, FixedClock, NOW,
        dice,
    };

    fn deps(ai: Arc<FakeAi>, store: Arc<FakeStore>) -> Collaborators {
        Collaborators {
            ai,
            store,
            feeds: Arc::new(FakeFeeds::default()),
            research: None,
            reports: None,
            remote: None,
            clock: Arc::new(FixedClock(NOW)),
            dice: dice(0.99),
        }
    }

    fn generator(config: BlogConfig, deps: Collaborators) -> Generator {
        Generator::new(Arc::new(config), deps)
    }

    #[tokio::test]
    async fn test_generate_news_internal_with_no_prior_posts() {
        let ai = Arc::new(FakeAi::pipeline());
        let store = Arc::new(FakeStore::default());
        let generator = generator(BlogConfig::default(), deps(ai.clone(), store.clone()));

        let post = generator
            .generate(Typology::News, &GenerateOptions::default(), &Progress::silent())
            .await
            .unwrap();

        assert_eq!(post.category, "news");
        assert_eq!(post.status, PostStatus::Published);
        assert!(!post.content.is_empty());
        assert_eq!(post.slug, "async-rust-in-practice");
        assert_eq!(post.published_at, Some(NOW));
        assert!(store.posts.lock().unwrap().contains_key("async-rust-in-practice"));

        let prompts = ai.prompts.lock().unwrap();
        let draft_prompt = prompts
            .iter()
            .find(|p| p.contains("professional blog author"))
            .unwrap();
        assert!(draft_prompt.contains("Internal Knowledge Check"));
        assert!(draft_prompt.contains("Intensity 5/10"));
        assert!(draft_prompt.contains("2026-10-16"));
    }

    #[tokio::test]
    async fn test_semantic_gate_retries_then_indexes() {
        let ai = Arc::new(FakeAi::pipeline().with_embedding(vec![1.0, 0.0]));
        let store = Arc::new(FakeStore::with_index(vec![vec!["older-post".to_string()]]));
        let generator = generator(BlogConfig::default(), deps(ai.clone(), store.clone()));

        let post = generator
            .generate(Typology::Guide, &GenerateOptions::default(), &Progress::silent())
            .await
            .unwrap();

        assert_eq!(ai.prompts_containing("content strategist"), 2);
        assert_eq!(store.indexed(), vec![post.slug]);
    }

    #[tokio::test]
    async fn test_combined_budget_proceeds_with_last_topic() {
        let mut config = BlogConfig::default();
        config.competitors.enemies = vec![Enemy {
            name: "rival".to_string(),
            base_url: "https://rival.example".to_string(),
            rss_url: "https://rival.example/rss".to_string(),
        }];

        let ai = Arc::new(
            FakeAi::pipeline()
                .with_embedding(vec![1.0])
                .on("Competitor topics", &["TOO_SIMILAR"]),
        );
        let store = Arc::new(FakeStore::with_index(vec![vec!["dup".to_string()]]));
        let mut deps = deps(ai.clone(), store);
        deps.feeds = Arc::new(
            FakeFeeds::default().with("https://rival.example/rss", &["Async Rust in Practice"]),
        );

        let post = generator(config, deps)
            .generate(Typology::News, &GenerateOptions::default(), &Progress::silent())
            .await
            .unwrap();

        // attempt 1 fails gate A, attempts 2 and 3 fail gate B
        assert_eq!(ai.prompts_containing("content strategist"), 3);
        assert_eq!(post.title, "Async Rust in Practice");
    }

    #[tokio::test]
    async fn test_web_lite_failure_falls_back_to_internal() {
        let ai = Arc::new(FakeAi::pipeline());
        let mut deps = deps(ai.clone(), Arc::new(FakeStore::default()));
        deps.research = Some(Arc::new(FakeResearch::failing()));

        let options = GenerateOptions {
            research_mode: ResearchMode::WebLite,
            ..Default::default()
        };
        let post = generator(BlogConfig::default(), deps)
            .generate(Typology::News, &options, &Progress::silent())
            .await
            .unwrap();

        assert!(post.source_refs.is_empty());
        assert_eq!(ai.prompts_containing("Internal Knowledge Check"), 1);
    }

    #[tokio::test]
    async fn test_web_lite_sources_become_refs() {
        let mut config = BlogConfig::default();
        config.sources.insert(
            Typology::News,
            SourceStrategy {
                feeds: vec![],
                allowed_domains: vec!["blog.rust-lang.org".to_string()],
                query_templates: vec!["{topic} announcement".to_string()],
            },
        );

        let ai = Arc::new(FakeAi::pipeline());
        let research = Arc::new(FakeResearch::ok(
            "Scraped material",
            &["https://blog.rust-lang.org/a"],
        ));
        let mut deps = deps(ai.clone(), Arc::new(FakeStore::default()));
        deps.research = Some(research.clone());

        let options = GenerateOptions {
            research_mode: ResearchMode::WebLite,
            ..Default::default()
        };
        let post = generator(config, deps)
            .generate(Typology::News, &options, &Progress::silent())
            .await
            .unwrap();

        assert_eq!(post.source_refs, ["https://blog.rust-lang.org/a"]);
        assert_eq!(
            research.queries.lock().unwrap()[0],
            "Async Rust in Practice announcement site:blog.rust-lang.org"
        );
        assert_eq!(ai.prompts_containing("Scraped material"), 1);
    }

    #[tokio::test]
    async fn test_deep_mode_reads_latest_report_or_placeholder() {
        let ai = Arc::new(FakeAi::pipeline());
        let reports = FakeReports {
            latest: Some("research-1.md".to_string()),
            ..Default::default()
        };
        reports
            .reports
            .lock()
            .unwrap()
            .insert("research-1.md".to_string(), "Learned things".to_string());
        let mut with_report = deps(ai.clone(), Arc::new(FakeStore::default()));
        with_report.reports = Some(Arc::new(reports));

        let options = GenerateOptions {
            research_mode: ResearchMode::Deep,
            ..Default::default()
        };
        generator(BlogConfig::default(), with_report)
            .generate(Typology::DeepDive, &options, &Progress::silent())
            .await
            .unwrap();
        assert_eq!(ai.prompts_containing("Learned things"), 1);

        let ai = Arc::new(FakeAi::pipeline());
        let mut empty = deps(ai.clone(), Arc::new(FakeStore::default()));
        empty.reports = Some(Arc::new(FakeReports::default()));
        generator(BlogConfig::default(), empty)
            .generate(Typology::DeepDive, &options, &Progress::silent())
            .await
            .unwrap();
        assert_eq!(ai.prompts_containing("[Deep Research Note]"), 1);
    }

    #[tokio::test]
    async fn test_empty_title_is_rejected() {
        let ai = Arc::new(
            FakeAi::new()
                .on("content strategist", &[r#"{"title": "T", "focus": "F"}"#])
                .on("professional blog author", &[r#"{"title": "  ", "content": "x"}"#]),
        );
        let result = generator(BlogConfig::default(), deps(ai, Arc::new(FakeStore::default())))
            .generate(Typology::News, &GenerateOptions::default(), &Progress::silent())
            .await;
        assert!(matches!(result, Err(GenerateError::EmptyDraft)));
    }

    #[tokio::test]
    async fn test_invalid_draft_json_surfaces() {
        let ai = Arc::new(
            FakeAi::new()
                .on("content strategist", &[r#"{"title": "T", "focus": "F"}"#])
                .on("professional blog author", &["{not json"]),
        );
        let store = Arc::new(FakeStore::default());
        let result = generator(BlogConfig::default(), deps(ai, store.clone()))
            .generate(Typology::News, &GenerateOptions::default(), &Progress::silent())
            .await;
        assert!(matches!(
            result,
            Err(GenerateError::Ai(AiError::InvalidResponseFormat(_)))
        ));
        assert!(store.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_propagates() {
        let ai = Arc::new(FakeAi::pipeline());
        let store = Arc::new(FakeStore {
            fail_saves: true,
            ..Default::default()
        });
        let result = generator(BlogConfig::default(), deps(ai, store))
            .generate(Typology::News, &GenerateOptions::default(), &Progress::silent())
            .await;
        assert!(matches!(
            result,
            Err(GenerateError::Store(StoreError::Persistence(_)))
        ));
    }

    #[tokio::test]
    async fn test_embedding_failure_keeps_saved_post() {
        let ai = Arc::new(FakeAi::pipeline().with_failing_embedder());
        let store = Arc::new(FakeStore::with_index(vec![]));
        let post = generator(BlogConfig::default(), deps(ai, store.clone()))
            .generate(Typology::News, &GenerateOptions::default(), &Progress::silent())
            .await
            .unwrap();
        assert!(store.posts.lock().unwrap().contains_key(&post.slug));
        assert!(store.indexed().is_empty());
    }

    #[tokio::test]
    async fn test_custom_context_and_author_flow_through() {
        let ai = Arc::new(FakeAi::pipeline());
        let options = GenerateOptions {
            custom_context: Some("Mention the 1.0 release".to_string()),
            author: Some("Ada".to_string()),
            seo_level: SeoLevel::Fixed(9),
            ..Default::default()
        };
        let post = generator(BlogConfig::default(), deps(ai.clone(), Arc::new(FakeStore::default())))
            .generate(Typology::Opinion, &options, &Progress::silent())
            .await
            .unwrap();

        assert_eq!(post.author.as_deref(), Some("Ada"));
        assert_eq!(post.category, "opinion");
        assert_eq!(ai.prompts_containing("Mention the 1.0 release"), 1);
        assert_eq!(ai.prompts_containing("Aggressively optimize"), 1);
    }

    #[tokio::test]
    async fn test_spawn_run_streams_progress_then_complete() {
        let ai = Arc::new(FakeAi::pipeline());
        let generator = Arc::new(generator(
            BlogConfig::default(),
            deps(ai, Arc::new(FakeStore::default())),
        ));

        let mut rx = generator.spawn_run(RunRequest {
            typology: TypologySelection::Specific(Typology::News),
            options: GenerateOptions::default(),
        });

        let mut events = vec![];
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert!(events.len() > 2);
        assert!(
            events[..events.len() - 1]
                .iter()
                .all(|e| matches!(e, GenerationEvent::Progress { .. }))
        );
        assert!(matches!(events.last(), Some(GenerationEvent::Complete { .. })));
    }

    #[tokio::test]
    async fn test_spawn_run_ends_with_error_event() {
        let ai = Arc::new(FakeAi::new());
        let generator = Arc::new(generator(
            BlogConfig::default(),
            deps(ai, Arc::new(FakeStore::default())),
        ));

        let mut rx = generator.spawn_run(RunRequest {
            typology: TypologySelection::Specific(Typology::News),
            options: GenerateOptions::default(),
        });

        let mut last = None;
        while let Some(event) = rx.recv().await {
            last = Some(event);
        }
        assert!(matches!(last, Some(GenerationEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_deep_run_dispatches_workflow() {
        let ai = Arc::new(FakeAi::pipeline());
        let remote = Arc::new(FakeRemote::default());
        let store = Arc::new(FakeStore::default());
        let mut deps = deps(ai.clone(), store.clone());
        deps.remote = Some(remote.clone());

        let event = generator(BlogConfig::default(), deps)
            .run(
                &RunRequest {
                    typology: TypologySelection::Specific(Typology::DeepDive),
                    options: GenerateOptions {
                        research_mode: ResearchMode::Deep,
                        ..Default::default()
                    },
                },
                &Progress::silent(),
            )
            .await
            .unwrap();

        assert_eq!(
            event,
            GenerationEvent::ResearchTriggered {
                topic: "Async Rust in Practice".to_string()
            }
        );
        assert_eq!(
            remote.workflows.lock().unwrap()[0],
            ("Async Rust in Practice".to_string(), "deep_dive".to_string())
        );
        assert_eq!(ai.prompts_containing("professional blog author"), 0);
        assert!(store.posts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_auto_resolves_through_director() {
        let ai = Arc::new(FakeAi::pipeline().on("Editor-in-Chief", &["tutorial"]));
        let generator = generator(BlogConfig::default(), deps(ai, Arc::new(FakeStore::default())));
        assert_eq!(generator.resolve(TypologySelection::Auto).await, Typology::Tutorial);
        assert_eq!(
            generator
                .resolve(TypologySelection::Specific(Typology::Guide))
                .await,
            Typology::Guide
        );
    }
}
