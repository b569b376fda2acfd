//! Builds adapters from configuration and wires them into the use cases

use anyhow::{Context, Result, bail};
use autoblog_adapters::{
    feeds::HttpFeedReader,
    llm::{
        AnthropicProvider, GeminiProvider, LlmConfig as AdapterLlmConfig, OllamaProvider,
        OpenAiCompatProvider, OpenAiProvider, StubProvider,
    },
    remote::{GitHubConfig, GitHubRemote},
    research::{FirecrawlResearch, FsReportSource},
    schedules::FsScheduleStore,
    store::{InMemoryPostStore, LayeredFileStore, SqlitePostStore},
};
use autoblog_domain::{
    AiProvider, BlogConfig, Clock, PostStore, RemoteStore, ReportSource, ResearchSource,
    ScheduleStore, SystemClock, SystemDice,
    usecases::{Collaborators, DeepResearcher, Generator, ScheduleBook, Scheduler},
};
use secrecy::SecretString;
use std::sync::Arc;

use crate::config::AppConfig;

/// Fully wired application services
pub struct App {
    pub blog: Arc<BlogConfig>,
    pub store: Arc<dyn PostStore>,
    pub generator: Arc<Generator>,
    pub scheduler: Arc<Scheduler>,
    pub schedules: ScheduleBook,
    ai: Arc<dyn AiProvider>,
    research: Option<Arc<dyn ResearchSource>>,
    reports: Arc<dyn ReportSource>,
    clock: Arc<dyn Clock>,
}

impl App {
    pub async fn build(config: &AppConfig) -> Result<Self> {
        let blog = Arc::new(config.blog_config()?);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let ai = build_provider(config)?;
        let remote = build_remote(config)?;
        let store = build_store(config, remote.clone(), Arc::clone(&clock)).await?;
        let research = build_research(config)?;
        let reports: Arc<dyn ReportSource> =
            Arc::new(FsReportSource::new(&config.research.reports_dir));

        let feeds = Arc::new(
            HttpFeedReader::new(config.research.timeout_secs)
                .context("Failed to build feed reader")?,
        );

        let generator = Arc::new(Generator::new(
            Arc::clone(&blog),
            Collaborators {
                ai: Arc::clone(&ai),
                store: Arc::clone(&store),
                feeds,
                research: research.clone(),
                reports: Some(Arc::clone(&reports)),
                remote: remote.clone(),
                clock: Arc::clone(&clock),
                dice: Arc::new(SystemDice),
            },
        ));
        let scheduler = Arc::new(Scheduler::new(Arc::clone(&generator), Arc::clone(&clock)));
        let schedules = ScheduleBook::new(build_schedule_store(config, remote));

        Ok(Self {
            blog,
            store,
            generator,
            scheduler,
            schedules,
            ai,
            research,
            reports,
            clock,
        })
    }

    /// Deep researcher; requires a configured research source
    pub fn researcher(&self) -> Result<DeepResearcher> {
        let Some(research) = &self.research else {
            bail!("Deep research needs a research source; set the Firecrawl API key");
        };
        Ok(DeepResearcher::new(
            Arc::clone(&self.ai),
            Arc::clone(research),
            Arc::clone(&self.reports),
            Arc::clone(&self.clock),
        ))
    }
}

pub(crate) fn adapter_llm_config(config: &crate::config::LlmConfig) -> AdapterLlmConfig {
    AdapterLlmConfig {
        model: config.model.clone(),
        embedding_model: config
            .embedding_model
            .clone()
            .filter(|m| !m.trim().is_empty()),
        temperature: config.temperature,
        top_p: config.top_p,
        max_output_tokens: config.max_output_tokens,
        timeout_secs: config.timeout_secs,
        retries: config.retries,
    }
}

pub(crate) fn build_provider(config: &AppConfig) -> Result<Arc<dyn AiProvider>> {
    let llm_config = adapter_llm_config(&config.llm);

    let provider: Arc<dyn AiProvider> = match config.llm.provider.as_str() {
        "openai" => {
            let api_key = load_api_key(&config.llm.openai.api_key_env, "openai")?;
            Arc::new(OpenAiProvider::with_base_url(
                api_key,
                config.llm.openai.base_url.clone(),
                llm_config,
            )?)
        }
        "anthropic" => {
            let api_key = load_api_key(&config.llm.anthropic.api_key_env, "anthropic")?;
            Arc::new(AnthropicProvider::new(api_key, llm_config)?)
        }
        "gemini" => {
            let api_key = load_api_key(&config.llm.gemini.api_key_env, "gemini")?;
            Arc::new(GeminiProvider::new(api_key, llm_config)?)
        }
        "ollama" => {
            let base_url = config.llm.ollama.base_url.trim();
            if base_url.is_empty() {
                Arc::new(OllamaProvider::new(llm_config)?)
            } else {
                Arc::new(OllamaProvider::with_base_url(
                    base_url.to_string(),
                    llm_config,
                )?)
            }
        }
        "openai_compat" => {
            let base_url = config.llm.openai_compat.base_url.trim();
            if base_url.is_empty() {
                bail!("OpenAI-compatible base_url is required");
            }
            let api_key = load_api_key(&config.llm.openai_compat.api_key_env, "openai_compat")?;
            Arc::new(OpenAiCompatProvider::new(
                api_key,
                base_url.to_string(),
                llm_config,
            )?)
        }
        "stub" => Arc::new(StubProvider::new()),
        other => bail!("Unknown LLM provider: {}", other),
    };

    tracing::debug!(provider = %config.llm.provider, model = %config.llm.model, "AI provider ready");
    Ok(provider)
}

/// GitHub remote, when owner, repo and token are all available
pub(crate) fn build_remote(config: &AppConfig) -> Result<Option<Arc<dyn RemoteStore>>> {
    let remote = &config.remote;
    if remote.owner.trim().is_empty() || remote.repo.trim().is_empty() {
        return Ok(None);
    }

    let token = match read_secret(&remote.token_env) {
        Some(token) => token,
        None => {
            tracing::warn!(
                env = %remote.token_env,
                "Remote configured but token is not set, running without remote"
            );
            return Ok(None);
        }
    };

    let github = GitHubRemote::new(
        token,
        GitHubConfig {
            owner: remote.owner.clone(),
            repo: remote.repo.clone(),
            branch: remote.branch.clone(),
            workflow: remote.workflow.clone(),
        },
    )
    .context("Failed to configure GitHub remote")?;

    tracing::info!(owner = %remote.owner, repo = %remote.repo, branch = %remote.branch, "Remote mirror enabled");
    Ok(Some(Arc::new(github)))
}

pub(crate) async fn build_store(
    config: &AppConfig,
    remote: Option<Arc<dyn RemoteStore>>,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn PostStore>> {
    let storage = &config.storage;
    let store: Arc<dyn PostStore> = match storage.adapter.as_str() {
        "file" => {
            let mut store = LayeredFileStore::new(&storage.durable_dir, &storage.scratch_dir)
                .with_clock(clock);
            if let Some(remote) = remote {
                store = store.with_remote(remote, config.remote.content_prefix.clone());
            }
            Arc::new(store)
        }
        "sqlite" => Arc::new(
            SqlitePostStore::new(&storage.sqlite_path)
                .await
                .with_context(|| {
                    format!(
                        "Failed to open SQLite store: {}",
                        storage.sqlite_path.display()
                    )
                })?
                .with_clock(clock),
        ),
        "memory" => Arc::new(InMemoryPostStore::with_clock(clock)),
        other => bail!("Unknown storage adapter: {}", other),
    };

    tracing::debug!(adapter = %storage.adapter, "Post store ready");
    Ok(store)
}

/// Firecrawl research, when its key is available
pub(crate) fn build_research(config: &AppConfig) -> Result<Option<Arc<dyn ResearchSource>>> {
    let Some(api_key) = read_secret(&config.research.firecrawl_api_key_env) else {
        tracing::debug!("No Firecrawl key, web research disabled");
        return Ok(None);
    };

    let research = FirecrawlResearch::with_base_url(
        api_key,
        config.research.firecrawl_base_url.clone(),
        config.research.timeout_secs,
    )
    .context("Failed to configure Firecrawl")?;
    Ok(Some(Arc::new(research)))
}

fn build_schedule_store(
    config: &AppConfig,
    remote: Option<Arc<dyn RemoteStore>>,
) -> Arc<dyn ScheduleStore> {
    let store = FsScheduleStore::new(&config.schedules.path);
    match remote {
        Some(remote) => Arc::new(store.with_remote(remote, config.schedules.remote_path.clone())),
        None => Arc::new(store),
    }
}

pub(crate) fn load_api_key(env_var: &str, provider: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No API key env var configured for provider {}", provider);
    }

    let key = std::env::var(env_var).with_context(|| {
        format!(
            "Missing API key env var {} for provider {}",
            env_var, provider
        )
    })?;

    if key.trim().is_empty() {
        bail!(
            "API key env var {} is empty for provider {}",
            env_var,
            provider
        );
    }

    Ok(SecretString::new(key.into()))
}

/// Value of an optional secret env var; empty counts as unset
pub(crate) fn read_secret(env_var: &str) -> Option<SecretString> {
    if env_var.trim().is_empty() {
        return None;
    }
    std::env::var(env_var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(|value| SecretString::new(value.into()))
}
