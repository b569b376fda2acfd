//! Serve command - HTTP API over the use cases

use anyhow::{Context, Result};
use autoblog_domain::{
    GenerationEvent, Post, PostFilter, ResearchMode, Schedule, ScheduleStoreError, SeoLevel,
    StoreError, TypologySelection,
    usecases::{FeedRenderer, GenerateOptions, RunRequest},
};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::stream::{self, Stream};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::net::TcpListener;

use crate::args::ServeArgs;
use crate::config::AppConfig;
use crate::wiring::{App, read_secret};

pub struct ServerState {
    app: App,
    admin_token: Option<SecretString>,
}

impl ServerState {
    pub fn new(app: App, admin_token: Option<SecretString>) -> Self {
        Self { app, admin_token }
    }
}

pub async fn execute(args: ServeArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let app = App::build(&config).await?;

    let admin_token = read_secret(&config.server.admin_token_env);
    if admin_token.is_none() {
        tracing::warn!(
            env = %config.server.admin_token_env,
            "No admin token set, mutating routes are open"
        );
    }

    let bind = args.bind.unwrap_or(config.general.bind);
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;

    tracing::info!(bind = %bind, "autoblog listening");
    axum::serve(listener, router(Arc::new(ServerState::new(app, admin_token))))
        .await
        .context("Server error")?;

    Ok(())
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/blog/run", get(run))
        .route("/api/blog/cron", post(cron))
        .route(
            "/api/blog/posts",
            get(get_posts).post(save_post).delete(delete_post),
        )
        .route(
            "/api/blog/schedules",
            get(list_schedules).post(replace_schedules),
        )
        .route("/blog/sitemap.xml", get(sitemap))
        .route("/blog/rss.xml", get(rss))
        .with_state(state)
}

/// JSON error body with a status
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let status = match e {
            StoreError::InvalidSlug(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl From<ScheduleStoreError> for ApiError {
    fn from(e: ScheduleStoreError) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

/// Bearer check for mutating routes; open when no token is configured
fn authorize(state: &ServerState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = &state.admin_token else {
        return Ok(());
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(token) if token_matches(token, expected.expose_secret()) => Ok(()),
        _ => {
            tracing::warn!("Rejected request with missing or invalid admin token");
            Err(ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

/// Constant-time for equal lengths; a length mismatch fails early
fn token_matches(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunQuery {
    #[serde(default = "auto")]
    typology: TypologySelection,
    #[serde(default)]
    research_mode: ResearchMode,
    #[serde(default)]
    seo_level: SeoLevel,
    research_file: Option<String>,
    custom_context: Option<String>,
    author: Option<String>,
}

fn auto() -> TypologySelection {
    TypologySelection::Auto
}

/// GET /api/blog/run: stream one run as SSE, ending on `complete` or `error`
async fn run(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(query): Query<RunQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    authorize(&state, &headers)?;

    let request = RunRequest {
        typology: query.typology,
        options: GenerateOptions {
            seo_level: query.seo_level,
            research_mode: query.research_mode,
            research_file: query.research_file,
            custom_context: query.custom_context,
            author: query.author,
        },
    };
    tracing::info!(typology = %request.typology, research_mode = %request.options.research_mode, "Run requested");

    let rx = state.app.generator.spawn_run(request);
    let events = stream::unfold(Some(rx), |rx| async move {
        let mut rx = rx?;
        let event = rx.recv().await?;
        let next = if event.is_terminal() { None } else { Some(rx) };
        Some((Ok::<_, Infallible>(sse_event(&event)), next))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn sse_event(event: &GenerationEvent) -> Event {
    Event::default().json_data(event).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to encode event");
        Event::default().data(json!({ "type": "error", "message": e.to_string() }).to_string())
    })
}

/// POST /api/blog/cron
async fn cron(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, &headers)?;
    let summary = state
        .app
        .scheduler
        .run_and_clean_up(&state.app.schedules)
        .await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
struct PostsQuery {
    slug: Option<String>,
    category: Option<String>,
    limit: Option<usize>,
    #[serde(default)]
    offset: usize,
}

/// GET /api/blog/posts: one post by `slug`, or a filtered list
async fn get_posts(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<PostsQuery>,
) -> Result<Response, ApiError> {
    let store = &state.app.store;
    if let Some(slug) = query.slug {
        return match store.get_post(&slug).await? {
            Some(post) => Ok(Json(post).into_response()),
            None => Err(ApiError::new(
                StatusCode::NOT_FOUND,
                format!("Post not found: {}", slug),
            )),
        };
    }

    let filter = PostFilter {
        category: query.category,
        limit: query.limit,
        offset: query.offset,
    };
    Ok(Json(store.list_posts(&filter).await?).into_response())
}

/// POST /api/blog/posts
async fn save_post(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(post): Json<Post>,
) -> Result<Json<Post>, ApiError> {
    authorize(&state, &headers)?;
    let saved = state.app.store.save_post(&post).await?;
    Ok(Json(saved))
}

#[derive(Debug, Deserialize)]
struct DeleteQuery {
    slug: String,
}

/// DELETE /api/blog/posts?slug=
async fn delete_post(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    if state.app.store.delete_post(&query.slug).await? {
        Ok(Json(json!({ "deleted": query.slug })))
    } else {
        Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Post not found: {}", query.slug),
        ))
    }
}

async fn list_schedules(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<Vec<Schedule>>, ApiError> {
    Ok(Json(state.app.schedules.list().await?))
}

/// POST /api/blog/schedules: replace the whole list
async fn replace_schedules(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(schedules): Json<Vec<Schedule>>,
) -> Result<Json<Vec<Schedule>>, ApiError> {
    authorize(&state, &headers)?;
    Ok(Json(state.app.schedules.replace(schedules).await?))
}

async fn sitemap(State(state): State<Arc<ServerState>>) -> Result<Response, ApiError> {
    let posts = state.app.store.list_posts(&PostFilter::default()).await?;
    let xml = FeedRenderer::new(&state.app.blog.site).sitemap(&posts);
    Ok(([(header::CONTENT_TYPE, "application/xml")], xml).into_response())
}

async fn rss(State(state): State<Arc<ServerState>>) -> Result<Response, ApiError> {
    let posts = state.app.store.list_posts(&PostFilter::default()).await?;
    let xml = FeedRenderer::new(&state.app.blog.site).rss(&posts);
    Ok(([(header::CONTENT_TYPE, "application/rss+xml")], xml).into_response())
}
