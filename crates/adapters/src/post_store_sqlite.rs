//! SQLite post store with an embedding index

use async_trait::async_trait;
use autoblog_domain::{
    Clock, Post, PostFilter, PostStore, SemanticIndex, StoreError, SystemClock, cosine_similarity,
    validate_slug,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use std::sync::Arc;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Fixed-width UTC timestamp so `created_at` orders correctly as text
fn sort_key(at: OffsetDateTime) -> Result<String, StoreError> {
    at.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
        ))
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

/// SQLite-backed post store.
///
/// Posts are kept as JSON documents keyed by slug; embeddings are JSON float
/// arrays scored in-process.
pub struct SqlitePostStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

fn db_error(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

impl SqlitePostStore {
    /// Open the database, creating it if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(db_error)?;

        let store = Self {
            pool,
            clock: Arc::new(SystemClock),
        };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(db_error)?;

        let store = Self {
            pool,
            clock: Arc::new(SystemClock),
        };
        store.run_migrations().await?;

        Ok(store)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                slug TEXT PRIMARY KEY,
                category TEXT NOT NULL,
                created_at TEXT NOT NULL,
                data TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS post_embeddings (
                slug TEXT PRIMARY KEY,
                embedding TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_posts_recent
            ON posts(category, created_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_posts_created
            ON posts(created_at DESC)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    fn decode(data: &str) -> Result<Post, StoreError> {
        serde_json::from_str(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn get_post(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM posts WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(|(data,)| Self::decode(&data)).transpose()
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, StoreError> {
        let limit = i64::try_from(filter.page_size()).unwrap_or(i64::MAX);
        let offset = i64::try_from(filter.offset).unwrap_or(i64::MAX);

        let rows: Vec<(String,)> = match &filter.category {
            Some(category) => {
                sqlx::query_as(
                    r#"
                    SELECT data FROM posts
                    WHERE category = ?
                    ORDER BY created_at DESC, slug
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(category)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT data FROM posts
                    ORDER BY created_at DESC, slug
                    LIMIT ? OFFSET ?
                    "#,
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_error)?;

        rows.iter().map(|(data,)| Self::decode(data)).collect()
    }

    async fn save_post(&self, post: &Post) -> Result<Post, StoreError> {
        validate_slug(&post.slug)?;

        let previous = self.get_post(&post.slug).await?.and_then(|p| p.created_at);
        let saved = post.clone().stamp(previous, self.clock.now());

        let created_at = sort_key(saved.created_at.unwrap_or(OffsetDateTime::UNIX_EPOCH))?;
        let data =
            serde_json::to_string(&saved).map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO posts (slug, category, created_at, data)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(slug) DO UPDATE SET
                category = excluded.category,
                data = excluded.data
            "#,
        )
        .bind(&saved.slug)
        .bind(&saved.category)
        .bind(&created_at)
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(saved)
    }

    async fn delete_post(&self, slug: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE slug = ?")
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        sqlx::query("DELETE FROM post_embeddings WHERE slug = ?")
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    fn semantic_index(&self) -> Option<&dyn SemanticIndex> {
        Some(self)
    }
}

#[async_trait]
impl SemanticIndex for SqlitePostStore {
    async fn save_embedding(&self, slug: &str, embedding: &[f32]) -> Result<(), StoreError> {
        let encoded =
            serde_json::to_string(embedding).map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO post_embeddings (slug, embedding)
            VALUES (?, ?)
            ON CONFLICT(slug) DO UPDATE SET embedding = excluded.embedding
            "#,
        )
        .bind(slug)
        .bind(&encoded)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find_similar(
        &self,
        embedding: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT slug, embedding FROM post_embeddings")
                .fetch_all(&self.pool)
                .await
                .map_err(db_error)?;

        let mut scored = Vec::new();
        for (slug, encoded) in rows {
            let stored: Vec<f32> = serde_json::from_str(&encoded)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let score = cosine_similarity(embedding, &stored);
            if score >= threshold {
                scored.push((slug, score));
            }
        }

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(scored.into_iter().take(limit).map(|(slug, _)| slug).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    struct Fixed(OffsetDateTime);

    impl Clock for Fixed {
        fn now(&self) -> OffsetDateTime {
            self.0
        }
    }

    #[tokio::test]
    async fn test_post_roundtrip() {
        let store = SqlitePostStore::in_memory().await.unwrap();

        let mut post = Post::new("rust-async", "Rust Async");
        post.category = "guide".to_string();
        post.content = "Body".to_string();
        store.save_post(&post).await.unwrap();

        let retrieved = store.get_post("rust-async").await.unwrap().unwrap();
        assert_eq!(retrieved.title, "Rust Async");
        assert_eq!(retrieved.content, "Body");
        assert!(retrieved.created_at.is_some());
        assert!(store.get_post("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_keeps_created_at() {
        let first_now = datetime!(2026-01-01 10:00 UTC);
        let store = SqlitePostStore::in_memory()
            .await
            .unwrap()
            .with_clock(Arc::new(Fixed(first_now)));
        store.save_post(&Post::new("p", "One")).await.unwrap();

        let store = store.with_clock(Arc::new(Fixed(datetime!(2026-01-02 10:00 UTC))));
        let saved = store.save_post(&Post::new("p", "Two")).await.unwrap();

        assert_eq!(saved.created_at, Some(first_now));
        assert_eq!(saved.updated_at, Some(datetime!(2026-01-02 10:00 UTC)));
        assert_eq!(store.list_posts(&PostFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_by_category_newest_first() {
        let store = SqlitePostStore::in_memory().await.unwrap();
        for (slug, category, day) in [("a", "news", 1), ("b", "guide", 2), ("c", "news", 3)] {
            let mut post = Post::new(slug, slug.to_uppercase());
            post.category = category.to_string();
            post.created_at = Some(datetime!(2026-03-01 00:00 UTC) + time::Duration::days(day));
            store.save_post(&post).await.unwrap();
        }

        let filter = PostFilter {
            category: Some("news".to_string()),
            ..Default::default()
        };
        let slugs: Vec<_> = store
            .list_posts(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(slugs, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_list_pages_in_created_order() {
        let store = SqlitePostStore::in_memory().await.unwrap();
        let base = datetime!(2026-03-01 00:00 UTC);
        let stamps = [
            ("whole", base + time::Duration::seconds(1)),
            ("fraction", base + time::Duration::milliseconds(1500)),
            ("offset", datetime!(2026-03-01 01:00:02 +01:00)),
            ("oldest", base),
        ];
        for (slug, created_at) in stamps {
            let mut post = Post::new(slug, slug);
            post.created_at = Some(created_at);
            store.save_post(&post).await.unwrap();
        }

        let slugs = |posts: Vec<Post>| posts.into_iter().map(|p| p.slug).collect::<Vec<_>>();
        let all = store.list_posts(&PostFilter::default()).await.unwrap();
        assert_eq!(slugs(all), vec!["offset", "fraction", "whole", "oldest"]);

        let page = PostFilter {
            limit: Some(2),
            offset: 1,
            ..Default::default()
        };
        let paged = store.list_posts(&page).await.unwrap();
        assert_eq!(slugs(paged), vec!["fraction", "whole"]);
    }

    #[tokio::test]
    async fn test_find_similar_above_threshold() {
        let store = SqlitePostStore::in_memory().await.unwrap();
        let index = store.semantic_index().unwrap();

        index.save_embedding("close", &[1.0, 0.1]).await.unwrap();
        index.save_embedding("far", &[0.0, 1.0]).await.unwrap();
        index.save_embedding("exact", &[1.0, 0.0]).await.unwrap();

        let found = index.find_similar(&[1.0, 0.0], 0.85, 5).await.unwrap();
        assert_eq!(found, vec!["exact".to_string(), "close".to_string()]);

        let limited = index.find_similar(&[1.0, 0.0], 0.85, 1).await.unwrap();
        assert_eq!(limited, vec!["exact".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_removes_embedding() {
        let store = SqlitePostStore::in_memory().await.unwrap();
        store.save_post(&Post::new("gone", "Gone")).await.unwrap();
        store.save_embedding("gone", &[1.0]).await.unwrap();

        assert!(store.delete_post("gone").await.unwrap());
        assert!(store.find_similar(&[1.0], 0.5, 5).await.unwrap().is_empty());
        assert!(!store.delete_post("gone").await.unwrap());
    }
}
