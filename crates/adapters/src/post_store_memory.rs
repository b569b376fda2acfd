//! In-memory post store for testing and offline mode

use async_trait::async_trait;
use autoblog_domain::{Clock, Post, PostFilter, PostStore, StoreError, SystemClock, validate_slug};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// In-memory post store implementation
pub struct InMemoryPostStore {
    posts: RwLock<HashMap<String, Post>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryPostStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            posts: RwLock::new(HashMap::new()),
            clock,
        }
    }
}

impl Default for InMemoryPostStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn get_post(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        let posts = self
            .posts
            .read()
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(posts.get(slug).cloned())
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, StoreError> {
        let posts = self
            .posts
            .read()
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(filter.apply(posts.values().cloned()))
    }

    async fn save_post(&self, post: &Post) -> Result<Post, StoreError> {
        validate_slug(&post.slug)?;
        let mut posts = self
            .posts
            .write()
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        let previous = posts.get(&post.slug).and_then(|p| p.created_at);
        let saved = post.clone().stamp(previous, self.clock.now());
        posts.insert(saved.slug.clone(), saved.clone());
        Ok(saved)
    }

    async fn delete_post(&self, slug: &str) -> Result<bool, StoreError> {
        let mut posts = self
            .posts
            .write()
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(posts.remove(slug).is_some())
    }
}
