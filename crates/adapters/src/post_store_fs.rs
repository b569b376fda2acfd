//! Layered file post store: durable dir, scratch dir, optional remote mirror

use async_trait::async_trait;
use autoblog_domain::{
    Clock, FileChange, Post, PostFilter, PostStore, RemoteStore, StoreError, SystemClock,
    validate_slug,
};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A missing file, or a path component that is not a directory
fn is_absent(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

/// Which locations accepted a write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    pub durable: bool,
    pub scratch: bool,
    /// `None` when no remote is configured
    pub remote: Option<bool>,
}

impl WriteReport {
    pub fn any_local(&self) -> bool {
        self.durable || self.scratch
    }
}

/// File-per-post store.
///
/// Writes go to the durable directory, falling back to the scratch directory
/// when the durable one is unwritable. Reads prefer scratch. Every successful
/// write is mirrored to the remote store when one is configured.
pub struct LayeredFileStore {
    durable_dir: PathBuf,
    scratch_dir: PathBuf,
    remote: Option<Arc<dyn RemoteStore>>,
    remote_prefix: String,
    clock: Arc<dyn Clock>,
}

impl LayeredFileStore {
    pub fn new(durable_dir: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            durable_dir: durable_dir.into(),
            scratch_dir: scratch_dir.into(),
            remote: None,
            remote_prefix: "content/posts".to_string(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Mirror writes to `remote` under `prefix`
    pub fn with_remote(mut self, remote: Arc<dyn RemoteStore>, prefix: impl Into<String>) -> Self {
        self.remote = Some(remote);
        self.remote_prefix = prefix.into().trim_matches('/').to_string();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn file_name(slug: &str) -> String {
        format!("{}.json", slug)
    }

    fn remote_path(&self, slug: &str) -> String {
        if self.remote_prefix.is_empty() {
            Self::file_name(slug)
        } else {
            format!("{}/{}", self.remote_prefix, Self::file_name(slug))
        }
    }

    async fn read_file(path: &Path) -> Result<Option<Post>, StoreError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| StoreError::Serialization(format!("{}: {}", path.display(), e))),
            Err(e) if is_absent(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a sibling temp file so an interrupted save never leaves a truncated post
    async fn write_file(dir: &Path, slug: &str, body: &str) -> std::io::Result<()> {
        tokio::fs::create_dir_all(dir).await?;
        let tmp = dir.join(format!(".{}.json.tmp", slug));
        tokio::fs::write(&tmp, body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, dir.join(Self::file_name(slug))).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }

    /// `created_at` of the stored copy. Unreadable copies count as absent.
    async fn previous_created_at(&self, slug: &str) -> Option<time::OffsetDateTime> {
        let name = Self::file_name(slug);
        for dir in [&self.scratch_dir, &self.durable_dir] {
            let path = dir.join(&name);
            match Self::read_file(&path).await {
                Ok(Some(post)) => return post.created_at,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable previous copy");
                }
            }
        }
        None
    }

    async fn remove_file(path: &Path) -> Result<bool, StoreError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if is_absent(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read_dir_posts(dir: &Path) -> Result<HashMap<String, Post>, StoreError> {
        let mut posts = HashMap::new();
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if is_absent(&e) => return Ok(posts),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match Self::read_file(&path).await {
                Ok(Some(post)) => {
                    posts.insert(post.slug.clone(), post);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable post file");
                }
            }
        }

        Ok(posts)
    }

    /// Save and report which locations accepted the write
    pub async fn save_post_reported(&self, post: &Post) -> Result<(Post, WriteReport), StoreError> {
        validate_slug(&post.slug)?;

        let previous = self.previous_created_at(&post.slug).await;
        let saved = post.clone().stamp(previous, self.clock.now());
        let body = serde_json::to_string_pretty(&saved)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut report = WriteReport::default();

        match Self::write_file(&self.durable_dir, &saved.slug, &body).await {
            Ok(()) => {
                report.durable = true;
                let stale = self.scratch_dir.join(Self::file_name(&saved.slug));
                if let Err(e) = Self::remove_file(&stale).await {
                    tracing::warn!(slug = %saved.slug, error = %e, "Failed to remove stale scratch copy");
                }
            }
            Err(e) => {
                tracing::warn!(
                    slug = %saved.slug,
                    dir = %self.durable_dir.display(),
                    error = %e,
                    "Durable write failed, falling back to scratch"
                );
                match Self::write_file(&self.scratch_dir, &saved.slug, &body).await {
                    Ok(()) => report.scratch = true,
                    Err(e) => {
                        tracing::warn!(
                            slug = %saved.slug,
                            dir = %self.scratch_dir.display(),
                            error = %e,
                            "Scratch write failed"
                        );
                    }
                }
            }
        }

        if let Some(remote) = &self.remote {
            let change = FileChange {
                path: self.remote_path(&saved.slug),
                content: body.clone(),
            };
            let message = format!("Update post: {}", saved.title);
            match remote.commit_files(&[change], &message).await {
                Ok(receipt) => {
                    tracing::info!(slug = %saved.slug, sha = ?receipt.sha, "Post mirrored to remote");
                    report.remote = Some(true);
                }
                Err(e) => {
                    report.remote = Some(false);
                    if report.any_local() {
                        tracing::warn!(slug = %saved.slug, error = %e, "Remote mirror failed");
                    } else {
                        return Err(StoreError::Persistence(format!(
                            "All local writes failed and remote mirror failed: {}",
                            e
                        )));
                    }
                }
            }
        }

        if !report.any_local() && report.remote != Some(true) {
            return Err(StoreError::Persistence(format!(
                "No writable location for post '{}'",
                saved.slug
            )));
        }

        tracing::debug!(slug = %saved.slug, ?report, "Post saved");
        Ok((saved, report))
    }
}

#[async_trait]
impl PostStore for LayeredFileStore {
    async fn get_post(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        validate_slug(slug)?;
        let name = Self::file_name(slug);

        if let Some(post) = Self::read_file(&self.scratch_dir.join(&name)).await? {
            return Ok(Some(post));
        }
        Self::read_file(&self.durable_dir.join(&name)).await
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, StoreError> {
        let mut merged = Self::read_dir_posts(&self.durable_dir).await?;
        merged.extend(Self::read_dir_posts(&self.scratch_dir).await?);
        Ok(filter.apply(merged.into_values()))
    }

    async fn save_post(&self, post: &Post) -> Result<Post, StoreError> {
        self.save_post_reported(post).await.map(|(saved, _)| saved)
    }

    async fn delete_post(&self, slug: &str) -> Result<bool, StoreError> {
        validate_slug(slug)?;
        let name = Self::file_name(slug);

        let durable = Self::remove_file(&self.durable_dir.join(&name)).await?;
        let scratch = Self::remove_file(&self.scratch_dir.join(&name)).await?;

        if let Some(remote) = &self.remote {
            let message = format!("Delete post: {}", slug);
            if let Err(e) = remote.delete_file(&self.remote_path(slug), &message).await {
                tracing::warn!(slug = %slug, error = %e, "Remote delete failed");
            }
        }

        Ok(durable || scratch)
    }
}
