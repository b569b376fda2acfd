//! JSON file trigger store with optional remote mirror

use async_trait::async_trait;
use autoblog_domain::{FileChange, RemoteStore, Schedule, ScheduleStore, ScheduleStoreError};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

/// Triggers kept as a JSON array in one file
pub struct FsScheduleStore {
    path: PathBuf,
    remote: Option<(Arc<dyn RemoteStore>, String)>,
}

impl FsScheduleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            remote: None,
        }
    }

    /// Mirror saves to `remote_path` on the remote store
    pub fn with_remote(mut self, remote: Arc<dyn RemoteStore>, remote_path: impl Into<String>) -> Self {
        self.remote = Some((remote, remote_path.into()));
        self
    }

    async fn write_local(&self, body: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, body).await
    }
}

#[async_trait]
impl ScheduleStore for FsScheduleStore {
    async fn load(&self) -> Result<Vec<Schedule>, ScheduleStoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(vec![]);
        }

        let raw: Vec<Value> = serde_json::from_str(&text)
            .map_err(|e| ScheduleStoreError::Serialization(e.to_string()))?;
        let missing_ids = raw.iter().any(|entry| entry.get("id").is_none());
        let schedules = raw
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Schedule>, _>>()
            .map_err(|e| ScheduleStoreError::Serialization(e.to_string()))?;

        // Persist generated ids so they stay stable between loads
        if missing_ids {
            tracing::info!(path = %self.path.display(), "Assigning ids to stored schedules");
            self.save(&schedules).await?;
        }

        Ok(schedules)
    }

    async fn save(&self, schedules: &[Schedule]) -> Result<(), ScheduleStoreError> {
        let body = serde_json::to_string_pretty(schedules)
            .map_err(|e| ScheduleStoreError::Serialization(e.to_string()))?;

        let local = self.write_local(&body).await;
        if let Err(e) = &local {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write schedules file");
        }

        if let Some((remote, remote_path)) = &self.remote {
            let change = FileChange {
                path: remote_path.clone(),
                content: body,
            };
            match remote.commit_files(&[change], "Update schedules").await {
                Ok(_) => return Ok(()),
                Err(e) if local.is_ok() => {
                    tracing::warn!(error = %e, "Remote schedules mirror failed");
                }
                Err(e) => return Err(e.into()),
            }
        }

        local.map_err(Into::into)
    }
}
