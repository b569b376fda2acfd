//! Research report directory

use async_trait::async_trait;
use autoblog_domain::{ReportError, ReportSource};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::SystemTime;

/// Markdown reports stored flat in one directory
pub struct FsReportSource {
    dir: PathBuf,
}

impl FsReportSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolve a bare file name inside the directory
    fn resolve(&self, name: &str) -> Result<PathBuf, ReportError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && !name.contains("..");
        if valid {
            Ok(self.dir.join(name))
        } else {
            Err(ReportError::InvalidName(name.to_string()))
        }
    }
}

#[async_trait]
impl ReportSource for FsReportSource {
    async fn latest_report(&self) -> Result<Option<String>, ReportError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut newest: Option<(SystemTime, PathBuf)> = None;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "md") {
                continue;
            }
            let modified = entry.metadata().await?.modified()?;
            if newest.as_ref().is_none_or(|(time, _)| modified > *time) {
                newest = Some((modified, path));
            }
        }

        match newest {
            Some((_, path)) => {
                tracing::debug!(path = %path.display(), "Using latest research report");
                Ok(Some(tokio::fs::read_to_string(path).await?))
            }
            None => Ok(None),
        }
    }

    async fn read_report(&self, name: &str) -> Result<String, ReportError> {
        let path = self.resolve(name)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ReportError::NotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_report(&self, name: &str, content: &str) -> Result<(), ReportError> {
        let path = self.resolve(name)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_latest_report_by_mtime() {
        let tmp = TempDir::new().unwrap();
        let reports = FsReportSource::new(tmp.path().join("reports"));
        assert!(reports.latest_report().await.unwrap().is_none());

        reports.write_report("research-1.md", "older").await.unwrap();
        let older = std::fs::File::options()
            .write(true)
            .open(tmp.path().join("reports/research-1.md"))
            .unwrap();
        older
            .set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();
        reports.write_report("research-2.md", "newer").await.unwrap();
        reports.write_report("notes.txt", "ignored").await.unwrap();

        assert_eq!(reports.latest_report().await.unwrap().as_deref(), Some("newer"));
    }

    #[tokio::test]
    async fn test_read_report_by_name() {
        let tmp = TempDir::new().unwrap();
        let reports = FsReportSource::new(tmp.path());
        reports.write_report("r.md", "content").await.unwrap();

        assert_eq!(reports.read_report("r.md").await.unwrap(), "content");
        assert!(matches!(
            reports.read_report("missing.md").await,
            Err(ReportError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_path_escapes() {
        let tmp = TempDir::new().unwrap();
        let reports = FsReportSource::new(tmp.path());

        for name in ["../secret.md", "a/b.md", "", ".hidden"] {
            assert!(matches!(
                reports.read_report(name).await,
                Err(ReportError::InvalidName(_))
            ));
        }
    }
}
