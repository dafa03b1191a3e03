use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tracing::debug;

use assayer_ports::{ReportArtifact, ReportStore};

/// Writes artifacts as `<directory>/<name>.<ext>`, replacing earlier runs.
#[derive(Debug, Clone)]
pub struct FileReportStore {
    directory: PathBuf,
}

impl FileReportStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn target(&self, artifact: &ReportArtifact) -> Result<PathBuf> {
        let file_name = artifact.file_name();
        let plain = !artifact.name.is_empty()
            && !artifact.name.starts_with('.')
            && !artifact.name.contains(['/', '\\']);
        if !plain {
            bail!("refusing to store report with unsafe name {:?}", artifact.name);
        }
        Ok(self.directory.join(file_name))
    }
}

#[async_trait]
impl ReportStore for FileReportStore {
    async fn store(&self, artifact: &ReportArtifact) -> Result<()> {
        let target = self.target(artifact)?;
        tokio::fs::create_dir_all(&self.directory)
            .await
            .with_context(|| format!("failed to create {}", self.directory.display()))?;
        tokio::fs::write(&target, &artifact.body)
            .await
            .with_context(|| format!("failed to write {}", target.display()))?;
        debug!(path = %target.display(), bytes = artifact.body.len(), "wrote report");
        Ok(())
    }
}
