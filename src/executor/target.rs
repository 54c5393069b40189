//! Infrastructure targets the executor converges against.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::resource::{Resource, sha256_hex};
use crate::error::KcupError;
use crate::graph::{Task, TaskKind, TaskSpec};

/// Directory, relative to the asset root, holding observed resource records.
pub const RESOURCE_RECORD_DIR: &str = ".kcup/resources";

/// Live infrastructure as seen by the executor.
#[async_trait]
pub trait Target: Send + Sync {
    /// Look up the live counterpart of `desired`, if one exists.
    async fn find(&self, desired: &Resource) -> Result<Option<Resource>, KcupError>;

    /// Create or update the live resource and return its new state.
    async fn apply(
        &self,
        task: &Task,
        desired: &Resource,
        existing: Option<&Resource>,
    ) -> Result<Resource, KcupError>;
}

/// Target backed by the local asset root.
///
/// Managed files are written to their location under the root. Every
/// resource is also recorded under [`RESOURCE_RECORD_DIR`] so later runs can
/// compare against it.
#[derive(Debug, Clone)]
pub struct LocalTarget {
    root: PathBuf,
}

impl LocalTarget {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn record_path(&self, name: &str) -> PathBuf {
        let file = name.replace(['/', '\\'], "_");
        self.root
            .join(RESOURCE_RECORD_DIR)
            .join(format!("{file}.yaml"))
    }

    /// Resolve a managed file location, refusing paths that leave the root.
    fn file_path(&self, task: &str, location: &str) -> Result<PathBuf, KcupError> {
        let relative = Path::new(location);
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir));
        if escapes {
            return Err(KcupError::Conflict {
                task: task.to_string(),
                reason: format!("location {location:?} is outside the asset root"),
            });
        }
        Ok(self.root.join(relative))
    }

    async fn write(path: &Path, contents: &[u8], task: &str) -> Result<(), KcupError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| KcupError::provider(task, e))?;
        }
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| KcupError::provider(task, e))
    }
}

#[async_trait]
impl Target for LocalTarget {
    async fn find(&self, desired: &Resource) -> Result<Option<Resource>, KcupError> {
        let record = self.record_path(&desired.name);
        let contents = match tokio::fs::read_to_string(&record).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(KcupError::provider(&desired.name, e)),
        };
        let mut observed: Resource = serde_yaml::from_str(&contents).map_err(|e| {
            KcupError::provider(&desired.name, format!("corrupt resource record: {e}"))
        })?;

        // The record may be stale if the file was edited or removed.
        if observed.kind == TaskKind::ManagedFile
            && let Some(location) = observed.property("location").map(str::to_string)
        {
            let path = self.file_path(&desired.name, &location)?;
            match tokio::fs::read(&path).await {
                Ok(bytes) => {
                    observed
                        .properties
                        .insert("sha256".to_string(), sha256_hex(&bytes));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("{} recorded but missing on disk", path.display());
                    return Ok(None);
                }
                Err(e) => return Err(KcupError::provider(&desired.name, e)),
            }
        }

        Ok(Some(observed))
    }

    async fn apply(
        &self,
        task: &Task,
        desired: &Resource,
        existing: Option<&Resource>,
    ) -> Result<Resource, KcupError> {
        if let TaskSpec::ManagedFile { location, contents } = &task.spec {
            let path = self.file_path(&task.name, location)?;
            Self::write(&path, contents.as_bytes(), &task.name).await?;
            debug!("Wrote {}", path.display());
        }

        let record = serde_yaml::to_string(desired)
            .map_err(|e| KcupError::provider(&task.name, e))?;
        Self::write(&self.record_path(&task.name), record.as_bytes(), &task.name).await?;

        debug!(
            "{} {} {}",
            if existing.is_some() { "Updated" } else { "Created" },
            desired.kind,
            desired.name
        );
        Ok(desired.clone())
    }
}
