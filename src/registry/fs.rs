//! Filesystem-backed state store.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<cluster>/config                  cluster spec as written by the operator
//! <root>/<cluster>/instancegroup/<name>    one file per instance group
//! <root>/<cluster>/cluster.spec            completed (populated) cluster spec
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::StateStore;
use crate::api::{Cluster, InstanceGroup};
use crate::error::KcupError;

const CLUSTER_FILE: &str = "config";
const COMPLETED_FILE: &str = "cluster.spec";
const INSTANCE_GROUP_DIR: &str = "instancegroup";

#[derive(Debug, Clone)]
pub struct FsStateStore {
    root: PathBuf,
}

impl FsStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn cluster_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, KcupError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| KcupError::persistence(format!("reading {}", path.display()), e))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| KcupError::persistence(format!("parsing {}", path.display()), e))
    }

    /// Write `value` as YAML, skipping the write when the file already holds
    /// identical contents.
    fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), KcupError> {
        let contents = serde_yaml::to_string(value)
            .map_err(|e| KcupError::persistence(format!("encoding {}", path.display()), e))?;

        if fs::read_to_string(path).is_ok_and(|existing| existing == contents) {
            debug!("{} unchanged, skipping write", path.display());
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                KcupError::persistence(format!("creating {}", parent.display()), e)
            })?;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(".{file_name}.tmp"));
        fs::write(&tmp, contents)
            .map_err(|e| KcupError::persistence(format!("writing {}", tmp.display()), e))?;
        fs::rename(&tmp, path)
            .map_err(|e| KcupError::persistence(format!("writing {}", path.display()), e))?;

        debug!("Wrote {}", path.display());
        Ok(())
    }
}

impl StateStore for FsStateStore {
    fn read_cluster(&self, name: &str) -> Result<Cluster, KcupError> {
        let path = self.cluster_dir(name).join(CLUSTER_FILE);
        if !path.exists() {
            return Err(KcupError::ClusterNotFound(name.to_string()));
        }
        let mut cluster: Cluster = Self::read_yaml(&path)?;
        if cluster.metadata.name.is_empty() {
            cluster.metadata.name = name.to_string();
        }
        Ok(cluster)
    }

    fn read_instance_groups(&self, cluster: &str) -> Result<Vec<InstanceGroup>, KcupError> {
        let dir = self.cluster_dir(cluster).join(INSTANCE_GROUP_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir)
            .map_err(|e| KcupError::persistence(format!("listing {}", dir.display()), e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| KcupError::persistence(format!("listing {}", dir.display()), e))?;
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if path.is_file() && !hidden {
                paths.push(path);
            }
        }
        paths.sort();

        let mut groups = Vec::with_capacity(paths.len());
        for path in paths {
            let mut group: InstanceGroup = Self::read_yaml(&path)?;
            if group.metadata.name.is_empty()
                && let Some(name) = path.file_name().and_then(|n| n.to_str())
            {
                group.metadata.name = name.to_string();
            }
            groups.push(group);
        }
        Ok(groups)
    }

    fn update_cluster(&self, cluster: &Cluster) -> Result<(), KcupError> {
        let path = self.cluster_dir(cluster.name()).join(CLUSTER_FILE);
        Self::write_yaml(&path, cluster)
    }

    fn update_instance_group(
        &self,
        cluster: &str,
        group: &InstanceGroup,
    ) -> Result<(), KcupError> {
        let path = self
            .cluster_dir(cluster)
            .join(INSTANCE_GROUP_DIR)
            .join(group.name());
        Self::write_yaml(&path, group)
    }

    fn write_completed_config(&self, completed: &Cluster) -> Result<(), KcupError> {
        let path = self.cluster_dir(completed.name()).join(COMPLETED_FILE);
        Self::write_yaml(&path, completed)
    }

    fn read_completed_config(&self, name: &str) -> Result<Option<Cluster>, KcupError> {
        let path = self.cluster_dir(name).join(COMPLETED_FILE);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_yaml(&path).map(Some)
    }

    fn config_base(&self, name: &str) -> String {
        self.cluster_dir(name).display().to_string()
    }
}
