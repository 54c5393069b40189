//! Persistent state store for cluster and instance group records.

pub mod fs;

use crate::api::{Cluster, InstanceGroup};
use crate::error::KcupError;

pub use fs::FsStateStore;

/// Read/write access to the stored desired state of clusters.
///
/// Writes are expected to be applied in the order they are issued; the
/// upgrade commit path relies on this to leave the completed config as the
/// last record touched.
pub trait StateStore: Send + Sync {
    fn read_cluster(&self, name: &str) -> Result<Cluster, KcupError>;

    /// All instance groups of a cluster, sorted by name.
    fn read_instance_groups(&self, cluster: &str) -> Result<Vec<InstanceGroup>, KcupError>;

    fn update_cluster(&self, cluster: &Cluster) -> Result<(), KcupError>;

    fn update_instance_group(&self, cluster: &str, group: &InstanceGroup)
    -> Result<(), KcupError>;

    /// Persist the populated and validated copy of the cluster spec.
    fn write_completed_config(&self, completed: &Cluster) -> Result<(), KcupError>;

    fn read_completed_config(&self, name: &str) -> Result<Option<Cluster>, KcupError>;

    /// Default asset root for a cluster.
    fn config_base(&self, name: &str) -> String;
}
