//! Upgrade actions and the commands that apply them.

use serde::{Deserialize, Serialize};

use crate::api::{Cluster, DockerConfig, InstanceGroup, KubenetNetworkingSpec, NetworkingSpec};
use crate::error::KcupError;

/// One proposed change, shown to the operator before anything is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeAction {
    /// Record being changed, e.g. `Cluster` or `InstanceGroup/nodes`.
    pub item: String,
    pub property: String,
    pub old: String,
    pub new: String,
    pub command: UpgradeCommand,
}

/// Mutation applied to the in-memory records once an action is confirmed.
///
/// Applying a command twice leaves the records as applying it once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum UpgradeCommand {
    SetKubernetesVersion { version: String },
    SwitchToKubenet { kubenet: KubenetNetworkingSpec },
    SetInstanceGroupImage { group: String, image: String },
    SetDockerStorage { storage: String },
}

impl UpgradeCommand {
    /// Path of the field this command writes.
    pub fn target_path(&self) -> String {
        match self {
            Self::SetKubernetesVersion { .. } => "spec.kubernetesVersion".to_string(),
            Self::SwitchToKubenet { .. } => "spec.networking".to_string(),
            Self::SetInstanceGroupImage { group, .. } => {
                format!("instancegroup/{group}:spec.image")
            }
            Self::SetDockerStorage { .. } => "spec.docker.storage".to_string(),
        }
    }

    pub fn apply(
        &self,
        cluster: &mut Cluster,
        groups: &mut [InstanceGroup],
    ) -> Result<(), KcupError> {
        match self {
            Self::SetKubernetesVersion { version } => {
                cluster.spec.kubernetes_version = Some(version.clone());
            }
            Self::SwitchToKubenet { kubenet } => {
                let networking = cluster
                    .spec
                    .networking
                    .get_or_insert_with(NetworkingSpec::default);
                networking.classic = None;
                networking.kubenet = Some(kubenet.clone());
            }
            Self::SetInstanceGroupImage { group, image } => {
                let target = groups
                    .iter_mut()
                    .find(|g| g.name() == group)
                    .ok_or_else(|| KcupError::InstanceGroupNotFound {
                        cluster: cluster.name().to_string(),
                        group: group.clone(),
                    })?;
                target.spec.image = Some(image.clone());
            }
            Self::SetDockerStorage { storage } => {
                cluster
                    .spec
                    .docker
                    .get_or_insert_with(DockerConfig::default)
                    .storage = Some(storage.clone());
            }
        }
        Ok(())
    }
}
