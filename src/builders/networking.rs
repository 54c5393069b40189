//! Networking addon configuration.

use serde::Serialize;

use super::TaskBuilder;
use crate::api::{Cluster, NetworkingMode};
use crate::error::KcupError;
use crate::graph::{Task, TaskGraph, TaskSpec};

pub struct NetworkingBuilder<'a> {
    cluster: &'a Cluster,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NetworkingConfig<'a> {
    mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mtu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    network_cidr: Option<&'a str>,
}

impl<'a> NetworkingBuilder<'a> {
    pub fn new(cluster: &'a Cluster) -> Self {
        Self { cluster }
    }

    /// Name of the networking task, when the cluster's mode has one.
    pub fn task_name(cluster: &Cluster) -> Option<String> {
        match cluster.networking_mode() {
            Some(NetworkingMode::Kubenet | NetworkingMode::Vxlan) => {
                Some(format!("{}-networking", cluster.name()))
            }
            _ => None,
        }
    }
}

impl TaskBuilder for NetworkingBuilder<'_> {
    fn name(&self) -> &'static str {
        "networking"
    }

    fn build_tasks(&self, graph: &mut TaskGraph) -> Result<(), KcupError> {
        let (Some(name), Some(networking), Some(mode)) = (
            Self::task_name(self.cluster),
            self.cluster.spec.networking.as_ref(),
            self.cluster.networking_mode(),
        ) else {
            return Ok(());
        };

        let config = NetworkingConfig {
            mode: mode.to_string(),
            mtu: networking.kubenet.as_ref().and_then(|k| k.mtu),
            port: networking.vxlan.as_ref().and_then(|v| v.port),
            network_cidr: self.cluster.spec.network_cidr.as_deref(),
        };
        let contents = serde_yaml::to_string(&config)
            .map_err(|e| KcupError::persistence("encoding networking config", e))?;

        graph.add(Task::new(
            name,
            self.name(),
            TaskSpec::ManagedFile {
                location: format!("addons/networking/{mode}.yaml"),
                contents,
            },
        ))
    }
}
