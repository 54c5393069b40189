//! Per-instance-group boot configuration, launch templates and autoscaling
//! groups.

use serde::Serialize;

use super::bootstrap_channel::{BOOTSTRAP_CHANNEL_LOCATION, BootstrapChannelBuilder};
use super::{NetworkingBuilder, TaskBuilder};
use crate::api::{Cluster, InstanceGroup, InstanceGroupRole};
use crate::error::KcupError;
use crate::graph::{Task, TaskGraph, TaskRef, TaskSpec};

pub struct InstanceGroupBuilder<'a> {
    cluster: &'a Cluster,
    groups: &'a [InstanceGroup],
}

/// Boot configuration read by the node agent.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeupConfig<'a> {
    cluster_name: &'a str,
    instance_group: &'a str,
    role: InstanceGroupRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    kubernetes_version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    networking: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    docker_storage: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    docker_log_driver: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    channels: Vec<&'a str>,
}

impl<'a> InstanceGroupBuilder<'a> {
    pub fn new(cluster: &'a Cluster, groups: &'a [InstanceGroup]) -> Self {
        Self { cluster, groups }
    }

    fn nodeup_task(&self, group: &InstanceGroup) -> Result<Task, KcupError> {
        let docker = self.cluster.spec.docker.as_ref();
        let config = NodeupConfig {
            cluster_name: self.cluster.name(),
            instance_group: group.name(),
            role: group.spec.role,
            kubernetes_version: self.cluster.spec.kubernetes_version.as_deref(),
            networking: self.cluster.networking_mode().map(|m| m.to_string()),
            docker_storage: docker.and_then(|d| d.storage.as_deref()),
            docker_log_driver: docker.and_then(|d| d.log_driver.as_deref()),
            channels: if group.is_master() {
                vec![BOOTSTRAP_CHANNEL_LOCATION]
            } else {
                Vec::new()
            },
        };
        let contents = serde_yaml::to_string(&config).map_err(|e| {
            KcupError::persistence(format!("encoding nodeup config for {}", group.name()), e)
        })?;

        let role = group.spec.role.to_string().to_lowercase();
        Ok(Task::new(
            nodeup_task_name(self.cluster, group),
            self.name(),
            TaskSpec::ManagedFile {
                location: format!("igconfig/{role}/{}/nodeup.yaml", group.name()),
                contents,
            },
        ))
    }

    fn launch_template_task(&self, group: &InstanceGroup) -> Task {
        let mut files = vec![TaskRef::new(nodeup_task_name(self.cluster, group))];
        if let Some(networking) = NetworkingBuilder::task_name(self.cluster) {
            files.push(TaskRef::new(networking));
        }
        if group.is_master() {
            files.push(TaskRef::new(BootstrapChannelBuilder::task_name(self.cluster)));
        }

        Task::new(
            launch_template_task_name(self.cluster, group),
            self.name(),
            TaskSpec::LaunchTemplate {
                image: group.spec.image.clone().unwrap_or_default(),
                machine_type: group.spec.machine_type.clone().unwrap_or_default(),
                role: group.spec.role,
                files,
            },
        )
    }

    fn autoscaling_group_task(&self, group: &InstanceGroup) -> Task {
        let min_size = group.spec.min_size.unwrap_or(1);
        Task::new(
            autoscaling_group_task_name(self.cluster, group),
            self.name(),
            TaskSpec::AutoscalingGroup {
                launch_template: TaskRef::new(launch_template_task_name(self.cluster, group)),
                min_size,
                max_size: group.spec.max_size.unwrap_or(min_size),
                zones: group.spec.zones.clone(),
            },
        )
    }
}

pub fn nodeup_task_name(cluster: &Cluster, group: &InstanceGroup) -> String {
    format!("{}-nodeup-{}", cluster.name(), group.name())
}

pub fn launch_template_task_name(cluster: &Cluster, group: &InstanceGroup) -> String {
    format!("{}.{}-template", group.name(), cluster.name())
}

pub fn autoscaling_group_task_name(cluster: &Cluster, group: &InstanceGroup) -> String {
    format!("{}.{}", group.name(), cluster.name())
}

impl TaskBuilder for InstanceGroupBuilder<'_> {
    fn name(&self) -> &'static str {
        "instance-groups"
    }

    fn build_tasks(&self, graph: &mut TaskGraph) -> Result<(), KcupError> {
        for group in self.groups {
            graph.add(self.nodeup_task(group)?)?;
            graph.add(self.launch_template_task(group))?;
            graph.add(self.autoscaling_group_task(group))?;
        }
        Ok(())
    }
}
