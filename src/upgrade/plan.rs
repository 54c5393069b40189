//! Upgrade planning: diff a cluster against a channel.

use serde::Serialize;
use tracing::{debug, warn};

use super::action::{UpgradeAction, UpgradeCommand};
use crate::api::{Channel, Cluster, ClusterSpec, InstanceGroup};
use crate::cloud::CloudProviderId;
use crate::error::KcupError;

/// Ordered actions that bring a cluster in line with a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradePlan {
    pub cluster: String,
    pub actions: Vec<UpgradeAction>,
}

impl UpgradePlan {
    /// Returns true if the cluster already matches the channel.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }
}

/// Reject clusters that must not go through the upgrade flow.
pub fn ensure_upgradable(cluster: &Cluster) -> Result<(), KcupError> {
    if cluster.is_imported() {
        return Err(KcupError::UnsupportedCluster(cluster.name().to_string()));
    }
    Ok(())
}

/// Compare `cluster` and its groups against `channel`.
///
/// Actions are grouped by step in a fixed order: platform version,
/// networking mode, instance group images, container storage driver. The
/// inputs are not modified.
pub fn plan_upgrade(
    cluster: &Cluster,
    groups: &[InstanceGroup],
    channel: &Channel,
    provider: CloudProviderId,
) -> UpgradePlan {
    let overlay = channel.cluster_spec();

    let mut actions = Vec::new();
    actions.extend(plan_kubernetes_version(cluster, &overlay));
    actions.extend(plan_networking(cluster, &overlay));
    actions.extend(plan_images(groups, channel, provider));
    actions.extend(plan_docker_storage(cluster, &overlay));

    debug!(
        "Planned {} upgrade actions for {}",
        actions.len(),
        cluster.name()
    );
    UpgradePlan {
        cluster: cluster.name().to_string(),
        actions,
    }
}

fn plan_kubernetes_version(cluster: &Cluster, overlay: &ClusterSpec) -> Option<UpgradeAction> {
    let target = overlay
        .kubernetes_version
        .as_deref()
        .filter(|v| !v.is_empty())?;
    let current = cluster.spec.kubernetes_version.as_deref().unwrap_or_default();
    if current == target {
        return None;
    }

    Some(UpgradeAction {
        item: "Cluster".to_string(),
        property: "KubernetesVersion".to_string(),
        old: current.to_string(),
        new: target.to_string(),
        command: UpgradeCommand::SetKubernetesVersion {
            version: target.to_string(),
        },
    })
}

/// Only classic to kubenet is ever proposed. A cluster without any mode
/// set runs classic, matching spec population.
fn plan_networking(cluster: &Cluster, overlay: &ClusterSpec) -> Option<UpgradeAction> {
    let kubenet = overlay.networking.as_ref()?.kubenet.as_ref()?;
    let on_classic = cluster
        .spec
        .networking
        .as_ref()
        .is_none_or(|n| n.classic.is_some() || n.modes().is_empty());
    if !on_classic {
        return None;
    }

    Some(UpgradeAction {
        item: "Cluster".to_string(),
        property: "Networking".to_string(),
        old: "classic".to_string(),
        new: "kubenet".to_string(),
        command: UpgradeCommand::SwitchToKubenet {
            kubenet: kubenet.clone(),
        },
    })
}

fn plan_images(
    groups: &[InstanceGroup],
    channel: &Channel,
    provider: CloudProviderId,
) -> Vec<UpgradeAction> {
    let candidates = channel.images_for_provider(provider.as_str());
    let image = match candidates.as_slice() {
        [image] => &image.name,
        [] => {
            warn!("No matching images specified in channel for cloud provider {provider}");
            return Vec::new();
        }
        _ => {
            warn!(
                "Found {} matching images for cloud provider {provider}, skipping image upgrade",
                candidates.len()
            );
            return Vec::new();
        }
    };

    groups
        .iter()
        .filter(|group| group.spec.image.as_deref() != Some(image.as_str()))
        .map(|group| UpgradeAction {
            item: format!("InstanceGroup/{}", group.name()),
            property: "Image".to_string(),
            old: group.spec.image.clone().unwrap_or_default(),
            new: image.clone(),
            command: UpgradeCommand::SetInstanceGroupImage {
                group: group.name().to_string(),
                image: image.clone(),
            },
        })
        .collect()
}

fn plan_docker_storage(cluster: &Cluster, overlay: &ClusterSpec) -> Option<UpgradeAction> {
    let target = overlay
        .docker
        .as_ref()?
        .storage
        .as_deref()?;
    let current = cluster
        .spec
        .docker
        .as_ref()
        .and_then(|d| d.storage.as_deref())
        .unwrap_or_default();
    if current == target {
        return None;
    }

    Some(UpgradeAction {
        item: "Cluster".to_string(),
        property: "Docker.Storage".to_string(),
        old: current.to_string(),
        new: target.to_string(),
        command: UpgradeCommand::SetDockerStorage {
            storage: target.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::cluster::{ANNOTATION_MANAGEMENT, MANAGEMENT_IMPORTED};
    use crate::api::{
        ChannelImageSpec, ClusterSpec, DockerConfig, NetworkingSpec, ObjectMeta,
        channel::LABEL_CLOUD_PROVIDER,
    };

    fn cluster(version: &str, networking: NetworkingSpec) -> Cluster {
        let mut cluster = Cluster {
            metadata: ObjectMeta::named("demo.example.com"),
            ..Cluster::default()
        };
        cluster.spec.cloud_provider = Some("aws".to_string());
        cluster.spec.kubernetes_version = Some(version.to_string());
        cluster.spec.networking = Some(networking);
        cluster
    }

    fn group(name: &str, image: &str) -> InstanceGroup {
        let mut group = InstanceGroup {
            metadata: ObjectMeta::named(name),
            ..InstanceGroup::default()
        };
        group.spec.image = Some(image.to_string());
        group
    }

    fn image(name: &str, provider: &str) -> ChannelImageSpec {
        ChannelImageSpec {
            name: name.to_string(),
            labels: [(LABEL_CLOUD_PROVIDER.to_string(), provider.to_string())].into(),
        }
    }

    fn channel(spec: Option<ClusterSpec>, images: Vec<ChannelImageSpec>) -> Channel {
        let mut channel = Channel::default();
        channel.spec.cluster = spec;
        channel.spec.images = images;
        channel
    }

    fn channel_version(version: &str) -> ClusterSpec {
        ClusterSpec {
            kubernetes_version: Some(version.to_string()),
            ..ClusterSpec::default()
        }
    }

    #[test]
    fn test_version_change() {
        let plan = plan_upgrade(
            &cluster("1.3.0", NetworkingSpec::kubenet()),
            &[],
            &channel(Some(channel_version("1.4.0")), vec![]),
            CloudProviderId::Aws,
        );
        assert_eq!(plan.len(), 1);
        let action = &plan.actions[0];
        assert_eq!(action.item, "Cluster");
        assert_eq!(action.property, "KubernetesVersion");
        assert_eq!((action.old.as_str(), action.new.as_str()), ("1.3.0", "1.4.0"));
    }

    #[test]
    fn test_same_or_empty_version_is_noop() {
        let current = cluster("1.4.0", NetworkingSpec::kubenet());
        for target in ["1.4.0", ""] {
            let plan = plan_upgrade(
                &current,
                &[],
                &channel(Some(channel_version(target)), vec![]),
                CloudProviderId::Aws,
            );
            assert!(plan.is_empty(), "target {target:?}");
        }
    }

    #[test]
    fn test_missing_channel_cluster_block() {
        let plan = plan_upgrade(
            &cluster("1.3.0", NetworkingSpec::classic()),
            &[],
            &channel(None, vec![]),
            CloudProviderId::Aws,
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn test_classic_to_kubenet() {
        let spec = ClusterSpec {
            networking: Some(NetworkingSpec::kubenet()),
            ..ClusterSpec::default()
        };
        let plan = plan_upgrade(
            &cluster("1.4.0", NetworkingSpec::classic()),
            &[],
            &channel(Some(spec), vec![]),
            CloudProviderId::Aws,
        );
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.actions[0].property, "Networking");
        assert_eq!(plan.actions[0].old, "classic");
        assert_eq!(plan.actions[0].new, "kubenet");
    }

    #[test]
    fn test_unset_networking_moves_to_kubenet() {
        let spec = ClusterSpec {
            networking: Some(NetworkingSpec::kubenet()),
            ..ClusterSpec::default()
        };
        let channel = channel(Some(spec), vec![]);

        for networking in [None, Some(NetworkingSpec::default())] {
            let mut current = cluster("1.4.0", NetworkingSpec::classic());
            current.spec.networking = networking;

            let plan = plan_upgrade(&current, &[], &channel, CloudProviderId::Aws);
            assert_eq!(plan.len(), 1, "networking {:?}", current.spec.networking);
            assert_eq!(plan.actions[0].property, "Networking");
            assert_eq!(plan.actions[0].old, "classic");

            plan.actions[0].command.apply(&mut current, &mut []).unwrap();
            assert_eq!(current.spec.networking, Some(NetworkingSpec::kubenet()));
            let replan = plan_upgrade(&current, &[], &channel, CloudProviderId::Aws);
            assert!(replan.is_empty());
        }
    }

    #[test]
    fn test_no_other_networking_transitions() {
        let spec = ClusterSpec {
            networking: Some(NetworkingSpec::kubenet()),
            ..ClusterSpec::default()
        };
        let plan = plan_upgrade(
            &cluster("1.4.0", NetworkingSpec::vxlan()),
            &[],
            &channel(Some(spec), vec![]),
            CloudProviderId::Aws,
        );
        assert!(plan.is_empty());

        let classic_channel = ClusterSpec {
            networking: Some(NetworkingSpec::classic()),
            ..ClusterSpec::default()
        };
        let plan = plan_upgrade(
            &cluster("1.4.0", NetworkingSpec::kubenet()),
            &[],
            &channel(Some(classic_channel), vec![]),
            CloudProviderId::Aws,
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn test_image_updates_only_differing_groups() {
        let groups = vec![group("master-a", "ami-new"), group("nodes", "ami-old")];
        let plan = plan_upgrade(
            &cluster("1.4.0", NetworkingSpec::kubenet()),
            &groups,
            &channel(None, vec![image("ami-new", "aws"), image("gce-img", "gce")]),
            CloudProviderId::Aws,
        );
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.actions[0].item, "InstanceGroup/nodes");
        assert_eq!(plan.actions[0].old, "ami-old");
        assert_eq!(plan.actions[0].new, "ami-new");
    }

    #[test]
    fn test_ambiguous_images_skipped() {
        let groups = vec![group("nodes", "ami-old")];
        let current = cluster("1.4.0", NetworkingSpec::kubenet());

        let none = channel(None, vec![image("gce-img", "gce")]);
        assert!(plan_upgrade(&current, &groups, &none, CloudProviderId::Aws).is_empty());

        let two = channel(None, vec![image("ami-a", "aws"), image("ami-b", "aws")]);
        assert!(plan_upgrade(&current, &groups, &two, CloudProviderId::Aws).is_empty());
    }

    #[test]
    fn test_docker_storage_from_unset() {
        let spec = ClusterSpec {
            docker: Some(DockerConfig {
                storage: Some("overlay".to_string()),
                ..DockerConfig::default()
            }),
            ..ClusterSpec::default()
        };
        let plan = plan_upgrade(
            &cluster("1.4.0", NetworkingSpec::kubenet()),
            &[],
            &channel(Some(spec), vec![]),
            CloudProviderId::Aws,
        );
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.actions[0].property, "Docker.Storage");
        assert_eq!(plan.actions[0].old, "");
        assert_eq!(plan.actions[0].new, "overlay");
    }

    #[test]
    fn test_step_order() {
        let spec = ClusterSpec {
            kubernetes_version: Some("1.4.0".to_string()),
            networking: Some(NetworkingSpec::kubenet()),
            docker: Some(DockerConfig {
                storage: Some("overlay".to_string()),
                ..DockerConfig::default()
            }),
            ..ClusterSpec::default()
        };
        let plan = plan_upgrade(
            &cluster("1.3.0", NetworkingSpec::classic()),
            &[group("nodes", "ami-old")],
            &channel(Some(spec), vec![image("ami-new", "aws")]),
            CloudProviderId::Aws,
        );
        let properties: Vec<&str> = plan.actions.iter().map(|a| a.property.as_str()).collect();
        assert_eq!(
            properties,
            vec!["KubernetesVersion", "Networking", "Image", "Docker.Storage"]
        );
    }

    #[test]
    fn test_plan_is_deterministic() {
        let current = cluster("1.3.0", NetworkingSpec::classic());
        let groups = vec![group("a", "x"), group("b", "y")];
        let target = channel(Some(channel_version("1.4.0")), vec![image("ami-new", "aws")]);

        let first = plan_upgrade(&current, &groups, &target, CloudProviderId::Aws);
        let second = plan_upgrade(&current, &groups, &target, CloudProviderId::Aws);
        assert_eq!(first, second);
    }

    #[test]
    fn test_ensure_upgradable_rejects_imported() {
        let mut imported = cluster("1.3.0", NetworkingSpec::classic());
        assert!(ensure_upgradable(&imported).is_ok());
        imported
            .metadata
            .annotations
            .insert(ANNOTATION_MANAGEMENT.to_string(), MANAGEMENT_IMPORTED.to_string());
        assert!(matches!(
            ensure_upgradable(&imported),
            Err(KcupError::UnsupportedCluster(_))
        ));
    }
}
