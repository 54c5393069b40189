//! Fill defaults into the completed copy of a cluster spec.

use tracing::debug;

use super::{Cluster, DockerConfig, InstanceGroup, NetworkingSpec};
use crate::cloud::Cloud;
use crate::registry::StateStore;

pub const DEFAULT_SERVICE_CLUSTER_IP_RANGE: &str = "100.64.0.0/13";
pub const DEFAULT_CLUSTER_DNS_DOMAIN: &str = "cluster.local";
pub const DEFAULT_DOCKER_LOG_DRIVER: &str = "json-file";

/// Return a copy of `cluster` with every defaultable field set.
///
/// The input is left untouched: defaults belong to the completed config, not
/// to what the operator wrote.
pub fn populate_cluster_spec(cluster: &Cluster, store: &dyn StateStore) -> Cluster {
    let mut full = cluster.clone();
    let spec = &mut full.spec;

    if spec.config_base.is_none() {
        spec.config_base = Some(store.config_base(cluster.name()));
    }
    if spec.networking.as_ref().is_none_or(|n| n.modes().is_empty()) {
        spec.networking = Some(NetworkingSpec::classic());
    }
    if spec.service_cluster_ip_range.is_none() {
        spec.service_cluster_ip_range = Some(DEFAULT_SERVICE_CLUSTER_IP_RANGE.to_string());
    }
    if spec.cluster_dns_domain.is_none() {
        spec.cluster_dns_domain = Some(DEFAULT_CLUSTER_DNS_DOMAIN.to_string());
    }

    let docker = spec.docker.get_or_insert_with(DockerConfig::default);
    if docker.log_driver.is_none() {
        docker.log_driver = Some(DEFAULT_DOCKER_LOG_DRIVER.to_string());
    }

    debug!("Populated cluster spec for {}", cluster.name());
    full
}

/// Return a copy of `group` with machine type and sizing defaults set.
pub fn populate_instance_group(group: &InstanceGroup, cloud: &dyn Cloud) -> InstanceGroup {
    let mut full = group.clone();
    let spec = &mut full.spec;

    if spec.machine_type.is_none() {
        spec.machine_type = Some(cloud.default_machine_type(spec.role).to_string());
    }
    let min = *spec.min_size.get_or_insert(1);
    spec.max_size.get_or_insert(min);

    full
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{InstanceGroupRole, KubenetNetworkingSpec, ObjectMeta};
    use crate::cloud::AwsCloud;
    use crate::registry::FsStateStore;

    fn cluster() -> Cluster {
        Cluster {
            metadata: ObjectMeta::named("demo.example.com"),
            ..Cluster::default()
        }
    }

    #[test]
    fn test_populate_fills_defaults() {
        let store = FsStateStore::new("/state");
        let full = populate_cluster_spec(&cluster(), &store);

        assert_eq!(
            full.spec.config_base.as_deref(),
            Some("/state/demo.example.com")
        );
        assert_eq!(full.spec.networking, Some(NetworkingSpec::classic()));
        assert_eq!(
            full.spec.service_cluster_ip_range.as_deref(),
            Some(DEFAULT_SERVICE_CLUSTER_IP_RANGE)
        );
        assert_eq!(full.spec.cluster_dns_domain.as_deref(), Some("cluster.local"));
        assert_eq!(
            full.spec.docker.unwrap().log_driver.as_deref(),
            Some("json-file")
        );
    }

    #[test]
    fn test_populate_keeps_explicit_values() {
        let store = FsStateStore::new("/state");
        let mut input = cluster();
        input.spec.config_base = Some("/assets".to_string());
        input.spec.networking = Some(NetworkingSpec {
            kubenet: Some(KubenetNetworkingSpec { mtu: Some(1500) }),
            ..NetworkingSpec::default()
        });
        input.spec.docker = Some(DockerConfig {
            storage: Some("overlay".to_string()),
            ..DockerConfig::default()
        });

        let full = populate_cluster_spec(&input, &store);
        assert_eq!(full.spec.config_base.as_deref(), Some("/assets"));
        assert_eq!(full.spec.networking, input.spec.networking);
        assert_eq!(
            full.spec.docker.unwrap().storage.as_deref(),
            Some("overlay")
        );
        // Input stays as written.
        assert!(input.spec.cluster_dns_domain.is_none());
    }

    #[test]
    fn test_populate_instance_group_defaults() {
        let mut group = InstanceGroup {
            metadata: ObjectMeta::named("master-a"),
            ..InstanceGroup::default()
        };
        group.spec.role = InstanceGroupRole::Master;
        group.spec.min_size = Some(2);

        let full = populate_instance_group(&group, &AwsCloud);
        assert_eq!(full.spec.machine_type.as_deref(), Some("m3.medium"));
        assert_eq!(full.spec.min_size, Some(2));
        assert_eq!(full.spec.max_size, Some(2));
    }
}
