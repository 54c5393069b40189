//! Deep validation of a populated cluster and its instance groups.

use std::collections::BTreeSet;

use ipnet::IpNet;

use super::{Cluster, InstanceGroup};
use crate::cloud::CloudProviderId;
use crate::error::KcupError;

/// Validate the completed cluster spec together with its instance groups.
///
/// All problems are collected and returned in one `Validation` error. With
/// `strict`, fields that population never fills (images, config base) must
/// be present too.
pub fn validate_cluster(
    cluster: &Cluster,
    groups: &[InstanceGroup],
    strict: bool,
) -> Result<(), KcupError> {
    let mut problems = Vec::new();
    let spec = &cluster.spec;

    if let Err(problem) = validate_name(cluster.name()) {
        problems.push(format!("metadata.name: {problem}"));
    }

    match spec.kubernetes_version.as_deref() {
        None | Some("") => problems.push("spec.kubernetesVersion is required".to_string()),
        Some(version) => {
            if semver::Version::parse(version.trim_start_matches('v')).is_err() {
                problems.push(format!(
                    "spec.kubernetesVersion {version:?} is not a valid version"
                ));
            }
        }
    }

    match spec.cloud_provider.as_deref() {
        None | Some("") => problems.push("spec.cloudProvider is required".to_string()),
        Some(provider) => {
            if provider.parse::<CloudProviderId>().is_err() {
                problems.push(format!("spec.cloudProvider {provider:?} is not supported"));
            }
        }
    }

    match &spec.networking {
        None => problems.push("spec.networking is required".to_string()),
        Some(networking) => {
            let modes = networking.modes();
            if modes.len() != 1 {
                let names: Vec<String> = modes.iter().map(ToString::to_string).collect();
                problems.push(format!(
                    "spec.networking must configure exactly one mode, found [{}]",
                    names.join(", ")
                ));
            }
        }
    }

    for (field, value) in [
        ("spec.networkCIDR", &spec.network_cidr),
        ("spec.serviceClusterIPRange", &spec.service_cluster_ip_range),
    ] {
        if let Some(cidr) = value
            && cidr.parse::<IpNet>().is_err()
        {
            problems.push(format!("{field} {cidr:?} is not a valid CIDR"));
        }
    }

    if let Some(storage) = spec.docker.as_ref().and_then(|d| d.storage.as_deref())
        && storage.trim().is_empty()
    {
        problems.push("spec.docker.storage must not be empty when set".to_string());
    }

    if strict && spec.config_base.as_deref().is_none_or(str::is_empty) {
        problems.push("spec.configBase is required".to_string());
    }

    validate_instance_groups(groups, strict, &mut problems);

    if problems.is_empty() {
        Ok(())
    } else {
        Err(KcupError::Validation(problems))
    }
}

fn validate_instance_groups(groups: &[InstanceGroup], strict: bool, problems: &mut Vec<String>) {
    let mut seen = BTreeSet::new();
    for group in groups {
        let name = group.name();
        if name.is_empty() {
            problems.push("instance group with empty name".to_string());
            continue;
        }
        if !seen.insert(name) {
            problems.push(format!("instance group {name:?} is defined more than once"));
        }
        if let Err(problem) = validate_name(name) {
            problems.push(format!("instance group {name:?}: {problem}"));
        }
        if strict && group.spec.image.as_deref().is_none_or(str::is_empty) {
            problems.push(format!("instance group {name:?} has no image"));
        }
        if let (Some(min), Some(max)) = (group.spec.min_size, group.spec.max_size)
            && min > max
        {
            problems.push(format!(
                "instance group {name:?} minSize {min} exceeds maxSize {max}"
            ));
        }
    }

    if !groups.iter().any(InstanceGroup::is_master) {
        problems.push("must have at least one Master instance group".to_string());
    }
}

/// Names are DNS-like: lowercase alphanumerics, `-` and `.`.
fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name is required".to_string());
    }
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    if !valid_chars {
        return Err(format!("{name:?} must contain only lowercase letters, digits, '-' and '.'"));
    }
    let edges_ok = name
        .chars()
        .next()
        .zip(name.chars().last())
        .is_some_and(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric());
    if !edges_ok {
        return Err(format!("{name:?} must start and end with an alphanumeric character"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        ClassicNetworkingSpec, DockerConfig, InstanceGroupRole, NetworkingSpec, ObjectMeta,
    };

    fn valid_cluster() -> Cluster {
        let mut cluster = Cluster {
            metadata: ObjectMeta::named("demo.example.com"),
            ..Cluster::default()
        };
        cluster.spec.cloud_provider = Some("aws".to_string());
        cluster.spec.kubernetes_version = Some("1.4.0".to_string());
        cluster.spec.config_base = Some("/state/demo.example.com".to_string());
        cluster.spec.network_cidr = Some("172.20.0.0/16".to_string());
        cluster.spec.networking = Some(NetworkingSpec::kubenet());
        cluster
    }

    fn group(name: &str, role: InstanceGroupRole) -> InstanceGroup {
        let mut group = InstanceGroup {
            metadata: ObjectMeta::named(name),
            ..InstanceGroup::default()
        };
        group.spec.role = role;
        group.spec.image = Some("ami-1".to_string());
        group
    }

    fn valid_groups() -> Vec<InstanceGroup> {
        vec![
            group("master-a", InstanceGroupRole::Master),
            group("nodes", InstanceGroupRole::Node),
        ]
    }

    fn problems(result: Result<(), KcupError>) -> Vec<String> {
        match result {
            Err(KcupError::Validation(problems)) => problems,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_cluster_passes() {
        assert!(validate_cluster(&valid_cluster(), &valid_groups(), true).is_ok());
    }

    #[test]
    fn test_collects_all_problems() {
        let mut cluster = valid_cluster();
        cluster.spec.kubernetes_version = Some("one.four".to_string());
        cluster.spec.cloud_provider = Some("azure".to_string());
        cluster.spec.network_cidr = Some("172.20.0.0/40".to_string());

        let found = problems(validate_cluster(&cluster, &valid_groups(), true));
        assert_eq!(found.len(), 3, "{found:?}");
    }

    #[test]
    fn test_version_with_v_prefix_accepted() {
        let mut cluster = valid_cluster();
        cluster.spec.kubernetes_version = Some("v1.4.6".to_string());
        assert!(validate_cluster(&cluster, &valid_groups(), true).is_ok());
    }

    #[test]
    fn test_multiple_networking_modes_rejected() {
        let mut cluster = valid_cluster();
        cluster.spec.networking.as_mut().unwrap().classic = Some(ClassicNetworkingSpec {});
        let found = problems(validate_cluster(&cluster, &valid_groups(), true));
        assert!(found[0].contains("[classic, kubenet]"), "{found:?}");
    }

    #[test]
    fn test_empty_storage_driver_rejected() {
        let mut cluster = valid_cluster();
        cluster.spec.docker = Some(DockerConfig {
            storage: Some(String::new()),
            ..DockerConfig::default()
        });
        assert!(validate_cluster(&cluster, &valid_groups(), true).is_err());
    }

    #[test]
    fn test_strict_requires_images() {
        let mut groups = valid_groups();
        groups[1].spec.image = None;
        assert!(validate_cluster(&valid_cluster(), &groups, false).is_ok());
        let found = problems(validate_cluster(&valid_cluster(), &groups, true));
        assert_eq!(found, vec!["instance group \"nodes\" has no image".to_string()]);
    }

    #[test]
    fn test_duplicate_and_missing_master() {
        let groups = vec![
            group("nodes", InstanceGroupRole::Node),
            group("nodes", InstanceGroupRole::Node),
        ];
        let found = problems(validate_cluster(&valid_cluster(), &groups, true));
        assert!(found.iter().any(|p| p.contains("more than once")));
        assert!(found.iter().any(|p| p.contains("Master")));
    }

    #[test]
    fn test_min_exceeds_max() {
        let mut groups = valid_groups();
        groups[1].spec.min_size = Some(3);
        groups[1].spec.max_size = Some(2);
        let found = problems(validate_cluster(&valid_cluster(), &groups, true));
        assert!(found[0].contains("minSize 3 exceeds maxSize 2"));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("demo.example.com").is_ok());
        assert!(validate_name("Demo").is_err());
        assert!(validate_name("-demo").is_err());
        assert!(validate_name("").is_err());
    }

    #[test]
    fn test_cidr_ranges() {
        for cidr in ["100.64.0.0/13", "fd00:10:96::/108"] {
            let mut cluster = valid_cluster();
            cluster.spec.service_cluster_ip_range = Some(cidr.to_string());
            assert!(
                validate_cluster(&cluster, &valid_groups(), true).is_ok(),
                "{cidr} should be accepted"
            );
        }

        for cidr in ["100.64.0.0", "100.64.0/13", "100.64.0.0/33", "fd00::/129"] {
            let mut cluster = valid_cluster();
            cluster.spec.service_cluster_ip_range = Some(cidr.to_string());
            let found = problems(validate_cluster(&cluster, &valid_groups(), true));
            assert_eq!(
                found,
                vec![format!(
                    "spec.serviceClusterIPRange {cidr:?} is not a valid CIDR"
                )]
            );
        }
    }
}
