//! Bootstrap addon channel.
//!
//! Emits the addons manifest the in-cluster channel controller applies at
//! boot: DNS, core objects and the DNS controller, plus the overlay router
//! when the cluster runs vxlan networking.

use std::collections::BTreeMap;

use super::TaskBuilder;
use crate::api::addons::{AddonSpec, AddonsManifest};
use crate::api::{Cluster, NetworkingMode};
use crate::error::KcupError;
use crate::graph::{Task, TaskGraph, TaskSpec};

pub const BOOTSTRAP_CHANNEL_LOCATION: &str = "addons/bootstrap-channel.yaml";

const ADDONS_MANIFEST_NAME: &str = "bootstrap";
const SELECTOR_KEY: &str = "k8s-addon";

const KROUTON_MANIFEST: &str = "https://raw.githubusercontent.com/kopeio/krouton/4dd0f75871518e875e06a5250dd45d831d6111a2/k8s/krouton.yaml";

pub struct BootstrapChannelBuilder<'a> {
    cluster: &'a Cluster,
}

impl<'a> BootstrapChannelBuilder<'a> {
    pub fn new(cluster: &'a Cluster) -> Self {
        Self { cluster }
    }

    /// Task name of the manifest for `cluster`.
    pub fn task_name(cluster: &Cluster) -> String {
        format!("{}-addons-{ADDONS_MANIFEST_NAME}", cluster.name())
    }

    pub fn build_manifest(&self) -> AddonsManifest {
        let mut addons = vec![
            addon("kube-dns", "1.4.0", "kube-dns/v1.4.0.yaml"),
            addon("core", "1.4.0", "core/v1.4.0.yaml"),
            addon("dns-controller", "1.4.1", "dns-controller/v1.4.1.yaml"),
        ];

        if self.cluster.networking_mode() == Some(NetworkingMode::Vxlan) {
            addons.push(addon("krouton", "1.0.0", KROUTON_MANIFEST));
        }

        AddonsManifest::new(ADDONS_MANIFEST_NAME, addons)
    }
}

fn addon(name: &str, version: &str, manifest: &str) -> AddonSpec {
    AddonSpec {
        name: name.to_string(),
        version: Some(version.to_string()),
        selector: BTreeMap::from([(
            SELECTOR_KEY.to_string(),
            format!("{name}.addons.k8s.io"),
        )]),
        manifest: manifest.to_string(),
    }
}

impl TaskBuilder for BootstrapChannelBuilder<'_> {
    fn name(&self) -> &'static str {
        "bootstrap-channel"
    }

    fn build_tasks(&self, graph: &mut TaskGraph) -> Result<(), KcupError> {
        let manifest = self.build_manifest();
        let contents = serde_yaml::to_string(&manifest)
            .map_err(|e| KcupError::persistence("encoding addons manifest", e))?;

        graph.add(Task::new(
            Self::task_name(self.cluster),
            self.name(),
            TaskSpec::ManagedFile {
                location: BOOTSTRAP_CHANNEL_LOCATION.to_string(),
                contents,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{NetworkingSpec, ObjectMeta};

    fn cluster(networking: NetworkingSpec) -> Cluster {
        let mut cluster = Cluster {
            metadata: ObjectMeta::named("demo.example.com"),
            ..Cluster::default()
        };
        cluster.spec.networking = Some(networking);
        cluster
    }

    fn addon_names(manifest: &AddonsManifest) -> Vec<&str> {
        manifest.spec.addons.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn test_baseline_addons_in_order() {
        for networking in [NetworkingSpec::classic(), NetworkingSpec::kubenet()] {
            let cluster = cluster(networking);
            let manifest = BootstrapChannelBuilder::new(&cluster).build_manifest();
            assert_eq!(manifest.kind, "Addons");
            assert_eq!(manifest.metadata.name, "bootstrap");
            assert_eq!(addon_names(&manifest), vec!["kube-dns", "core", "dns-controller"]);
        }
    }

    #[test]
    fn test_vxlan_adds_router() {
        let cluster = cluster(NetworkingSpec::vxlan());
        let manifest = BootstrapChannelBuilder::new(&cluster).build_manifest();
        assert_eq!(
            addon_names(&manifest),
            vec!["kube-dns", "core", "dns-controller", "krouton"]
        );
        let krouton = &manifest.spec.addons[3];
        assert_eq!(krouton.version.as_deref(), Some("1.0.0"));
        assert_eq!(krouton.selector["k8s-addon"], "krouton.addons.k8s.io");
        assert!(krouton.manifest.starts_with("https://"));
    }

    #[test]
    fn test_addon_fields() {
        let cluster = cluster(NetworkingSpec::classic());
        let manifest = BootstrapChannelBuilder::new(&cluster).build_manifest();
        let dns_controller = &manifest.spec.addons[2];
        assert_eq!(dns_controller.version.as_deref(), Some("1.4.1"));
        assert_eq!(dns_controller.manifest, "dns-controller/v1.4.1.yaml");
        assert_eq!(
            dns_controller.selector["k8s-addon"],
            "dns-controller.addons.k8s.io"
        );
    }

    #[test]
    fn test_emits_managed_file() {
        let cluster = cluster(NetworkingSpec::classic());
        let mut graph = TaskGraph::new();
        BootstrapChannelBuilder::new(&cluster)
            .build_tasks(&mut graph)
            .unwrap();

        let task = graph.get("demo.example.com-addons-bootstrap").unwrap();
        match &task.spec {
            TaskSpec::ManagedFile { location, contents } => {
                assert_eq!(location, "addons/bootstrap-channel.yaml");
                assert!(contents.starts_with("kind: Addons\n"));
                let parsed: AddonsManifest = serde_yaml::from_str(contents).unwrap();
                assert_eq!(parsed.spec.addons.len(), 3);
            }
            other => panic!("unexpected spec {other:?}"),
        }
    }

    #[test]
    fn test_manifest_bytes_are_stable() {
        let cluster = cluster(NetworkingSpec::vxlan());
        let render = || {
            let mut graph = TaskGraph::new();
            BootstrapChannelBuilder::new(&cluster)
                .build_tasks(&mut graph)
                .unwrap();
            graph.get("demo.example.com-addons-bootstrap").unwrap().clone()
        };
        assert_eq!(render(), render());
    }
}
