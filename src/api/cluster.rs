//! Cluster resource.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ObjectMeta;

/// Annotation recording how a cluster came under management.
pub const ANNOTATION_MANAGEMENT: &str = "kcup.io/management";

/// Value of [`ANNOTATION_MANAGEMENT`] for clusters adopted from elsewhere.
pub const MANAGEMENT_IMPORTED: &str = "imported";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: ClusterSpec,
}

impl Cluster {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Imported clusters are managed by a separate conversion flow.
    pub fn is_imported(&self) -> bool {
        self.metadata
            .annotations
            .get(ANNOTATION_MANAGEMENT)
            .is_some_and(|v| v == MANAGEMENT_IMPORTED)
    }

    /// Configured networking mode, if exactly one is set.
    pub fn networking_mode(&self) -> Option<NetworkingMode> {
        self.spec.networking.as_ref().and_then(NetworkingSpec::mode)
    }
}

/// Desired state of a cluster.
///
/// Also used as the overlay carried by a channel, which is why every field
/// is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_provider: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,

    /// Root location for generated assets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_base: Option<String>,

    #[serde(rename = "networkCIDR", skip_serializing_if = "Option::is_none")]
    pub network_cidr: Option<String>,

    #[serde(
        rename = "serviceClusterIPRange",
        skip_serializing_if = "Option::is_none"
    )]
    pub service_cluster_ip_range: Option<String>,

    #[serde(rename = "clusterDNSDomain", skip_serializing_if = "Option::is_none")]
    pub cluster_dns_domain: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub networking: Option<NetworkingSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerConfig>,
}

/// Pod networking configuration. Exactly one variant should be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkingSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classic: Option<ClassicNetworkingSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubenet: Option<KubenetNetworkingSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vxlan: Option<VxlanNetworkingSpec>,
}

impl NetworkingSpec {
    pub fn classic() -> Self {
        Self {
            classic: Some(ClassicNetworkingSpec {}),
            ..Self::default()
        }
    }

    pub fn kubenet() -> Self {
        Self {
            kubenet: Some(KubenetNetworkingSpec::default()),
            ..Self::default()
        }
    }

    pub fn vxlan() -> Self {
        Self {
            vxlan: Some(VxlanNetworkingSpec::default()),
            ..Self::default()
        }
    }

    /// All modes that are set, in declaration order.
    pub fn modes(&self) -> Vec<NetworkingMode> {
        let mut modes = Vec::new();
        if self.classic.is_some() {
            modes.push(NetworkingMode::Classic);
        }
        if self.kubenet.is_some() {
            modes.push(NetworkingMode::Kubenet);
        }
        if self.vxlan.is_some() {
            modes.push(NetworkingMode::Vxlan);
        }
        modes
    }

    /// The configured mode when exactly one is set.
    pub fn mode(&self) -> Option<NetworkingMode> {
        match self.modes().as_slice() {
            [mode] => Some(*mode),
            _ => None,
        }
    }
}

/// Legacy networking with no options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicNetworkingSpec {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubenetNetworkingSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VxlanNetworkingSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NetworkingMode {
    Classic,
    Kubenet,
    Vxlan,
}

impl fmt::Display for NetworkingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Classic => "classic",
            Self::Kubenet => "kubenet",
            Self::Vxlan => "vxlan",
        };
        f.write_str(s)
    }
}

/// Container runtime settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DockerConfig {
    /// Storage driver, e.g. `overlay` or `devicemapper`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_driver: Option<String>,
}
