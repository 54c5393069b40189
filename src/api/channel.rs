//! Channel documents published for clusters to track.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ClusterSpec, ObjectMeta};

pub const CHANNEL_KIND: &str = "Channel";

/// Image label naming the cloud provider an image is built for.
pub const LABEL_CLOUD_PROVIDER: &str = "k8s.io/cloudprovider";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: ChannelSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSpec {
    /// Recommended cluster settings. Missing means "no recommendation".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterSpec>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ChannelImageSpec>,

    /// Opaque per-provider documents, keyed by provider id.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelImageSpec {
    pub name: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl Channel {
    /// Recommended cluster settings, treating a missing block as empty.
    pub fn cluster_spec(&self) -> ClusterSpec {
        self.spec.cluster.clone().unwrap_or_default()
    }

    /// Images labelled for `provider`, in document order.
    pub fn images_for_provider(&self, provider: &str) -> Vec<&ChannelImageSpec> {
        self.spec
            .images
            .iter()
            .filter(|image| {
                image
                    .labels
                    .get(LABEL_CLOUD_PROVIDER)
                    .is_some_and(|p| p == provider)
            })
            .collect()
    }
}
