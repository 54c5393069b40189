//! Cluster, instance group, channel and addon resource types.
//!
//! These are the documents kept in the state store and published in
//! channels. All of them are plain serde structs so they round-trip through
//! YAML without custom code.

pub mod addons;
pub mod channel;
pub mod cluster;
pub mod instancegroup;
pub mod populate;
pub mod validation;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use channel::{Channel, ChannelImageSpec, ChannelSpec};
pub use cluster::{
    ClassicNetworkingSpec, Cluster, ClusterSpec, DockerConfig, KubenetNetworkingSpec,
    NetworkingMode, NetworkingSpec, VxlanNetworkingSpec,
};
pub use instancegroup::{InstanceGroup, InstanceGroupRole, InstanceGroupSpec};

/// Metadata shared by every stored resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: BTreeMap::new(),
        }
    }
}

/// One document of a multi-document resource file, dispatched on `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Document {
    Cluster(Cluster),
    InstanceGroup(InstanceGroup),
}

/// Parse a YAML stream of `Cluster` and `InstanceGroup` documents.
///
/// Empty documents (e.g. a trailing `---`) are skipped.
pub fn parse_documents(input: &str) -> Result<Vec<Document>, serde_yaml::Error> {
    let mut documents = Vec::new();
    for de in serde_yaml::Deserializer::from_str(input) {
        let value = serde_yaml::Value::deserialize(de)?;
        if value.is_null() {
            continue;
        }
        documents.push(serde_yaml::from_value(value)?);
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_documents_mixed_kinds() {
        let input = r"
kind: Cluster
metadata:
  name: demo.example.com
spec:
  cloudProvider: aws
  kubernetesVersion: 1.4.0
---
kind: InstanceGroup
metadata:
  name: nodes
spec:
  role: Node
  image: ami-123
---
";
        let docs = parse_documents(input).unwrap();
        assert_eq!(docs.len(), 2);
        match &docs[0] {
            Document::Cluster(c) => {
                assert_eq!(c.metadata.name, "demo.example.com");
                assert_eq!(c.spec.kubernetes_version.as_deref(), Some("1.4.0"));
            }
            other => panic!("expected Cluster, got {other:?}"),
        }
        assert!(matches!(&docs[1], Document::InstanceGroup(ig) if ig.metadata.name == "nodes"));
    }

    #[test]
    fn test_parse_documents_unknown_kind() {
        let input = "kind: Secret\nmetadata:\n  name: x\n";
        assert!(parse_documents(input).is_err());
    }

    #[test]
    fn test_object_meta_omits_empty_annotations() {
        let yaml = serde_yaml::to_string(&ObjectMeta::named("demo")).unwrap();
        assert_eq!(yaml, "name: demo\n");
    }
}
