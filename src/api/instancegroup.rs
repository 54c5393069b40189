//! Instance group resource.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ObjectMeta;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceGroup {
    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: InstanceGroupSpec,
}

impl InstanceGroup {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn is_master(&self) -> bool {
        self.spec.role == InstanceGroupRole::Master
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstanceGroupSpec {
    pub role: InstanceGroupRole,

    /// Machine image the nodes boot from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u32>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InstanceGroupRole {
    Master,
    #[default]
    Node,
}

impl fmt::Display for InstanceGroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Master => f.write_str("Master"),
            Self::Node => f.write_str("Node"),
        }
    }
}
