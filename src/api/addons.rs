//! Addon manifest consumed by the in-cluster channel controller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ObjectMeta;

pub const ADDONS_KIND: &str = "Addons";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonsManifest {
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: AddonsSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonsSpec {
    pub addons: Vec<AddonSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonSpec {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Labels identifying the objects this addon owns.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selector: BTreeMap<String, String>,

    /// Manifest path relative to the addons directory, or an absolute URL.
    pub manifest: String,
}

impl AddonsManifest {
    pub fn new(name: &str, addons: Vec<AddonSpec>) -> Self {
        Self {
            kind: ADDONS_KIND.to_string(),
            metadata: ObjectMeta::named(name),
            spec: AddonsSpec { addons },
        }
    }
}
