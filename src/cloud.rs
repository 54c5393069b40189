//! Cloud provider identity.
//!
//! Only the pieces of a provider the planner and builders need are modelled:
//! its id (used to pick channel images) and sizing defaults for instance
//! groups. Provider SDK calls live behind the executor's `Target`.

use std::fmt;
use std::str::FromStr;

use crate::api::{Cluster, InstanceGroupRole};
use crate::error::KcupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudProviderId {
    Aws,
    Gce,
}

impl CloudProviderId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Gce => "gce",
        }
    }
}

impl fmt::Display for CloudProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudProviderId {
    type Err = KcupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aws" => Ok(Self::Aws),
            "gce" => Ok(Self::Gce),
            other => Err(KcupError::UnsupportedCloud(other.to_string())),
        }
    }
}

pub trait Cloud: Send + Sync {
    fn provider_id(&self) -> CloudProviderId;

    /// Machine type used when an instance group does not name one.
    fn default_machine_type(&self, role: InstanceGroupRole) -> &'static str;
}

#[derive(Debug, Default)]
pub struct AwsCloud;

impl Cloud for AwsCloud {
    fn provider_id(&self) -> CloudProviderId {
        CloudProviderId::Aws
    }

    fn default_machine_type(&self, role: InstanceGroupRole) -> &'static str {
        match role {
            InstanceGroupRole::Master => "m3.medium",
            InstanceGroupRole::Node => "t2.medium",
        }
    }
}

#[derive(Debug, Default)]
pub struct GceCloud;

impl Cloud for GceCloud {
    fn provider_id(&self) -> CloudProviderId {
        CloudProviderId::Gce
    }

    fn default_machine_type(&self, _role: InstanceGroupRole) -> &'static str {
        "n1-standard-1"
    }
}

/// Build the cloud abstraction for the provider named in the cluster spec.
pub fn build_cloud(cluster: &Cluster) -> Result<Box<dyn Cloud>, KcupError> {
    let provider = cluster
        .spec
        .cloud_provider
        .as_deref()
        .ok_or_else(|| KcupError::UnsupportedCloud(String::new()))?;

    match provider.parse::<CloudProviderId>()? {
        CloudProviderId::Aws => Ok(Box::new(AwsCloud)),
        CloudProviderId::Gce => Ok(Box::new(GceCloud)),
    }
}
