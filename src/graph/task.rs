//! Task definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::InstanceGroupRole;

/// Reference to another task by name, resolved when the graph is finalized.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskRef(String);

impl TaskRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One named unit of desired infrastructure state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    /// Builder that emitted the task.
    pub builder: String,
    pub spec: TaskSpec,
}

impl Task {
    pub fn new(name: impl Into<String>, builder: &str, spec: TaskSpec) -> Self {
        Self {
            name: name.into(),
            builder: builder.to_string(),
            spec,
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.spec.kind()
    }

    pub fn references(&self) -> Vec<&TaskRef> {
        self.spec.references()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TaskSpec {
    /// A file written relative to the cluster's asset root.
    ManagedFile { location: String, contents: String },

    #[serde(rename_all = "camelCase")]
    LaunchTemplate {
        image: String,
        machine_type: String,
        role: InstanceGroupRole,
        files: Vec<TaskRef>,
    },

    #[serde(rename_all = "camelCase")]
    AutoscalingGroup {
        launch_template: TaskRef,
        min_size: u32,
        max_size: u32,
        zones: Vec<String>,
    },
}

impl TaskSpec {
    pub const fn kind(&self) -> TaskKind {
        match self {
            Self::ManagedFile { .. } => TaskKind::ManagedFile,
            Self::LaunchTemplate { .. } => TaskKind::LaunchTemplate,
            Self::AutoscalingGroup { .. } => TaskKind::AutoscalingGroup,
        }
    }

    /// Tasks whose outputs this task consumes.
    pub fn references(&self) -> Vec<&TaskRef> {
        match self {
            Self::ManagedFile { .. } => Vec::new(),
            Self::LaunchTemplate { files, .. } => files.iter().collect(),
            Self::AutoscalingGroup {
                launch_template, ..
            } => vec![launch_template],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    ManagedFile,
    LaunchTemplate,
    AutoscalingGroup,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ManagedFile => "ManagedFile",
            Self::LaunchTemplate => "LaunchTemplate",
            Self::AutoscalingGroup => "AutoscalingGroup",
        };
        f.write_str(s)
    }
}
