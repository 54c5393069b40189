//! Rendered resources and change detection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::KcupError;
use crate::graph::{Task, TaskKind, TaskSpec};

/// Comparable form of a task's desired or observed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: TaskKind,
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl Resource {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Digest over every property, used by dependents to pick up changes.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (key, value) in &self.properties {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

/// Outcome of comparing desired and observed state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    None,
    Create,
    /// Names of the properties that differ.
    Update(Vec<String>),
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Properties that cannot be changed in place.
pub const fn immutable_properties(kind: TaskKind) -> &'static [&'static str] {
    match kind {
        TaskKind::ManagedFile => &["location"],
        TaskKind::LaunchTemplate => &["role"],
        TaskKind::AutoscalingGroup => &[],
    }
}

/// Render `task` into its desired resource, given the outputs of the tasks
/// it references.
pub fn render(task: &Task, outputs: &BTreeMap<String, Resource>) -> Result<Resource, KcupError> {
    let dependency = |name: &str| {
        outputs.get(name).ok_or_else(|| KcupError::UnresolvedReference {
            task: task.name.clone(),
            reference: name.to_string(),
        })
    };

    let mut properties = BTreeMap::new();
    match &task.spec {
        TaskSpec::ManagedFile { location, contents } => {
            properties.insert("location".to_string(), location.clone());
            properties.insert("sha256".to_string(), sha256_hex(contents.as_bytes()));
        }
        TaskSpec::LaunchTemplate {
            image,
            machine_type,
            role,
            files,
        } => {
            properties.insert("image".to_string(), image.clone());
            properties.insert("machineType".to_string(), machine_type.clone());
            properties.insert("role".to_string(), role.to_string());
            for file in files {
                let output = dependency(file.name())?;
                let location = output.property("location").unwrap_or_default();
                let sha = output.property("sha256").unwrap_or_default();
                properties.insert(format!("file/{}", file.name()), format!("{location}@{sha}"));
            }
        }
        TaskSpec::AutoscalingGroup {
            launch_template,
            min_size,
            max_size,
            zones,
        } => {
            let output = dependency(launch_template.name())?;
            properties.insert("launchTemplate".to_string(), launch_template.to_string());
            properties.insert("launchTemplateFingerprint".to_string(), output.fingerprint());
            properties.insert("minSize".to_string(), min_size.to_string());
            properties.insert("maxSize".to_string(), max_size.to_string());
            properties.insert("zones".to_string(), zones.join(","));
        }
    }

    Ok(Resource {
        kind: task.kind(),
        name: task.name.clone(),
        properties,
    })
}

/// Compare desired state with what the target reports.
pub fn diff(desired: &Resource, observed: Option<&Resource>) -> Result<Change, KcupError> {
    let Some(observed) = observed else {
        return Ok(Change::Create);
    };

    if observed.kind != desired.kind {
        return Err(KcupError::Conflict {
            task: desired.name.clone(),
            reason: format!("existing resource is a {}, not a {}", observed.kind, desired.kind),
        });
    }

    for key in immutable_properties(desired.kind) {
        let want = desired.property(key);
        let have = observed.property(key);
        if want != have {
            return Err(KcupError::Conflict {
                task: desired.name.clone(),
                reason: format!(
                    "{key} cannot change from {:?} to {:?}",
                    have.unwrap_or_default(),
                    want.unwrap_or_default()
                ),
            });
        }
    }

    let mut changed: Vec<String> = desired
        .properties
        .iter()
        .filter(|(key, value)| observed.properties.get(*key) != Some(*value))
        .map(|(key, _)| key.clone())
        .collect();
    changed.extend(
        observed
            .properties
            .keys()
            .filter(|key| !desired.properties.contains_key(*key))
            .cloned(),
    );
    changed.sort();

    if changed.is_empty() {
        Ok(Change::None)
    } else {
        Ok(Change::Update(changed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InstanceGroupRole;
    use crate::graph::TaskRef;

    fn file_task(contents: &str) -> Task {
        Task::new(
            "nodeup",
            "test",
            TaskSpec::ManagedFile {
                location: "igconfig/node/nodes/nodeup.yaml".to_string(),
                contents: contents.to_string(),
            },
        )
    }

    fn template_task() -> Task {
        Task::new(
            "nodes-template",
            "test",
            TaskSpec::LaunchTemplate {
                image: "ami-1".to_string(),
                machine_type: "t2.medium".to_string(),
                role: InstanceGroupRole::Node,
                files: vec![TaskRef::new("nodeup")],
            },
        )
    }

    #[test]
    fn test_render_managed_file() {
        let resource = render(&file_task("hello"), &BTreeMap::new()).unwrap();
        assert_eq!(resource.kind, TaskKind::ManagedFile);
        assert_eq!(
            resource.property("sha256"),
            Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
        );
    }

    #[test]
    fn test_template_tracks_file_contents() {
        let mut outputs = BTreeMap::new();
        outputs.insert(
            "nodeup".to_string(),
            render(&file_task("v1"), &BTreeMap::new()).unwrap(),
        );
        let first = render(&template_task(), &outputs).unwrap();

        outputs.insert(
            "nodeup".to_string(),
            render(&file_task("v2"), &BTreeMap::new()).unwrap(),
        );
        let second = render(&template_task(), &outputs).unwrap();

        assert_ne!(first.fingerprint(), second.fingerprint());
        assert_eq!(
            diff(&second, Some(&first)).unwrap(),
            Change::Update(vec!["file/nodeup".to_string()])
        );
    }

    #[test]
    fn test_render_missing_dependency_output() {
        let err = render(&template_task(), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, KcupError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_diff_create_and_none() {
        let desired = render(&file_task("x"), &BTreeMap::new()).unwrap();
        assert_eq!(diff(&desired, None).unwrap(), Change::Create);
        assert_eq!(diff(&desired, Some(&desired)).unwrap(), Change::None);
    }

    #[test]
    fn test_diff_immutable_property_conflicts() {
        let desired = render(&file_task("x"), &BTreeMap::new()).unwrap();
        let mut observed = desired.clone();
        observed
            .properties
            .insert("location".to_string(), "elsewhere.yaml".to_string());
        let err = diff(&desired, Some(&observed)).unwrap_err();
        assert!(matches!(err, KcupError::Conflict { .. }));
        assert!(err.to_string().contains("location cannot change"));
    }

    #[test]
    fn test_diff_kind_mismatch_conflicts() {
        let desired = render(&file_task("x"), &BTreeMap::new()).unwrap();
        let mut observed = desired.clone();
        observed.kind = TaskKind::AutoscalingGroup;
        assert!(matches!(
            diff(&desired, Some(&observed)),
            Err(KcupError::Conflict { .. })
        ));
    }

    #[test]
    fn test_diff_reports_removed_properties() {
        let desired = render(&file_task("x"), &BTreeMap::new()).unwrap();
        let mut observed = desired.clone();
        observed
            .properties
            .insert("legacy".to_string(), "1".to_string());
        assert_eq!(
            diff(&desired, Some(&observed)).unwrap(),
            Change::Update(vec!["legacy".to_string()])
        );
    }
}
