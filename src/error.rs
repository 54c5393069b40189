//! Custom error types for kcup.

use thiserror::Error;

/// Errors that can occur while planning, building or converging a cluster.
#[derive(Error, Debug)]
pub enum KcupError {
    #[error("error fetching channel {location:?}: {reason}")]
    ChannelFetch { location: String, reason: String },

    #[error("error parsing channel {location:?}: {reason}")]
    ChannelParse { location: String, reason: String },

    #[error(
        "cluster {0:?} is imported; upgrade is not for use with imported clusters (did you mean `kcup toolbox convert-imported`?)"
    )]
    UnsupportedCluster(String),

    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),

    #[error("InstanceGroup {group:?} not found in cluster {cluster:?}")]
    InstanceGroupNotFound { cluster: String, group: String },

    #[error("Unsupported cloud provider: {0:?}")]
    UnsupportedCloud(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("task {task:?} emitted by builder {incoming:?} already registered by {existing:?}")]
    BuilderConflict {
        task: String,
        existing: String,
        incoming: String,
    },

    #[error("dependency cycle between tasks: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),

    #[error("task {task:?} references unknown task {reference:?}")]
    UnresolvedReference { task: String, reference: String },

    #[error("error {operation}: {reason}")]
    Persistence { operation: String, reason: String },

    #[error("[{task}] conflicting live resource: {reason}")]
    Conflict { task: String, reason: String },

    #[error("[{task}] provider error: {reason}")]
    Provider {
        task: String,
        reason: String,
        transient: bool,
    },
}

impl KcupError {
    /// Wrap an I/O or encoding failure raised while persisting state.
    pub fn persistence<E: std::fmt::Display>(operation: impl Into<String>, err: E) -> Self {
        Self::Persistence {
            operation: operation.into(),
            reason: err.to_string(),
        }
    }

    /// Create a provider error, classifying it as transient from its message.
    pub fn provider<E: std::fmt::Display>(task: &str, err: E) -> Self {
        let reason = err.to_string();
        let lower = reason.to_lowercase();
        let transient = lower.contains("timed out")
            || lower.contains("timeout")
            || lower.contains("temporarily unavailable")
            || lower.contains("throttl")
            || lower.contains("resource busy")
            || lower.contains("interrupted");

        Self::Provider {
            task: task.to_string(),
            reason,
            transient,
        }
    }

    /// Whether the failed operation may succeed if retried.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Provider {
                transient: true,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_cluster_not_found() {
        let err = KcupError::ClusterNotFound("demo.example.com".to_string());
        assert_eq!(err.to_string(), "Cluster not found: demo.example.com");
    }

    #[test]
    fn test_error_display_unsupported_cluster_guides_operator() {
        let err = KcupError::UnsupportedCluster("legacy".to_string());
        assert!(err.to_string().contains("kcup toolbox convert-imported"));
    }

    #[test]
    fn test_error_display_validation_joins_problems() {
        let err = KcupError::Validation(vec![
            "spec.kubernetesVersion is required".to_string(),
            "no Master instance group".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: spec.kubernetesVersion is required; no Master instance group"
        );
    }

    #[test]
    fn test_error_display_cycle_lists_tasks() {
        let err = KcupError::DependencyCycle(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "dependency cycle between tasks: a, b");
    }

    #[test]
    fn test_provider_helper_classifies_transient() {
        let err = KcupError::provider("nodes.demo", "request timed out");
        assert!(err.is_transient());
        assert!(err.to_string().contains("[nodes.demo]"));
    }

    #[test]
    fn test_provider_helper_permanent() {
        let err = KcupError::provider("nodes.demo", "permission denied");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_non_provider_errors_are_not_transient() {
        let err = KcupError::persistence("writing cluster", "disk full");
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "error writing cluster: disk full");
    }
}
