//! Execution report.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::graph::TaskKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskStatus {
    Unchanged,
    Created,
    Updated,
    WouldCreate,
    WouldUpdate,
    Failed,
    NotStarted,
}

impl TaskStatus {
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unchanged => "Unchanged",
            Self::Created => "Created",
            Self::Updated => "Updated",
            Self::WouldCreate => "WouldCreate",
            Self::WouldUpdate => "WouldUpdate",
            Self::Failed => "Failed",
            Self::NotStarted => "NotStarted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    pub name: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    /// Properties that differed from the live resource.
    pub changes: Vec<String>,
    pub error: Option<String>,
    /// Apply attempts made, including retries.
    pub attempts: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One entry per task, in graph order.
    pub tasks: Vec<TaskReport>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        !self.tasks.iter().any(|t| t.status.is_failure())
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }

    pub fn task(&self, name: &str) -> Option<&TaskReport> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Returns true if nothing would change or did change.
    pub fn is_converged(&self) -> bool {
        self.tasks.iter().all(|t| t.status == TaskStatus::Unchanged)
    }

    pub fn summary(&self) -> String {
        if self.dry_run {
            format!(
                "{} to create, {} to update, {} unchanged",
                self.count(TaskStatus::WouldCreate),
                self.count(TaskStatus::WouldUpdate),
                self.count(TaskStatus::Unchanged)
            )
        } else {
            format!(
                "{} created, {} updated, {} unchanged, {} failed, {} not started",
                self.count(TaskStatus::Created),
                self.count(TaskStatus::Updated),
                self.count(TaskStatus::Unchanged),
                self.count(TaskStatus::Failed),
                self.count(TaskStatus::NotStarted)
            )
        }
    }
}
