//! Task graph.
//!
//! Builders register named tasks into a [`TaskGraph`]. Tasks refer to each
//! other by name only; [`TaskGraph::finalize`] resolves those references into
//! dependency edges and a deterministic execution order in a single pass.

pub mod resolve;
pub mod task;

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::KcupError;

pub use resolve::ResolvedGraph;
pub use task::{Task, TaskKind, TaskRef, TaskSpec};

#[derive(Debug, Default)]
pub struct TaskGraph {
    tasks: BTreeMap<String, Task>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task. Names are unique across all builders.
    pub fn add(&mut self, task: Task) -> Result<(), KcupError> {
        if let Some(existing) = self.tasks.get(&task.name) {
            return Err(KcupError::BuilderConflict {
                task: task.name,
                existing: existing.builder.clone(),
                incoming: task.builder,
            });
        }
        debug!("Registered {} task {} from {}", task.kind(), task.name, task.builder);
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Resolve references and compute the execution order.
    pub fn finalize(self) -> Result<ResolvedGraph, KcupError> {
        resolve::resolve(self.tasks)
    }
}
