//! Task executor.
//!
//! Walks a [`ResolvedGraph`] in dependency order and converges each task
//! against a [`Target`]. Independent ready tasks run concurrently on a
//! [`JoinSet`], bounded by a semaphore. A dependent is only scheduled once
//! every task it references has completed successfully.
//!
//! The first fatal failure stops new scheduling. Tasks already running are
//! allowed to finish and everything left over is reported as not started.

pub mod report;
pub mod resource;
pub mod target;

use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::KcupError;
use crate::graph::{ResolvedGraph, Task};

pub use report::{ExecutionReport, TaskReport, TaskStatus};
pub use resource::{Change, Resource};
pub use target::{LocalTarget, Target};

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Execution settings.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum number of tasks applied at the same time.
    pub max_concurrency: usize,
    /// Compare only; never call `Target::apply`.
    pub dry_run: bool,
    /// Extra attempts for transient provider errors.
    pub retry_attempts: u32,
    /// Base delay between attempts, multiplied by the attempt number.
    pub retry_delay: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            dry_run: false,
            retry_attempts: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

pub struct Executor {
    target: Arc<dyn Target>,
    config: ExecutorConfig,
}

/// Result of converging a single task.
struct Converged {
    status: TaskStatus,
    changes: Vec<String>,
    output: Resource,
    attempts: u32,
}

struct Failed {
    error: String,
    attempts: u32,
}

impl Executor {
    pub fn new(target: Arc<dyn Target>, config: ExecutorConfig) -> Self {
        Self { target, config }
    }

    pub async fn run(&self, graph: &ResolvedGraph) -> ExecutionReport {
        let started_at = Utc::now();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));

        let mut waiting: BTreeMap<&str, usize> = graph
            .order()
            .iter()
            .map(|name| (name.as_str(), graph.dependencies_of(name).count()))
            .collect();
        let mut ready: BTreeSet<&str> = waiting
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&name, _)| name)
            .collect();

        let mut outputs: BTreeMap<String, Resource> = BTreeMap::new();
        let mut reports: BTreeMap<String, TaskReport> = BTreeMap::new();
        let mut running = JoinSet::new();
        let mut halted = false;

        loop {
            while !halted && !ready.is_empty() {
                let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() else {
                    break;
                };
                let Some(name) = ready.pop_first() else {
                    break;
                };
                let Some(task) = graph.task(name) else {
                    continue;
                };

                let desired = match resource::render(task, &outputs) {
                    Ok(desired) => desired,
                    Err(e) => {
                        error!("[{}] {}", name, e);
                        reports.insert(name.to_string(), failed_report(task, e.to_string(), 0));
                        halted = true;
                        break;
                    }
                };

                debug!("Starting {} {}", task.kind(), task.name);
                let future = converge(
                    Arc::clone(&self.target),
                    task.clone(),
                    desired,
                    self.config.clone(),
                );
                let task_name = name.to_string();
                running.spawn(async move {
                    let result = AssertUnwindSafe(future).catch_unwind().await;
                    drop(permit);
                    (task_name, result)
                });
            }

            let Some(joined) = running.join_next().await else {
                break;
            };
            let (name, result) = match joined {
                Ok(joined) => joined,
                Err(e) => {
                    error!("Task join failed: {}", e);
                    halted = true;
                    continue;
                }
            };
            let Some(task) = graph.task(&name) else {
                continue;
            };

            match result {
                Ok(Ok(converged)) => {
                    info!(
                        "{} {}: {}",
                        task.kind(),
                        task.name,
                        converged.status
                    );
                    reports.insert(
                        name.clone(),
                        TaskReport {
                            name: name.clone(),
                            kind: task.kind(),
                            status: converged.status,
                            changes: converged.changes,
                            error: None,
                            attempts: converged.attempts,
                        },
                    );
                    outputs.insert(name.clone(), converged.output);

                    for dependent in graph.dependents_of(&name) {
                        if let Some(count) = waiting.get_mut(dependent.as_str()) {
                            *count -= 1;
                            if *count == 0 {
                                ready.insert(dependent.as_str());
                            }
                        }
                    }
                }
                Ok(Err(failed)) => {
                    error!("[{}] {}", name, failed.error);
                    reports.insert(name, failed_report(task, failed.error, failed.attempts));
                    halted = true;
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!("[{}] task panicked: {}", name, message);
                    reports.insert(
                        name,
                        failed_report(task, format!("task panicked: {message}"), 1),
                    );
                    halted = true;
                }
            }
        }

        let tasks = graph
            .order()
            .iter()
            .filter_map(|name| {
                reports.remove(name).or_else(|| {
                    graph.task(name).map(|task| TaskReport {
                        name: name.clone(),
                        kind: task.kind(),
                        status: TaskStatus::NotStarted,
                        changes: Vec::new(),
                        error: None,
                        attempts: 0,
                    })
                })
            })
            .collect();

        ExecutionReport {
            dry_run: self.config.dry_run,
            started_at,
            finished_at: Utc::now(),
            tasks,
        }
    }
}

/// Compare one task with the live state and apply it when needed.
async fn converge(
    target: Arc<dyn Target>,
    task: Task,
    desired: Resource,
    config: ExecutorConfig,
) -> Result<Converged, Failed> {
    let fail = |e: KcupError, attempts| Failed {
        error: e.to_string(),
        attempts,
    };

    let observed = target.find(&desired).await.map_err(|e| fail(e, 0))?;
    let change = resource::diff(&desired, observed.as_ref()).map_err(|e| fail(e, 0))?;

    let (status, changes) = match (&change, config.dry_run) {
        (Change::None, _) => {
            let output = observed.unwrap_or_else(|| desired.clone());
            return Ok(Converged {
                status: TaskStatus::Unchanged,
                changes: Vec::new(),
                output,
                attempts: 0,
            });
        }
        (Change::Create, true) => (TaskStatus::WouldCreate, Vec::new()),
        (Change::Update(keys), true) => (TaskStatus::WouldUpdate, keys.clone()),
        (Change::Create, false) => (TaskStatus::Created, Vec::new()),
        (Change::Update(keys), false) => (TaskStatus::Updated, keys.clone()),
    };

    if config.dry_run {
        return Ok(Converged {
            status,
            changes,
            output: desired,
            attempts: 0,
        });
    }

    let mut attempt = 0;
    loop {
        attempt += 1;
        match target.apply(&task, &desired, observed.as_ref()).await {
            Ok(output) => {
                return Ok(Converged {
                    status,
                    changes,
                    output,
                    attempts: attempt,
                });
            }
            Err(e) if e.is_transient() && attempt <= config.retry_attempts => {
                let delay = config.retry_delay * attempt;
                warn!(
                    "[{}] transient error (attempt {}/{}), retrying in {:?}: {}",
                    task.name,
                    attempt,
                    config.retry_attempts + 1,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(fail(e, attempt)),
        }
    }
}

fn failed_report(task: &Task, error: String, attempts: u32) -> TaskReport {
    TaskReport {
        name: task.name.clone(),
        kind: task.kind(),
        status: TaskStatus::Failed,
        changes: Vec::new(),
        error: Some(error),
        attempts,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
