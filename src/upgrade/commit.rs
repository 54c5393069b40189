//! Applying a confirmed plan and persisting the result.

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::plan::UpgradePlan;
use crate::api::populate::{populate_cluster_spec, populate_instance_group};
use crate::api::validation::validate_cluster;
use crate::api::{Cluster, InstanceGroup};
use crate::builders::build_task_graph;
use crate::cloud::build_cloud;
use crate::registry::StateStore;

/// Records as persisted by a successful commit.
#[derive(Debug, Clone)]
pub struct CommittedUpgrade {
    pub cluster: Cluster,
    pub groups: Vec<InstanceGroup>,
    pub completed: Cluster,
    /// Number of tasks the updated spec compiles to.
    pub tasks: usize,
}

/// Apply `plan` and persist the updated records.
///
/// Order: apply actions in memory, populate, validate, build the task graph,
/// then write the cluster, each instance group, and finally the completed
/// config. Nothing is written if any step before the first write fails.
pub fn commit_upgrade(
    store: &dyn StateStore,
    mut cluster: Cluster,
    mut groups: Vec<InstanceGroup>,
    plan: UpgradePlan,
) -> Result<CommittedUpgrade> {
    for action in plan.actions {
        debug!(
            "Applying {} {}: {:?} -> {:?} ({})",
            action.item,
            action.property,
            action.old,
            action.new,
            action.command.target_path()
        );
        action.command.apply(&mut cluster, &mut groups)?;
    }

    let completed = populate_cluster_spec(&cluster, store);
    let cloud = build_cloud(&completed)?;
    let full_groups: Vec<InstanceGroup> = groups
        .iter()
        .map(|g| populate_instance_group(g, cloud.as_ref()))
        .collect();

    validate_cluster(&completed, &full_groups, true)?;

    let tasks = build_task_graph(&completed, &full_groups)?.finalize()?.len();
    debug!("Updated spec compiles to {} tasks", tasks);

    store
        .update_cluster(&cluster)
        .context("error writing updated cluster configuration")?;

    for group in &groups {
        store
            .update_instance_group(cluster.name(), group)
            .with_context(|| format!("error writing InstanceGroup {:?} to registry", group.name()))?;
    }

    store
        .write_completed_config(&completed)
        .context("error writing completed cluster spec")?;

    info!("Committed upgrade of {}", cluster.name());
    Ok(CommittedUpgrade {
        cluster,
        groups,
        completed,
        tasks,
    })
}
