//! Task builders.
//!
//! Each builder owns one infrastructure concern and reads only the frozen,
//! fully populated cluster spec. Builders run in the fixed order returned by
//! [`default_builders`].

pub mod bootstrap_channel;
pub mod instance_groups;
pub mod networking;

use tracing::debug;

use crate::api::{Cluster, InstanceGroup};
use crate::error::KcupError;
use crate::graph::TaskGraph;

pub use bootstrap_channel::BootstrapChannelBuilder;
pub use instance_groups::InstanceGroupBuilder;
pub use networking::NetworkingBuilder;

pub trait TaskBuilder {
    fn name(&self) -> &'static str;

    fn build_tasks(&self, graph: &mut TaskGraph) -> Result<(), KcupError>;
}

/// Builders in registration order.
pub fn default_builders<'a>(
    cluster: &'a Cluster,
    groups: &'a [InstanceGroup],
) -> Vec<Box<dyn TaskBuilder + 'a>> {
    vec![
        Box::new(BootstrapChannelBuilder::new(cluster)),
        Box::new(NetworkingBuilder::new(cluster)),
        Box::new(InstanceGroupBuilder::new(cluster, groups)),
    ]
}

/// Run every default builder against the completed cluster spec.
pub fn build_task_graph(
    cluster: &Cluster,
    groups: &[InstanceGroup],
) -> Result<TaskGraph, KcupError> {
    let mut graph = TaskGraph::new();
    for builder in default_builders(cluster, groups) {
        let before = graph.len();
        builder.build_tasks(&mut graph)?;
        debug!(
            "Builder {} emitted {} tasks",
            builder.name(),
            graph.len() - before
        );
    }
    Ok(graph)
}
