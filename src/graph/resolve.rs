//! Reference resolution and topological ordering.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::Direction::{self, Incoming, Outgoing};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use super::Task;
use crate::error::KcupError;

/// A graph whose references all resolve and whose edges form a DAG.
#[derive(Debug)]
pub struct ResolvedGraph {
    tasks: BTreeMap<String, Task>,
    dependencies: BTreeMap<String, BTreeSet<String>>,
    dependents: BTreeMap<String, BTreeSet<String>>,
    order: Vec<String>,
}

impl ResolvedGraph {
    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    /// Task names in execution order. Every task appears after all of its
    /// dependencies; ties are broken by name.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn dependencies_of(&self, name: &str) -> impl Iterator<Item = &String> {
        self.dependencies.get(name).into_iter().flatten()
    }

    pub fn dependents_of(&self, name: &str) -> impl Iterator<Item = &String> {
        self.dependents.get(name).into_iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

pub(super) fn resolve(tasks: BTreeMap<String, Task>) -> Result<ResolvedGraph, KcupError> {
    let (order, dependencies, dependents) = {
        // Edges point from a dependency to its dependent.
        let mut graph: DiGraphMap<&str, ()> =
            DiGraphMap::with_capacity(tasks.len(), tasks.len());
        for name in tasks.keys() {
            graph.add_node(name.as_str());
        }
        for (name, task) in &tasks {
            for reference in task.references() {
                if !graph.contains_node(reference.name()) {
                    return Err(KcupError::UnresolvedReference {
                        task: name.clone(),
                        reference: reference.name().to_string(),
                    });
                }
                graph.add_edge(reference.name(), name.as_str(), ());
            }
        }

        let order = topological_order(&graph);
        if order.len() < graph.node_count() {
            return Err(KcupError::DependencyCycle(cycle_members(&graph)));
        }
        (
            order,
            adjacency(&graph, Incoming),
            adjacency(&graph, Outgoing),
        )
    };

    debug!("Resolved task graph: {} tasks", order.len());
    Ok(ResolvedGraph {
        tasks,
        dependencies,
        dependents,
        order,
    })
}

fn adjacency(
    graph: &DiGraphMap<&str, ()>,
    direction: Direction,
) -> BTreeMap<String, BTreeSet<String>> {
    graph
        .nodes()
        .map(|name| {
            let neighbors = graph
                .neighbors_directed(name, direction)
                .map(str::to_string)
                .collect();
            (name.to_string(), neighbors)
        })
        .collect()
}

/// Kahn's algorithm, always taking the smallest ready name first. Tasks on
/// or behind a cycle are left out of the result.
fn topological_order(graph: &DiGraphMap<&str, ()>) -> Vec<String> {
    let mut in_degree: BTreeMap<&str, usize> = graph
        .nodes()
        .map(|name| (name, graph.neighbors_directed(name, Incoming).count()))
        .collect();
    let mut ready: BTreeSet<&str> = in_degree
        .iter()
        .filter(|&(_, &degree)| degree == 0)
        .map(|(&name, _)| name)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(name) = ready.pop_first() {
        order.push(name.to_string());
        for dependent in graph.neighbors_directed(name, Outgoing) {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }
    order
}

/// Tasks that lie on a cycle: members of strongly connected components with
/// more than one task, plus tasks referencing themselves. Tasks merely
/// downstream of a cycle are excluded.
fn cycle_members(graph: &DiGraphMap<&str, ()>) -> Vec<String> {
    let mut members: Vec<String> = tarjan_scc(graph)
        .into_iter()
        .filter(|component| match component.as_slice() {
            [single] => graph.contains_edge(*single, *single),
            _ => true,
        })
        .flatten()
        .map(str::to_string)
        .collect();
    members.sort();
    members
}
