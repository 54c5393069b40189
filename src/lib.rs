//! kcup - channel-driven cluster upgrade planner and convergence engine.
//!
//! - Loads published channels and diffs them against stored cluster specs
//! - Applies confirmed upgrade actions and persists the completed config
//! - Compiles cluster specs into a dependency-ordered task graph
//! - Converges tasks against a target with bounded concurrency

pub mod api;
pub mod builders;
pub mod channel;
pub mod cloud;
pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod output;
pub mod registry;
pub mod upgrade;
