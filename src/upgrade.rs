//! Channel-driven upgrades.
//!
//! Planning is pure: [`plan_upgrade`] diffs the stored spec against a channel
//! and returns reviewable actions. Nothing changes until the caller passes a
//! confirmed plan to [`commit_upgrade`].

pub mod action;
pub mod commit;
pub mod plan;

pub use action::{UpgradeAction, UpgradeCommand};
pub use commit::{CommittedUpgrade, commit_upgrade};
pub use plan::{UpgradePlan, ensure_upgradable, plan_upgrade};
