//! CLI configuration and argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::channel::DEFAULT_CHANNEL;
use crate::executor::DEFAULT_MAX_CONCURRENCY;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const COMMIT: &str = env!("BUILD_COMMIT");
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Channel-driven cluster upgrade and convergence tool.
///
/// Compares stored cluster specs against a published channel, applies the
/// recommended changes on confirmation, and converges generated assets.
#[derive(Parser, Debug, Clone)]
#[command(name = "kcup")]
#[command(about = "Channel-driven cluster upgrade and convergence tool")]
#[command(version = const_format::formatcp!(
    "{} (commit: {}, build date: {})",
    VERSION, COMMIT, BUILD_DATE
))]
pub struct Args {
    /// State store directory holding cluster configuration
    #[arg(long, global = true, env = "KCUP_STATE_STORE")]
    pub state: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn", env = "KCUP_LOG_LEVEL")]
    pub log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text", env = "KCUP_LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Upgrade a cluster to the versions recommended by a channel
    Upgrade {
        #[command(subcommand)]
        resource: UpgradeResource,
    },

    /// Converge generated assets with the stored cluster spec
    Update {
        #[command(subcommand)]
        resource: UpdateResource,
    },

    /// Create cluster and instance group records from a file
    #[command(after_help = r"Examples:
  kcup create -f cluster.yaml   Create records defined in cluster.yaml")]
    Create {
        /// YAML file with Cluster and InstanceGroup documents
        #[arg(short, long, value_name = "FILE")]
        filename: PathBuf,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum UpgradeResource {
    /// Plan and apply channel recommendations for a cluster
    #[command(after_help = r"Examples:
  kcup upgrade cluster demo.example.com         Show the upgrade plan
  kcup upgrade cluster demo.example.com --yes   Apply the upgrade plan")]
    Cluster {
        /// Cluster name
        #[arg(value_name = "NAME")]
        name: String,

        /// Channel location (URL or local path)
        #[arg(long, default_value = DEFAULT_CHANNEL, env = "KCUP_CHANNEL")]
        channel: String,

        /// Apply the upgrade without asking
        #[arg(short, long, default_value = "false")]
        yes: bool,

        /// Ask for confirmation instead of requiring --yes
        #[arg(short, long, default_value = "false")]
        interactive: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum UpdateResource {
    /// Preview or apply changes to a cluster's generated assets
    #[command(after_help = r"Examples:
  kcup update cluster demo.example.com         Preview changes (dry run)
  kcup update cluster demo.example.com --yes   Apply changes")]
    Cluster {
        /// Cluster name
        #[arg(value_name = "NAME")]
        name: String,

        /// Apply changes; without this flag only a preview is shown
        #[arg(short, long, default_value = "false")]
        yes: bool,

        /// Maximum number of tasks applied concurrently
        #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
        max_concurrency: usize,

        /// Retries for transient provider errors
        #[arg(long, default_value_t = 3)]
        retry_attempts: u32,

        /// Report format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },
}

/// Application configuration derived from CLI args.
#[derive(Debug, Clone)]
pub struct Config {
    pub state: Option<PathBuf>,
    pub log_level: String,
    pub log_format: LogFormat,
    pub command: Command,
}

impl Config {
    /// Create config from CLI arguments.
    pub fn from_args(args: Args) -> Self {
        Self {
            state: args.state,
            log_level: args.log_level,
            log_format: args.log_format,
            command: args.command,
        }
    }

    /// The state store directory, which every command needs.
    pub fn state_store(&self) -> anyhow::Result<&PathBuf> {
        self.state
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("--state or KCUP_STATE_STORE is required"))
    }
}
