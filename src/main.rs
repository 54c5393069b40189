//! kcup - channel-driven cluster upgrade and convergence tool.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use dialoguer::{Confirm, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use kcup::api::populate::{populate_cluster_spec, populate_instance_group};
use kcup::api::validation::validate_cluster;
use kcup::api::{Cluster, Document, InstanceGroup, parse_documents};
use kcup::builders::build_task_graph;
use kcup::channel::load_channel;
use kcup::cloud::build_cloud;
use kcup::config::{
    Args, Command, Config, LogFormat, OutputFormat, UpdateResource, UpgradeResource,
};
use kcup::error::KcupError;
use kcup::executor::{Executor, ExecutorConfig, LocalTarget};
use kcup::output::{print_execution_report, print_upgrade_plan};
use kcup::registry::{FsStateStore, StateStore};
use kcup::upgrade::{commit_upgrade, ensure_upgradable, plan_upgrade};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let config = Config::from_args(args);

    if let Err(e) = init_tracing(&config.log_level, config.log_format) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    debug!("Starting kcup");

    if let Err(e) = run(&config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing subscriber.
fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to initialize log filter: {e}"))?;

    match format {
        LogFormat::Json => fmt()
            .with_env_filter(filter)
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(std::io::stderr)
            .init(),
    }

    Ok(())
}

/// Main application logic.
async fn run(config: &Config) -> Result<()> {
    let store = FsStateStore::new(config.state_store()?);

    match &config.command {
        Command::Upgrade {
            resource:
                UpgradeResource::Cluster {
                    name,
                    channel,
                    yes,
                    interactive,
                },
        } => run_upgrade(&store, name, channel, *yes, *interactive).await,
        Command::Update {
            resource:
                UpdateResource::Cluster {
                    name,
                    yes,
                    max_concurrency,
                    retry_attempts,
                    output,
                },
        } => {
            let executor_config = ExecutorConfig {
                max_concurrency: *max_concurrency,
                dry_run: !yes,
                retry_attempts: *retry_attempts,
                ..ExecutorConfig::default()
            };
            run_update(&store, name, executor_config, *output).await
        }
        Command::Create { filename } => run_create(&store, filename),
    }
}

/// Plan a channel upgrade and apply it once confirmed.
async fn run_upgrade(
    store: &FsStateStore,
    name: &str,
    channel_location: &str,
    yes: bool,
    interactive: bool,
) -> Result<()> {
    let cluster = store.read_cluster(name)?;
    ensure_upgradable(&cluster)?;
    let groups = store.read_instance_groups(name)?;
    let cloud = build_cloud(&cluster)?;

    let channel = load_channel(channel_location).await?;
    let plan = plan_upgrade(&cluster, &groups, &channel, cloud.provider_id());

    if plan.is_empty() {
        eprintln!();
        eprintln!("No upgrade required");
        return Ok(());
    }

    print_upgrade_plan(&plan);

    if !yes {
        if !interactive {
            println!("{}", "Must specify --yes to apply".yellow());
            return Ok(());
        }
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Apply {} changes to {}?", plan.len(), name))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{}", "Upgrade cancelled. No changes were made.".yellow());
            return Ok(());
        }
    }

    let committed = commit_upgrade(store, cluster, groups, plan)?;
    info!(
        "Updated configuration of {} ({} tasks)",
        name, committed.tasks
    );

    println!("{}", "Updates applied to configuration.".green().bold());
    println!("You can now apply these changes, using `kcup update cluster {name} --yes`");
    Ok(())
}

/// Build the task graph for a cluster and converge it.
async fn run_update(
    store: &FsStateStore,
    name: &str,
    config: ExecutorConfig,
    output: OutputFormat,
) -> Result<()> {
    let cluster = store.read_cluster(name)?;
    let groups = store.read_instance_groups(name)?;
    let cloud = build_cloud(&cluster)?;

    let completed = populate_cluster_spec(&cluster, store);
    let groups: Vec<InstanceGroup> = groups
        .iter()
        .map(|g| populate_instance_group(g, cloud.as_ref()))
        .collect();
    validate_cluster(&completed, &groups, true)?;

    if let Some(stored) = store.read_completed_config(name)?
        && stored != completed
    {
        warn!("Stored completed config for {} is stale; using the re-derived spec", name);
    }

    let graph = build_task_graph(&completed, &groups)?.finalize()?;
    let asset_root = completed
        .spec
        .config_base
        .clone()
        .unwrap_or_else(|| store.config_base(name));
    debug!("Converging {} tasks under {}", graph.len(), asset_root);

    let dry_run = config.dry_run;
    let executor = Executor::new(Arc::new(LocalTarget::new(asset_root)), config);

    let pb = if output == OutputFormat::Table {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!(
        "{} {} tasks for {}",
        if dry_run { "Checking" } else { "Applying" },
        graph.len(),
        name
    ));

    let report = executor.run(&graph).await;
    pb.finish_and_clear();

    match output {
        OutputFormat::Table => print_execution_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if !report.is_success() {
        bail!(
            "update of cluster {name} failed: {} task(s) failed",
            report.count(kcup::executor::TaskStatus::Failed)
        );
    }
    if dry_run && output == OutputFormat::Table && !report.is_converged() {
        println!();
        println!("{}", "Must specify --yes to apply changes".yellow());
    }
    Ok(())
}

/// Create cluster and instance group records from a resource file.
fn run_create(store: &FsStateStore, filename: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(filename)
        .with_context(|| format!("error reading {}", filename.display()))?;
    let documents = parse_documents(&contents)
        .with_context(|| format!("error parsing {}", filename.display()))?;

    let mut clusters: Vec<Cluster> = Vec::new();
    let mut groups: Vec<InstanceGroup> = Vec::new();
    for document in documents {
        match document {
            Document::Cluster(cluster) => clusters.push(cluster),
            Document::InstanceGroup(group) => groups.push(group),
        }
    }

    let cluster = match clusters.as_slice() {
        [cluster] => cluster.clone(),
        [] => bail!("{} does not define a Cluster", filename.display()),
        _ => bail!("{} defines more than one Cluster", filename.display()),
    };
    let name = cluster.name().to_string();

    match store.read_cluster(&name) {
        Ok(_) => bail!("cluster {name:?} already exists"),
        Err(KcupError::ClusterNotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let completed = populate_cluster_spec(&cluster, store);
    validate_cluster(&completed, &groups, false)?;

    store.update_cluster(&cluster)?;
    for group in &groups {
        store
            .update_instance_group(&name, group)
            .with_context(|| format!("error writing InstanceGroup {:?} to registry", group.name()))?;
    }
    store.write_completed_config(&completed)?;

    println!(
        "Created cluster {} with {} instance group(s)",
        name.bold(),
        groups.len()
    );
    println!("You can now apply the configuration, using `kcup update cluster {name} --yes`");
    Ok(())
}
