//! CLI command definitions and dispatch.

mod plan;
mod run;
mod version;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use regsweep_core::SweepConfig;
use regsweep_runtime::{Cleaner, SnapshotInventory, SnapshotOrchestrator};

/// regsweep - deletes stale images from a container registry.
#[derive(Parser)]
#[command(name = "regsweep", version, about)]
pub struct Cli {
    /// YAML config file, applied before environment variables
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Show which images would be deleted, without deleting anything
    Plan(plan::PlanArgs),
    /// Evaluate, then export, notify and delete as configured
    Run(run::RunArgs),
    /// Show version information
    Version(version::VersionArgs),
}

/// Inputs and policy overrides shared by `plan` and `run`.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Registry inventory snapshot (JSON or YAML)
    #[arg(long, value_name = "FILE")]
    pub inventory: PathBuf,

    /// Orchestrator task snapshot (JSON or YAML)
    #[arg(long, value_name = "FILE")]
    pub tasks: PathBuf,

    /// Always keep this many images per repository
    #[arg(long, value_name = "N")]
    pub min_image_count: Option<usize>,

    /// Keep images pushed within this many days
    #[arg(long, value_name = "N")]
    pub max_age_days: Option<u32>,

    /// Write delete candidates to this file
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,
}

impl SourceArgs {
    /// Flags override everything else.
    fn apply_to(&self, config: &mut SweepConfig) {
        if let Some(n) = self.min_image_count {
            config.min_image_count = n;
        }
        if let Some(days) = self.max_age_days {
            config.max_age_days = days;
        }
        if let Some(path) = &self.export {
            config.export_path = Some(path.clone());
        }
    }

    /// A cleaner reading both snapshots, with no sinks attached.
    fn cleaner(&self, config: SweepConfig) -> Result<Cleaner, Box<dyn std::error::Error>> {
        let inventory = SnapshotInventory::from_file(&self.inventory)?;
        let orchestrator = SnapshotOrchestrator::from_file(&self.tasks)?;
        Ok(Cleaner::new(config, Box::new(inventory), Box::new(orchestrator)))
    }
}

/// Resolve the effective config: defaults, then the YAML file, then
/// environment variables.
pub(crate) fn load_config<F>(
    path: Option<&Path>,
    lookup: F,
) -> Result<SweepConfig, Box<dyn std::error::Error>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => SweepConfig::from_yaml_file(path)?,
        None => SweepConfig::default(),
    };
    config.apply_env(lookup)?;
    Ok(config)
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Plan(args) => plan::execute(args, config_path).await,
        Command::Run(args) => run::execute(args, config_path).await,
        Command::Version(args) => version::execute(args).await,
    }
}
