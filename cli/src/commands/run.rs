//! `regsweep run` command - full retention sweep.

use std::path::Path;

use clap::Args;
use regsweep_core::SweepConfig;
use regsweep_runtime::{RegistryAuth, RegistryDeletionSink, RunReport, SlackNotifier};

use super::SourceArgs;

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Registry base URL used for manifest deletion
    #[arg(long, value_name = "URL")]
    pub registry: Option<String>,

    /// Delete images (otherwise a dry run unless DELETE_ENABLED is set)
    #[arg(long)]
    pub delete: bool,

    /// Post the report to Slack (otherwise only if SLACK_ENABLED is set)
    #[arg(long)]
    pub notify: bool,
}

pub async fn execute(
    args: RunArgs,
    config_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path, |key| std::env::var(key).ok())?;
    args.source.apply_to(&mut config);
    if args.delete {
        config.delete_enabled = true;
    }
    if args.notify {
        config.notify_enabled = true;
    }

    let deletion_sink = deletion_sink(&args, &config)?;
    let notifier = notifier(&config)?;

    let mut cleaner = args.source.cleaner(config)?;
    if let Some(sink) = deletion_sink {
        cleaner = cleaner.with_deletion_sink(Box::new(sink));
    }
    if let Some(notifier) = notifier {
        cleaner = cleaner.with_notifier(Box::new(notifier));
    }

    let report = cleaner.run(chrono::Utc::now()).await?;
    print_report(&report, cleaner.config().delete_enabled);
    Ok(())
}

fn deletion_sink(
    args: &RunArgs,
    config: &SweepConfig,
) -> Result<Option<RegistryDeletionSink>, Box<dyn std::error::Error>> {
    if !config.delete_enabled {
        return Ok(None);
    }
    let registry = args
        .registry
        .as_deref()
        .ok_or("deletion is enabled but --registry was not given")?;
    Ok(Some(RegistryDeletionSink::new(registry, RegistryAuth::from_env())?))
}

fn notifier(config: &SweepConfig) -> Result<Option<SlackNotifier>, Box<dyn std::error::Error>> {
    if !config.notify_enabled {
        return Ok(None);
    }
    let token = config
        .slack_token
        .as_deref()
        .ok_or("notification is enabled but SLACK_TOKEN is not set")?;
    let channel = config
        .slack_channel
        .as_deref()
        .ok_or("notification is enabled but SLACK_CHANNEL is not set")?;
    Ok(Some(SlackNotifier::new(
        token,
        channel,
        config.max_message_length,
    )))
}

fn print_report(report: &RunReport, delete_enabled: bool) {
    let candidates = report.plan.summary.total_delete_count();
    if let Some(rows) = report.exported {
        println!("Exported {rows} delete candidate(s).");
    }
    if report.notified {
        println!("Report sent.");
    }

    if !delete_enabled {
        println!("Dry run: {candidates} image(s) would be deleted.");
        return;
    }

    println!(
        "Deleted {} of {} image(s).",
        report.deleted_count(),
        candidates
    );

    let failed: Vec<_> = report.deletions.iter().filter(|d| !d.is_clean()).collect();
    if !failed.is_empty() {
        eprintln!("\nErrors:");
        for deletion in failed {
            for failure in &deletion.image_failures {
                eprintln!("  {}:{}: {}", deletion.repository, failure.digest, failure.reason);
            }
        }
    }
}
