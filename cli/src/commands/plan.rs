//! `regsweep plan` command - dry-run retention evaluation.

use std::path::Path;

use clap::Args;
use regsweep_core::report::ReportFormatter;
use regsweep_runtime::{write_export, RunPlan};

use super::SourceArgs;
use crate::output;

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print delete counts as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(
    args: PlanArgs,
    config_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path, |key| std::env::var(key).ok())?;
    args.source.apply_to(&mut config);

    let export_path = config.export_path.clone();
    let max_message_length = config.max_message_length;
    let cleaner = args.source.cleaner(config)?;
    let plan = cleaner.plan(chrono::Utc::now()).await?;

    if let Some(path) = &export_path {
        write_export(path, &plan.summary)?;
    }

    let formatter = ReportFormatter::new(max_message_length);
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&formatter.counts(&plan.summary))?
        );
        return Ok(());
    }

    print_plan(&plan, &formatter, cleaner.config().max_age_days);
    Ok(())
}

fn print_plan(plan: &RunPlan, formatter: &ReportFormatter, max_age_days: u32) {
    if plan.summary.is_empty() {
        println!(
            "Nothing to delete across {} repositories.",
            plan.repositories
        );
    } else {
        println!("{}", output::counts_table(&formatter.counts(&plan.summary)));
        println!();
        println!(
            "{} image(s) to delete across {} repositories (images newer than {} are kept).",
            plan.summary.total_delete_count(),
            plan.repositories,
            output::format_days(max_age_days)
        );
    }

    if !plan.skipped_repositories.is_empty() {
        eprintln!(
            "Skipped repositories: {}",
            plan.skipped_repositories.join(", ")
        );
    }
    if !plan.skipped_clusters.is_empty() {
        eprintln!(
            "Clusters not visible, their images are unprotected: {}",
            plan.skipped_clusters.join(", ")
        );
    }
    if plan.dropped_records > 0 {
        eprintln!("Dropped {} image record(s) without a digest.", plan.dropped_records);
    }
}
