//! Run orchestration.
//!
//! A run builds the active image index once, evaluates every repository
//! against one captured `now`, then (optionally) exports, notifies and
//! deletes. Nothing is mutated in the registry before the deletion step.

use chrono::{DateTime, Utc};
use regsweep_core::config::SweepConfig;
use regsweep_core::error::{Result, SweepError};
use regsweep_core::image::{ImageRecord, Repository};
use regsweep_core::report::ReportFormatter;
use regsweep_core::retention::{RetentionDecision, RetentionEvaluator};
use regsweep_core::summary::RunSummary;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::deleter::{BatchDeleter, DeletionReport};
use crate::export::write_export;
use crate::index::build_active_index;
use crate::source::{DeletionSink, InventorySource, NotificationSink, OrchestratorSource};

/// Result of evaluating every repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunPlan {
    /// Cutoff used for the recency criterion
    pub cutoff: DateTime<Utc>,
    pub summary: RunSummary,
    /// Repositories evaluated
    pub repositories: usize,
    /// Repositories whose images could not be listed
    pub skipped_repositories: Vec<String>,
    /// Clusters whose tasks could not be listed
    pub skipped_clusters: Vec<String>,
    /// Image records dropped for missing a digest
    pub dropped_records: usize,
}

/// Result of a full run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub plan: RunPlan,
    /// Rows written to the export file, if one was configured
    pub exported: Option<usize>,
    pub notified: bool,
    pub deletions: Vec<DeletionReport>,
}

impl RunReport {
    /// Digests the registry confirmed as deleted.
    pub fn deleted_count(&self) -> usize {
        self.deletions.iter().map(|d| d.deleted.len()).sum()
    }
}

/// Registry cleaner wired to its collaborators.
pub struct Cleaner {
    config: SweepConfig,
    inventory: Box<dyn InventorySource>,
    orchestrator: Box<dyn OrchestratorSource>,
    deletion_sink: Option<Box<dyn DeletionSink>>,
    notifier: Option<Box<dyn NotificationSink>>,
}

impl Cleaner {
    pub fn new(
        config: SweepConfig,
        inventory: Box<dyn InventorySource>,
        orchestrator: Box<dyn OrchestratorSource>,
    ) -> Self {
        Self {
            config,
            inventory,
            orchestrator,
            deletion_sink: None,
            notifier: None,
        }
    }

    /// Sink used when `delete_enabled` is set.
    pub fn with_deletion_sink(mut self, sink: Box<dyn DeletionSink>) -> Self {
        self.deletion_sink = Some(sink);
        self
    }

    /// Sink used when `notify_enabled` is set.
    pub fn with_notifier(mut self, notifier: Box<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Decide what to delete without touching the registry.
    pub async fn plan(&self, now: DateTime<Utc>) -> Result<RunPlan> {
        let span = tracing::info_span!(
            "plan",
            run_id = %uuid::Uuid::new_v4(),
            region = %self.config.region
        );
        self.plan_inner(now).instrument(span).await
    }

    /// Plan, then export, notify and delete as configured.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunReport> {
        let span = tracing::info_span!(
            "run",
            run_id = %uuid::Uuid::new_v4(),
            region = %self.config.region
        );
        self.run_inner(now).instrument(span).await
    }

    async fn plan_inner(&self, now: DateTime<Utc>) -> Result<RunPlan> {
        self.config.validate()?;

        let active = build_active_index(self.orchestrator.as_ref()).await?;
        if !active.skipped_clusters().is_empty() {
            tracing::warn!(
                clusters = ?active.skipped_clusters(),
                "Some clusters were not visible; their images are not protected"
            );
        }

        let repositories = self.inventory.list_repositories().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to list repositories");
            e
        })?;

        let policy = self.config.retention_policy();
        let evaluator = RetentionEvaluator::new(policy, now, &active);

        let mut plan = RunPlan {
            cutoff: evaluator.cutoff(),
            repositories: repositories.len(),
            skipped_clusters: active.skipped_clusters().to_vec(),
            ..Default::default()
        };

        for repository in &repositories {
            match self.evaluate_repository(repository, &evaluator, &mut plan).await {
                Some(decision) => plan.summary.record(&repository.name, &decision),
                None => plan.skipped_repositories.push(repository.name.clone()),
            }
        }

        tracing::info!(
            repositories = plan.repositories,
            skipped = plan.skipped_repositories.len(),
            candidates = plan.summary.total_delete_count(),
            cutoff = %evaluator.cutoff(),
            "Retention plan ready"
        );

        Ok(plan)
    }

    /// `None` if the repository's images could not be listed.
    async fn evaluate_repository(
        &self,
        repository: &Repository,
        evaluator: &RetentionEvaluator<'_>,
        plan: &mut RunPlan,
    ) -> Option<RetentionDecision> {
        let raw_images = match self.inventory.list_images(&repository.name).await {
            Ok(images) => images,
            Err(e) => {
                tracing::warn!(
                    repository = %repository.name,
                    error = %e,
                    "Skipping repository, images could not be listed"
                );
                return None;
            }
        };

        let mut images = Vec::with_capacity(raw_images.len());
        for raw in raw_images {
            match ImageRecord::normalize(repository, raw) {
                Ok(image) => images.push(image),
                Err(e) => {
                    tracing::warn!(repository = %repository.name, error = %e, "Dropping image record");
                    plan.dropped_records += 1;
                }
            }
        }

        let decision = evaluator.evaluate(&images);
        tracing::info!(
            repository = %repository.name,
            images = images.len(),
            keep = decision.keep.len(),
            delete = decision.delete.len(),
            "Evaluated repository"
        );
        Some(decision)
    }

    async fn run_inner(&self, now: DateTime<Utc>) -> Result<RunReport> {
        self.check_sinks()?;

        let plan = self.plan_inner(now).await?;
        let mut report = RunReport::default();

        if let Some(path) = &self.config.export_path {
            report.exported = Some(write_export(path, &plan.summary)?);
        }

        if plan.summary.is_empty() {
            tracing::info!("Nothing to delete");
            report.plan = plan;
            return Ok(report);
        }

        if self.config.notify_enabled {
            report.notified = self.notify(&plan.summary).await;
        }

        if self.config.delete_enabled {
            if let Some(sink) = &self.deletion_sink {
                let deleter = BatchDeleter::new(sink.as_ref(), self.config.max_batch_size);
                for (repository, deletion) in plan.summary.iter() {
                    report
                        .deletions
                        .push(deleter.delete(repository, &deletion.delete).await);
                }
            }
        } else {
            tracing::info!(
                candidates = plan.summary.total_delete_count(),
                "Deletion disabled, dry run only"
            );
        }

        report.plan = plan;
        Ok(report)
    }

    /// Send the report. Failures are logged and reported as `false`.
    async fn notify(&self, summary: &RunSummary) -> bool {
        let Some(notifier) = &self.notifier else {
            return false;
        };

        let max_len = notifier
            .max_message_length()
            .min(self.config.max_message_length)
            .max(1);
        let parts = ReportFormatter::new(max_len).message_parts(summary);

        for (i, part) in parts.iter().enumerate() {
            if let Err(e) = notifier.send_message(part).await {
                tracing::error!(part = i + 1, parts = parts.len(), error = %e, "Failed to send report");
                return false;
            }
        }
        true
    }

    fn check_sinks(&self) -> Result<()> {
        if self.config.delete_enabled && self.deletion_sink.is_none() {
            return Err(SweepError::Config(
                "deletion is enabled but no deletion sink is configured".to_string(),
            ));
        }
        if self.config.notify_enabled && self.notifier.is_none() {
            return Err(SweepError::Config(
                "notification is enabled but no notifier is configured".to_string(),
            ));
        }
        Ok(())
    }
}
