//! Builds the [`ActiveImageIndex`] from the orchestrator.

use regsweep_core::active::ActiveImageIndex;
use regsweep_core::error::{Result, SweepError};

use crate::source::OrchestratorSource;

/// Collect the images of every running task on every cluster.
///
/// A cluster whose tasks cannot be listed is logged, recorded as skipped and
/// left out; the remaining clusters are still indexed. Failing to list the
/// clusters at all is an error, since an empty index would mark every image
/// as unused.
pub async fn build_active_index(orchestrator: &dyn OrchestratorSource) -> Result<ActiveImageIndex> {
    let clusters = orchestrator.list_clusters().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list clusters");
        match e {
            SweepError::Collection { .. } => e,
            other => SweepError::collection("orchestrator", other.to_string()),
        }
    })?;

    let mut index = ActiveImageIndex::new();

    for cluster in &clusters {
        let tasks = match orchestrator.list_tasks(cluster).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!(
                    cluster = %cluster,
                    error = %e,
                    "Skipping cluster, running images unknown"
                );
                index.record_skipped_cluster(cluster.clone());
                continue;
            }
        };

        let mut running = 0usize;
        for task in tasks.iter().filter(|t| t.is_running()) {
            running += 1;
            for image in &task.images {
                index.insert(image);
            }
        }

        tracing::debug!(
            cluster = %cluster,
            tasks = tasks.len(),
            running,
            "Indexed cluster"
        );
    }

    tracing::info!(
        clusters = clusters.len(),
        skipped = index.skipped_clusters().len(),
        addresses = index.len(),
        "Built active image index"
    );

    Ok(index)
}
