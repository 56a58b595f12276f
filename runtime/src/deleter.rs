//! Chunked, best-effort image deletion.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::source::{DeletionSink, ImageFailure};

/// What happened while deleting one repository's candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub repository: String,
    /// Deletion calls issued
    pub batches: usize,
    /// Calls that failed as a whole
    pub failed_batches: usize,
    /// Digests the registry confirmed as deleted
    pub deleted: Vec<String>,
    /// Digests the registry refused, plus every digest of a failed call
    pub image_failures: Vec<ImageFailure>,
}

impl DeletionReport {
    pub fn is_clean(&self) -> bool {
        self.failed_batches == 0 && self.image_failures.is_empty()
    }
}

/// Splits delete sets into registry-sized batches and deletes them one call
/// at a time.
pub struct BatchDeleter<'a> {
    sink: &'a dyn DeletionSink,
    max_batch_size: usize,
}

impl<'a> BatchDeleter<'a> {
    /// `max_batch_size` is the registry's per-call limit; zero is treated as one.
    pub fn new(sink: &'a dyn DeletionSink, max_batch_size: usize) -> Self {
        Self {
            sink,
            max_batch_size: max_batch_size.max(1),
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Delete `digests` from `repository`.
    ///
    /// A failed call is logged and the remaining batches still run. Nothing
    /// is retried.
    pub async fn delete(&self, repository: &str, digests: &BTreeSet<String>) -> DeletionReport {
        let mut report = DeletionReport {
            repository: repository.to_string(),
            ..Default::default()
        };

        let digests: Vec<String> = digests.iter().cloned().collect();

        for batch in digests.chunks(self.max_batch_size) {
            report.batches += 1;
            tracing::info!(
                repository = %repository,
                batch = report.batches,
                digests = batch.len(),
                "Deleting images"
            );

            match self.sink.delete_images(repository, batch).await {
                Ok(result) => {
                    for failure in &result.failures {
                        tracing::warn!(
                            repository = %repository,
                            digest = %failure.digest,
                            reason = %failure.reason,
                            "Registry refused to delete image"
                        );
                    }
                    report.deleted.extend(result.deleted);
                    report.image_failures.extend(result.failures);
                }
                Err(e) => {
                    tracing::error!(
                        repository = %repository,
                        batch = report.batches,
                        error = %e,
                        "Deletion batch failed"
                    );
                    report.failed_batches += 1;
                    report
                        .image_failures
                        .extend(batch.iter().map(|digest| ImageFailure {
                            digest: digest.clone(),
                            reason: e.to_string(),
                        }));
                }
            }
        }

        report
    }
}
