//! regsweep core - retention types and decision logic
//!
//! This crate decides which registry images are safe to delete. It performs
//! no I/O against registries or orchestrators; those live behind the
//! collaborator traits in `regsweep-runtime`.

pub mod active;
pub mod config;
pub mod error;
pub mod image;
pub mod report;
pub mod retention;
pub mod summary;

// Re-export commonly used types
pub use active::ActiveImageIndex;
pub use config::{RetentionPolicy, SweepConfig};
pub use error::{Result, SweepError};
pub use image::{ImageRecord, RawImageRecord, Repository};
pub use report::{split_message, ReportFormatter, RepositoryCount};
pub use retention::{KeepReason, RetentionDecision, RetentionEvaluator};
pub use summary::{RepositoryDeletion, RunSummary};

/// regsweep version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
