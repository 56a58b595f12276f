//! regsweep runtime - collaborators and run orchestration.
//!
//! Connects the decision logic in `regsweep-core` to registries,
//! orchestrators and chat: the collaborator traits, their adapters, chunked
//! deletion, export and the [`Cleaner`] that drives a run.

pub mod cleaner;
pub mod deleter;
pub mod export;
pub mod index;
pub mod registry;
pub mod slack;
pub mod snapshot;
pub mod source;

// Re-export common types
pub use cleaner::{Cleaner, RunPlan, RunReport};
pub use deleter::{BatchDeleter, DeletionReport};
pub use export::{write_export, EXPORT_HEADER};
pub use index::build_active_index;
pub use registry::{RegistryAuth, RegistryDeletionSink};
pub use slack::SlackNotifier;
pub use snapshot::{ClusterSnapshot, RepositorySnapshot, SnapshotInventory, SnapshotOrchestrator};
pub use source::{
    BatchDeleteResult, DeletionSink, ImageFailure, InventorySource, NotificationSink,
    OrchestratorSource, TaskSnapshot, TaskStatus,
};

/// regsweep runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
