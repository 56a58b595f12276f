//! Collaborator interfaces.
//!
//! The cleaner only talks to registries, orchestrators and chat through
//! these traits, so adapters and in-memory fakes are interchangeable.

use async_trait::async_trait;
use regsweep_core::error::Result;
use regsweep_core::image::{RawImageRecord, Repository};
use serde::{Deserialize, Serialize};

/// Lists repositories and their images.
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Every repository, in registry order.
    async fn list_repositories(&self) -> Result<Vec<Repository>>;

    /// Every image of `repository`, pagination already resolved.
    async fn list_images(&self, repository: &str) -> Result<Vec<RawImageRecord>>;
}

/// Lifecycle status of an orchestrator task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Provisioning,
    Pending,
    Activating,
    Running,
    Deactivating,
    Stopping,
    Deprovisioning,
    Stopped,
    #[serde(other)]
    Unknown,
}

/// One orchestrator task and the images of its containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    #[serde(default)]
    pub task_id: String,
    pub desired_status: TaskStatus,
    pub last_status: TaskStatus,
    /// One reference per container definition
    #[serde(default)]
    pub images: Vec<String>,
}

impl TaskSnapshot {
    /// Running, or on its way to / from running.
    pub fn is_running(&self) -> bool {
        self.desired_status == TaskStatus::Running || self.last_status == TaskStatus::Running
    }
}

/// Lists clusters and the tasks on them.
#[async_trait]
pub trait OrchestratorSource: Send + Sync {
    async fn list_clusters(&self) -> Result<Vec<String>>;

    async fn list_tasks(&self, cluster: &str) -> Result<Vec<TaskSnapshot>>;
}

/// A digest the registry refused to delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFailure {
    pub digest: String,
    pub reason: String,
}

/// Outcome of one deletion call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDeleteResult {
    pub deleted: Vec<String>,
    pub failures: Vec<ImageFailure>,
}

/// Deletes images by digest.
#[async_trait]
pub trait DeletionSink: Send + Sync {
    /// Delete at most one batch of digests from `repository`.
    ///
    /// `Err` means the whole call failed; per-image refusals are reported in
    /// [`BatchDeleteResult::failures`].
    async fn delete_images(&self, repository: &str, digests: &[String])
        -> Result<BatchDeleteResult>;
}

/// Delivers report messages.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Longest message the transport accepts, in characters.
    fn max_message_length(&self) -> usize;

    async fn send_message(&self, text: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(desired: TaskStatus, last: TaskStatus) -> TaskSnapshot {
        TaskSnapshot {
            task_id: "t-1".to_string(),
            desired_status: desired,
            last_status: last,
            images: vec![],
        }
    }

    #[test]
    fn test_task_is_running() {
        assert!(task(TaskStatus::Running, TaskStatus::Running).is_running());
        assert!(task(TaskStatus::Running, TaskStatus::Pending).is_running());
        assert!(task(TaskStatus::Stopped, TaskStatus::Running).is_running());
        assert!(!task(TaskStatus::Stopped, TaskStatus::Stopped).is_running());
        assert!(!task(TaskStatus::Stopped, TaskStatus::Deprovisioning).is_running());
    }

    #[test]
    fn test_task_status_serde() {
        let json = r#"{"taskId":"t-9","desiredStatus":"RUNNING","lastStatus":"SOMETHING_NEW","images":["a:b"]}"#;
        let task: TaskSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(task.desired_status, TaskStatus::Running);
        assert_eq!(task.last_status, TaskStatus::Unknown);
        assert_eq!(task.images, vec!["a:b"]);
    }
}
