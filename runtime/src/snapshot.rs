//! Inventory and orchestrator snapshots loaded from files.
//!
//! Snapshots are JSON or YAML (picked by file extension) and hold the same
//! data a live registry or orchestrator listing would return. They back
//! dry-run audits and double as in-memory fakes.
//!
//! Inventory:
//!
//! ```yaml
//! repositories:
//!   - name: web
//!     uri: 123456789012.dkr.ecr.eu-west-2.amazonaws.com/web
//!     images:
//!       - imageDigest: sha256:...
//!         imageTags: [v1]
//!         imagePushedAt: 2024-05-01T10:00:00Z
//! ```
//!
//! Orchestrator:
//!
//! ```yaml
//! clusters:
//!   - name: prod
//!     tasks:
//!       - taskId: 4f2a
//!         desiredStatus: RUNNING
//!         lastStatus: RUNNING
//!         images: [123456789012.dkr.ecr.eu-west-2.amazonaws.com/web:v1]
//! ```

use std::path::Path;

use async_trait::async_trait;
use regsweep_core::error::{Result, SweepError};
use regsweep_core::image::{RawImageRecord, Repository};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::source::{InventorySource, OrchestratorSource, TaskSnapshot};

/// One repository and its images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    #[serde(flatten)]
    pub repository: Repository,
    #[serde(default, alias = "imageDetails")]
    pub images: Vec<RawImageRecord>,
}

/// In-memory registry inventory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInventory {
    #[serde(default)]
    pub repositories: Vec<RepositorySnapshot>,
}

impl SnapshotInventory {
    pub fn new(repositories: Vec<RepositorySnapshot>) -> Self {
        Self { repositories }
    }

    /// Load from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        load_snapshot(path)
    }
}

#[async_trait]
impl InventorySource for SnapshotInventory {
    async fn list_repositories(&self) -> Result<Vec<Repository>> {
        Ok(self
            .repositories
            .iter()
            .map(|r| r.repository.clone())
            .collect())
    }

    async fn list_images(&self, repository: &str) -> Result<Vec<RawImageRecord>> {
        self.repositories
            .iter()
            .find(|r| r.repository.name == repository)
            .map(|r| r.images.clone())
            .ok_or_else(|| {
                SweepError::collection("inventory", format!("repository not found: {}", repository))
            })
    }
}

/// One cluster and its tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<TaskSnapshot>,
}

/// In-memory orchestrator state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotOrchestrator {
    #[serde(default)]
    pub clusters: Vec<ClusterSnapshot>,
}

impl SnapshotOrchestrator {
    pub fn new(clusters: Vec<ClusterSnapshot>) -> Self {
        Self { clusters }
    }

    /// Load from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        load_snapshot(path)
    }
}

#[async_trait]
impl OrchestratorSource for SnapshotOrchestrator {
    async fn list_clusters(&self) -> Result<Vec<String>> {
        Ok(self.clusters.iter().map(|c| c.name.clone()).collect())
    }

    async fn list_tasks(&self, cluster: &str) -> Result<Vec<TaskSnapshot>> {
        self.clusters
            .iter()
            .find(|c| c.name == cluster)
            .map(|c| c.tasks.clone())
            .ok_or_else(|| {
                SweepError::collection("orchestrator", format!("cluster not found: {}", cluster))
            })
    }
}

fn load_snapshot<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        SweepError::collection(
            path.display().to_string(),
            format!("Failed to read snapshot: {}", e),
        )
    })?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    let snapshot = if is_yaml {
        serde_yaml::from_str(&data)?
    } else {
        serde_json::from_str(&data)?
    };
    Ok(snapshot)
}
