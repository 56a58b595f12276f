//! Per-run aggregation of retention decisions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::retention::RetentionDecision;

/// Delete candidates of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDeletion {
    pub total_delete: usize,
    pub delete: BTreeSet<String>,
}

/// Delete candidates of a whole run, keyed by repository name.
///
/// Only repositories with at least one candidate are recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    repositories: BTreeMap<String, RepositoryDeletion>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the decision for `repository`. No-op decisions are skipped.
    pub fn record(&mut self, repository: &str, decision: &RetentionDecision) {
        if decision.delete.is_empty() {
            return;
        }
        self.repositories.insert(
            repository.to_string(),
            RepositoryDeletion {
                total_delete: decision.delete.len(),
                delete: decision.delete.clone(),
            },
        );
    }

    pub fn get(&self, repository: &str) -> Option<&RepositoryDeletion> {
        self.repositories.get(repository)
    }

    /// Repositories in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RepositoryDeletion)> {
        self.repositories.iter()
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    /// Delete candidates across every repository.
    pub fn total_delete_count(&self) -> usize {
        self.repositories.values().map(|r| r.total_delete).sum()
    }

    /// `repository:digest` for every candidate.
    pub fn candidates(&self) -> impl Iterator<Item = String> + '_ {
        self.repositories.iter().flat_map(|(name, deletion)| {
            deletion
                .delete
                .iter()
                .map(move |digest| format!("{name}:{digest}"))
        })
    }
}
