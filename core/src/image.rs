//! Registry repositories and image records.
//!
//! Raw listing entries are normalized into [`ImageRecord`]s, which know every
//! fully-qualified address a workload could use to reference them:
//! `{uri}@{digest}` and `{uri}:{tag}` for each tag.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};

/// A registry repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository name (e.g., "team/web")
    #[serde(alias = "repositoryName")]
    pub name: String,
    /// Base address (e.g., "123456789012.dkr.ecr.eu-west-2.amazonaws.com/team/web")
    #[serde(alias = "repositoryUri")]
    pub uri: String,
}

impl Repository {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
        }
    }
}

/// An image entry as returned by a registry listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawImageRecord {
    #[serde(default)]
    pub image_digest: Option<String>,
    #[serde(default)]
    pub image_tag: Option<String>,
    #[serde(default)]
    pub image_tags: Option<Vec<String>>,
    #[serde(default)]
    pub image_pushed_at: Option<DateTime<Utc>>,
}

/// A normalized image belonging to one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    repository_uri: String,
    digest: String,
    tags: BTreeSet<String>,
    pushed_at: Option<DateTime<Utc>>,
}

impl ImageRecord {
    /// Normalize a raw listing entry for `repository`.
    ///
    /// Fails with [`SweepError::MalformedRecord`] when the digest is absent or
    /// blank. Tags are optional; the primary tag and the tag list are merged.
    pub fn normalize(repository: &Repository, raw: RawImageRecord) -> Result<Self> {
        let digest = raw
            .image_digest
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| {
                SweepError::MalformedRecord(format!(
                    "image in repository '{}' has no digest",
                    repository.name
                ))
            })?;

        let tags = raw
            .image_tag
            .into_iter()
            .chain(raw.image_tags.unwrap_or_default())
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(Self {
            repository_uri: repository.uri.clone(),
            digest,
            tags,
            pushed_at: raw.image_pushed_at,
        })
    }

    /// Content digest (e.g., "sha256:abc123...")
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Union of primary and additional tags.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Push timestamp, if the listing carried one.
    pub fn pushed_at(&self) -> Option<DateTime<Utc>> {
        self.pushed_at
    }

    pub fn is_tagged(&self) -> bool {
        !self.tags.is_empty()
    }

    /// `{uri}@{digest}`
    pub fn digest_address(&self) -> String {
        format!("{}@{}", self.repository_uri, self.digest)
    }

    /// `{uri}:{tag}` for every tag.
    pub fn tag_addresses(&self) -> impl Iterator<Item = String> + '_ {
        self.tags
            .iter()
            .map(move |tag| format!("{}:{}", self.repository_uri, tag))
    }

    /// Every address this image can be referenced by.
    pub fn addresses(&self) -> BTreeSet<String> {
        let mut addresses: BTreeSet<String> = self.tag_addresses().collect();
        addresses.insert(self.digest_address());
        addresses
    }
}
