//! Set of image addresses referenced by running workloads.
//!
//! Orchestrator references arrive as `name:tag` or `name@digest`. A few other
//! shapes show up in real task definitions and are expanded so they still
//! match registry addresses:
//!
//! - `name:tag@digest` → `name:tag` and `name@digest`
//! - `name` (no tag, no digest) → `name:latest`

use std::collections::BTreeSet;

use crate::image::ImageRecord;

/// Tag an orchestrator pulls when a reference carries none.
const DEFAULT_TAG: &str = "latest";

/// Addresses of every image referenced by a running task.
///
/// Built once per run and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveImageIndex {
    addresses: BTreeSet<String>,
    skipped_clusters: Vec<String>,
}

impl ActiveImageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a list of references in one go.
    pub fn from_references<I, S>(references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::new();
        for reference in references {
            index.insert(reference.as_ref());
        }
        index
    }

    /// Add one container image reference.
    pub fn insert(&mut self, reference: &str) {
        let reference = reference.trim();
        if reference.is_empty() {
            return;
        }
        for address in expand_reference(reference) {
            self.addresses.insert(address);
        }
    }

    /// Remember a cluster whose tasks could not be listed.
    pub fn record_skipped_cluster(&mut self, cluster: impl Into<String>) {
        self.skipped_clusters.push(cluster.into());
    }

    /// Clusters left out of this index because listing them failed.
    pub fn skipped_clusters(&self) -> &[String] {
        &self.skipped_clusters
    }

    pub fn contains(&self, address: &str) -> bool {
        self.addresses.contains(address)
    }

    /// True if any tag-form address of `image` is referenced.
    pub fn is_active_by_tag(&self, image: &ImageRecord) -> bool {
        image.tag_addresses().any(|address| self.contains(&address))
    }

    /// True if the digest-form address of `image` is referenced.
    pub fn is_active_by_digest(&self, image: &ImageRecord) -> bool {
        self.contains(&image.digest_address())
    }

    pub fn is_active(&self, image: &ImageRecord) -> bool {
        self.is_active_by_tag(image) || self.is_active_by_digest(image)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.addresses.iter()
    }
}

/// Expand a reference into the address forms it matches.
fn expand_reference(reference: &str) -> Vec<String> {
    if let Some(at_pos) = reference.rfind('@') {
        let name_tag = &reference[..at_pos];
        let digest = &reference[at_pos + 1..];
        return match split_tag(name_tag) {
            Some((name, tag)) => vec![format!("{name}@{digest}"), format!("{name}:{tag}")],
            None => vec![reference.to_string()],
        };
    }

    match split_tag(reference) {
        Some(_) => vec![reference.to_string()],
        None => vec![format!("{reference}:{DEFAULT_TAG}")],
    }
}

/// Split `name:tag`, only looking after the last `/` so a registry port is
/// never mistaken for a tag.
fn split_tag(name_tag: &str) -> Option<(&str, &str)> {
    let last_segment_start = name_tag.rfind('/').map(|p| p + 1).unwrap_or(0);
    let colon_pos = name_tag[last_segment_start..].rfind(':')? + last_segment_start;
    Some((&name_tag[..colon_pos], &name_tag[colon_pos + 1..]))
}
