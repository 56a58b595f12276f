//! Retention decisions.
//!
//! Every image of a repository is kept if any of these holds:
//!
//! 1. fewer than `min_image_count` images have been kept so far (count floor)
//! 2. it was pushed at or after the age cutoff (recency)
//! 3. one of its tag addresses is referenced by a running task
//! 4. its digest address is referenced by a running task
//!
//! Images are visited in inventory order, so the count floor protects the
//! first images the inventory returns, not necessarily the newest ones.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::active::ActiveImageIndex;
use crate::config::RetentionPolicy;
use crate::image::ImageRecord;

/// Why an image was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeepReason {
    CountFloor,
    Recent,
    ActiveByTag,
    ActiveByDigest,
}

impl fmt::Display for KeepReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CountFloor => write!(f, "count-floor"),
            Self::Recent => write!(f, "recent"),
            Self::ActiveByTag => write!(f, "active-by-tag"),
            Self::ActiveByDigest => write!(f, "active-by-digest"),
        }
    }
}

/// Keep/delete partition of one repository's digests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionDecision {
    pub keep: BTreeSet<String>,
    pub delete: BTreeSet<String>,
}

impl RetentionDecision {
    /// Every digest seen, kept or not.
    pub fn all(&self) -> BTreeSet<String> {
        self.keep.union(&self.delete).cloned().collect()
    }

    pub fn is_noop(&self) -> bool {
        self.delete.is_empty()
    }
}

/// Classifies repository images against a policy, a fixed cutoff and the
/// active image index.
pub struct RetentionEvaluator<'a> {
    policy: RetentionPolicy,
    cutoff: DateTime<Utc>,
    active: &'a ActiveImageIndex,
}

impl<'a> RetentionEvaluator<'a> {
    /// `now` is captured once per run so every repository shares the cutoff.
    pub fn new(policy: RetentionPolicy, now: DateTime<Utc>, active: &'a ActiveImageIndex) -> Self {
        Self {
            policy,
            cutoff: policy.cutoff(now),
            active,
        }
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// Reasons to keep `image`, given how many images are already kept.
    ///
    /// An empty result means the image is a delete candidate.
    pub fn keep_reasons(&self, image: &ImageRecord, kept_so_far: usize) -> Vec<KeepReason> {
        let mut reasons = Vec::new();

        if kept_so_far < self.policy.min_image_count {
            reasons.push(KeepReason::CountFloor);
        }

        // No push time means the image cannot be shown to be old.
        match image.pushed_at() {
            Some(pushed_at) if pushed_at < self.cutoff => {}
            _ => reasons.push(KeepReason::Recent),
        }

        if self.active.is_active_by_tag(image) {
            reasons.push(KeepReason::ActiveByTag);
        }
        if self.active.is_active_by_digest(image) {
            reasons.push(KeepReason::ActiveByDigest);
        }

        reasons
    }

    /// Partition `images` (in inventory order) into keep and delete sets.
    pub fn evaluate(&self, images: &[ImageRecord]) -> RetentionDecision {
        let mut all = BTreeSet::new();
        let mut keep = BTreeSet::new();

        for image in images {
            all.insert(image.digest().to_string());

            let reasons = self.keep_reasons(image, keep.len());
            if !reasons.is_empty() {
                tracing::debug!(
                    digest = image.digest(),
                    reasons = ?reasons,
                    "Keeping image"
                );
                keep.insert(image.digest().to_string());
            }
        }

        let delete = all.difference(&keep).cloned().collect();
        RetentionDecision { keep, delete }
    }
}
