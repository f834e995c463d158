// Duplicate classification over perceptual hashes.
// The first file seen for a bucket is kept; later collisions are flagged.

use crate::core::hash::PerceptualHash;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// How close two hashes must be to count as duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Identical fingerprints only.
    Exact,
    /// Hamming distance strictly below `below`.
    Hamming { below: u32 },
}

impl DuplicatePolicy {
    pub fn matches(&self, a: &PerceptualHash, b: &PerceptualHash) -> bool {
        match self {
            DuplicatePolicy::Exact => a == b,
            DuplicatePolicy::Hamming { below } => a.distance(b) < *below,
        }
    }
}

impl Default for DuplicatePolicy {
    fn default() -> Self {
        DuplicatePolicy::Exact
    }
}

/// Index of first-seen hashes for a single scan.
pub struct DuplicateIndex {
    policy: DuplicatePolicy,
    buckets: HashMap<PerceptualHash, PathBuf>,
    order: Vec<PerceptualHash>,
}

impl DuplicateIndex {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            buckets: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Check `hash` against everything indexed so far.
    ///
    /// Returns the original's path when `hash` collides; otherwise indexes
    /// `path` as a new original and returns `None`.
    pub fn check_and_insert(&mut self, path: &Path, hash: &PerceptualHash) -> Option<PathBuf> {
        if let Some(original) = self.buckets.get(hash) {
            return Some(original.clone());
        }

        if let DuplicatePolicy::Hamming { .. } = self.policy {
            // indexing order decides which original wins when several are close
            if let Some(close) = self.order.iter().find(|h| self.policy.matches(hash, h)) {
                return self.buckets.get(close).cloned();
            }
        }

        self.buckets.insert(hash.clone(), path.to_path_buf());
        self.order.push(hash.clone());
        None
    }
}
