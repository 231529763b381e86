//! Index over the loaded-features log.
//!
//! Offsets are bucketed by lookup key (the extensionless basename). Under a
//! key, each bucket is anchored by the first record ever inserted into it;
//! later records join the first bucket whose anchor they match and are not
//! stored themselves, only their offsets. Matching is asymmetric (see
//! [`matches`]) and always has the anchor on the left.
//!
//! The index keeps a [`Snapshot`] of the log taken after its last full
//! build. Whenever the live log no longer shares that snapshot's storage the
//! whole index is thrown away and rebuilt from offset 0.

use crate::feature::{FeatureRecord, PlatformExtension};
use crate::log::{LoadedFeatures, Snapshot};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// The first record inserted into a bucket.
///
/// Only the index creates anchors, so every comparison has one.
#[derive(Debug, Clone)]
pub struct Anchor(FeatureRecord);

impl Anchor {
    #[must_use]
    pub fn record(&self) -> &FeatureRecord {
        &self.0
    }
}

/// Whether `candidate` denotes the same feature as the indexed `anchor`.
///
/// The candidate must be a trailing part of the anchor. Extensions are only
/// compared when the candidate has one: `foo` matches `/lib/foo.rb`, while
/// `foo.so` does not match `/lib/foo.rb`.
#[must_use]
pub fn matches(anchor: &Anchor, candidate: &FeatureRecord) -> bool {
    let stored = &anchor.0;
    if candidate.has_extension() {
        stored.raw().ends_with(candidate.raw())
    } else {
        stored
            .without_extension()
            .ends_with(candidate.without_extension())
    }
}

/// An anchor and the ordered offsets of every log entry matching it.
#[derive(Debug, Clone)]
pub struct Bucket {
    anchor: Anchor,
    offsets: Vec<usize>,
}

impl Bucket {
    #[must_use]
    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }
}

/// Index statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Entries in the live log.
    pub log_len: usize,
    /// Distinct lookup keys.
    pub keys: usize,
    /// Anchored buckets across all keys.
    pub buckets: usize,
    /// Full rebuilds performed so far.
    pub rebuilds: u64,
    /// Whether the index currently reflects the live log.
    pub fresh: bool,
}

/// Lookup-key index with snapshot-based staleness detection.
#[derive(Debug, Default)]
pub struct FeatureIndex {
    buckets: HashMap<String, Vec<Bucket>>,
    snapshot: Option<Snapshot>,
    platform: PlatformExtension,
    rebuilds: u64,
}

impl FeatureIndex {
    #[must_use]
    pub fn new(platform: PlatformExtension) -> Self {
        Self {
            platform,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn platform(&self) -> &PlatformExtension {
        &self.platform
    }

    /// Whether the index was built from exactly the current log.
    #[must_use]
    pub fn is_fresh(&self, log: &LoadedFeatures) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|snapshot| log.snapshot_equals(snapshot))
    }

    /// Rebuild from `log` if it diverged from the snapshot.
    ///
    /// Entries are normalized to their canonical string form first. Returns
    /// whether a rebuild happened.
    pub fn ensure_fresh(&mut self, log: &mut LoadedFeatures) -> bool {
        if self.is_fresh(log) {
            return false;
        }

        self.buckets.clear();
        // Release the old storage so normalization can work in place.
        self.snapshot = None;
        let coerced = log.normalize();

        for (offset, feature) in log.iter().enumerate() {
            let record = FeatureRecord::new(feature.into_owned(), &self.platform);
            self.add(record, offset);
        }

        self.snapshot = Some(log.snapshot());
        self.rebuilds += 1;
        debug!(
            log_len = log.len(),
            keys = self.buckets.len(),
            coerced,
            rebuilds = self.rebuilds,
            "Rebuilt loaded features index"
        );
        true
    }

    /// Index `record` at `offset`.
    ///
    /// # Panics
    /// Panics if `offset` is not past every offset already in the bucket it
    /// joins; buckets are kept in log order.
    pub fn add(&mut self, record: FeatureRecord, offset: usize) {
        let buckets = self
            .buckets
            .entry(record.lookup_key().to_string())
            .or_default();

        if let Some(bucket) = buckets.iter_mut().find(|b| matches(&b.anchor, &record)) {
            if let Some(&last) = bucket.offsets.last() {
                assert!(
                    last < offset,
                    "feature index invariant violated: offset {offset} added after {last} under key {:?}",
                    record.lookup_key()
                );
            }
            bucket.offsets.push(offset);
        } else {
            buckets.push(Bucket {
                anchor: Anchor(record),
                offsets: vec![offset],
            });
        }
    }

    /// The bucket `record` belongs to, if any.
    #[must_use]
    pub fn bucket(&self, record: &FeatureRecord) -> Option<&Bucket> {
        self.buckets
            .get(record.lookup_key())?
            .iter()
            .find(|b| matches(&b.anchor, record))
    }

    /// Offsets of log entries equal to `record`, in log order. Empty on a miss.
    #[must_use]
    pub fn lookup(&self, record: &FeatureRecord) -> &[usize] {
        self.bucket(record).map_or(&[], Bucket::offsets)
    }

    /// Drop every bucket and the snapshot; the next access rebuilds.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.snapshot = None;
    }

    /// Release the snapshot ahead of an append made by the index's owner.
    pub(crate) fn detach_snapshot(&mut self) {
        self.snapshot = None;
    }

    /// Re-take the snapshot after the owner brought the index up to date.
    pub(crate) fn attach_snapshot(&mut self, log: &LoadedFeatures) {
        self.snapshot = Some(log.snapshot());
    }

    #[must_use]
    pub fn stats(&self, log: &LoadedFeatures) -> IndexStats {
        IndexStats {
            log_len: log.len(),
            keys: self.buckets.len(),
            buckets: self.buckets.values().map(Vec::len).sum(),
            rebuilds: self.rebuilds,
            fresh: self.is_fresh(log),
        }
    }
}
