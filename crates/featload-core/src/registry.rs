//! The synchronized loaded-features registry.
//!
//! The log, its index and the index's snapshot form one unit of shared
//! state. Every operation that reads or writes any of them runs inside
//! [`FeatureRegistry::synchronized`], which hands the closure exclusive
//! access to the whole triad. A check for "already loaded" followed by an
//! append is therefore one atomic decision.

use crate::error::Result;
use crate::feature::{FeatureRecord, PlatformExtension};
use crate::index::{FeatureIndex, IndexStats};
use crate::log::LoadedFeatures;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// The log and its index, only reachable while the registry lock is held.
#[derive(Debug)]
pub struct FeatureState {
    log: LoadedFeatures,
    index: FeatureIndex,
}

impl FeatureState {
    fn new(log: LoadedFeatures, platform: PlatformExtension) -> Self {
        Self {
            log,
            index: FeatureIndex::new(platform),
        }
    }

    #[must_use]
    pub fn platform(&self) -> &PlatformExtension {
        self.index.platform()
    }

    #[must_use]
    pub fn loaded_features(&self) -> &LoadedFeatures {
        &self.log
    }

    /// Direct access to the log, bypassing the index.
    ///
    /// Anything done here is picked up by the next staleness check.
    pub fn loaded_features_mut(&mut self) -> &mut LoadedFeatures {
        &mut self.log
    }

    /// Bring the index up to date; returns whether it was rebuilt.
    pub fn ensure_fresh(&mut self) -> bool {
        self.index.ensure_fresh(&mut self.log)
    }

    /// Fetch the offsets indexed for `record` together with the log they
    /// point into. The index is refreshed first.
    pub fn lookup(&mut self, record: &FeatureRecord) -> (&LoadedFeatures, &[usize]) {
        self.index.ensure_fresh(&mut self.log);
        (&self.log, self.index.lookup(record))
    }

    /// Append `feature` to the log and index it. Returns the new offset.
    ///
    /// # Errors
    /// [`crate::Error::LogFrozen`] if the log is frozen; nothing changes.
    pub fn provide(&mut self, feature: impl Into<String>) -> Result<usize> {
        let feature = feature.into();
        if self.log.is_frozen() {
            return Err(crate::Error::log_frozen(feature));
        }

        self.index.ensure_fresh(&mut self.log);
        // With the snapshot released the append does not copy the log.
        self.index.detach_snapshot();
        let record = FeatureRecord::new(feature.as_str(), self.index.platform());
        let offset = self.log.append(feature)?;
        self.index.add(record, offset);
        self.index.attach_snapshot(&self.log);
        Ok(offset)
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        self.index.stats(&self.log)
    }
}

/// Process-wide (or module-system-wide) registry of loaded features.
///
/// Create one per runtime and share it by reference or `Arc`; tests get
/// isolation by creating fresh instances.
#[derive(Debug)]
pub struct FeatureRegistry {
    state: Mutex<FeatureState>,
}

impl Default for FeatureRegistry {
    fn default() -> Self {
        Self::new(PlatformExtension::default())
    }
}

impl FeatureRegistry {
    /// Empty log, empty index.
    #[must_use]
    pub fn new(platform: PlatformExtension) -> Self {
        Self::with_loaded_features(platform, LoadedFeatures::new())
    }

    /// Adopt an existing log; it is indexed on first use.
    #[must_use]
    pub fn with_loaded_features(platform: PlatformExtension, log: LoadedFeatures) -> Self {
        Self {
            state: Mutex::new(FeatureState::new(log, platform)),
        }
    }

    /// Run `f` with exclusive access to the log and index.
    ///
    /// The lock is recovered if a previous holder panicked: the snapshot is
    /// only refreshed once the index is complete, so anything left half done
    /// is seen as stale and rebuilt.
    pub fn synchronized<R>(&self, f: impl FnOnce(&mut FeatureState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    /// Register `feature` as loaded.
    ///
    /// # Errors
    /// [`crate::Error::LogFrozen`] if the log is frozen; the log is unchanged.
    pub fn provide(&self, feature: impl Into<String>) -> Result<()> {
        self.synchronized(|state| state.provide(feature)).map(|_| ())
    }

    /// Drop the index and snapshot; the log is kept.
    pub fn clear_cache(&self) {
        self.synchronized(|state| state.index.clear());
        debug!("Cleared loaded features index");
    }

    /// Freeze the log. Later provides fail with `LogFrozen`.
    pub fn freeze(&self) {
        self.synchronized(|state| state.log.freeze());
        debug!("Froze loaded features log");
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.synchronized(|state| state.log.is_frozen())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.synchronized(|state| state.log.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the log.
    #[must_use]
    pub fn loaded_features(&self) -> Vec<String> {
        self.synchronized(|state| state.log.to_vec())
    }

    /// Mutate the log directly, the way a runtime manipulates its
    /// loaded-features list. The index notices on its next use.
    pub fn with_loaded_features_mut<R>(&self, f: impl FnOnce(&mut LoadedFeatures) -> R) -> R {
        self.synchronized(|state| f(&mut state.log))
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        self.synchronized(|state| state.stats())
    }
}
