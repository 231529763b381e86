//! The loaded-features log.
//!
//! An ordered, append-mostly list of every feature path that has begun
//! loading. Positions ("offsets") are insertion order and are what the
//! [`FeatureIndex`](crate::index::FeatureIndex) stores.
//!
//! Storage is copy-on-write and shared with [`Snapshot`]s: any mutation made
//! while a snapshot is alive moves the log to fresh storage, so comparing
//! storage identity is enough to detect that the log diverged from a
//! snapshot.

use crate::error::{Error, Result};
use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Text(String),
    /// Pushed as a filesystem path; coerced to text by [`LoadedFeatures::normalize`].
    Path(PathBuf),
}

impl Entry {
    fn as_str(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s),
            Self::Path(p) => p.to_string_lossy(),
        }
    }

    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Path(p) => p.to_string_lossy().into_owned(),
        }
    }
}

/// A shared handle on the log's storage at some point in time.
#[derive(Debug, Clone)]
pub struct Snapshot(Arc<Vec<Entry>>);

impl Snapshot {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The loaded-features log.
#[derive(Debug, Default)]
pub struct LoadedFeatures {
    entries: Arc<Vec<Entry>>,
    frozen: bool,
}

impl LoadedFeatures {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log pre-populated with `features`, in order.
    pub fn from_features<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: Arc::new(
                features
                    .into_iter()
                    .map(|f| Entry::Text(f.into()))
                    .collect(),
            ),
            frozen: false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Path at `offset`. Offsets returned by [`Self::append`] stay valid as
    /// long as nothing outside the append path removes entries.
    #[must_use]
    pub fn get(&self, offset: usize) -> Option<Cow<'_, str>> {
        self.entries.get(offset).map(Entry::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = Cow<'_, str>> {
        self.entries.iter().map(Entry::as_str)
    }

    /// Copy the log out as strings.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(Cow::into_owned).collect()
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Make the log immutable. There is no way back.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    fn ensure_mutable(&self, feature: &str) -> Result<()> {
        if self.frozen {
            Err(Error::log_frozen(feature))
        } else {
            Ok(())
        }
    }

    /// Append `feature`, returning its offset.
    ///
    /// # Errors
    /// [`Error::LogFrozen`] if the log has been frozen.
    pub fn append(&mut self, feature: impl Into<String>) -> Result<usize> {
        let feature = feature.into();
        self.ensure_mutable(&feature)?;
        let entries = Arc::make_mut(&mut self.entries);
        entries.push(Entry::Text(feature));
        Ok(entries.len() - 1)
    }

    /// Append a filesystem path. It is kept in path form until the next
    /// normalization pass.
    ///
    /// # Errors
    /// [`Error::LogFrozen`] if the log has been frozen.
    pub fn push_path(&mut self, path: impl Into<PathBuf>) -> Result<usize> {
        let path = path.into();
        self.ensure_mutable(&path.to_string_lossy())?;
        let entries = Arc::make_mut(&mut self.entries);
        entries.push(Entry::Path(path));
        Ok(entries.len() - 1)
    }

    /// Insert `feature` at `offset`, shifting later entries.
    ///
    /// # Errors
    /// [`Error::LogFrozen`] if frozen, [`Error::Other`] if `offset > len`.
    pub fn insert(&mut self, offset: usize, feature: impl Into<String>) -> Result<()> {
        let feature = feature.into();
        self.ensure_mutable(&feature)?;
        if offset > self.len() {
            return Err(Error::other(format!(
                "insert offset {offset} out of bounds for log of length {}",
                self.len()
            )));
        }
        Arc::make_mut(&mut self.entries).insert(offset, Entry::Text(feature));
        Ok(())
    }

    /// Remove and return the entry at `offset`, if any.
    ///
    /// # Errors
    /// [`Error::LogFrozen`] if the log has been frozen.
    pub fn remove(&mut self, offset: usize) -> Result<Option<String>> {
        self.ensure_mutable("<remove>")?;
        if offset >= self.len() {
            return Ok(None);
        }
        Ok(Some(
            Arc::make_mut(&mut self.entries)
                .remove(offset)
                .into_string(),
        ))
    }

    /// Keep only entries for which `keep` returns true.
    ///
    /// # Errors
    /// [`Error::LogFrozen`] if the log has been frozen.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> Result<()> {
        self.ensure_mutable("<retain>")?;
        Arc::make_mut(&mut self.entries).retain(|entry| keep(&entry.as_str()));
        Ok(())
    }

    /// Replace the whole log.
    ///
    /// # Errors
    /// [`Error::LogFrozen`] if the log has been frozen.
    pub fn replace<I, S>(&mut self, features: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_mutable("<replace>")?;
        // New storage, even when nothing else shares the old one.
        self.entries = Arc::new(
            features
                .into_iter()
                .map(|f| Entry::Text(f.into()))
                .collect(),
        );
        Ok(())
    }

    /// Remove every entry.
    ///
    /// # Errors
    /// [`Error::LogFrozen`] if the log has been frozen.
    pub fn clear(&mut self) -> Result<()> {
        self.replace(std::iter::empty::<String>())
    }

    /// Coerce every entry to its canonical string form in place.
    ///
    /// Length, order and offsets are preserved. Runs on frozen logs too,
    /// since it does not change what the log says. Returns how many entries
    /// were coerced.
    pub fn normalize(&mut self) -> usize {
        if !self.entries.iter().any(|e| matches!(e, Entry::Path(_))) {
            return 0;
        }
        let mut coerced = 0;
        for entry in Arc::make_mut(&mut self.entries).iter_mut() {
            if let Entry::Path(path) = entry {
                *entry = Entry::Text(path.to_string_lossy().into_owned());
                coerced += 1;
            }
        }
        coerced
    }

    /// Take a snapshot sharing the current storage.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(Arc::clone(&self.entries))
    }

    /// Whether the log still is exactly what `snapshot` captured.
    #[must_use]
    pub fn snapshot_equals(&self, snapshot: &Snapshot) -> bool {
        Arc::ptr_eq(&self.entries, &snapshot.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_returns_stable_offsets() {
        let mut log = LoadedFeatures::new();
        assert_eq!(log.append("/a/foo.rb").unwrap(), 0);
        assert_eq!(log.append("/a/bar.rb").unwrap(), 1);
        assert_eq!(log.len(), 2);
        assert_eq!(log.get(0).as_deref(), Some("/a/foo.rb"));
        assert_eq!(log.get(1).as_deref(), Some("/a/bar.rb"));
        assert!(log.get(2).is_none());
    }

    #[test]
    fn test_frozen_log_rejects_mutation() {
        let mut log = LoadedFeatures::from_features(["/a/foo.rb"]);
        log.freeze();

        let err = log.append("/a/bar.rb").unwrap_err();
        assert!(matches!(err, Error::LogFrozen { ref feature } if feature == "/a/bar.rb"));
        assert!(log.push_path("/a/baz.rb").is_err());
        assert!(log.remove(0).is_err());
        assert!(log.clear().is_err());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_snapshot_identity_survives_reads() {
        let log = LoadedFeatures::from_features(["/a/foo.rb"]);
        let snap = log.snapshot();
        let _ = log.get(0);
        let _ = log.to_vec();
        assert!(log.snapshot_equals(&snap));
    }

    #[test]
    fn test_mutation_breaks_snapshot_identity() {
        let mut log = LoadedFeatures::from_features(["/a/foo.rb"]);
        let snap = log.snapshot();
        log.append("/a/bar.rb").unwrap();
        assert!(!log.snapshot_equals(&snap));
        // The snapshot still holds the old content.
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn test_same_length_content_change_breaks_identity() {
        let mut log = LoadedFeatures::from_features(["/a/foo.rb", "/a/bar.rb"]);
        let snap = log.snapshot();
        log.remove(1).unwrap();
        log.append("/a/baz.rb").unwrap();
        assert_eq!(log.len(), snap.len());
        assert!(!log.snapshot_equals(&snap));
    }

    #[test]
    fn test_replace_with_identical_content_breaks_identity() {
        let mut log = LoadedFeatures::from_features(["/a/foo.rb"]);
        let snap = log.snapshot();
        log.replace(["/a/foo.rb"]).unwrap();
        assert!(!log.snapshot_equals(&snap));
    }

    #[test]
    fn test_normalize_coerces_paths_in_place() {
        let mut log = LoadedFeatures::from_features(["/a/foo.rb"]);
        log.push_path(PathBuf::from("/a/bar.rb")).unwrap();
        log.append("/a/baz.rb").unwrap();

        assert_eq!(log.normalize(), 1);
        assert_eq!(log.to_vec(), vec!["/a/foo.rb", "/a/bar.rb", "/a/baz.rb"]);
        assert_eq!(log.normalize(), 0);
    }

    #[test]
    fn test_normalize_without_paths_keeps_storage() {
        let mut log = LoadedFeatures::from_features(["/a/foo.rb"]);
        let snap = log.snapshot();
        log.normalize();
        assert!(log.snapshot_equals(&snap));
    }

    #[test]
    fn test_insert_bounds() {
        let mut log = LoadedFeatures::from_features(["/a/foo.rb"]);
        log.insert(0, "/a/first.rb").unwrap();
        assert_eq!(log.get(0).as_deref(), Some("/a/first.rb"));
        assert!(log.insert(5, "/a/x.rb").is_err());
    }

    #[test]
    fn test_retain() {
        let mut log = LoadedFeatures::from_features(["/a/foo.rb", "/a/bar.so", "/a/baz.rb"]);
        log.retain(|f| f.ends_with(".rb")).unwrap();
        assert_eq!(log.to_vec(), vec!["/a/foo.rb", "/a/baz.rb"]);
    }
}
