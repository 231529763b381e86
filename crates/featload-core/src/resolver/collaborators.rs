//! Collaborators the resolver consumes: file lookup and the search path.

use std::sync::{Arc, PoisonError, RwLock};

/// Turns a specifier into the path of an existing file, if there is one.
///
/// Implementations should be thread-safe (Send + Sync). Failing to find a
/// file is a normal answer, not an error.
///
/// `find` is called while the [`FeatureRegistry`](crate::FeatureRegistry)
/// lock is held, and that lock is not reentrant. An implementation must not
/// call back into the registry (or a [`Resolver`](crate::Resolver) sharing
/// it) from `find`; doing so deadlocks.
pub trait FileResolver: Send + Sync {
    /// Resolve `feature` (already home-expanded) against the search path
    /// and the filesystem.
    fn find(&self, feature: &str) -> Option<String>;
}

impl<F> FileResolver for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn find(&self, feature: &str) -> Option<String> {
        self(feature)
    }
}

/// File resolver that never finds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFileResolver;

impl FileResolver for NoFileResolver {
    fn find(&self, _feature: &str) -> Option<String> {
        None
    }
}

/// Ordered list of directories features are searched in.
///
/// Read-only from the resolver's side.
pub trait SearchPathProvider: Send + Sync {
    /// The current directories, in search order.
    fn search_paths(&self) -> Arc<[String]>;
}

/// A runtime-owned, shareable search path.
#[derive(Debug)]
pub struct LoadPath {
    dirs: RwLock<Arc<[String]>>,
}

impl Default for LoadPath {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

impl LoadPath {
    pub fn new<I, S>(dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dirs: RwLock::new(dirs.into_iter().map(Into::into).collect()),
        }
    }

    /// Replace all directories.
    pub fn set<I, S>(&self, dirs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dirs: Arc<[String]> = dirs.into_iter().map(Into::into).collect();
        *self.dirs.write().unwrap_or_else(PoisonError::into_inner) = dirs;
    }

    /// Append a directory (searched last).
    pub fn push(&self, dir: impl Into<String>) {
        self.edit(|dirs| dirs.push(dir.into()));
    }

    /// Prepend a directory (searched first).
    pub fn unshift(&self, dir: impl Into<String>) {
        self.edit(|dirs| dirs.insert(0, dir.into()));
    }

    fn edit(&self, f: impl FnOnce(&mut Vec<String>)) {
        let mut guard = self.dirs.write().unwrap_or_else(PoisonError::into_inner);
        let mut dirs = guard.to_vec();
        f(&mut dirs);
        *guard = dirs.into();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.search_paths().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SearchPathProvider for LoadPath {
    fn search_paths(&self) -> Arc<[String]> {
        Arc::clone(&self.dirs.read().unwrap_or_else(PoisonError::into_inner))
    }
}
