//! Load decisions: is a feature already loaded, and if not, which file to load.
//!
//! The whole decision runs inside one [`FeatureRegistry`] transaction, file
//! lookups included, so the check after a successful search and any
//! subsequent registration see the same log.

use super::collaborators::{FileResolver, SearchPathProvider};
use super::trace::{steps, ResolveTrace, ResolveTraceStep};
use crate::error::Result;
use crate::feature::{
    extension, extension_kind, ExtensionKind, FeatureRecord, PlatformExtension, NATIVE_EXT,
};
use crate::registry::{FeatureRegistry, FeatureState};
use featload_util::home::expand_home;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Result of a load request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "path", rename_all = "snake_case")]
pub enum Outcome {
    /// The feature, or an equivalent path, is already in the log.
    AlreadyLoaded,
    /// Not loaded yet; this file should be loaded.
    Found(String),
    /// Nothing loaded and nothing on disk.
    NotFound,
}

impl Outcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyLoaded => "already_loaded",
            Self::Found(_) => "found",
            Self::NotFound => "not_found",
        }
    }

    /// The file to load, for [`Outcome::Found`].
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Found(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(path) => write!(f, "found {path}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// How an already-loaded feature matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provided {
    /// Loaded under an extensionless path; the kind cannot be told.
    Unknown,
    /// Loaded as a native binary or platform dynamic library.
    NativeBinary,
    /// Loaded as a source script.
    SourceScript,
}

/// Result of resolution with trace.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveResultWithTrace {
    /// The decision.
    pub outcome: Outcome,
    /// The resolution trace.
    pub trace: ResolveTrace,
}

/// Resolves load requests against a [`FeatureRegistry`].
pub struct Resolver {
    registry: Arc<FeatureRegistry>,
    files: Arc<dyn FileResolver>,
    search_paths: Arc<dyn SearchPathProvider>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("registry", &self.registry)
            .field("files", &"<FileResolver>")
            .field("search_paths", &self.search_paths.search_paths())
            .finish()
    }
}

impl Resolver {
    #[must_use]
    pub fn new(
        registry: Arc<FeatureRegistry>,
        files: Arc<dyn FileResolver>,
        search_paths: Arc<dyn SearchPathProvider>,
    ) -> Self {
        Self {
            registry,
            files,
            search_paths,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<FeatureRegistry> {
        &self.registry
    }

    /// Decide whether `feature` is loaded and, if not, which file to load.
    #[must_use]
    pub fn resolve(&self, feature: &str) -> Outcome {
        let outcome = self
            .registry
            .synchronized(|state| self.search(state, None).search_required(feature));
        trace!(feature, outcome = outcome.as_str(), path = outcome.path(), "Resolved feature");
        outcome
    }

    /// [`Self::resolve`], recording every step.
    #[must_use]
    pub fn resolve_with_trace(&self, feature: &str) -> ResolveResultWithTrace {
        let mut trace = ResolveTrace::new();
        let outcome = self
            .registry
            .synchronized(|state| self.search(state, Some(&mut trace)).search_required(feature));
        ResolveResultWithTrace { outcome, trace }
    }

    /// Resolve and, on [`Outcome::Found`], register the file in the same
    /// transaction. Of several concurrent requires for one feature exactly
    /// one sees `Found`.
    ///
    /// # Errors
    /// [`crate::Error::LogFrozen`] when a file was found but the log is frozen.
    pub fn require(&self, feature: &str) -> Result<Outcome> {
        let outcome = self.registry.synchronized(|state| {
            let outcome = self.search(state, None).search_required(feature);
            if let Outcome::Found(path) = &outcome {
                state.provide(path.as_str())?;
            }
            Ok::<_, crate::Error>(outcome)
        })?;
        trace!(feature, outcome = outcome.as_str(), path = outcome.path(), "Required feature");
        Ok(outcome)
    }

    /// Whether `feature` is already in the log, and as what.
    ///
    /// `expanded` marks `feature` as an absolute path of an existing file; such
    /// a path is never reconciled through the search path.
    #[must_use]
    pub fn feature_provided(&self, feature: &str, expanded: bool) -> Option<Provided> {
        self.registry
            .synchronized(|state| self.search(state, None).feature_provided(feature, expanded))
    }

    /// Register `feature` as loaded.
    ///
    /// # Errors
    /// [`crate::Error::LogFrozen`] if the log is frozen.
    pub fn provide(&self, feature: &str) -> Result<()> {
        self.registry.provide(feature)
    }

    /// Drop the index and its snapshot.
    pub fn clear_cache(&self) {
        self.registry.clear_cache();
    }

    fn search<'a>(
        &'a self,
        state: &'a mut FeatureState,
        trace: Option<&'a mut ResolveTrace>,
    ) -> Search<'a> {
        let platform = state.platform().clone();
        Search {
            state,
            files: self.files.as_ref(),
            load_path: self.search_paths.search_paths(),
            platform,
            trace,
        }
    }
}

/// One load decision, holding the registry lock for its lifetime.
struct Search<'a> {
    state: &'a mut FeatureState,
    files: &'a dyn FileResolver,
    load_path: Arc<[String]>,
    platform: PlatformExtension,
    trace: Option<&'a mut ResolveTrace>,
}

impl Search<'_> {
    fn record(&mut self, step: impl FnOnce() -> ResolveTraceStep) {
        if let Some(trace) = self.trace.as_deref_mut() {
            trace.add_step(step());
        }
    }

    fn finish(&mut self, outcome: Outcome) -> Outcome {
        self.record(|| {
            let step = ResolveTraceStep::new(steps::FINAL_OUTCOME, true, outcome.as_str());
            match outcome.path() {
                Some(path) => step.with_path(path),
                None => step,
            }
        });
        outcome
    }

    fn search_required(&mut self, feature: &str) -> Outcome {
        let kind = extension_kind(feature, &self.platform);
        self.record(|| {
            let detail = kind.map_or("no extension".to_string(), |k| format!("extension {k}"));
            ResolveTraceStep::new(steps::CLASSIFY_FEATURE, true, detail)
        });

        let mut found = None;
        match kind {
            Some(ExtensionKind::SourceScript) => {
                if self.traced_provided(feature).is_some() {
                    return self.finish(Outcome::AlreadyLoaded);
                }
                let outcome = match self.find_file(feature) {
                    Some(path) => self.expanded_path_provided(path),
                    None => Outcome::NotFound,
                };
                return self.finish(outcome);
            }
            Some(ExtensionKind::NativeBinary) => {
                if self.traced_provided(feature).is_some() {
                    return self.finish(Outcome::AlreadyLoaded);
                }
                // A `.so` request may be satisfied by the platform library.
                let stem = &feature[..feature.len() - NATIVE_EXT.len()];
                let platform_feature = format!("{stem}{}", self.platform.dotted());
                if let Some(path) = self.find_file(&platform_feature) {
                    let outcome = self.expanded_path_provided(path);
                    return self.finish(outcome);
                }
            }
            Some(ExtensionKind::PlatformDynamic) => {
                if self.traced_provided(feature).is_some() {
                    return self.finish(Outcome::AlreadyLoaded);
                }
                if let Some(path) = self.find_file(feature) {
                    let outcome = self.expanded_path_provided(path);
                    return self.finish(outcome);
                }
            }
            Some(ExtensionKind::Other) => {}
            None => {
                found = self.traced_provided(feature);
                // Only a loaded source script settles it; a loaded binary
                // yields to a source file found on disk.
                if found == Some(Provided::SourceScript) {
                    return self.finish(Outcome::AlreadyLoaded);
                }
            }
        }

        let outcome = match self.find_file(feature) {
            Some(path) => self.expanded_path_provided(path),
            None if found.is_some() => Outcome::AlreadyLoaded,
            None => Outcome::NotFound,
        };
        self.finish(outcome)
    }

    fn traced_provided(&mut self, feature: &str) -> Option<Provided> {
        let provided = self.feature_provided(feature, false);
        self.record(|| match provided {
            Some(p) => ResolveTraceStep::new(
                steps::FEATURE_PROVIDED,
                true,
                format!("{feature} already provided ({p:?})"),
            ),
            None => ResolveTraceStep::new(
                steps::FEATURE_PROVIDED,
                false,
                format!("{feature} not provided"),
            ),
        });
        provided
    }

    fn expanded_path_provided(&mut self, path: String) -> Outcome {
        let provided = self.feature_provided(&path, true);
        self.record(|| {
            let detail = if provided.is_some() {
                "resolved file already provided"
            } else {
                "resolved file not yet provided"
            };
            ResolveTraceStep::new(steps::EXPANDED_PROVIDED, provided.is_some(), detail)
                .with_path(path.as_str())
        });
        if provided.is_some() {
            Outcome::AlreadyLoaded
        } else {
            Outcome::Found(path)
        }
    }

    fn find_file(&mut self, feature: &str) -> Option<String> {
        let expanded = expand_home(feature);
        let path = self.files.find(&expanded);
        self.record(|| {
            let step = match &path {
                Some(p) => ResolveTraceStep::new(steps::FIND_FILE, true, format!("found {feature}"))
                    .with_path(p.as_str()),
                None => ResolveTraceStep::new(steps::FIND_FILE, false, format!("no file for {feature}")),
            };
            if expanded != feature {
                step.with_note(format!("home-expanded to {expanded}"))
            } else {
                step
            }
        });
        path
    }

    /// Scan the log entries indexed under `feature` for one that provides it.
    fn feature_provided(&mut self, feature: &str, expanded: bool) -> Option<Provided> {
        let record = FeatureRecord::new(feature, &self.platform);
        let feature_ext = record.extension_kind();
        let feature_has_rb = feature_ext == Some(ExtensionKind::SourceScript);
        let (log, offsets) = self.state.lookup(&record);

        for &offset in offsets {
            let Some(loaded) = log.get(offset) else {
                panic!(
                    "feature index invariant violated: offset {offset} for {feature:?} but the log has {} entries",
                    log.len()
                );
            };

            if loaded.len() < feature.len() {
                continue;
            }
            let reconciled = loaded.starts_with(feature)
                || (!expanded
                    && loaded_feature_path(&loaded, feature, &self.load_path, &self.platform)
                        .is_some());
            if !reconciled {
                continue;
            }

            match extension_kind(&loaded, &self.platform) {
                None => {
                    if feature_ext.is_none() {
                        return Some(Provided::Unknown);
                    }
                }
                Some(loaded_ext) => {
                    if !feature_has_rb && loaded_ext.is_binary() {
                        return Some(Provided::NativeBinary);
                    }
                    if (feature_has_rb || feature_ext.is_none())
                        && loaded_ext == ExtensionKind::SourceScript
                    {
                        return Some(Provided::SourceScript);
                    }
                }
            }
        }

        None
    }
}

/// The search-path directory `dir` for which `loaded` is `dir/feature`,
/// with or without `loaded`'s own extension. First match in order wins.
fn loaded_feature_path<'d>(
    loaded: &str,
    feature: &str,
    load_path: &'d [String],
    platform: &PlatformExtension,
) -> Option<&'d str> {
    let loaded_ext = extension(loaded, platform).unwrap_or("");
    load_path
        .iter()
        .find(|dir| {
            loaded
                .strip_prefix(dir.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .and_then(|rest| rest.strip_prefix(feature))
                .is_some_and(|rest| rest.is_empty() || rest == loaded_ext)
        })
        .map(String::as_str)
}
