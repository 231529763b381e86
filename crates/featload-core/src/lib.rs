#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::return_self_not_must_use)]

//! Loaded-features bookkeeping for a runtime's `require`.
//!
//! [`FeatureRegistry`] owns the loaded-features log and its index;
//! [`Resolver`] answers "already loaded, found, or not found" against it.

pub mod config;
pub mod error;
pub mod feature;
pub mod index;
pub mod log;
pub mod registry;
pub mod resolver;
pub mod version;

pub use config::LoaderConfig;
pub use error::{Error, Result};
pub use feature::{ExtensionKind, FeatureRecord, PlatformExtension};
pub use index::{FeatureIndex, IndexStats};
pub use log::LoadedFeatures;
pub use registry::{FeatureRegistry, FeatureState};
pub use resolver::{
    FileResolver, FsFileResolver, LoadPath, NoFileResolver, Outcome, Provided, ResolveResultWithTrace,
    ResolveTrace, ResolveTraceStep, Resolver, SearchPathProvider, EXPLAIN_SCHEMA_VERSION,
};
pub use version::VERSION;
