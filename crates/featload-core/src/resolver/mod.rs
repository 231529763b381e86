//! Feature resolver for `require`.
//!
//! Decides whether a feature is already loaded and, if not, which file to
//! load. File lookup and the search path are collaborators behind traits;
//! [`FsFileResolver`] and [`LoadPath`] are the stock implementations.
//! Tracing support backs the `featload explain` command.

mod collaborators;
mod fs;
mod search;
pub mod trace;

pub use collaborators::{FileResolver, LoadPath, NoFileResolver, SearchPathProvider};
pub use fs::FsFileResolver;
pub use search::{Outcome, Provided, ResolveResultWithTrace, Resolver};
pub use trace::{steps as trace_steps, ResolveTrace, ResolveTraceStep, EXPLAIN_SCHEMA_VERSION};
