pub mod explain;
pub mod resolve;
pub mod version;

use featload_core::{FeatureRegistry, FsFileResolver, LoadPath, LoaderConfig, Resolver};
use featload_util::fs::{absolutize, read_feature_list};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// A registry and resolver built from the loader config.
pub struct Session {
    pub registry: Arc<FeatureRegistry>,
    pub resolver: Resolver,
}

impl Session {
    /// Build a fresh registry, seeded from `preload` when given.
    pub fn open(config: &LoaderConfig, preload: Option<&Path>) -> featload_core::Result<Self> {
        let platform = config.platform();
        let cwd = absolutize(&std::env::current_dir()?, &config.cwd);
        let registry = Arc::new(FeatureRegistry::new(platform.clone()));

        if let Some(preload) = preload {
            let path = cwd.join(preload);
            let features = read_feature_list(&path)?;
            let count = features.len();
            registry.with_loaded_features_mut(|log| log.replace(features))?;
            debug!(path = %path.display(), count, "Preloaded loaded features");
        }

        // Search-path entries are compared as strings against logged paths,
        // so they get the same canonical form the file resolver reports.
        let load_path = Arc::new(LoadPath::new(
            config
                .load_path
                .iter()
                .map(|dir| absolutize(&cwd, Path::new(dir)).to_string_lossy().into_owned()),
        ));
        let files = Arc::new(FsFileResolver::new(
            cwd,
            load_path.clone(),
            platform,
        ));
        let resolver = Resolver::new(Arc::clone(&registry), files, load_path);

        Ok(Self { registry, resolver })
    }
}

#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
}

/// Error result for JSON output (locked format: { ok, error: { code, message } }).
#[derive(Serialize)]
struct ErrorJsonResult {
    ok: bool,
    error: ErrorInfo,
}

/// Report a failed command.
///
/// In JSON mode the error is printed to stdout and the process exits with
/// status 1; otherwise it is handed to miette.
pub fn fail(err: featload_core::Error, json: bool) -> Result<()> {
    if json {
        let result = ErrorJsonResult {
            ok: false,
            error: ErrorInfo {
                code: err.code(),
                message: err.to_string(),
            },
        };
        println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
        std::process::exit(1);
    }
    Err(err).into_diagnostic()
}
