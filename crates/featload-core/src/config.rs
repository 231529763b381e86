use crate::error::{Error, Result};
use crate::feature::{PlatformExtension, DEFAULT_DLEXT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Loader configuration for the featload CLI and embedders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Search-path directories, in search order.
    pub load_path: Vec<String>,

    /// Platform dynamic-library suffix, without the dot.
    pub dlext: String,

    /// Working directory for relative specifiers and search-path entries.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            load_path: Vec::new(),
            dlext: DEFAULT_DLEXT.to_string(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
        }
    }
}

impl LoaderConfig {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replace the search path.
    #[must_use]
    pub fn with_load_path<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.load_path = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Append directories to the search path.
    #[must_use]
    pub fn with_extra_load_path<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.load_path.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Set the platform dynamic-library suffix.
    #[must_use]
    pub fn with_dlext(mut self, dlext: impl Into<String>) -> Self {
        self.dlext = dlext.into();
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = cwd;
        self
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    #[must_use]
    pub fn platform(&self) -> PlatformExtension {
        PlatformExtension::new(&self.dlext)
    }
}
