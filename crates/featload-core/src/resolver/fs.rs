//! Filesystem-backed [`FileResolver`].
//!
//! Supports:
//! - Absolute specifiers and `./`, `../` specifiers relative to the working directory
//! - Bare and nested specifiers searched through the search path
//! - Extension probing: `.rb` across every directory first, then the platform suffix

use super::collaborators::{FileResolver, SearchPathProvider};
use crate::feature::{extension_kind, ExtensionKind, PlatformExtension, SOURCE_EXT};
use featload_util::fs::is_regular_file;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolves features against the real filesystem.
pub struct FsFileResolver {
    cwd: PathBuf,
    search_paths: Arc<dyn SearchPathProvider>,
    platform: PlatformExtension,
}

impl fmt::Debug for FsFileResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsFileResolver")
            .field("cwd", &self.cwd)
            .field("search_paths", &self.search_paths.search_paths())
            .field("platform", &self.platform)
            .finish()
    }
}

impl FsFileResolver {
    #[must_use]
    pub fn new(
        cwd: PathBuf,
        search_paths: Arc<dyn SearchPathProvider>,
        platform: PlatformExtension,
    ) -> Self {
        Self {
            cwd,
            search_paths,
            platform,
        }
    }

    /// Suffixes to try, in order. Recognized extensions are taken as given.
    fn suffixes(&self, feature: &str) -> Vec<&str> {
        match extension_kind(feature, &self.platform) {
            Some(
                ExtensionKind::SourceScript
                | ExtensionKind::NativeBinary
                | ExtensionKind::PlatformDynamic,
            ) => vec![""],
            Some(ExtensionKind::Other) | None => vec![SOURCE_EXT, self.platform.dotted()],
        }
    }

    fn existing(base: &Path, suffix: &str) -> Option<String> {
        let candidate = if suffix.is_empty() {
            base.to_path_buf()
        } else {
            let mut name = base.as_os_str().to_os_string();
            name.push(suffix);
            PathBuf::from(name)
        };

        if !is_regular_file(&candidate) {
            return None;
        }
        let resolved = dunce::canonicalize(&candidate).unwrap_or(candidate);
        Some(resolved.to_string_lossy().into_owned())
    }
}

/// Whether `feature` names a location directly rather than via the search path.
fn is_explicit(feature: &str) -> bool {
    feature.starts_with("./") || feature.starts_with("../") || Path::new(feature).is_absolute()
}

impl FileResolver for FsFileResolver {
    fn find(&self, feature: &str) -> Option<String> {
        if feature.is_empty() {
            return None;
        }
        let suffixes = self.suffixes(feature);

        if is_explicit(feature) {
            let base = self.cwd.join(feature);
            return suffixes.iter().find_map(|suffix| Self::existing(&base, suffix));
        }

        let dirs = self.search_paths.search_paths();
        suffixes.iter().find_map(|suffix| {
            dirs.iter()
                .find_map(|dir| Self::existing(&self.cwd.join(dir).join(feature), suffix))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::LoadPath;
    use std::fs;
    use tempfile::tempdir;

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let root = dunce::canonicalize(dir.path()).unwrap();
            Self { _dir: dir, root }
        }

        fn file(&self, rel: &str) -> String {
            let path = self.root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "").unwrap();
            path.to_string_lossy().into_owned()
        }

        fn dir(&self, rel: &str) -> String {
            let path = self.root.join(rel);
            fs::create_dir_all(&path).unwrap();
            path.to_string_lossy().into_owned()
        }

        fn resolver(&self, dirs: &[String]) -> FsFileResolver {
            FsFileResolver::new(
                self.root.clone(),
                Arc::new(LoadPath::new(dirs.iter().cloned())),
                PlatformExtension::new("bundle"),
            )
        }
    }

    #[test]
    fn test_bare_name_prefers_source() {
        let fx = Fixture::new();
        let lib = fx.dir("lib");
        let rb = fx.file("lib/foo.rb");
        fx.file("lib/foo.bundle");

        assert_eq!(fx.resolver(&[lib]).find("foo"), Some(rb));
    }

    #[test]
    fn test_search_order_is_extension_major() {
        let fx = Fixture::new();
        let first = fx.dir("first");
        let second = fx.dir("second");
        fx.file("first/foo.bundle");
        let rb = fx.file("second/foo.rb");

        assert_eq!(fx.resolver(&[first, second]).find("foo"), Some(rb));
    }

    #[test]
    fn test_first_directory_wins() {
        let fx = Fixture::new();
        let first = fx.dir("first");
        let second = fx.dir("second");
        let winner = fx.file("first/foo.rb");
        fx.file("second/foo.rb");

        assert_eq!(fx.resolver(&[first, second]).find("foo"), Some(winner));
    }

    #[test]
    fn test_platform_suffix_fallback() {
        let fx = Fixture::new();
        let lib = fx.dir("lib");
        let bundle = fx.file("lib/json/ext.bundle");

        assert_eq!(fx.resolver(&[lib]).find("json/ext"), Some(bundle));
    }

    #[test]
    fn test_explicit_extension_is_not_extended() {
        let fx = Fixture::new();
        let lib = fx.dir("lib");
        fx.file("lib/foo.rb.rb");

        assert!(fx.resolver(&[lib.clone()]).find("foo.rb").is_none());
        let exact = fx.file("lib/foo.rb");
        assert_eq!(fx.resolver(&[lib]).find("foo.rb"), Some(exact));
    }

    #[test]
    fn test_opaque_extension_gets_suffixes() {
        let fx = Fixture::new();
        let lib = fx.dir("lib");
        let expected = fx.file("lib/config.v2.rb");

        assert_eq!(fx.resolver(&[lib]).find("config.v2"), Some(expected));
    }

    #[test]
    fn test_absolute_and_relative_specifiers() {
        let fx = Fixture::new();
        let abs = fx.file("app/main.rb");

        let resolver = fx.resolver(&[]);
        assert_eq!(resolver.find(abs.trim_end_matches(".rb")), Some(abs.clone()));
        assert_eq!(resolver.find("./app/main"), Some(abs.clone()));
        assert_eq!(resolver.find("./app/../app/main.rb"), Some(abs));
    }

    #[test]
    fn test_relative_search_path_entries_use_cwd() {
        let fx = Fixture::new();
        let rb = fx.file("vendor/lib/foo.rb");

        assert_eq!(fx.resolver(&["vendor/lib".to_string()]).find("foo"), Some(rb));
    }

    #[test]
    fn test_directories_do_not_match() {
        let fx = Fixture::new();
        let lib = fx.dir("lib");
        fx.dir("lib/foo.rb");

        assert!(fx.resolver(&[lib]).find("foo").is_none());
    }

    #[test]
    fn test_missing_and_empty() {
        let fx = Fixture::new();
        let lib = fx.dir("lib");
        let resolver = fx.resolver(&[lib]);
        assert!(resolver.find("nope").is_none());
        assert!(resolver.find("").is_none());
    }
}
