//! Feature records: the parsed view of a specifier or a loaded-features entry.
//!
//! A record is a pure function of its input string and the platform's
//! dynamic-library suffix. Classification never fails; anything without a
//! recognizable extension is simply extensionless.

use serde::{Deserialize, Serialize};

/// Suffix of source scripts.
pub const SOURCE_EXT: &str = ".rb";

/// Suffix of native binaries, accepted on every platform.
pub const NATIVE_EXT: &str = ".so";

/// Host dynamic-library suffix (without the dot).
pub const DEFAULT_DLEXT: &str = if cfg!(target_os = "macos") {
    "bundle"
} else if cfg!(windows) {
    "dll"
} else {
    "so"
};

/// The platform's dynamic-library suffix, stored with its leading dot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PlatformExtension {
    dotted: String,
}

impl PlatformExtension {
    /// Create from a suffix with or without the leading dot (`"bundle"` or `".bundle"`).
    #[must_use]
    pub fn new(dlext: &str) -> Self {
        Self {
            dotted: format!(".{}", dlext.trim_start_matches('.')),
        }
    }

    /// The host platform's suffix.
    #[must_use]
    pub fn host() -> Self {
        Self::new(DEFAULT_DLEXT)
    }

    /// Suffix without the dot, e.g. `bundle`.
    #[must_use]
    pub fn dlext(&self) -> &str {
        &self.dotted[1..]
    }

    /// Suffix with the dot, e.g. `.bundle`.
    #[must_use]
    pub fn dotted(&self) -> &str {
        &self.dotted
    }
}

impl Default for PlatformExtension {
    fn default() -> Self {
        Self::host()
    }
}

impl From<String> for PlatformExtension {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

impl From<PlatformExtension> for String {
    fn from(value: PlatformExtension) -> Self {
        value.dlext().to_string()
    }
}

/// Extension classification of a feature path.
///
/// "No extension" is expressed as `Option::None` by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionKind {
    /// `.rb`
    SourceScript,
    /// `.so`
    NativeBinary,
    /// The platform dynamic-library suffix.
    PlatformDynamic,
    /// Any other non-empty extension.
    Other,
}

impl ExtensionKind {
    /// Native binary or platform dynamic library.
    #[must_use]
    pub fn is_binary(self) -> bool {
        matches!(self, Self::NativeBinary | Self::PlatformDynamic)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SourceScript => "source_script",
            Self::NativeBinary => "native_binary",
            Self::PlatformDynamic => "platform_dynamic",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify the extension of `path`, returning the kind and the byte length
/// of the matched suffix.
///
/// The suffix checks run in a fixed order (`.rb`, `.so`, platform suffix,
/// generic extension), so a path matches exactly one kind. With a platform
/// suffix of `so`, `.so` is always `NativeBinary`.
#[must_use]
pub fn classify(path: &str, platform: &PlatformExtension) -> Option<(ExtensionKind, usize)> {
    if path.ends_with(SOURCE_EXT) {
        Some((ExtensionKind::SourceScript, SOURCE_EXT.len()))
    } else if path.ends_with(NATIVE_EXT) {
        Some((ExtensionKind::NativeBinary, NATIVE_EXT.len()))
    } else if platform.dotted().len() > 1 && path.ends_with(platform.dotted()) {
        Some((ExtensionKind::PlatformDynamic, platform.dotted().len()))
    } else {
        extname(path).map(|ext| (ExtensionKind::Other, ext.len()))
    }
}

/// Extension kind of `path` alone.
#[must_use]
pub fn extension_kind(path: &str, platform: &PlatformExtension) -> Option<ExtensionKind> {
    classify(path, platform).map(|(kind, _)| kind)
}

/// Extension suffix of `path` as matched by [`classify`] (e.g. `.rb`).
#[must_use]
pub fn extension<'a>(path: &'a str, platform: &PlatformExtension) -> Option<&'a str> {
    classify(path, platform).map(|(_, len)| &path[path.len() - len..])
}

/// Generic extension of the final path component.
///
/// Leading dots of the component do not start an extension (`.profile` has
/// none); a trailing dot is an extension of its own (`foo.` has `.`).
fn extname(path: &str) -> Option<&str> {
    let base = path.rsplit('/').next().unwrap_or(path);
    let trimmed = base.trim_start_matches('.');
    let dot = trimmed.rfind('.')?;
    Some(&trimmed[dot..])
}

/// Byte range of the final path component, ignoring trailing slashes.
fn basename_range(path: &str) -> (usize, usize) {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        // "" stays empty; "/" and "//" are their own basename.
        return (0, path.len().min(1));
    }
    let start = trimmed.rfind('/').map_or(0, |i| i + 1);
    (start, trimmed.len())
}

/// Immutable, parsed view of one specifier or logged path.
///
/// Records are only compared through [`crate::index::matches`], with an
/// anchor on one side; there is no `PartialEq`.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    raw: String,
    ext: Option<ExtensionKind>,
    stem_len: usize,
    key: (usize, usize),
}

impl FeatureRecord {
    /// Parse `raw`.
    #[must_use]
    pub fn new(raw: impl Into<String>, platform: &PlatformExtension) -> Self {
        let raw = raw.into();
        let (ext, stem_len) = match classify(&raw, platform) {
            Some((kind, len)) => (Some(kind), raw.len() - len),
            None => (None, raw.len()),
        };
        let key = basename_range(&raw[..stem_len]);
        Self {
            raw,
            ext,
            stem_len,
            key,
        }
    }

    /// The input string, unchanged.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn extension_kind(&self) -> Option<ExtensionKind> {
        self.ext
    }

    #[must_use]
    pub fn has_extension(&self) -> bool {
        self.ext.is_some()
    }

    /// The matched suffix, empty when extensionless.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.raw[self.stem_len..]
    }

    /// `raw` with the matched suffix removed.
    #[must_use]
    pub fn without_extension(&self) -> &str {
        &self.raw[..self.stem_len]
    }

    /// Basename of [`Self::without_extension`]; buckets records in the index.
    #[must_use]
    pub fn lookup_key(&self) -> &str {
        &self.raw[self.key.0..self.key.1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> PlatformExtension {
        PlatformExtension::new("bundle")
    }

    #[test]
    fn test_platform_extension_accepts_dotted_and_bare() {
        assert_eq!(PlatformExtension::new(".dll"), PlatformExtension::new("dll"));
        assert_eq!(PlatformExtension::new("dll").dotted(), ".dll");
        assert_eq!(PlatformExtension::new(".dll").dlext(), "dll");
    }

    #[test]
    fn test_classification_order() {
        let p = bundle();
        assert_eq!(extension_kind("/a/foo.rb", &p), Some(ExtensionKind::SourceScript));
        assert_eq!(extension_kind("/a/foo.so", &p), Some(ExtensionKind::NativeBinary));
        assert_eq!(
            extension_kind("/a/foo.bundle", &p),
            Some(ExtensionKind::PlatformDynamic)
        );
        assert_eq!(extension_kind("/a/foo.json", &p), Some(ExtensionKind::Other));
        assert_eq!(extension_kind("/a/foo", &p), None);
    }

    #[test]
    fn test_so_platform_never_classifies_platform_dynamic() {
        let p = PlatformExtension::new("so");
        assert_eq!(extension_kind("foo.so", &p), Some(ExtensionKind::NativeBinary));
    }

    #[test]
    fn test_dotfiles_and_directories() {
        let p = bundle();
        assert_eq!(extension_kind("/home/u/.profile", &p), None);
        assert_eq!(extension_kind("lib.d/foo", &p), None);
        assert_eq!(extension_kind("..", &p), None);
        assert_eq!(extension_kind("", &p), None);
        assert_eq!(extension_kind("..hidden.txt", &p), Some(ExtensionKind::Other));
    }

    #[test]
    fn test_trailing_dot_is_opaque_extension() {
        let record = FeatureRecord::new("lib/foo.", &bundle());
        assert_eq!(record.extension_kind(), Some(ExtensionKind::Other));
        assert_eq!(record.without_extension(), "lib/foo");
        assert_eq!(record.extension(), ".");
    }

    #[test]
    fn test_record_fields() {
        let record = FeatureRecord::new("/app/lib/json/ext.bundle", &bundle());
        assert_eq!(record.raw(), "/app/lib/json/ext.bundle");
        assert_eq!(record.extension_kind(), Some(ExtensionKind::PlatformDynamic));
        assert_eq!(record.extension(), ".bundle");
        assert_eq!(record.without_extension(), "/app/lib/json/ext");
        assert_eq!(record.lookup_key(), "ext");
    }

    #[test]
    fn test_extensionless_record() {
        let record = FeatureRecord::new("json/ext", &bundle());
        assert!(!record.has_extension());
        assert_eq!(record.without_extension(), "json/ext");
        assert_eq!(record.extension(), "");
        assert_eq!(record.lookup_key(), "ext");
    }

    #[test]
    fn test_lookup_key_ignores_trailing_slash() {
        let p = bundle();
        assert_eq!(FeatureRecord::new("/app/lib/", &p).lookup_key(), "lib");
        assert_eq!(FeatureRecord::new("/", &p).lookup_key(), "/");
        assert_eq!(FeatureRecord::new("", &p).lookup_key(), "");
        assert_eq!(FeatureRecord::new("foo", &p).lookup_key(), "foo");
    }

    #[test]
    fn test_classification_is_idempotent() {
        let p = bundle();
        for path in ["foo", "a/b.rb", "c.so", "/d/e.bundle", "f.tar.gz", ".rc", ""] {
            let first = FeatureRecord::new(path, &p);
            let second = FeatureRecord::new(first.raw(), &p);
            assert_eq!(first.extension_kind(), second.extension_kind());
            assert_eq!(first.without_extension(), second.without_extension());
            assert_eq!(first.lookup_key(), second.lookup_key());
        }
    }

    #[test]
    fn test_extension_helper() {
        let p = bundle();
        assert_eq!(extension("a/b.tar.gz", &p), Some(".gz"));
        assert_eq!(extension("a/b.rb", &p), Some(".rb"));
        assert_eq!(extension("a/b", &p), None);
    }
}
