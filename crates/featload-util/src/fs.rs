use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Read a file to string, replacing invalid UTF-8 sequences with the replacement character.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Parse a feature list: one path per line.
///
/// Surrounding whitespace is trimmed; blank lines and `#` comments are skipped.
/// Order is preserved and duplicates are kept, since a loaded-features log may
/// legitimately contain the same path twice.
#[must_use]
pub fn parse_feature_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read a feature list file (see [`parse_feature_list`]).
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_feature_list(path: &Path) -> io::Result<Vec<String>> {
    read_to_string_lossy(path).map(|content| parse_feature_list(&content))
}

/// Whether `path` exists and is a regular file (symlinks are followed).
#[must_use]
pub fn is_regular_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|meta| meta.is_file())
}

/// Remove `.` components and fold `..` into the preceding component,
/// without touching the filesystem. `..` never climbs past the root.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// `path` taken against `base`, canonicalized when it exists and
/// lexically normalized otherwise.
#[must_use]
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    let joined = base.join(path);
    dunce::canonicalize(&joined).unwrap_or_else(|_| normalize_lexically(&joined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_read_to_string_lossy_valid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"/app/lib/foo.rb").unwrap();
        file.flush().unwrap();

        let content = read_to_string_lossy(file.path()).unwrap();
        assert_eq!(content, "/app/lib/foo.rb");
    }

    #[test]
    fn test_read_to_string_lossy_invalid_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x2f, 0x61, 0x80, 0x81]).unwrap();
        file.flush().unwrap();

        let content = read_to_string_lossy(file.path()).unwrap();
        assert!(content.starts_with("/a"));
        assert!(content.contains('\u{FFFD}'));
    }

    #[test]
    fn test_parse_feature_list_skips_blanks_and_comments() {
        let list = parse_feature_list(
            "# preloaded\n/app/lib/foo.rb\n\n   /app/lib/bar.so  \n# trailing\n/app/lib/foo.rb\n",
        );
        assert_eq!(
            list,
            vec!["/app/lib/foo.rb", "/app/lib/bar.so", "/app/lib/foo.rb"]
        );
    }

    #[test]
    fn test_read_feature_list_missing_file() {
        let dir = tempdir().unwrap();
        assert!(read_feature_list(&dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn test_is_regular_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("foo.rb");
        fs::write(&file, "").unwrap();

        assert!(is_regular_file(&file));
        assert!(!is_regular_file(dir.path()));
        assert!(!is_regular_file(&dir.path().join("nope.rb")));
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(normalize_lexically(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_lexically(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize_lexically(Path::new("../x/./y")), PathBuf::from("../x/y"));
        assert_eq!(normalize_lexically(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn test_absolutize_existing_and_missing() {
        let dir = tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();
        fs::create_dir_all(root.join("lib")).unwrap();

        assert_eq!(absolutize(dir.path(), Path::new("./lib")), root.join("lib"));
        assert_eq!(absolutize(dir.path(), Path::new("lib/../lib")), root.join("lib"));
        assert_eq!(
            absolutize(&root, Path::new("./gone/../missing")),
            root.join("missing")
        );
    }
}
