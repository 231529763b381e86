//! Home-directory expansion for feature specifiers.

use std::borrow::Cow;

/// Expand a leading `~` or `~/` to the current user's home directory.
///
/// Other specifiers (including `~user/...` forms) are returned unchanged, as
/// is everything when no home directory can be determined.
#[must_use]
pub fn expand_home(feature: &str) -> Cow<'_, str> {
    let rest = if feature == "~" {
        ""
    } else if let Some(rest) = feature.strip_prefix("~/") {
        rest
    } else {
        return Cow::Borrowed(feature);
    };

    let Some(home) = dirs_next::home_dir() else {
        return Cow::Borrowed(feature);
    };

    let home = home.to_string_lossy();
    let home = home.trim_end_matches('/');
    if rest.is_empty() {
        Cow::Owned(if home.is_empty() { "/" } else { home }.to_string())
    } else {
        Cow::Owned(format!("{home}/{rest}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct HomeGuard(Option<std::ffi::OsString>);

    impl HomeGuard {
        fn set(value: &str) -> Self {
            let previous = std::env::var_os("HOME");
            std::env::set_var("HOME", value);
            Self(previous)
        }
    }

    impl Drop for HomeGuard {
        fn drop(&mut self) {
            match self.0.take() {
                Some(previous) => std::env::set_var("HOME", previous),
                None => std::env::remove_var("HOME"),
            }
        }
    }

    #[test]
    fn test_non_tilde_is_borrowed() {
        assert!(matches!(expand_home("foo/bar"), Cow::Borrowed("foo/bar")));
        assert!(matches!(expand_home("/abs/~x"), Cow::Borrowed("/abs/~x")));
    }

    #[test]
    fn test_user_form_is_left_alone() {
        assert_eq!(expand_home("~alice/lib/foo.rb"), "~alice/lib/foo.rb");
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_expands_tilde_slash() {
        let _guard = HomeGuard::set("/home/tester");
        assert_eq!(expand_home("~/lib/foo.rb"), "/home/tester/lib/foo.rb");
        assert_eq!(expand_home("~"), "/home/tester");
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_trailing_slash_in_home() {
        let _guard = HomeGuard::set("/home/tester/");
        assert_eq!(expand_home("~/foo"), "/home/tester/foo");
    }
}
