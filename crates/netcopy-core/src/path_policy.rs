//! Server-side path authorization and wire/native path conversion.
//!
//! The policy holds an immutable set of allowed roots. A destination is
//! admissible iff, after lexical normalization, it equals a root or is a
//! strict descendant of one. The check is purely lexical: symlinks are not
//! resolved, so operators must choose roots that do not contain
//! adversary-writable symlinks.
//!
//! Paths on the wire always use `/` separators; native form uses the
//! platform separator. Absoluteness detection recognizes both Unix (`/...`)
//! and Windows (`X:\...`, `\\host\...`) shapes regardless of the running
//! platform, because the client and server may sit on different systems.

use std::path::{Component, Path, PathBuf};

/// Immutable set of allowed roots.
#[derive(Debug, Clone)]
pub struct PathPolicy {
    roots: Vec<PathBuf>,
}

impl PathPolicy {
    /// Build a policy from native-format root paths. Roots are normalized
    /// once here.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            roots: roots
                .into_iter()
                .map(|p| lexical_normalize(p.as_ref()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Whether a destination (absolute, native form) falls under at least
    /// one allowed root. Equality with a root counts.
    pub fn is_allowed(&self, destination: &Path) -> bool {
        let normalized = lexical_normalize(destination);
        self.roots.iter().any(|root| normalized.starts_with(root))
    }
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component where one exists. No filesystem access.
pub fn lexical_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                // Pop a normal component; `..` directly under a root
                // collapses into the root itself.
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                // Leading (or stacked) `..` on a relative path is kept.
                _ => normalized.push(component),
            },
            other => normalized.push(other),
        }
    }
    normalized
}

/// Convert a wire path (always `/`-separated) to the platform's native
/// separator.
pub fn to_native(wire_path: &str) -> String {
    if cfg!(windows) {
        wire_path.replace('/', "\\")
    } else {
        wire_path.replace('\\', "/")
    }
}

/// Convert any path to wire form (`/` separators).
pub fn to_wire(path: &str) -> String {
    path.replace('\\', "/")
}

/// Absoluteness check that understands both Unix and Windows shapes,
/// independent of the running platform.
pub fn is_absolute_path(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }

    let bytes = path.as_bytes();
    if bytes[0] == b'/' || bytes[0] == b'\\' {
        return true;
    }

    // Windows drive letter: "X:" followed by anything (or nothing).
    bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy(roots: &[&str]) -> PathPolicy {
        PathPolicy::new(roots.iter().map(PathBuf::from))
    }

    #[test]
    fn root_itself_is_allowed() {
        let policy = policy(&["/srv/data"]);
        assert!(policy.is_allowed(Path::new("/srv/data")));
        assert!(policy.is_allowed(Path::new("/srv/data/")));
    }

    #[test]
    fn descendants_are_allowed() {
        let policy = policy(&["/srv/data"]);
        assert!(policy.is_allowed(Path::new("/srv/data/file.bin")));
        assert!(policy.is_allowed(Path::new("/srv/data/deep/nested/tree/x")));
    }

    #[test]
    fn siblings_and_prefix_tricks_are_denied() {
        let policy = policy(&["/srv/data"]);
        assert!(!policy.is_allowed(Path::new("/srv/other")));
        assert!(!policy.is_allowed(Path::new("/etc/passwd")));
        // "/srv/database" shares a string prefix but is not a descendant.
        assert!(!policy.is_allowed(Path::new("/srv/database/file")));
    }

    #[test]
    fn dotdot_escapes_are_folded_and_denied() {
        let policy = policy(&["/srv/data"]);
        assert!(!policy.is_allowed(Path::new("/srv/data/../other/file")));
        assert!(!policy.is_allowed(Path::new("/srv/data/sub/../../../etc/passwd")));
        // Escaping and coming back in is fine after folding.
        assert!(policy.is_allowed(Path::new("/srv/data/sub/../file")));
    }

    #[test]
    fn curdir_components_are_ignored() {
        let policy = policy(&["/srv/data"]);
        assert!(policy.is_allowed(Path::new("/srv/data/./sub/./file")));
    }

    #[test]
    fn multiple_roots() {
        let policy = policy(&["/srv/data", "/var/backups"]);
        assert!(policy.is_allowed(Path::new("/var/backups/today.tar")));
        assert!(policy.is_allowed(Path::new("/srv/data/x")));
        assert!(!policy.is_allowed(Path::new("/var/lib/x")));
    }

    #[test]
    fn empty_policy_denies_everything() {
        let policy = PathPolicy::new(Vec::<PathBuf>::new());
        assert!(policy.is_empty());
        assert!(!policy.is_allowed(Path::new("/srv/data")));
    }

    #[test]
    fn normalize_folds_parent_components() {
        assert_eq!(
            lexical_normalize(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(lexical_normalize(Path::new("/a/../../b")), PathBuf::from("/b"));
        assert_eq!(lexical_normalize(Path::new("/..")), PathBuf::from("/"));
    }

    #[test]
    fn wire_native_conversion() {
        #[cfg(unix)]
        {
            assert_eq!(to_native("/srv/data/file"), "/srv/data/file");
            assert_eq!(to_native("C:\\Work\\file"), "C:/Work/file");
        }
        assert_eq!(to_wire("C:\\Work\\file"), "C:/Work/file");
        assert_eq!(to_wire("/srv/data"), "/srv/data");
    }

    #[test]
    fn absoluteness_detection_is_platform_independent() {
        assert!(is_absolute_path("/srv/data"));
        assert!(is_absolute_path("C:\\Work"));
        assert!(is_absolute_path("d:/work"));
        assert!(is_absolute_path("\\\\host\\share"));

        assert!(!is_absolute_path(""));
        assert!(!is_absolute_path("relative/path"));
        assert!(!is_absolute_path("file.txt"));
        assert!(!is_absolute_path("1:notadrive"));
    }

    proptest! {
        /// Any safe relative suffix under a root stays allowed.
        #[test]
        fn safe_suffixes_are_allowed(
            components in prop::collection::vec("[a-zA-Z0-9_.-]{1,12}", 1..6)
        ) {
            // Filter out pure dot components the generator may produce.
            prop_assume!(components.iter().all(|c| c != "." && c != ".."));

            let policy = policy(&["/srv/data"]);
            let mut path = PathBuf::from("/srv/data");
            for component in &components {
                path.push(component);
            }
            prop_assert!(policy.is_allowed(&path));
        }

        /// Enough `..` components to climb out of the root always deny.
        #[test]
        fn escapes_are_denied(
            depth in 1usize..4,
            target in "[a-z]{1,8}"
        ) {
            let policy = policy(&["/srv/data"]);
            let mut path = PathBuf::from("/srv/data");
            // Climb past /srv/data and /srv entirely.
            for _ in 0..(depth + 2) {
                path.push("..");
            }
            path.push(&target);
            prop_assert!(!policy.is_allowed(&path));
        }

        /// is_allowed agrees with a containment oracle on normalized paths.
        #[test]
        fn soundness_against_oracle(
            components in prop::collection::vec(
                prop_oneof![
                    Just("..".to_string()),
                    Just(".".to_string()),
                    "[a-z]{1,8}",
                ],
                0..8,
            )
        ) {
            let policy = policy(&["/srv/data"]);
            let mut path = PathBuf::from("/");
            for component in &components {
                path.push(component);
            }

            let normalized = lexical_normalize(&path);
            let expected = normalized.starts_with("/srv/data");
            prop_assert_eq!(policy.is_allowed(&path), expected);
        }
    }
}
