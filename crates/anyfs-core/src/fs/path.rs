//! Path helpers: component splitting, basenames and entry-name validation.

use crate::error::{FsError, FsResult};

/// Path component separator.
pub const SEPARATOR: char = '/';

/// Name of the root folder.
pub const ROOT_NAME: &str = "/";

/// Split a path into its non-empty components.
///
/// `"/a//b/"` yields `["a", "b"]`.
pub fn components(path: &str) -> Vec<&str> {
    path.split(SEPARATOR).filter(|c| !c.is_empty()).collect()
}

/// Whether the path starts at the root.
pub fn is_absolute(path: &str) -> bool {
    path.starts_with(SEPARATOR)
}

/// Last component of a path, or `""` for the root or an empty path.
pub fn basename(path: &str) -> &str {
    path.split(SEPARATOR)
        .rev()
        .find(|c| !c.is_empty())
        .unwrap_or("")
}

/// Join a folder's absolute path and a child name.
pub fn join(parent: &str, name: &str) -> String {
    if parent.ends_with(SEPARATOR) {
        format!("{parent}{name}")
    } else {
        format!("{parent}{SEPARATOR}{name}")
    }
}

/// Check that `name` may be stored as a folder entry.
pub fn validate_name(name: &str) -> FsResult<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name == "." || name == ".." {
        "name is reserved"
    } else if name.contains(SEPARATOR) {
        "name contains a path separator"
    } else {
        return Ok(());
    };
    Err(FsError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_discard_empty() {
        assert_eq!(components("/a//b/"), vec!["a", "b"]);
        assert_eq!(components("a/./../c"), vec!["a", ".", "..", "c"]);
        assert!(components("/").is_empty());
        assert!(components("").is_empty());
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("/a/b.txt"), "b.txt");
        assert_eq!(basename("/a/b/"), "b");
        assert_eq!(basename("name"), "name");
        assert_eq!(basename("/"), "");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b"), "/a/b");
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("file.txt").is_ok());
        assert!(validate_name("...").is_ok());
        for bad in ["", ".", "..", "a/b"] {
            assert!(
                matches!(validate_name(bad), Err(FsError::InvalidName { .. })),
                "{bad:?} should be rejected"
            );
        }
    }
}
