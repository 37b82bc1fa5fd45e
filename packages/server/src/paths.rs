//! Path safety for every endpoint that touches the filesystem.
//!
//! Untrusted path arguments may use a leading separator (root-relative form)
//! but never parent references. After joining, the result must still sit at
//! or under the project root. Anything else is `PathTraversal`, raised before
//! any filesystem access.

use crate::errors::GatewayError;
use std::path::{Component, Path, PathBuf};

/// Resolve an untrusted root-relative path inside the project root.
pub fn resolve_within_root(root: &Path, requested: &str) -> Result<PathBuf, GatewayError> {
    let mut sanitized = PathBuf::new();
    for part in Path::new(requested).components() {
        match part {
            Component::Normal(seg) => sanitized.push(seg),
            // a parent reference anywhere is an escape attempt
            Component::ParentDir => {
                return Err(GatewayError::PathTraversal(requested.to_string()));
            }
            // "." and the leading "/" (or drive prefix) are dropped
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }

    let full = root.join(&sanitized);
    if full == root || full.starts_with(root) {
        Ok(full)
    } else {
        Err(GatewayError::PathTraversal(requested.to_string()))
    }
}

/// Like [`resolve_within_root`] for a bare filename: a single name segment,
/// no separators at all.
pub fn safe_filename(filename: &str) -> Result<&str, GatewayError> {
    // ".." and "." parse as their own component kinds, so a lone Normal
    // component is already separator- and parent-free
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(filename),
        _ => Err(GatewayError::PathTraversal(filename.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        PathBuf::from("/srv/site")
    }

    #[test]
    fn plain_relative_paths_resolve() {
        let full = resolve_within_root(&root(), "days/day1/index.html").unwrap();
        assert_eq!(full, PathBuf::from("/srv/site/days/day1/index.html"));
    }

    #[test]
    fn leading_separator_is_stripped() {
        let full = resolve_within_root(&root(), "/days/day1/index.html").unwrap();
        assert_eq!(full, PathBuf::from("/srv/site/days/day1/index.html"));
    }

    #[test]
    fn parent_references_are_rejected() {
        assert!(matches!(
            resolve_within_root(&root(), "../../etc/passwd"),
            Err(GatewayError::PathTraversal(_))
        ));
        assert!(matches!(
            resolve_within_root(&root(), "days/../../../etc/passwd"),
            Err(GatewayError::PathTraversal(_))
        ));
        assert!(matches!(
            resolve_within_root(&root(), "/days/../index.html"),
            Err(GatewayError::PathTraversal(_))
        ));
    }

    #[test]
    fn root_itself_is_allowed() {
        assert_eq!(resolve_within_root(&root(), "").unwrap(), root());
        assert_eq!(resolve_within_root(&root(), "/").unwrap(), root());
    }

    #[test]
    fn filenames_must_be_single_segments() {
        assert!(safe_filename("photo_12.jpg").is_ok());
        // interior dots are fine, only the ".." component is a traversal
        assert!(safe_filename("a..b.jpg").is_ok());
        assert!(safe_filename("a/b.jpg").is_err());
        assert!(safe_filename("..").is_err());
        assert!(safe_filename("").is_err());
    }
}
