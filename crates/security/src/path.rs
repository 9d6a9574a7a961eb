//! Path validation: filesystem sandboxing for the file tools.
//!
//! Resolves symlinks and relative segments, blocks paths that touch
//! credential material, and optionally confines access to a workspace root.

use std::path::{Component, Path, PathBuf};

/// Path fragments that are always refused, matched case-insensitively
/// against the fully resolved path.
const BLOCKED_PATH_FRAGMENTS: &[&str] = &[
    "/etc/shadow",
    "/etc/passwd",
    ".ssh/id_",
    ".env",
    ".git/config",
];

/// Error returned when path validation fails.
#[derive(Debug, thiserror::Error)]
pub enum PathPolicyError {
    #[error("Access to {fragment} is blocked for security")]
    BlockedPath { fragment: &'static str },

    #[error("Path must be within the workspace")]
    OutsideWorkspace,

    #[error("Invalid path")]
    InvalidPath,
}

/// Sanitize and validate a file path.
///
/// Resolution order:
/// 1. Expand `~` and make the path absolute.
/// 2. Canonicalize the longest existing prefix so symlinks and `..`
///    segments cannot escape, then re-append the non-existing tail (write
///    targets usually don't exist yet).
/// 3. Refuse paths containing any blocked fragment (case-insensitive).
/// 4. If a workspace root is given, refuse paths that are not equal to or
///    nested under it.
///
/// Malformed input yields [`PathPolicyError::InvalidPath`]; this function
/// never panics on untrusted path strings.
pub fn sanitize_path(path: &str, workspace: Option<&Path>) -> Result<PathBuf, PathPolicyError> {
    if path.is_empty() {
        return Err(PathPolicyError::InvalidPath);
    }

    let resolved = resolve(&expand_tilde(path))?;

    let lower = resolved.to_string_lossy().to_lowercase();
    for fragment in BLOCKED_PATH_FRAGMENTS {
        if lower.contains(fragment) {
            return Err(PathPolicyError::BlockedPath { fragment });
        }
    }

    if let Some(workspace) = workspace {
        let workspace = resolve(&expand_tilde(&workspace.to_string_lossy()))?;
        if !resolved.starts_with(&workspace) {
            return Err(PathPolicyError::OutsideWorkspace);
        }
    }

    Ok(resolved)
}

/// Resolve a path to an absolute, symlink-free form.
///
/// `canonicalize` fails on paths that don't exist, so for write targets we
/// canonicalize the deepest existing ancestor and normalize the remaining
/// tail lexically (rejecting `..` segments that would climb back out).
fn resolve(path: &str) -> Result<PathBuf, PathPolicyError> {
    let path = Path::new(path);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|_| PathPolicyError::InvalidPath)?
            .join(path)
    };

    if let Ok(canonical) = absolute.canonicalize() {
        return Ok(canonical);
    }

    // Find the deepest existing ancestor.
    let mut existing = absolute.clone();
    let mut tail: Vec<std::ffi::OsString> = Vec::new();
    loop {
        if existing.exists() {
            break;
        }
        match existing.file_name() {
            Some(name) => {
                tail.push(name.to_os_string());
                existing = existing
                    .parent()
                    .map(Path::to_path_buf)
                    .ok_or(PathPolicyError::InvalidPath)?;
            }
            // Ran out of named components without finding an existing
            // ancestor (e.g. a path of only ".." segments).
            None => return Err(PathPolicyError::InvalidPath),
        }
    }

    let mut resolved = existing
        .canonicalize()
        .map_err(|_| PathPolicyError::InvalidPath)?;

    for segment in tail.iter().rev() {
        match Path::new(segment).components().next() {
            Some(Component::Normal(_)) => resolved.push(segment),
            Some(Component::CurDir) | None => {}
            // A `..` in the non-existing tail cannot be verified against
            // the real filesystem; refuse rather than guess.
            _ => return Err(PathPolicyError::InvalidPath),
        }
    }

    Ok(resolved)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if (path.starts_with("~/") || path == "~")
        && let Ok(home) = std::env::var("HOME")
    {
        return path.replacen('~', &home, 1);
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_path_in_tempdir_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "hi").unwrap();

        let resolved = sanitize_path(file.to_str().unwrap(), None).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("notes.txt"));
    }

    #[test]
    fn nonexistent_file_resolves_through_parent() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-yet-written.txt");

        let resolved = sanitize_path(file.to_str().unwrap(), None).unwrap();
        assert!(resolved.ends_with("not-yet-written.txt"));
    }

    #[test]
    fn blocked_fragments_rejected() {
        for path in [
            "/etc/shadow",
            "/etc/passwd",
            "/home/user/.ssh/id_rsa",
            "/home/user/project/.env",
            "/home/user/project/.git/config",
        ] {
            let result = sanitize_path(path, None);
            assert!(
                matches!(result, Err(PathPolicyError::BlockedPath { .. })),
                "expected {path} to be blocked"
            );
        }
    }

    #[test]
    fn blocked_fragments_are_case_insensitive() {
        let result = sanitize_path("/home/user/.SSH/ID_rsa", None);
        assert!(matches!(result, Err(PathPolicyError::BlockedPath { .. })));
    }

    #[test]
    fn workspace_containment_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let inside = dir.path().join("file.txt");
        std::fs::write(&inside, "x").unwrap();

        assert!(sanitize_path(inside.to_str().unwrap(), Some(dir.path())).is_ok());

        let outside = tempfile::tempdir().unwrap();
        let elsewhere = outside.path().join("other.txt");
        std::fs::write(&elsewhere, "x").unwrap();

        let result = sanitize_path(elsewhere.to_str().unwrap(), Some(dir.path()));
        assert!(matches!(result, Err(PathPolicyError::OutsideWorkspace)));
    }

    #[test]
    fn workspace_root_itself_is_inside() {
        let dir = tempfile::tempdir().unwrap();
        assert!(sanitize_path(dir.path().to_str().unwrap(), Some(dir.path())).is_ok());
    }

    #[test]
    fn dotdot_escape_from_workspace_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let sneaky = format!("{}/sub/../../../etc/hosts", dir.path().display());
        let result = sanitize_path(&sneaky, Some(dir.path()));
        assert!(result.is_err());
    }

    #[test]
    fn empty_path_is_invalid_not_a_panic() {
        assert!(matches!(
            sanitize_path("", None),
            Err(PathPolicyError::InvalidPath)
        ));
    }

    #[test]
    fn relative_path_resolves_against_cwd() {
        let resolved = sanitize_path("Cargo.toml", None);
        // Whatever the cwd is, the result must be absolute or a clean error.
        if let Ok(p) = resolved {
            assert!(p.is_absolute());
        }
    }
}
