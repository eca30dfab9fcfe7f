//! Path normalization utilities.
//!
//! Pure functions for path manipulation. No I/O, no side effects: symlinks
//! are not resolved and the filesystem is never touched, so these behave
//! identically for paths that do not exist yet (output files, watch targets
//! checked later).

use std::path::{Component, Path, PathBuf};

use crate::error::BuildError;

/// Resolve a user-supplied path to absolute, normalized form.
///
/// - Absolute input: lexically normalized, `root` is ignored.
/// - Relative input: joined onto `root`, then lexically normalized.
///
/// `root` must itself be absolute, and `path` must be non-empty.
///
/// # Example
/// ```ignore
/// use platen::utils::path::absolutize;
/// let abs = absolutize(Path::new("report/data.yml"), Path::new("/work"))?;
/// assert_eq!(abs, PathBuf::from("/work/report/data.yml"));
/// ```
pub fn absolutize(path: &Path, root: &Path) -> Result<PathBuf, BuildError> {
    if path.as_os_str().is_empty() {
        return Err(BuildError::InvalidArgument("empty path".into()));
    }
    if path.is_absolute() {
        return Ok(normalize(path));
    }
    if !root.is_absolute() {
        return Err(BuildError::InvalidArgument(format!(
            "root directory must be absolute, got `{}`",
            root.display()
        )));
    }
    Ok(normalize(&root.join(path)))
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. `..` at the root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` directly above the root is the root itself.
                Some(Component::RootDir | Component::Prefix(_)) => {}
                // Leading `..` in a relative path: keep it.
                _ => out.push(Component::ParentDir),
            },
            other => out.push(other),
        }
    }
    out
}
