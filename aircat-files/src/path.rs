//! Relative path resolution under the music root

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// Join a client-supplied relative path onto `root`.
///
/// Rejects absolute paths and any `..` component so the result always
/// stays under `root`. Empty and `.` components are dropped.
pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf> {
    let mut resolved = root.to_path_buf();

    for component in Path::new(relative).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::InvalidPath(relative.to_string()));
            }
        }
    }

    Ok(resolved)
}

/// Final path component as display text
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_joins_under_root() {
        let root = Path::new("/music");
        assert_eq!(
            resolve(root, "rock/a.mp3").unwrap(),
            PathBuf::from("/music/rock/a.mp3")
        );
        assert_eq!(resolve(root, "./b.ogg").unwrap(), PathBuf::from("/music/b.ogg"));
        assert_eq!(resolve(root, "").unwrap(), PathBuf::from("/music"));
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let root = Path::new("/music");
        assert!(matches!(resolve(root, "../etc/passwd"), Err(Error::InvalidPath(_))));
        assert!(matches!(resolve(root, "a/../../b"), Err(Error::InvalidPath(_))));
        assert!(matches!(resolve(root, "/etc/passwd"), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("/music/rock/a.mp3")), "a.mp3");
        assert_eq!(file_name(Path::new("/")), "");
    }
}
