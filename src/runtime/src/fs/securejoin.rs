//! Symlink-safe path joining.
//!
//! [`secure_join`] resolves an untrusted path inside a root directory the way
//! the kernel would if `root` were `/`: symlinks are followed, but absolute
//! targets are re-rooted and `..` can never climb above the root.
//!
//! The guarantee only holds at the time of the call. Anything created or
//! swapped underneath `root` afterwards is not covered; callers must not let
//! the tree change between resolution and use.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use orca_core::error::{BuildError, Result};

use super::clean::clean;

/// Maximum number of symlinks dereferenced during a single resolution.
pub const MAX_SYMLINK_LIMIT: usize = 255;

/// Join `unsafe_path` onto `root`, resolving symlinks so that the result
/// always lies within `root`.
///
/// Missing components are treated as plain directories, so the result may
/// name something that does not exist yet.
pub fn secure_join(root: &Path, unsafe_path: &Path) -> Result<PathBuf> {
    let root = path_str(root)?;
    let unsafe_path = path_str(unsafe_path)?;
    resolve(root, unsafe_path).map(PathBuf::from)
}

fn resolve(root: &str, unsafe_path: &str) -> Result<String> {
    // Validated prefix, kept relative to root and unrooted.
    let mut path = String::new();
    let mut pending = unsafe_path.to_string();
    let mut followed = 0usize;

    while !pending.is_empty() {
        let (component, rest) = match pending.split_once('/') {
            Some((component, rest)) => (component.to_string(), rest.to_string()),
            None => (pending.clone(), String::new()),
        };
        pending = rest;

        let candidate = clean(&format!("/{}{}", path, component));
        if candidate == "/" {
            path.clear();
            continue;
        }

        let full = clean(&format!("{}{}", root, candidate));
        let is_symlink = match fs::symlink_metadata(&full) {
            Ok(metadata) => metadata.file_type().is_symlink(),
            Err(e) if is_missing(&e) => false,
            Err(e) => return Err(e.into()),
        };

        if !is_symlink {
            path.push_str(&component);
            path.push('/');
            continue;
        }

        followed += 1;
        if followed > MAX_SYMLINK_LIMIT {
            return Err(BuildError::SymlinkLoop { path: full });
        }

        let target = fs::read_link(&full)?;
        let target = path_str(&target)?;
        if target.starts_with('/') {
            path.clear();
        }
        pending = format!("{}/{}", target, pending);
    }

    Ok(clean(&format!("{}{}", root, clean(&format!("/{}", path)))))
}

/// `ENOENT` and `ENOTDIR` both mean "nothing here to follow".
fn is_missing(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound || err.raw_os_error() == Some(libc::ENOTDIR)
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| BuildError::InvalidPath(format!("{} is not valid UTF-8", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    fn root() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("root");
        fs::create_dir(&root).unwrap();
        (tmp, root)
    }

    fn join(root: &Path, unsafe_path: &str) -> PathBuf {
        secure_join(root, Path::new(unsafe_path)).unwrap()
    }

    #[test]
    fn test_plain_paths_stay_lexical() {
        let (_tmp, root) = root();
        assert_eq!(join(&root, "a/b/../c"), root.join("a/c"));
        assert_eq!(join(&root, "/x/y"), root.join("x/y"));
        assert_eq!(join(&root, ""), root);
        assert_eq!(join(&root, "."), root);
    }

    #[test]
    fn test_dotdot_cannot_escape() {
        let (_tmp, root) = root();
        assert_eq!(join(&root, "../../etc/passwd"), root.join("etc/passwd"));
        assert_eq!(join(&root, "a/../../../b"), root.join("b"));
    }

    #[test]
    fn test_absolute_symlink_is_rerooted() {
        let (_tmp, root) = root();
        symlink("/etc/passwd", root.join("a")).unwrap();
        assert_eq!(join(&root, "a"), root.join("etc/passwd"));
    }

    #[test]
    fn test_relative_escape_symlink_is_confined() {
        let (_tmp, root) = root();
        fs::create_dir(root.join("dir")).unwrap();
        symlink("../../../../../etc", root.join("dir/up")).unwrap();
        assert_eq!(join(&root, "dir/up/shadow"), root.join("etc/shadow"));
    }

    #[test]
    fn test_relative_symlink_resolves_from_its_directory() {
        let (_tmp, root) = root();
        fs::create_dir_all(root.join("a/b")).unwrap();
        symlink("../c", root.join("a/b/link")).unwrap();
        assert_eq!(join(&root, "a/b/link/file"), root.join("a/c/file"));
    }

    /// `link0 -> link1 -> ... -> link{k-1} -> /final/dest`: k dereferences.
    fn chain(root: &Path, k: usize) {
        for i in 0..k {
            let target = if i + 1 == k {
                "/final/dest".to_string()
            } else {
                format!("link{}", i + 1)
            };
            symlink(&target, root.join(format!("link{}", i))).unwrap();
        }
    }

    #[test]
    fn test_symlink_chain_resolves() {
        let (_tmp, root) = root();
        chain(&root, 10);
        assert_eq!(join(&root, "link0"), root.join("final/dest"));
    }

    #[test]
    fn test_chain_at_limit_resolves() {
        let (_tmp, root) = root();
        chain(&root, MAX_SYMLINK_LIMIT);
        assert_eq!(join(&root, "link0"), root.join("final/dest"));
    }

    #[test]
    fn test_chain_one_past_limit_fails() {
        let (_tmp, root) = root();
        chain(&root, MAX_SYMLINK_LIMIT + 1);
        let err = secure_join(&root, Path::new("link0")).unwrap_err();
        assert!(matches!(err, BuildError::SymlinkLoop { .. }));
    }

    #[test]
    fn test_long_symlink_chain_fails() {
        let (_tmp, root) = root();
        let k = MAX_SYMLINK_LIMIT + 10;
        for i in 0..k {
            symlink(format!("link{}", i + 1), root.join(format!("link{}", i))).unwrap();
        }
        let err = secure_join(&root, Path::new("link0")).unwrap_err();
        assert!(matches!(err, BuildError::SymlinkLoop { .. }));
        assert!(err.to_string().contains("Too many levels of symbolic links"));
    }

    #[test]
    fn test_self_loop_fails() {
        let (_tmp, root) = root();
        symlink("loop", root.join("loop")).unwrap();
        assert!(matches!(
            secure_join(&root, Path::new("loop/x")),
            Err(BuildError::SymlinkLoop { .. })
        ));
    }

    #[test]
    fn test_component_below_regular_file() {
        let (_tmp, root) = root();
        fs::write(root.join("file"), b"data").unwrap();
        assert_eq!(join(&root, "file/child"), root.join("file/child"));
    }

    #[test]
    fn test_result_always_under_root() {
        let (_tmp, root) = root();
        fs::create_dir(root.join("d")).unwrap();
        symlink("/", root.join("slash")).unwrap();
        symlink("..", root.join("d/parent")).unwrap();
        symlink("../../..", root.join("d/far")).unwrap();
        symlink("/../../etc", root.join("abs")).unwrap();

        let prefix = clean(root.to_str().unwrap());
        let inputs = [
            "slash/etc",
            "d/parent/parent/x",
            "d/far/far/y",
            "abs/../..",
            "../d/../../slash",
            "/d/./far/..//z",
            "..",
            "/",
        ];
        for input in inputs {
            let resolved = join(&root, input);
            let resolved = resolved.to_str().unwrap();
            assert!(
                resolved.starts_with(&prefix),
                "{:?} resolved outside root: {}",
                input,
                resolved
            );
        }
    }
}
