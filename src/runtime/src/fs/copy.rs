//! Recursive copy that preserves symlinks and stays inside a root.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use orca_core::error::{BuildError, Result};
use walkdir::WalkDir;

use super::securejoin::secure_join;

/// Copy `src` into `dst`, where `dst` lies under `root`.
///
/// If `dst` is an existing directory, `src` lands inside it under its own
/// file name. Otherwise `src` is copied to `dst` itself. Returns the path
/// that was written.
pub fn copy_into(src: &Path, root: &Path, dst: &Path) -> Result<PathBuf> {
    let target = if dst.is_dir() {
        let name = src.file_name().ok_or_else(|| {
            BuildError::InvalidPath(format!("{} has no file name", src.display()))
        })?;
        dst.join(name)
    } else {
        dst.to_path_buf()
    };

    copy_tree(src, root, &target)?;
    Ok(target)
}

/// Copy `src` to exactly `dst`, recursing into directories.
///
/// Every output path is resolved again inside `root`, so symlinks already
/// present under `root` are followed only as far as `root` allows. Symlinks
/// in `src` are recreated with the same target and never followed.
/// Directories are merged with whatever already exists at `dst`; files and
/// symlinks already present are replaced, not written through.
pub fn copy_tree(src: &Path, root: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(walk_error)?;
        let relative = below(entry.path(), src)?;
        let out = if relative.as_os_str().is_empty() {
            dst.to_path_buf()
        } else {
            dst.join(relative)
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            let out = confine(root, &out)?;
            fs::create_dir_all(&out)?;
            let permissions = entry.metadata().map_err(walk_error)?.permissions();
            fs::set_permissions(&out, permissions)?;
            continue;
        }

        let out = confine_parent(root, &out)?;
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        remove_existing(&out)?;
        if file_type.is_symlink() {
            let target = fs::read_link(entry.path())?;
            symlink(&target, &out)?;
        } else {
            fs::copy(entry.path(), &out).map_err(|e| {
                BuildError::IoError(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to copy {} to {}: {}",
                        entry.path().display(),
                        out.display(),
                        e
                    ),
                ))
            })?;
        }
    }

    Ok(())
}

fn below<'a>(path: &'a Path, base: &Path) -> Result<&'a Path> {
    path.strip_prefix(base).map_err(|_| {
        BuildError::InvalidPath(format!(
            "{} is not below {}",
            path.display(),
            base.display()
        ))
    })
}

/// Resolve `path` (lexically under `root`) against the current tree.
fn confine(root: &Path, path: &Path) -> Result<PathBuf> {
    secure_join(root, below(path, root)?)
}

/// Like [`confine`], but the last component itself is never followed.
fn confine_parent(root: &Path, path: &Path) -> Result<PathBuf> {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if path != root => Ok(confine(root, parent)?.join(name)),
        _ => Err(BuildError::InvalidPath(format!(
            "cannot copy a file onto {}",
            path.display()
        ))),
    }
}

/// Remove a non-directory entry at `path` if there is one.
fn remove_existing(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if !metadata.is_dir() => fs::remove_file(path)?,
        _ => {}
    }
    Ok(())
}

fn walk_error(err: walkdir::Error) -> BuildError {
    BuildError::IoError(std::io::Error::new(
        std::io::ErrorKind::Other,
        err.to_string(),
    ))
}
