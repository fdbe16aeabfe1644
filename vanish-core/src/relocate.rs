use std::fs;
use std::io;
use std::path::Path;

use crate::{Result, VanishError};

/// How [`move_entry_with`] relocates content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Atomic rename, copy + remove when the rename fails
    #[default]
    RenameOrCopy,
    /// Always copy + remove, as if source and destination were on different devices
    CopyThenRemove,
}

/// How a successful move was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relocation {
    Renamed,
    Copied,
}

/// Move a file, symlink or directory tree from `src` to `dst`.
pub fn move_entry(src: &Path, dst: &Path) -> Result<Relocation> {
    move_entry_with(src, dst, Strategy::RenameOrCopy)
}

/// Move with an explicit strategy.
///
/// The copy fallback is not atomic: `src` is removed only once the whole
/// copy succeeded. When the copy fails, whatever reached `dst` is removed
/// again (if `dst` did not exist beforehand) and `src` is left untouched.
pub fn move_entry_with(src: &Path, dst: &Path, strategy: Strategy) -> Result<Relocation> {
    let src_meta = fs::symlink_metadata(src).map_err(|e| VanishError::io(src, e))?;

    if strategy == Strategy::RenameOrCopy {
        match fs::rename(src, dst) {
            Ok(()) => return Ok(Relocation::Renamed),
            Err(err) => {
                tracing::debug!(
                    src = %src.display(),
                    dst = %dst.display(),
                    error = %err,
                    "rename failed, falling back to copy"
                );
            }
        }
    }

    let dst_existed = fs::symlink_metadata(dst).is_ok();
    if let Err(err) = copy_entry_with_meta(src, dst, &src_meta) {
        if !dst_existed && let Err(cleanup_err) = remove_entry(dst) {
            tracing::debug!(
                path = %dst.display(),
                error = %cleanup_err,
                "failed to remove partial copy"
            );
        }
        return Err(err);
    }

    if let Err(err) = remove_entry(src) {
        // Content is complete at dst; keep it so nothing is lost
        tracing::warn!(
            src = %src.display(),
            copy = %dst.display(),
            error = %err,
            "copied but could not remove source"
        );
        return Err(err);
    }

    Ok(Relocation::Copied)
}

/// Recursively copy `src` to `dst`, overwriting files that already exist.
///
/// File permissions are carried over, directory permissions are applied
/// once the directory's content has been copied. Symlinks are recreated,
/// not followed.
pub fn copy_entry(src: &Path, dst: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(src).map_err(|e| VanishError::io(src, e))?;
    copy_entry_with_meta(src, dst, &meta)
}

fn copy_entry_with_meta(src: &Path, dst: &Path, meta: &fs::Metadata) -> Result<()> {
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        copy_symlink(src, dst)
    } else if file_type.is_dir() {
        copy_dir(src, dst, meta)
    } else {
        copy_file(src, dst)
    }
}

fn copy_dir(src: &Path, dst: &Path, meta: &fs::Metadata) -> Result<()> {
    fs::create_dir_all(dst).map_err(|e| VanishError::io(dst, e))?;

    let entries = fs::read_dir(src).map_err(|e| VanishError::io(src, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| VanishError::io(src, e))?;
        let child_src = entry.path();
        let child_dst = dst.join(entry.file_name());
        let child_meta =
            fs::symlink_metadata(&child_src).map_err(|e| VanishError::io(&child_src, e))?;
        copy_entry_with_meta(&child_src, &child_dst, &child_meta)?;
    }

    fs::set_permissions(dst, meta.permissions()).map_err(|e| VanishError::io(dst, e))
}

fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    // fs::copy carries the permission bits over
    fs::copy(src, dst).map_err(|e| VanishError::io(src, e))?;
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target = fs::read_link(src).map_err(|e| VanishError::io(src, e))?;
    if fs::symlink_metadata(dst).is_ok() {
        remove_entry(dst)?;
    }
    std::os::unix::fs::symlink(&target, dst).map_err(|e| VanishError::io(dst, e))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    copy_file(src, dst)
}

/// Remove a file, symlink or directory tree. Missing paths are not an error.
pub fn remove_entry(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(VanishError::io(path, err)),
    };

    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(VanishError::io(path, err)),
    }
}
