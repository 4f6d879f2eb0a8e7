//! Recursive file-tree mirror, excluding each side's own metadata directory.
//!
//! The Patch→Commit replayer needs to sync a reconstructed patch working tree
//! onto the commit working tree without touching `.git`/`.pijul`. `fs_extra`'s
//! directory copy has no exclude-filter support, so this walks the tree by
//! hand with `walkdir`, which already gives per-entry control over descent.

use std::path::{Path, PathBuf};

use crate::error::{BridgeError, Result};

pub fn mirror_excluding(src: &Path, dst: &Path, exclude_top_level: &[&str]) -> Result<()> {
  remove_existing(dst, exclude_top_level)?;
  copy_all(src, dst, exclude_top_level)
}

fn is_excluded(path: &Path, root: &Path, exclude_top_level: &[&str]) -> bool {
  match path.strip_prefix(root) {
    Ok(rel) => match rel.components().next() {
      Some(first) => {
        let name = first.as_os_str().to_string_lossy();
        exclude_top_level.iter().any(|e| *e == name)
      }
      None => false,
    },
    Err(_) => false,
  }
}

fn remove_existing(dst: &Path, exclude_top_level: &[&str]) -> Result<()> {
  if !dst.exists() {
    return Ok(());
  }

  let files: Vec<PathBuf> = walkdir::WalkDir::new(dst)
    .into_iter()
    .filter_entry(|e| !is_excluded(e.path(), dst, exclude_top_level))
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_file())
    .map(|e| e.path().to_path_buf())
    .collect();
  for file in files {
    let _ = std::fs::remove_file(&file);
  }

  let mut dirs: Vec<PathBuf> = walkdir::WalkDir::new(dst)
    .into_iter()
    .filter_entry(|e| !is_excluded(e.path(), dst, exclude_top_level))
    .filter_map(|e| e.ok())
    .filter(|e| e.file_type().is_dir() && e.path() != dst)
    .map(|e| e.path().to_path_buf())
    .collect();
  dirs.sort_by_key(|p| std::cmp::Reverse(p.components().count()));
  for dir in dirs {
    let _ = std::fs::remove_dir(&dir);
  }

  Ok(())
}

fn copy_all(src: &Path, dst: &Path, exclude_top_level: &[&str]) -> Result<()> {
  for entry in walkdir::WalkDir::new(src)
    .into_iter()
    .filter_entry(|e| !is_excluded(e.path(), src, exclude_top_level))
  {
    let entry = entry.map_err(|_| BridgeError::PathNotFound(src.to_path_buf()))?;
    if !entry.file_type().is_file() {
      continue;
    }
    let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
    let target = dst.join(relative);
    if let Some(parent) = target.parent() {
      std::fs::create_dir_all(parent).map_err(|source| BridgeError::Io {
        source,
        path: parent.to_path_buf(),
      })?;
    }
    std::fs::copy(entry.path(), &target).map_err(|source| BridgeError::Io {
      source,
      path: target.clone(),
    })?;
  }
  Ok(())
}
