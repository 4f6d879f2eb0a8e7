//! Makes sure both sides of a bridge have a local working copy, cloning on
//! first sight of a URL and fetching on every run after that.
//!
//! A clone is a one-time, hard failure: without it there is nothing to sync
//! against. An update pull/fetch is best-effort: a transient network blip
//! shouldn't abort a run that could otherwise still make progress against
//! whatever is already on disk.

use log::{info, warn};

use crate::commit_vcs;
use crate::error::Result;
use crate::model::RepoHandle;
use crate::patch_vcs::PatchVcs;

/// Clones `handle.url` into `handle.local_path` if it isn't there yet, then
/// fetches. A pre-existing clone that fails to fetch is logged and left as-is.
pub fn ensure_commit_clone(handle: &RepoHandle) -> Result<()> {
  if handle.local_path.join(".git").exists() {
    if let Err(err) = commit_vcs::fetch(&handle.local_path) {
      warn!(
        "fetch failed for commit repo at {}: {err}",
        handle.local_path.display()
      );
    }
    return Ok(());
  }

  info!(
    "cloning commit repo {} into {}",
    handle.url,
    handle.local_path.display()
  );
  commit_vcs::clone(&handle.url, &handle.local_path)
}

/// Same idea for the patch side, via whichever `PatchVcs` the caller is using
/// (the real `pijul` binary in production, a fake in tests). Pijul has no
/// separate clone step: `init` creates an empty repository, and `pull` with
/// a remote URL both registers the remote and fetches from it, so the first
/// run does both in one call.
pub fn ensure_patch_clone(handle: &RepoHandle, vcs: &dyn PatchVcs) -> Result<()> {
  if handle.local_path.join(".pijul").exists() {
    if let Err(err) = vcs.pull(&handle.local_path, None) {
      warn!(
        "pull failed for patch repo at {}: {err}",
        handle.local_path.display()
      );
    }
    return Ok(());
  }

  info!(
    "initializing patch repo {} at {}",
    handle.url,
    handle.local_path.display()
  );
  std::fs::create_dir_all(&handle.local_path).map_err(|source| crate::error::BridgeError::Io {
    source,
    path: handle.local_path.clone(),
  })?;
  vcs.init(&handle.local_path)?;
  if let Err(err) = vcs.pull(&handle.local_path, Some(&handle.url)) {
    warn!(
      "initial pull failed for patch repo at {}: {err}",
      handle.local_path.display()
    );
  }
  Ok(())
}
