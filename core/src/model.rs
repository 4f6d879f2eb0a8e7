//! Data types shared across the Fetcher, both Exporters, and the Orchestrator.

use std::path::PathBuf;

use crate::ledger::Ledger;
use crate::workdir;

/// A `(url, local_path)` pair. One handle exists per side of a bridge.
#[derive(Debug, Clone)]
pub struct RepoHandle {
  pub url: String,
  pub local_path: PathBuf,
}

impl RepoHandle {
  pub fn new(url: impl Into<String>) -> Self {
    let url = url.into();
    let local_path = workdir::path(&url);
    Self { url, local_path }
  }
}

/// A commit-side ref: `refs/heads/<name>` paired with its tip commit hash.
#[derive(Debug, Clone)]
pub struct BranchRef {
  pub name: String,
  pub tip: String,
}

/// The fields of a Git commit the engine actually reads. Never mutated;
/// referenced only until it has been recorded as a patch. Built by
/// `commit_vcs::commit_meta`.
#[derive(Debug, Clone)]
pub struct CommitMeta {
  pub hash: String,
  pub parents: Vec<String>,
  pub author: String,
  pub date: String,
  pub subject: String,
  pub body: String,
  pub changed_files: Vec<String>,
}

/// The fields of a Pijul patch the engine actually reads.
#[derive(Debug, Clone)]
pub struct PatchMeta {
  pub id: String,
  pub author: String,
  pub timestamp: String,
  pub message: String,
}

/// The two working trees plus the process-lifetime idempotence ledger, bundled
/// for the life of one Sync Orchestrator run.
pub struct SyncContext {
  pub commit_repo: RepoHandle,
  pub patch_repo: RepoHandle,
  pub ledger: Ledger,
}

impl SyncContext {
  pub fn new(commit_url: impl Into<String>, patch_url: impl Into<String>) -> Self {
    Self {
      commit_repo: RepoHandle::new(commit_url),
      patch_repo: RepoHandle::new(patch_url),
      ledger: Ledger::new(),
    }
  }
}
