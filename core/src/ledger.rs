//! In-memory set of already-processed identifiers, consulted and updated by
//! the Exporters to break translation cycles within and across runs of a
//! single process.
//!
//! This is deliberately a plain struct owned by `SyncContext`, not process-wide
//! mutable state: the original proxy kept two module-level lists
//! (`handled_git_commits`, `handled_pijul_patches`); here they become fields
//! threaded through explicitly, so ownership is unambiguous and a future
//! multi-bridge process can hold one `Ledger` per bridge without cross-talk.

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct Ledger {
  handled_commits: HashSet<String>,
  handled_patches: HashSet<String>,
}

impl Ledger {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn has_handled_commit(&self, commit_hash: &str) -> bool {
    self.handled_commits.contains(commit_hash)
  }

  pub fn mark_commit_handled(&mut self, commit_hash: impl Into<String>) {
    self.handled_commits.insert(commit_hash.into());
  }

  pub fn has_handled_patch(&self, patch_id: &str) -> bool {
    self.handled_patches.contains(patch_id)
  }

  pub fn mark_patch_handled(&mut self, patch_id: impl Into<String>) {
    self.handled_patches.insert(patch_id.into());
  }

  pub fn handled_patches(&self) -> impl Iterator<Item = &str> {
    self.handled_patches.iter().map(String::as_str)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn commit_membership_tracks_marks() {
    let mut ledger = Ledger::new();
    assert!(!ledger.has_handled_commit("abc"));
    ledger.mark_commit_handled("abc");
    assert!(ledger.has_handled_commit("abc"));
  }

  #[test]
  fn patch_membership_tracks_marks() {
    let mut ledger = Ledger::new();
    assert!(!ledger.has_handled_patch("p1"));
    ledger.mark_patch_handled("p1");
    assert!(ledger.has_handled_patch("p1"));
    assert_eq!(ledger.handled_patches().collect::<Vec<_>>(), vec!["p1"]);
  }
}
