//! Conflict banners prepended to file content whenever the Commit→Patch
//! Exporter can't reconcile both sides without a human. One template, one
//! `cause` clause per call site, per the Design Note consolidating what were
//! three near-identical banners in the original.

const HEADER: &str = "Notice by GitPijul proxy:";

fn banner(cause: &str) -> String {
  format!("/*\n * {HEADER} {cause} Make\n * sure to merge the conflict yourself and remove this banner.\n */\n")
}

/// Both sides touched the same file since the last common ancestor.
pub fn both_modified() -> String {
  banner("this file was modified by both Git and Pijul.")
}

/// The commit side recreated a file the patch side independently created;
/// the patch side's own version is preserved.
pub fn recreated_by_commit_side(commit_short_hash: &str) -> String {
  banner(&format!(
    "this file was recreated by Git commit {commit_short_hash}, but already exists on the Pijul side."
  ))
}
