//! Commit→Patch Exporter: walks every branch's commit graph and records one
//! patch per not-yet-exported commit.
//!
//! The graph walk is iterative (an explicit two-phase stack) rather than
//! recursive on commit parents — commit DAGs in real repositories get deep
//! enough that a naive recursive port would risk a stack overflow the
//! original's call-per-commit recursion never had to worry about under a
//! cooperative scheduler.

use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;

use log::{debug, info, warn};

use crate::banner;
use crate::commit_vcs;
use crate::error::Result;
use crate::merge;
use crate::model::SyncContext;
use crate::patch_vcs::PatchVcs;
use crate::tags;

const PATCH_ID_LEN: usize = 88;

pub fn export_commits_to_patches(ctx: &mut SyncContext, vcs: &dyn PatchVcs) -> Result<()> {
  let commit_path = ctx.commit_repo.local_path.clone();
  let patch_path = ctx.patch_repo.local_path.clone();

  let branches = commit_vcs::list_branches(&commit_path)?;
  for branch in branches {
    if let Err(err) = vcs.checkout(&patch_path, &branch.name) {
      warn!("could not check out branch '{}' on patch side: {err}", branch.name);
      continue;
    }
    let order = topological_untranslated(ctx, vcs, &commit_path, &patch_path, &branch.name, &branch.tip)?;
    for commit_hash in order {
      translate_commit(ctx, vcs, &commit_path, &patch_path, &branch.name, &commit_hash)?;
    }
  }
  Ok(())
}

/// Steps 1–4 of the per-commit exporter: short-circuit checks plus the
/// recursive parent walk, reshaped into a post-order stack so parents are
/// always translated before the commits that depend on them.
fn topological_untranslated(
  ctx: &SyncContext,
  vcs: &dyn PatchVcs,
  commit_path: &Path,
  patch_path: &Path,
  branch: &str,
  tip: &str,
) -> Result<Vec<String>> {
  let mut order = Vec::new();
  let mut visited = HashSet::new();
  let mut stack = vec![(tip.to_string(), false)];

  while let Some((hash, expanded)) = stack.pop() {
    if visited.contains(&hash) {
      continue;
    }
    if expanded {
      visited.insert(hash.clone());
      order.push(hash);
      continue;
    }
    if already_translated(ctx, vcs, commit_path, patch_path, branch, &hash)? {
      visited.insert(hash);
      continue;
    }
    stack.push((hash.clone(), true));
    for parent in commit_vcs::parents_of(commit_path, &hash)? {
      if !visited.contains(&parent) {
        stack.push((parent, false));
      }
    }
  }

  Ok(order)
}

/// Steps 1–3: tag path, ledger path, reverse-direction guard.
fn already_translated(
  ctx: &SyncContext,
  vcs: &dyn PatchVcs,
  commit_path: &Path,
  patch_path: &Path,
  branch: &str,
  commit_hash: &str,
) -> Result<bool> {
  if already_exported_by_tag(vcs, patch_path, branch, commit_hash)? {
    debug!("commit {commit_hash} already has a tagged patch, skipping");
    return Ok(true);
  }
  if ctx.ledger.has_handled_commit(commit_hash) {
    debug!("commit {commit_hash} already in ledger, skipping");
    return Ok(true);
  }
  let message = commit_vcs::message_body(commit_path, commit_hash)?;
  if tags::message_has_pijul_origin(&message) {
    debug!("commit {commit_hash} originated on the patch side, skipping (reverse guard)");
    return Ok(true);
  }
  Ok(false)
}

fn already_exported_by_tag(
  vcs: &dyn PatchVcs,
  patch_path: &Path,
  branch: &str,
  commit_hash: &str,
) -> Result<bool> {
  let tag = tags::imported_from_commit(commit_hash);
  let candidates = vcs.log_hash_only(patch_path, branch, Some(&tag))?;
  for candidate in candidates {
    if candidate.len() != PATCH_ID_LEN {
      continue;
    }
    let description = vcs.patch_description(patch_path, &candidate)?;
    if description.trim() == tag {
      return Ok(true);
    }
  }
  Ok(false)
}

/// Steps 5–11: reconcile every changed file, then record.
fn translate_commit(
  ctx: &mut SyncContext,
  vcs: &dyn PatchVcs,
  commit_path: &Path,
  patch_path: &Path,
  branch: &str,
  commit_hash: &str,
) -> Result<()> {
  if already_translated(ctx, vcs, commit_path, patch_path, branch, commit_hash)? {
    return Ok(());
  }

  vcs.checkout(patch_path, branch)?;

  let meta = commit_vcs::commit_meta(commit_path, commit_hash)?;
  let short_hash: String = commit_hash.chars().take(10).collect();

  let theirs: HashMap<String, Option<Vec<u8>>> = meta
    .changed_files
    .iter()
    .map(|f| (f.clone(), commit_vcs::read_file_at_rev(commit_path, commit_hash, f)))
    .collect();

  let base: HashMap<String, Option<Vec<u8>>> = if let Some(parent_hash) = meta.parents.first() {
    meta
      .changed_files
      .iter()
      .map(|f| (f.clone(), commit_vcs::read_file_at_rev(commit_path, parent_hash, f)))
      .collect()
  } else {
    meta.changed_files.iter().map(|f| (f.clone(), None)).collect()
  };

  for file in &meta.changed_files {
    let base_bytes = base.get(file).cloned().flatten();
    let theirs_bytes = theirs.get(file).cloned().flatten();
    let ours_path = patch_path.join(file);
    let ours_bytes = std::fs::read(&ours_path).ok();

    reconcile_file(patch_path, file, base_bytes, theirs_bytes, ours_bytes, &short_hash)?;
  }

  if vcs.status_short(patch_path)?.trim().is_empty() {
    debug!("commit {commit_hash} produced an empty diff on the patch side");
    ctx.ledger.mark_commit_handled(commit_hash.to_string());
    return Ok(());
  }

  let date = meta.date.replacen(' ', "T", 1);

  let patch_id = vcs.record(
    patch_path,
    branch,
    &meta.author,
    &date,
    &tags::imported_from_commit(commit_hash),
    &meta.subject,
  )?;
  info!("recorded patch {patch_id} for commit {commit_hash}");

  Ok(())
}

/// The merge decision table from step 7, applied to a single changed file.
fn reconcile_file(
  patch_path: &Path,
  relative_path: &str,
  base: Option<Vec<u8>>,
  theirs: Option<Vec<u8>>,
  ours: Option<Vec<u8>>,
  commit_short_hash: &str,
) -> Result<()> {
  let target = patch_path.join(relative_path);

  match (base.is_some(), theirs.is_some(), ours.is_some()) {
    (false, false, false) => {
      warn!("{relative_path} absent on all three sides despite being in the changed-file list");
    }
    (false, _, false) => {
      // Creation: base and ours both start empty, fall through to three-way.
      let theirs_text = lossy(theirs.as_deref());
      let outcome = merge::three_way_merge("", "", &theirs_text, "Pijul", &format!("Git (commit {commit_short_hash})"));
      write_merged(&target, &outcome)?;
    }
    (false, _, true) => {
      let ours_text = lossy(ours.as_deref());
      let theirs_text = lossy(theirs.as_deref());
      if ours_text == theirs_text {
        return Ok(());
      }
      let content = format!("{}{ours_text}", banner::recreated_by_commit_side(commit_short_hash));
      write_file(&target, content.as_bytes())?;
    }
    (true, false, _) => {
      let _ = std::fs::remove_file(&target);
    }
    (true, _, false) => {
      // Deleted on the patch side: leave it alone.
    }
    (true, true, true) => {
      let base_text = lossy(base.as_deref());
      let ours_text = lossy(ours.as_deref());
      let theirs_text = lossy(theirs.as_deref());
      let outcome = merge::three_way_merge(
        &base_text,
        &ours_text,
        &theirs_text,
        "Pijul",
        &format!("Git (commit {commit_short_hash})"),
      );
      write_merged(&target, &outcome)?;
    }
  }

  Ok(())
}

fn write_merged(target: &Path, outcome: &merge::MergeOutcome) -> Result<()> {
  if outcome.has_conflict {
    let content = format!("{}{}", banner::both_modified(), outcome.text);
    write_file(target, content.as_bytes())
  } else {
    write_file(target, outcome.text.as_bytes())
  }
}

fn write_file(target: &Path, content: &[u8]) -> Result<()> {
  if let Some(parent) = target.parent() {
    std::fs::create_dir_all(parent).map_err(|source| crate::error::BridgeError::Io {
      source,
      path: parent.to_path_buf(),
    })?;
  }
  std::fs::write(target, content).map_err(|source| crate::error::BridgeError::Io {
    source,
    path: target.to_path_buf(),
  })
}

fn lossy(bytes: Option<&[u8]>) -> String {
  bytes.map(|b| String::from_utf8_lossy(b).into_owned()).unwrap_or_default()
}
