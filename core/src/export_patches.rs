//! Patch→Commit Exporter: for each patch-side branch, rolls back every
//! not-yet-exported patch to reconstruct its ancestor state, then replays
//! each as a commit in arrival order.

use std::collections::HashMap;

use log::{debug, info};

use crate::commit_vcs;
use crate::error::Result;
use crate::mirror;
use crate::model::{PatchMeta, SyncContext};
use crate::patch_vcs::PatchVcs;
use crate::tags;

const GIT_METADATA_DIR: &str = ".git";
const PIJUL_METADATA_DIR: &str = ".pijul";

/// What a previously-exported patch tells us about the commit it produced,
/// recovered by grepping commit history rather than carried across loop
/// iterations (see the Open Question this resolves in the accompanying
/// design notes).
#[derive(Clone)]
struct ExportedCommit {
  author: String,
  date: String,
  message_without_tag: String,
}

/// A resolved unit of replay work. `Remove` carries only what is still
/// knowable once a patch has left the log: its id, and whatever the commit
/// that originally exported it can still tell us.
pub enum PatchAction {
  Add {
    patch: PatchMeta,
    rollback_patch_id: String,
  },
  Remove {
    patch_id: String,
    timestamp: String,
    origin: Option<ExportedCommit>,
  },
}

impl PatchAction {
  fn timestamp(&self) -> &str {
    match self {
      PatchAction::Add { patch, .. } => &patch.timestamp,
      PatchAction::Remove { timestamp, .. } => timestamp,
    }
  }
}

pub fn export_patches_to_commits(ctx: &mut SyncContext, vcs: &dyn PatchVcs) -> Result<()> {
  let commit_path = ctx.commit_repo.local_path.clone();
  let patch_path = ctx.patch_repo.local_path.clone();

  for branch in vcs.branches(&patch_path)? {
    commit_vcs::checkout_or_create(&commit_path, &branch)?;

    let exported = build_exported_map(ctx, &commit_path, &branch)?;
    let current = current_replayable_patches(vcs, &ctx.ledger, &patch_path, &branch)?;
    let current_ids: std::collections::HashSet<&str> =
      current.iter().map(|p| p.id.as_str()).collect();

    let mut pending = Vec::new();
    for patch in &current {
      if !exported.contains_key(&patch.id) {
        pending.push(PendingAction::Add(patch.clone()));
      }
    }
    for (patch_id, origin) in &exported {
      if !current_ids.contains(patch_id.as_str()) {
        let timestamp = origin.as_ref().map(|o| o.date.clone()).unwrap_or_default();
        pending.push(PendingAction::Remove {
          patch_id: patch_id.clone(),
          timestamp,
          origin: origin.clone(),
        });
      }
    }

    let mut resolved = rollback_phase(vcs, &patch_path, &branch, pending)?;
    resolved.sort_by(|a, b| a.timestamp().cmp(b.timestamp()));

    for action in resolved {
      replay_action(ctx, vcs, &commit_path, &patch_path, &branch, action)?;
    }
  }

  Ok(())
}

enum PendingAction {
  Add(PatchMeta),
  Remove {
    patch_id: String,
    timestamp: String,
    origin: Option<ExportedCommit>,
  },
}

/// Step 2: patch_id → the commit that already exported it, `None` if only
/// the ledger remembers it (no commit exists to cite).
fn build_exported_map(
  ctx: &SyncContext,
  commit_path: &std::path::Path,
  branch: &str,
) -> Result<HashMap<String, Option<ExportedCommit>>> {
  let mut exported: HashMap<String, Option<ExportedCommit>> = HashMap::new();

  commit_vcs::checkout_or_create(commit_path, branch)?;
  let raw = commit_vcs::log_grep(commit_path, tags::pijul_tag_grep_pattern(), "%H\u{1}%B\u{2}")?;
  for (hash, body) in parse_tagged_records(&raw) {
    let Some(patch_id) = tags::find_imported_patch_id(&body) else {
      continue;
    };
    if ctx.ledger.has_handled_commit(&hash) {
      continue;
    }
    let author = commit_vcs::author_of(commit_path, &hash)?;
    let date = commit_vcs::date_of(commit_path, &hash)?;
    exported.insert(
      patch_id.to_string(),
      Some(ExportedCommit {
        author,
        date,
        message_without_tag: tags::strip_pijul_tag_line(&body),
      }),
    );
  }

  for patch_id in ctx.ledger.handled_patches() {
    exported.entry(patch_id.to_string()).or_insert(None);
  }

  Ok(exported)
}

fn parse_tagged_records(raw: &str) -> Vec<(String, String)> {
  raw
    .split('\u{2}')
    .map(str::trim)
    .filter(|r| !r.is_empty())
    .filter_map(|record| record.split_once('\u{1}'))
    .map(|(hash, body)| (hash.trim().to_string(), body.trim().to_string()))
    .collect()
}

/// Step 3: current patches on `branch`, normalized, with commit-originated
/// patches filtered out (the reverse-direction guard) and with patches this
/// process has already replayed this run filtered out too (the same
/// same-process idempotence the ledger gives the Commit→Patch direction).
fn current_replayable_patches(
  vcs: &dyn PatchVcs,
  ledger: &crate::ledger::Ledger,
  patch_path: &std::path::Path,
  branch: &str,
) -> Result<Vec<PatchMeta>> {
  Ok(
    vcs
      .log(patch_path, branch)?
      .into_iter()
      .filter(|p| !tags::message_has_git_origin(&p.message))
      .filter(|p| !ledger.has_handled_patch(&p.id))
      .collect(),
  )
}

/// Step 5: roll every `add` patch back (recording its inverse) and apply
/// then fully revert every `remove` patch, leaving the working tree at the
/// ancestor state each action represents.
fn rollback_phase(
  vcs: &dyn PatchVcs,
  patch_path: &std::path::Path,
  branch: &str,
  pending: Vec<PendingAction>,
) -> Result<Vec<PatchAction>> {
  let mut resolved = Vec::with_capacity(pending.len());
  for action in pending {
    match action {
      PendingAction::Add(patch) => {
        let rollback_patch_id = vcs.rollback(patch_path, &patch.id, branch)?;
        resolved.push(PatchAction::Add {
          patch,
          rollback_patch_id,
        });
      }
      PendingAction::Remove {
        patch_id,
        timestamp,
        origin,
      } => {
        vcs.apply(patch_path, &patch_id, branch)?;
        vcs.revert_all(patch_path, branch)?;
        resolved.push(PatchAction::Remove {
          patch_id,
          timestamp,
          origin,
        });
      }
    }
  }
  Ok(resolved)
}

/// 4.5.a: un-record the rollback, revert everything, mirror the tree, then
/// commit if anything actually changed.
fn replay_action(
  ctx: &mut SyncContext,
  vcs: &dyn PatchVcs,
  commit_path: &std::path::Path,
  patch_path: &std::path::Path,
  branch: &str,
  action: PatchAction,
) -> Result<()> {
  let unrecord_id = match &action {
    PatchAction::Add { rollback_patch_id, .. } => rollback_patch_id.clone(),
    PatchAction::Remove { patch_id, .. } => patch_id.clone(),
  };
  vcs.unrecord(patch_path, &unrecord_id, branch)?;
  vcs.revert_all(patch_path, branch)?;

  mirror::mirror_excluding(patch_path, commit_path, &[GIT_METADATA_DIR, PIJUL_METADATA_DIR])?;

  if commit_vcs::status_short(commit_path)?.trim().is_empty() {
    let patch_id = match &action {
      PatchAction::Add { patch, .. } => patch.id.clone(),
      PatchAction::Remove { patch_id, .. } => patch_id.clone(),
    };
    debug!("patch {patch_id} produced an empty diff on the commit side");
    ctx.ledger.mark_patch_handled(patch_id);
    return Ok(());
  }

  let (author, date, message) = match &action {
    PatchAction::Add { patch, .. } => (
      patch.author.clone(),
      patch.timestamp.clone(),
      format!("{}\n\n{}", patch.message, tags::imported_from_patch(&patch.id)),
    ),
    PatchAction::Remove { patch_id, origin, .. } => {
      let author = origin
        .as_ref()
        .map(|o| o.author.clone())
        .unwrap_or_else(|| "Pijul Bridge <bridge@localhost>".to_string());
      let date = origin.as_ref().map(|o| o.date.clone()).unwrap_or_default();
      let body = origin
        .as_ref()
        .map(|o| o.message_without_tag.clone())
        .filter(|m| !m.is_empty());
      let tag = tags::reverted_patch(patch_id);
      let message = match body {
        Some(original) => format!("{original}\n\n{tag}"),
        None => tag,
      };
      (author, date, message)
    }
  };

  commit_vcs::add_all(commit_path)?;
  let commit_hash = commit_vcs::commit(commit_path, &author, &date, &message)?;
  info!("recorded commit {commit_hash} on branch {branch}");

  Ok(())
}

#[cfg(test)]
mod tests {
  use std::path::Path;

  use super::*;
  use crate::patch_vcs::FakePatchVcs;

  fn patch(id: &str, author: &str, timestamp: &str, message: &str) -> PatchMeta {
    PatchMeta {
      id: id.to_string(),
      author: author.to_string(),
      timestamp: timestamp.to_string(),
      message: message.to_string(),
    }
  }

  #[test]
  fn parse_tagged_records_splits_on_record_and_field_separators() {
    let raw = "hash1\u{1}body one\u{2}hash2\u{1}body two\u{2}";
    let records = parse_tagged_records(raw);
    assert_eq!(records, vec![
      ("hash1".to_string(), "body one".to_string()),
      ("hash2".to_string(), "body two".to_string()),
    ]);
  }

  #[test]
  fn parse_tagged_records_skips_empty_records() {
    let raw = "\u{2}hash1\u{1}body\u{2}\u{2}";
    let records = parse_tagged_records(raw);
    assert_eq!(records, vec![("hash1".to_string(), "body".to_string())]);
  }

  #[test]
  fn current_replayable_patches_excludes_patches_with_a_git_origin_tag() {
    let plain = patch("a".repeat(88).as_str(), "A <a@x>", "t1", "plain edit");
    let bounced = patch(
      "b".repeat(88).as_str(),
      "A <a@x>",
      "t2",
      &format!("edit\n\n{}", tags::imported_from_commit(&"c".repeat(40))),
    );
    let fake = FakePatchVcs {
      logs_by_branch: [("main".to_string(), vec![plain.clone(), bounced])].into(),
      ..Default::default()
    };

    let ledger = crate::ledger::Ledger::new();
    let replayable = current_replayable_patches(&fake, &ledger, Path::new("/tmp"), "main").unwrap();
    assert_eq!(replayable.len(), 1);
    assert_eq!(replayable[0].id, plain.id);
  }

  #[test]
  fn current_replayable_patches_excludes_patches_already_marked_handled_in_the_ledger() {
    let plain = patch("d".repeat(88).as_str(), "A <a@x>", "t1", "plain edit");
    let already_handled = patch("e".repeat(88).as_str(), "A <a@x>", "t2", "handled edit");
    let fake = FakePatchVcs {
      logs_by_branch: [(
        "main".to_string(),
        vec![plain.clone(), already_handled.clone()],
      )]
      .into(),
      ..Default::default()
    };
    let mut ledger = crate::ledger::Ledger::new();
    ledger.mark_patch_handled(already_handled.id.clone());

    let replayable = current_replayable_patches(&fake, &ledger, Path::new("/tmp"), "main").unwrap();
    assert_eq!(replayable.len(), 1);
    assert_eq!(replayable[0].id, plain.id);
  }

  #[test]
  fn rollback_phase_pairs_each_add_with_its_own_rollback_id() {
    let fake = FakePatchVcs::default();
    let pending = vec![
      PendingAction::Add(patch("a".repeat(88).as_str(), "A <a@x>", "t1", "one")),
      PendingAction::Add(patch("b".repeat(88).as_str(), "A <a@x>", "t2", "two")),
    ];

    let resolved = rollback_phase(&fake, Path::new("/tmp"), "main", pending).unwrap();
    assert_eq!(resolved.len(), 2);
    for action in &resolved {
      assert!(matches!(action, PatchAction::Add { rollback_patch_id, .. } if rollback_patch_id == "fake-rollback-id"));
    }
  }
}
