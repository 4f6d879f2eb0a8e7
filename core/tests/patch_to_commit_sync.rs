//! End-to-end tests for the Patch→Commit Exporter against a real `git`
//! working tree. The patch side is also stood in by `git` itself (see
//! `GitBackedPatchVcs` below) rather than a real `pijul` binary, since one
//! isn't guaranteed to be on `PATH`; `git revert`/`reset --hard` give the
//! same rollback/unrecord/revert-all shape a real patch tool provides for a
//! single, linear sequence of patches.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;
use vcsbridge_core::export_patches::export_patches_to_commits;
use vcsbridge_core::ledger::Ledger;
use vcsbridge_core::model::{PatchMeta, RepoHandle, SyncContext};
use vcsbridge_core::patch_vcs::PatchVcs;
use vcsbridge_core::tags;

const BRANCH: &str = "main";
const FIELD_SEP: char = '\u{1}';
const RECORD_SEP: char = '\u{2}';

fn git(args: &[&str], cwd: &Path) {
  let status = Command::new("git")
    .args(args)
    .current_dir(cwd)
    .status()
    .expect("git must be on PATH to run these tests");
  assert!(status.success(), "git {args:?} failed in {}", cwd.display());
}

fn git_text(args: &[&str], cwd: &Path) -> String {
  let out = Command::new("git").args(args).current_dir(cwd).output().unwrap();
  String::from_utf8_lossy(&out.stdout).into_owned()
}

fn init_repo(dir: &Path) {
  git(&["init", "--initial-branch=main"], dir);
  git(&["config", "user.name", "Test User"], dir);
  git(&["config", "user.email", "test@example.com"], dir);
}

fn commit_all(dir: &Path, message: &str) -> String {
  git(&["add", "--all"], dir);
  git(&["commit", "--message", message], dir);
  git_text(&["rev-parse", "HEAD"], dir).trim().to_string()
}

fn commit_count(dir: &Path) -> usize {
  git_text(&["log", "--oneline"], dir)
    .lines()
    .filter(|l| !l.is_empty())
    .count()
}

/// Patch-side double backed by plain `git`: every "patch" is a commit, `log`
/// reads real commit metadata instead of tracking a parallel store, and
/// `rollback`/`unrecord`/`revert_all` are implemented with `git
/// revert`/`reset --hard`, which give the same net effect as a real patch
/// tool's rollback-then-unrecord dance for a single linear sequence of
/// patches. `apply` is not exercised by these tests (see module docs) and is
/// left unimplemented.
struct GitBackedPatchVcs;

impl PatchVcs for GitBackedPatchVcs {
  fn init(&self, repo_path: &Path) -> vcsbridge_core::Result<()> {
    init_repo(repo_path);
    Ok(())
  }

  fn pull(&self, _repo_path: &Path, _remote_url: Option<&str>) -> vcsbridge_core::Result<()> {
    Ok(())
  }

  fn branches(&self, _repo_path: &Path) -> vcsbridge_core::Result<Vec<String>> {
    Ok(vec![BRANCH.to_string()])
  }

  fn checkout(&self, _repo_path: &Path, _branch: &str) -> vcsbridge_core::Result<()> {
    Ok(())
  }

  fn log_hash_only(
    &self,
    repo_path: &Path,
    _branch: &str,
    grep: Option<&str>,
  ) -> vcsbridge_core::Result<Vec<String>> {
    let mut args = vec!["log".to_string(), "--format=%H".to_string()];
    if let Some(pattern) = grep {
      args.push(format!("--grep={pattern}"));
    }
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    Ok(
      git_text(&args, repo_path)
        .lines()
        .map(str::to_string)
        .filter(|s| !s.is_empty())
        .collect(),
    )
  }

  fn patch_description(&self, repo_path: &Path, patch_id: &str) -> vcsbridge_core::Result<String> {
    Ok(git_text(&["log", "-1", "--format=%s", patch_id], repo_path).trim().to_string())
  }

  fn log(&self, repo_path: &Path, _branch: &str) -> vcsbridge_core::Result<Vec<PatchMeta>> {
    let format = format!("%H{FIELD_SEP}%an <%ae>{FIELD_SEP}%ci{FIELD_SEP}%B{RECORD_SEP}");
    let raw = git_text(&["log", &format!("--format={format}")], repo_path);
    Ok(
      raw
        .split(RECORD_SEP)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .filter_map(|record| {
          let mut parts = record.splitn(4, FIELD_SEP);
          let id = parts.next()?.to_string();
          let author = parts.next()?.to_string();
          let timestamp = parts.next()?.to_string();
          let message = parts.next()?.trim().to_string();
          Some(PatchMeta {
            id,
            author,
            timestamp,
            message,
          })
        })
        .collect(),
    )
  }

  fn status_short(&self, repo_path: &Path) -> vcsbridge_core::Result<String> {
    Ok(git_text(&["status", "--short"], repo_path))
  }

  fn record(
    &self,
    repo_path: &Path,
    _branch: &str,
    _author: &str,
    _date: &str,
    _description: &str,
    message: &str,
  ) -> vcsbridge_core::Result<String> {
    Ok(commit_all(repo_path, message))
  }

  /// Computes the inverse of `patch_id` relative to its parent and records it
  /// as a new commit, the same net effect as a real patch tool's rollback.
  fn rollback(&self, repo_path: &Path, patch_id: &str, _branch: &str) -> vcsbridge_core::Result<String> {
    git(&["revert", "--no-commit", patch_id], repo_path);
    git(
      &["commit", "--message", &format!("rollback of {patch_id}")],
      repo_path,
    );
    Ok(git_text(&["rev-parse", "HEAD"], repo_path).trim().to_string())
  }

  /// Only ever called with the current tip (the rollback commit this double
  /// just created, or the patch re-applied by `apply`): drops it, restoring
  /// the tree to the state before it existed.
  fn unrecord(&self, repo_path: &Path, patch_id: &str, _branch: &str) -> vcsbridge_core::Result<()> {
    let head = git_text(&["rev-parse", "HEAD"], repo_path).trim().to_string();
    assert_eq!(head, patch_id, "this double only supports unrecording the current tip");
    git(&["reset", "--hard", "HEAD~1"], repo_path);
    Ok(())
  }

  fn revert_all(&self, repo_path: &Path, _branch: &str) -> vcsbridge_core::Result<()> {
    git(&["reset", "--hard", "HEAD"], repo_path);
    git(&["clean", "-fd"], repo_path);
    Ok(())
  }

  fn apply(&self, _repo_path: &Path, _patch_id: &str, _branch: &str) -> vcsbridge_core::Result<()> {
    unimplemented!("patch removal propagation is covered at the unit level, not by this double")
  }
}

fn fresh_ctx(commit_dir: &Path, patch_dir: &Path) -> SyncContext {
  SyncContext {
    commit_repo: RepoHandle {
      url: "test://commit".to_string(),
      local_path: commit_dir.to_path_buf(),
    },
    patch_repo: RepoHandle {
      url: "test://patch".to_string(),
      local_path: patch_dir.to_path_buf(),
    },
    ledger: Ledger::new(),
  }
}

#[test]
fn replays_a_single_patch_as_a_commit() {
  let commit_dir = TempDir::new().unwrap();
  let patch_dir = TempDir::new().unwrap();
  init_repo(commit_dir.path());

  let vcs = GitBackedPatchVcs;
  vcs.init(patch_dir.path()).unwrap();
  std::fs::write(patch_dir.path().join("feature.txt"), "feature content\n").unwrap();
  commit_all(patch_dir.path(), "add feature");

  let mut ctx = fresh_ctx(commit_dir.path(), patch_dir.path());
  export_patches_to_commits(&mut ctx, &vcs).unwrap();

  assert_eq!(commit_count(commit_dir.path()), 1);
  let mirrored = std::fs::read_to_string(commit_dir.path().join("feature.txt")).unwrap();
  assert_eq!(mirrored, "feature content\n");

  let message = git_text(&["log", "-1", "--format=%B"], commit_dir.path());
  assert!(message.contains("Imported from Pijul patch"));
}

#[test]
fn a_second_pass_over_the_same_patch_history_is_a_no_op() {
  let commit_dir = TempDir::new().unwrap();
  let patch_dir = TempDir::new().unwrap();
  init_repo(commit_dir.path());

  let vcs = GitBackedPatchVcs;
  vcs.init(patch_dir.path()).unwrap();
  std::fs::write(patch_dir.path().join("feature.txt"), "feature content\n").unwrap();
  commit_all(patch_dir.path(), "add feature");

  let mut ctx = fresh_ctx(commit_dir.path(), patch_dir.path());
  export_patches_to_commits(&mut ctx, &vcs).unwrap();
  assert_eq!(commit_count(commit_dir.path()), 1);

  // The tag left in the first pass's commit satisfies `build_exported_map`'s
  // tag scan the second time through, so no new commit should appear.
  export_patches_to_commits(&mut ctx, &vcs).unwrap();
  assert_eq!(commit_count(commit_dir.path()), 1);
}

#[test]
fn a_patch_already_tagged_as_imported_from_a_commit_is_never_replayed_back() {
  let commit_dir = TempDir::new().unwrap();
  let patch_dir = TempDir::new().unwrap();
  init_repo(commit_dir.path());

  let vcs = GitBackedPatchVcs;
  vcs.init(patch_dir.path()).unwrap();
  let original_commit_hash = "f".repeat(40);
  std::fs::write(patch_dir.path().join("bounced.txt"), "came from git\n").unwrap();
  commit_all(
    patch_dir.path(),
    &format!("add bounced.txt\n\n{}", tags::imported_from_commit(&original_commit_hash)),
  );

  let mut ctx = fresh_ctx(commit_dir.path(), patch_dir.path());
  export_patches_to_commits(&mut ctx, &vcs).unwrap();

  assert_eq!(
    commit_count(commit_dir.path()),
    0,
    "a patch that originated on the commit side must not bounce back as a new commit"
  );
}
