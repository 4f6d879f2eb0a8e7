//! Same single-commit export scenario as `commit_to_patch_sync.rs`, but run
//! against the real `pijul` binary instead of a test double, when one is
//! actually on `PATH`. Skips (prints and returns) otherwise, since a CI
//! runner is not guaranteed to carry `pijul`.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;
use vcsbridge_core::model::{RepoHandle, SyncContext};
use vcsbridge_core::patch_vcs::{PatchVcs, PijulCli};
use vcsbridge_core::{export_commits::export_commits_to_patches, ledger::Ledger, shell};

const BRANCH: &str = "main";

fn git(args: &[&str], cwd: &Path) {
  let status = Command::new("git")
    .args(args)
    .current_dir(cwd)
    .status()
    .expect("git must be on PATH to run these tests");
  assert!(status.success(), "git {args:?} failed in {}", cwd.display());
}

fn init_commit_repo(dir: &Path) {
  git(&["init", "--initial-branch=main"], dir);
  git(&["config", "user.name", "Test User"], dir);
  git(&["config", "user.email", "test@example.com"], dir);
}

fn commit_all(dir: &Path, message: &str) {
  git(&["add", "--all"], dir);
  git(&["commit", "--message", message], dir);
}

#[test]
fn real_pijul_exports_a_single_commit_as_a_patch_the_same_way_the_fixture_double_does() {
  if !shell::tool_available("pijul") {
    println!("pijul not found on PATH, skipping real-binary integration test");
    return;
  }

  let commit_dir = TempDir::new().unwrap();
  let patch_dir = TempDir::new().unwrap();
  init_commit_repo(commit_dir.path());
  std::fs::write(commit_dir.path().join("hello.txt"), "hello world\n").unwrap();
  commit_all(commit_dir.path(), "initial commit");

  let vcs = PijulCli::default();
  vcs.init(patch_dir.path()).expect("pijul init");

  let mut ctx = SyncContext {
    commit_repo: RepoHandle {
      url: "test://commit".to_string(),
      local_path: commit_dir.path().to_path_buf(),
    },
    patch_repo: RepoHandle {
      url: "test://patch".to_string(),
      local_path: patch_dir.path().to_path_buf(),
    },
    ledger: Ledger::new(),
  };

  export_commits_to_patches(&mut ctx, &vcs).expect("export against a real pijul binary");

  let mirrored = std::fs::read_to_string(patch_dir.path().join("hello.txt")).unwrap();
  assert_eq!(mirrored, "hello world\n");

  let patches = vcs
    .log_hash_only(patch_dir.path(), BRANCH, None)
    .expect("pijul log");
  assert_eq!(patches.len(), 1, "exactly one patch should have been recorded");
}
