//! Typed wrapper over the commit-side ("Git") CLI operations the engine uses.
//!
//! Only the operations spec.md §6 lists are implemented; this is not a
//! general-purpose Git binding.

use std::path::Path;

use crate::error::Result;
use crate::model::{BranchRef, CommitMeta};
use crate::shell::{run_argv_checked, run_argv_text};

const GIT: &str = "git";

pub fn clone(url: &str, into: &Path) -> Result<()> {
  // `into` does not exist yet, so the command must be run from its parent.
  let parent = into.parent().unwrap_or_else(|| Path::new("/tmp"));
  let target = into.to_string_lossy().into_owned();
  run_argv_checked(GIT, &["clone", url, &target], parent)?;
  Ok(())
}

pub fn fetch(repo_path: &Path) -> Result<()> {
  run_argv_checked(GIT, &["fetch"], repo_path)?;
  Ok(())
}

pub fn checkout(repo_path: &Path, reference: &str) -> Result<()> {
  run_argv_checked(GIT, &["checkout", reference], repo_path)?;
  Ok(())
}

/// Checks out `branch`, creating it (from the current `HEAD`) if it doesn't
/// exist yet. Used by the Patch→Commit Exporter, which may see a branch name
/// on the patch side with no counterpart commit-side ref.
pub fn checkout_or_create(repo_path: &Path, branch: &str) -> Result<()> {
  if run_argv_checked(GIT, &["checkout", branch], repo_path).is_ok() {
    return Ok(());
  }
  run_argv_checked(GIT, &["checkout", "-b", branch], repo_path)?;
  Ok(())
}

/// `git for-each-ref --format '%(refname) %(objectname)'`, filtered down to
/// `refs/heads/<name>` and paired with the branch's tip commit hash.
pub fn list_branches(repo_path: &Path) -> Result<Vec<BranchRef>> {
  let stdout = run_argv_text(
    GIT,
    &["for-each-ref", "--format=%(refname) %(objectname)"],
    repo_path,
  )?;

  let mut branches = Vec::new();
  for line in stdout.lines() {
    let Some((refname, commit)) = line.split_once(' ') else {
      continue;
    };
    if let Some(name) = refname.strip_prefix("refs/heads/") {
      branches.push(BranchRef {
        name: name.to_string(),
        tip: commit.to_string(),
      });
    }
  }
  Ok(branches)
}

/// `git show -s --pretty=%P <hash>`, split into individual parent hashes.
pub fn parents_of(repo_path: &Path, commit_hash: &str) -> Result<Vec<String>> {
  let stdout = run_argv_text(GIT, &["show", "-s", "--pretty=%P", commit_hash], repo_path)?;
  Ok(
    stdout
      .split_whitespace()
      .map(|s| s.to_string())
      .collect(),
  )
}

/// `git log -1 --format=%B <hash>`: the full commit message body.
pub fn message_body(repo_path: &Path, commit_hash: &str) -> Result<String> {
  run_argv_text(GIT, &["log", "-1", "--format=%B", commit_hash], repo_path)
}

/// `git --no-pager show -s --format='%an <%ae>' <hash>`.
pub fn author_of(repo_path: &Path, commit_hash: &str) -> Result<String> {
  let stdout = run_argv_text(
    GIT,
    &["--no-pager", "show", "-s", "--format=%an <%ae>", commit_hash],
    repo_path,
  )?;
  Ok(stdout.trim().to_string())
}

/// `git log -1 --format=%ci <hash>`.
pub fn date_of(repo_path: &Path, commit_hash: &str) -> Result<String> {
  let stdout = run_argv_text(GIT, &["log", "-1", "--format=%ci", commit_hash], repo_path)?;
  Ok(stdout.trim().to_string())
}

/// `git diff-tree --no-commit-id --name-only -r <hash>`, empty entries
/// dropped per the boundary behavior in spec.md §8.
pub fn changed_files(repo_path: &Path, commit_hash: &str) -> Result<Vec<String>> {
  let stdout = run_argv_text(
    GIT,
    &["diff-tree", "--no-commit-id", "--name-only", "-r", commit_hash],
    repo_path,
  )?;
  Ok(
    stdout
      .lines()
      .map(str::to_string)
      .filter(|s| !s.is_empty())
      .collect(),
  )
}

/// `git show <rev>:<relative_path>`, read directly out of the object store.
/// Deliberately does not check out `rev` into the working tree: the exporter
/// reads several revisions of the same commit in sequence and checking each
/// one out would leave the repository in a detached-HEAD state afterward.
pub fn read_file_at_rev(repo_path: &Path, rev: &str, relative_path: &str) -> Option<Vec<u8>> {
  let output = crate::shell::run_argv(GIT, &["show", &format!("{rev}:{relative_path}")], repo_path).ok()?;
  output.status.success().then_some(output.stdout)
}

/// Gathers every field the exporters read off a commit into one struct, so
/// call sites that need more than one or two fields don't issue a separate
/// `git` invocation per field.
pub fn commit_meta(repo_path: &Path, commit_hash: &str) -> Result<CommitMeta> {
  let body = message_body(repo_path, commit_hash)?;
  let subject = body.lines().next().unwrap_or_default().to_string();
  Ok(CommitMeta {
    hash: commit_hash.to_string(),
    parents: parents_of(repo_path, commit_hash)?,
    author: author_of(repo_path, commit_hash)?,
    date: date_of(repo_path, commit_hash)?,
    subject,
    body,
    changed_files: changed_files(repo_path, commit_hash)?,
  })
}

pub fn status_short(repo_path: &Path) -> Result<String> {
  run_argv_text(GIT, &["status", "--short"], repo_path)
}

pub fn add_all(repo_path: &Path) -> Result<()> {
  run_argv_checked(GIT, &["add", "--all"], repo_path)?;
  Ok(())
}

pub fn commit(repo_path: &Path, author: &str, date: &str, message: &str) -> Result<String> {
  run_argv_checked(
    GIT,
    &[
      "commit",
      "--author",
      author,
      "--date",
      date,
      "--message",
      message,
      "--no-edit",
    ],
    repo_path,
  )?;
  rev_parse_head(repo_path)
}

pub fn rev_parse_head(repo_path: &Path) -> Result<String> {
  let stdout = run_argv_text(GIT, &["rev-parse", "HEAD"], repo_path)?;
  Ok(stdout.trim().to_string())
}

/// `git log --grep=<pattern> --format=<format>`. Returns raw stdout for the
/// caller to split on whatever record separator `format` encodes.
pub fn log_grep(repo_path: &Path, pattern: &str, format: &str) -> Result<String> {
  run_argv_text(
    GIT,
    &["log", &format!("--grep={pattern}"), &format!("--format={format}")],
    repo_path,
  )
}
