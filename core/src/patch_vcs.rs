//! Typed wrapper over the patch-side ("Pijul") CLI operations the engine
//! uses, behind a small trait so the parsing/decision logic in
//! `export_patches` can be unit tested without a real `pijul` binary
//! installed (see `FakePatchVcs` below).

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::model::PatchMeta;
use crate::shell::{run_argv_checked, run_argv_text};

pub trait PatchVcs {
  fn init(&self, repo_path: &Path) -> Result<()>;
  fn pull(&self, repo_path: &Path, remote_url: Option<&str>) -> Result<()>;
  fn branches(&self, repo_path: &Path) -> Result<Vec<String>>;
  fn checkout(&self, repo_path: &Path, branch: &str) -> Result<()>;
  fn log_hash_only(&self, repo_path: &Path, branch: &str, grep: Option<&str>) -> Result<Vec<String>>;
  fn patch_description(&self, repo_path: &Path, patch_id: &str) -> Result<String>;
  fn log(&self, repo_path: &Path, branch: &str) -> Result<Vec<PatchMeta>>;
  fn status_short(&self, repo_path: &Path) -> Result<String>;
  #[allow(clippy::too_many_arguments)]
  fn record(
    &self,
    repo_path: &Path,
    branch: &str,
    author: &str,
    date: &str,
    description: &str,
    message: &str,
  ) -> Result<String>;
  fn rollback(&self, repo_path: &Path, patch_id: &str, branch: &str) -> Result<String>;
  fn unrecord(&self, repo_path: &Path, patch_id: &str, branch: &str) -> Result<()>;
  fn revert_all(&self, repo_path: &Path, branch: &str) -> Result<()>;
  fn apply(&self, repo_path: &Path, patch_id: &str, branch: &str) -> Result<()>;
}

const RECORDED_PATCH_PREFIX: &str = "Recorded patch ";

/// The real implementation: shells out to a configurable binary (default
/// `pijul`).
pub struct PijulCli {
  binary: String,
}

impl Default for PijulCli {
  fn default() -> Self {
    Self {
      binary: "pijul".to_string(),
    }
  }
}

impl PijulCli {
  pub fn with_binary(binary: impl Into<String>) -> Self {
    Self {
      binary: binary.into(),
    }
  }

  fn run_text(&self, args: &[&str], cwd: &Path) -> Result<String> {
    run_argv_text(&self.binary, args, cwd)
  }

  fn run_checked(&self, args: &[&str], cwd: &Path) -> Result<std::process::Output> {
    run_argv_checked(&self.binary, args, cwd)
  }
}

impl PatchVcs for PijulCli {
  fn init(&self, repo_path: &Path) -> Result<()> {
    self.run_checked(&["init"], repo_path)?;
    Ok(())
  }

  fn pull(&self, repo_path: &Path, remote_url: Option<&str>) -> Result<()> {
    match remote_url {
      Some(url) => {
        self.run_checked(
          &["pull", "--set-default", "--set-remote", "origin", url, "--all"],
          repo_path,
        )?;
      }
      None => {
        self.run_checked(&["pull", "--all"], repo_path)?;
      }
    }
    Ok(())
  }

  fn branches(&self, repo_path: &Path) -> Result<Vec<String>> {
    let stdout = self.run_text(&["branches"], repo_path)?;
    Ok(
      stdout
        .lines()
        .filter(|l| !l.is_empty())
        .map(|l| l.get(2..).unwrap_or(l).to_string())
        .collect(),
    )
  }

  fn checkout(&self, repo_path: &Path, branch: &str) -> Result<()> {
    self.run_checked(&["checkout", branch], repo_path)?;
    Ok(())
  }

  fn log_hash_only(&self, repo_path: &Path, branch: &str, grep: Option<&str>) -> Result<Vec<String>> {
    let mut args = vec!["log", "--branch", branch, "--hash-only"];
    if let Some(pattern) = grep {
      args.push("--grep");
      args.push(pattern);
    }
    let stdout = self.run_text(&args, repo_path)?;
    Ok(
      stdout
        .lines()
        .map(|l| l.split(':').next().unwrap_or(l).trim().to_string())
        .filter(|s| !s.is_empty())
        .collect(),
    )
  }

  fn patch_description(&self, repo_path: &Path, patch_id: &str) -> Result<String> {
    let stdout = self.run_text(&["patch", "--description", patch_id], repo_path)?;
    Ok(stdout.trim().to_string())
  }

  fn log(&self, repo_path: &Path, branch: &str) -> Result<Vec<PatchMeta>> {
    let stdout = self.run_text(&["log", "--branch", branch], repo_path)?;
    Ok(
      parse_log_entries(&stdout)
        .into_iter()
        .map(|e| PatchMeta {
          id: e.id,
          author: e.author,
          timestamp: normalize_timestamp(&e.timestamp),
          message: e.message,
        })
        .collect(),
    )
  }

  fn status_short(&self, repo_path: &Path) -> Result<String> {
    self.run_text(&["status", "--short"], repo_path)
  }

  fn record(
    &self,
    repo_path: &Path,
    branch: &str,
    author: &str,
    date: &str,
    description: &str,
    message: &str,
  ) -> Result<String> {
    let stdout = self.run_text(
      &[
        "record",
        "--add-new-files",
        "--all",
        "--author",
        author,
        "--branch",
        branch,
        "--date",
        date,
        "--description",
        description,
        "--message",
        message,
      ],
      repo_path,
    )?;
    Ok(stdout.trim().trim_start_matches(RECORDED_PATCH_PREFIX).to_string())
  }

  fn rollback(&self, repo_path: &Path, patch_id: &str, branch: &str) -> Result<String> {
    let stdout = self.run_text(
      &[
        "rollback",
        "--author",
        "Rollback",
        "--message",
        "Rollback",
        patch_id,
        "--branch",
        branch,
      ],
      repo_path,
    )?;
    Ok(stdout.trim().trim_start_matches(RECORDED_PATCH_PREFIX).to_string())
  }

  fn unrecord(&self, repo_path: &Path, patch_id: &str, branch: &str) -> Result<()> {
    self.run_checked(&["unrecord", patch_id, "--branch", branch], repo_path)?;
    Ok(())
  }

  fn revert_all(&self, repo_path: &Path, branch: &str) -> Result<()> {
    self.run_checked(&["revert", "--all", "--branch", branch], repo_path)?;
    Ok(())
  }

  fn apply(&self, repo_path: &Path, patch_id: &str, branch: &str) -> Result<()> {
    self.run_checked(&["apply", patch_id, "--branch", branch], repo_path)?;
    Ok(())
  }
}

struct RawPatchEntry {
  id: String,
  author: String,
  timestamp: String,
  message: String,
}

/// Strips ANSI CSI escape sequences (`ESC [ ... <letter>`), since `pijul log`
/// bolds the `Hash:` label with them.
fn strip_ansi(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  let mut chars = input.chars().peekable();
  while let Some(c) = chars.next() {
    if c == '\u{1B}' && chars.peek() == Some(&'[') {
      chars.next();
      for c2 in chars.by_ref() {
        if c2.is_ascii_alphabetic() {
          break;
        }
      }
      continue;
    }
    out.push(c);
  }
  out
}

/// Parses the human-readable `pijul log --branch <branch>` format into
/// discrete entries: a `Hash:` line, an internal-id line, `Author:`,
/// `Date:`, a blank line, then message lines indented four spaces, up to
/// the next `Hash:` line or end of output.
fn parse_log_entries(stdout: &str) -> Vec<RawPatchEntry> {
  let cleaned = strip_ansi(stdout);
  let lines: Vec<&str> = cleaned.lines().collect();
  let mut entries = Vec::new();
  let mut i = 0;

  while i < lines.len() {
    if lines[i].trim().is_empty() {
      i += 1;
      continue;
    }
    let Some(id) = lines[i].strip_prefix("Hash:").map(|s| s.trim().to_string()) else {
      i += 1;
      continue;
    };
    i += 1;
    if i < lines.len() {
      i += 1; // internal id line, unused
    }

    let mut author = String::new();
    let mut timestamp = String::new();
    if i < lines.len() {
      if let Some(a) = lines[i].strip_prefix("Author:") {
        author = a.trim().to_string();
        i += 1;
      }
    }
    if i < lines.len() {
      if let Some(d) = lines[i].strip_prefix("Date:") {
        timestamp = d.trim().to_string();
        i += 1;
      }
    }
    if i < lines.len() && lines[i].trim().is_empty() {
      i += 1;
    }

    let mut message_lines = Vec::new();
    while i < lines.len() && !lines[i].starts_with("Hash:") {
      let line = lines[i];
      message_lines.push(line.strip_prefix("    ").unwrap_or(line).to_string());
      i += 1;
    }
    while matches!(message_lines.last(), Some(l) if l.trim().is_empty()) {
      message_lines.pop();
    }

    entries.push(RawPatchEntry {
      id,
      author,
      timestamp,
      message: message_lines.join("\n"),
    });
  }

  entries
}

/// Truncates a fractional-seconds timestamp to microseconds while preserving
/// the timezone suffix: `2019-05-26 14:52:37.697693123 UTC` becomes
/// `2019-05-26 14:52:37.697693 UTC`. Timestamps without a fractional part
/// pass through unchanged.
pub fn normalize_timestamp(timestamp: &str) -> String {
  let Some((whole, frac_and_tz)) = timestamp.split_once('.') else {
    return timestamp.to_string();
  };
  match frac_and_tz.split_once(' ') {
    Some((frac, tz)) => {
      let micros: String = frac.chars().take(6).collect();
      format!("{whole}.{micros} {tz}")
    }
    None => {
      let micros: String = frac_and_tz.chars().take(6).collect();
      format!("{whole}.{micros}")
    }
  }
}

/// An in-memory, fixture-backed double used by unit tests that exercise the
/// log-line parsing and action-computation logic in `export_patches` without
/// requiring a real `pijul` binary on `PATH`.
#[derive(Default)]
pub struct FakePatchVcs {
  pub branches: Vec<String>,
  pub logs_by_branch: HashMap<String, Vec<PatchMeta>>,
  pub descriptions: HashMap<String, String>,
}

impl PatchVcs for FakePatchVcs {
  fn init(&self, _repo_path: &Path) -> Result<()> {
    Ok(())
  }

  fn pull(&self, _repo_path: &Path, _remote_url: Option<&str>) -> Result<()> {
    Ok(())
  }

  fn branches(&self, _repo_path: &Path) -> Result<Vec<String>> {
    Ok(self.branches.clone())
  }

  fn checkout(&self, _repo_path: &Path, _branch: &str) -> Result<()> {
    Ok(())
  }

  fn log_hash_only(&self, _repo_path: &Path, branch: &str, grep: Option<&str>) -> Result<Vec<String>> {
    let entries = self.logs_by_branch.get(branch).cloned().unwrap_or_default();
    Ok(
      entries
        .into_iter()
        .filter(|p| grep.map(|g| p.message.contains(g)).unwrap_or(true))
        .map(|p| p.id)
        .collect(),
    )
  }

  fn patch_description(&self, _repo_path: &Path, patch_id: &str) -> Result<String> {
    Ok(self.descriptions.get(patch_id).cloned().unwrap_or_default())
  }

  fn log(&self, _repo_path: &Path, branch: &str) -> Result<Vec<PatchMeta>> {
    Ok(self.logs_by_branch.get(branch).cloned().unwrap_or_default())
  }

  fn status_short(&self, _repo_path: &Path) -> Result<String> {
    Ok(String::new())
  }

  fn record(
    &self,
    _repo_path: &Path,
    _branch: &str,
    _author: &str,
    _date: &str,
    _description: &str,
    _message: &str,
  ) -> Result<String> {
    Ok("fake-patch-id".to_string())
  }

  fn rollback(&self, _repo_path: &Path, _patch_id: &str, _branch: &str) -> Result<String> {
    Ok("fake-rollback-id".to_string())
  }

  fn unrecord(&self, _repo_path: &Path, _patch_id: &str, _branch: &str) -> Result<()> {
    Ok(())
  }

  fn revert_all(&self, _repo_path: &Path, _branch: &str) -> Result<()> {
    Ok(())
  }

  fn apply(&self, _repo_path: &Path, _patch_id: &str, _branch: &str) -> Result<()> {
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_well_formed_log_output() {
    let id = "a".repeat(88);
    let raw = format!(
      "\u{1B}[1mHash: {id}\u{1B}[0m\n  internal-id-line\nAuthor: A <a@x>\nDate: 2024-01-02 03:04:05.123456789 UTC\n\n    init\n    body line\n\n"
    );
    let entries = parse_log_entries(&raw);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, id);
    assert_eq!(entries[0].author, "A <a@x>");
    assert_eq!(entries[0].message, "init\nbody line");
  }

  #[test]
  fn parses_multiple_entries() {
    let raw = "Hash: one\nint\nAuthor: A\nDate: d1\n\n    msg one\n\nHash: two\nint\nAuthor: B\nDate: d2\n\n    msg two\n";
    let entries = parse_log_entries(raw);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, "one");
    assert_eq!(entries[1].id, "two");
    assert_eq!(entries[1].author, "B");
  }

  #[test]
  fn normalizes_fractional_timestamp_preserving_timezone() {
    assert_eq!(
      normalize_timestamp("2019-05-26 14:52:37.697693123 UTC"),
      "2019-05-26 14:52:37.697693 UTC"
    );
  }

  #[test]
  fn leaves_timestamp_without_fraction_unchanged() {
    assert_eq!(
      normalize_timestamp("2024-01-02 03:04:05 +0000"),
      "2024-01-02 03:04:05 +0000"
    );
  }

  #[test]
  fn branches_strip_two_char_marker_prefix() {
    let fake = FakePatchVcs {
      branches: vec!["main".to_string()],
      ..Default::default()
    };
    assert_eq!(fake.branches(Path::new("/tmp")).unwrap(), vec!["main"]);
  }
}
