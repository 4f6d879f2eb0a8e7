//! The textual idempotence markers that define "already translated".

const IMPORTED_FROM_GIT_COMMIT: &str = "Imported from Git commit ";
const IMPORTED_FROM_PIJUL_PATCH: &str = "Imported from Pijul patch ";
const REVERTED_PIJUL_PATCH: &str = "Reverted Pijul patch ";

/// Exact patch description for a commit exported from the Git side.
pub fn imported_from_commit(commit_hash: &str) -> String {
  format!("{IMPORTED_FROM_GIT_COMMIT}{commit_hash}")
}

/// Exact commit message trailer line for a patch imported onto the Git side.
pub fn imported_from_patch(patch_id: &str) -> String {
  format!("{IMPORTED_FROM_PIJUL_PATCH}{patch_id}")
}

/// Exact commit message trailer line for a rollback replay.
pub fn reverted_patch(patch_id: &str) -> String {
  format!("{REVERTED_PIJUL_PATCH}{patch_id}")
}

/// If `description` is exactly `Imported from Git commit <hash>`, returns the
/// hash. Used to confirm a tag-path candidate rather than just prefix-match,
/// since the description field can in principle contain anything.
pub fn parse_imported_from_commit(description: &str) -> Option<&str> {
  description.trim().strip_prefix(IMPORTED_FROM_GIT_COMMIT)
}

/// If `line` starts with `Imported from Pijul patch `, returns the patch id
/// (the remainder of the line, trimmed).
pub fn parse_imported_from_patch(line: &str) -> Option<&str> {
  line.strip_prefix(IMPORTED_FROM_PIJUL_PATCH).map(str::trim)
}

/// True if any line in `message` begins the reverse-direction guard tag.
pub fn message_has_pijul_origin(message: &str) -> bool {
  message
    .lines()
    .any(|line| line.starts_with(IMPORTED_FROM_PIJUL_PATCH))
}

/// True if any line in `message` begins the Commit→Patch tag; used by the
/// Patch→Commit Exporter to skip patches that were themselves produced by
/// the other direction.
pub fn message_has_git_origin(message: &str) -> bool {
  message
    .lines()
    .any(|line| line.starts_with(IMPORTED_FROM_GIT_COMMIT))
}

/// Strips a trailing `Imported from Pijul patch <id>` line from `message`,
/// if present, leaving just the original authored text.
pub fn strip_pijul_tag_line(message: &str) -> String {
  let mut lines: Vec<&str> = message.lines().collect();
  while matches!(lines.last(), Some(l) if l.trim().is_empty()) {
    lines.pop();
  }
  if matches!(lines.last(), Some(l) if l.starts_with(IMPORTED_FROM_PIJUL_PATCH)) {
    lines.pop();
  }
  while matches!(lines.last(), Some(l) if l.trim().is_empty()) {
    lines.pop();
  }
  lines.join("\n")
}

/// Finds the first `Imported from Pijul patch <id>` line in `message`, if any.
pub fn find_imported_patch_id(message: &str) -> Option<&str> {
  message.lines().find_map(parse_imported_from_patch)
}

/// Grep pattern for finding commits that cite a Pijul patch, without the
/// trailing space `imported_from_patch` would add for an empty id.
pub fn pijul_tag_grep_pattern() -> &'static str {
  "Imported from Pijul patch"
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn commit_tag_round_trips() {
    let hash = "a".repeat(40);
    let desc = imported_from_commit(&hash);
    assert_eq!(desc, format!("Imported from Git commit {hash}"));
    assert_eq!(parse_imported_from_commit(&desc), Some(hash.as_str()));
  }

  #[test]
  fn commit_tag_parse_rejects_unrelated_text() {
    assert_eq!(parse_imported_from_commit("edit\n\nsomething else"), None);
  }

  #[test]
  fn patch_tag_round_trips() {
    let id = "b".repeat(88);
    let line = imported_from_patch(&id);
    assert_eq!(parse_imported_from_patch(&line), Some(id.as_str()));
  }

  #[test]
  fn reverse_guard_scans_every_line() {
    let msg = format!("subject\n\nbody line\n{}", imported_from_patch("xyz"));
    assert!(message_has_pijul_origin(&msg));
    assert_eq!(find_imported_patch_id(&msg), Some("xyz"));
    assert!(!message_has_pijul_origin("subject\n\nno tag here"));
  }
}
