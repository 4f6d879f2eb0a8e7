//! Three-way cherry-pick merge for a single file's text content.
//!
//! The Commit->Patch Exporter needs to reconcile the parent commit's version
//! of a file (`base`), the version currently checked out on the patch side
//! (`ours`), and the version introduced by the new commit (`theirs`) into one
//! text, the way a line-level merge tool would. This mirrors the region-sync
//! algorithm behind `difflib`-based three-way mergers: find the runs of lines
//! `base` shares with both `ours` and `theirs`, and treat the gaps between
//! those runs as the candidate changes to reconcile.
//!
//! Conflict markers are the reverse of Git's: `>` opens a region, `=`
//! separates the two sides, `<` closes it. This keeps a Pijul-side reviewer
//! from mistaking one of these for an ordinary Git merge conflict left behind
//! by a stray rebase.

use similar::{ChangeTag, TextDiff};

const MARKER_LEN: usize = 32;

/// Result of reconciling one file's three versions.
pub struct MergeOutcome {
  pub text: String,
  pub has_conflict: bool,
}

/// A maximal run of lines `base[base_start..base_end]` that reappears
/// unchanged in both other texts, at `other_start..other_end`.
struct SyncPoint {
  base_start: usize,
  base_end: usize,
  ours_start: usize,
  ours_end: usize,
  theirs_start: usize,
  theirs_end: usize,
}

/// Maximal runs of lines that are equal between `base` and `other`, as
/// `(base_start, other_start, len)` triples, terminated by a zero-length
/// sentinel at the end of both sequences (mirrors `SequenceMatcher`'s
/// trailing dummy match).
fn equal_blocks(base: &[&str], other: &[&str]) -> Vec<(usize, usize, usize)> {
  let diff = TextDiff::from_slices(base, other);
  let mut equal_pairs = Vec::new();
  let mut base_i = 0;
  let mut other_i = 0;
  for change in diff.iter_all_changes() {
    match change.tag() {
      ChangeTag::Equal => {
        equal_pairs.push((base_i, other_i));
        base_i += 1;
        other_i += 1;
      }
      ChangeTag::Delete => base_i += 1,
      ChangeTag::Insert => other_i += 1,
    }
  }

  let mut blocks = Vec::new();
  let mut i = 0;
  while i < equal_pairs.len() {
    let (b0, o0) = equal_pairs[i];
    let mut len = 1;
    while i + len < equal_pairs.len() && equal_pairs[i + len] == (b0 + len, o0 + len) {
      len += 1;
    }
    blocks.push((b0, o0, len));
    i += len;
  }
  blocks.push((base.len(), other.len(), 0));
  blocks
}

fn intersect(a: (usize, usize), b: (usize, usize)) -> Option<(usize, usize)> {
  let start = a.0.max(b.0);
  let end = a.1.min(b.1);
  if start < end {
    Some((start, end))
  } else {
    None
  }
}

/// Ports the classic `find_sync_regions` step of a `difflib`-based three-way
/// merge: runs of `base` that neither side has touched.
fn find_sync_points(base: &[&str], ours: &[&str], theirs: &[&str]) -> Vec<SyncPoint> {
  let a_blocks = equal_blocks(base, ours);
  let b_blocks = equal_blocks(base, theirs);

  let mut points = Vec::new();
  let mut ia = 0;
  let mut ib = 0;
  while ia < a_blocks.len() && ib < b_blocks.len() {
    let (a_base, a_other, a_len) = a_blocks[ia];
    let (b_base, b_other, b_len) = b_blocks[ib];
    if let Some((start, end)) =
      intersect((a_base, a_base + a_len), (b_base, b_base + b_len))
    {
      let shift_a = a_other as isize - a_base as isize;
      let shift_b = b_other as isize - b_base as isize;
      points.push(SyncPoint {
        base_start: start,
        base_end: end,
        ours_start: (start as isize + shift_a) as usize,
        ours_end: (end as isize + shift_a) as usize,
        theirs_start: (start as isize + shift_b) as usize,
        theirs_end: (end as isize + shift_b) as usize,
      });
    }
    if a_base + a_len < b_base + b_len {
      ia += 1;
    } else {
      ib += 1;
    }
  }
  points.push(SyncPoint {
    base_start: base.len(),
    base_end: base.len(),
    ours_start: ours.len(),
    ours_end: ours.len(),
    theirs_start: theirs.len(),
    theirs_end: theirs.len(),
  });
  points
}

fn join(lines: &[&str], range: std::ops::Range<usize>) -> String {
  lines[range].concat()
}

/// Reconciles `ours` (the patch side's current content) against `theirs` (the
/// new commit's content), with `base` as the common parent version. `ours` is
/// preferred verbatim wherever only `theirs` changed, the reverse of a normal
/// merge direction, since the patch side is the one being written to.
pub fn three_way_merge(
  base: &str,
  ours: &str,
  theirs: &str,
  ours_label: &str,
  theirs_label: &str,
) -> MergeOutcome {
  let base_lines: Vec<&str> = base.split_inclusive('\n').collect();
  let ours_lines: Vec<&str> = ours.split_inclusive('\n').collect();
  let theirs_lines: Vec<&str> = theirs.split_inclusive('\n').collect();

  let sync_points = find_sync_points(&base_lines, &ours_lines, &theirs_lines);

  let mut out = String::new();
  let mut has_conflict = false;
  let mut prev = SyncPoint {
    base_start: 0,
    base_end: 0,
    ours_start: 0,
    ours_end: 0,
    theirs_start: 0,
    theirs_end: 0,
  };

  for point in sync_points {
    let ours_gap = join(&ours_lines, prev.ours_end..point.ours_start);
    let theirs_gap = join(&theirs_lines, prev.theirs_end..point.theirs_start);
    let base_gap = join(&base_lines, prev.base_end..point.base_start);

    if ours_gap == base_gap && theirs_gap == base_gap {
      out.push_str(&base_gap);
    } else if ours_gap == base_gap {
      out.push_str(&theirs_gap);
    } else if theirs_gap == base_gap {
      out.push_str(&ours_gap);
    } else if ours_gap == theirs_gap {
      out.push_str(&ours_gap);
    } else {
      has_conflict = true;
      out.push_str(&">".repeat(MARKER_LEN));
      out.push(' ');
      out.push_str(ours_label);
      out.push('\n');
      out.push_str(&ours_gap);
      out.push_str(&"=".repeat(MARKER_LEN));
      out.push('\n');
      out.push_str(&theirs_gap);
      out.push_str(&"<".repeat(MARKER_LEN));
      out.push(' ');
      out.push_str(theirs_label);
      out.push('\n');
    }

    out.push_str(&join(&ours_lines, point.ours_start..point.ours_end));

    prev = point;
  }

  MergeOutcome { text: out, has_conflict }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn identical_sides_produce_no_conflict() {
    let outcome = three_way_merge("a\nb\nc\n", "a\nb\nc\n", "a\nb\nc\n", "Pijul", "Git");
    assert!(!outcome.has_conflict);
    assert_eq!(outcome.text, "a\nb\nc\n");
  }

  #[test]
  fn only_theirs_changed_is_applied_cleanly() {
    let outcome = three_way_merge("a\nb\nc\n", "a\nb\nc\n", "a\nB\nc\n", "Pijul", "Git");
    assert!(!outcome.has_conflict);
    assert_eq!(outcome.text, "a\nB\nc\n");
  }

  #[test]
  fn only_ours_changed_is_kept() {
    let outcome = three_way_merge("a\nb\nc\n", "a\nB\nc\n", "a\nb\nc\n", "Pijul", "Git");
    assert!(!outcome.has_conflict);
    assert_eq!(outcome.text, "a\nB\nc\n");
  }

  #[test]
  fn both_sides_modifying_the_same_line_differently_conflicts() {
    let outcome = three_way_merge("a\nb\nc\n", "a\nOURS\nc\n", "a\nTHEIRS\nc\n", "Pijul", "Git (commit abc123)");
    assert!(outcome.has_conflict);
    assert!(outcome.text.contains(&">".repeat(MARKER_LEN)));
    assert!(outcome.text.contains(&"=".repeat(MARKER_LEN)));
    assert!(outcome.text.contains(&"<".repeat(MARKER_LEN)));
    assert!(outcome.text.contains("OURS"));
    assert!(outcome.text.contains("THEIRS"));
    assert!(outcome.text.contains("Pijul"));
    assert!(outcome.text.contains("Git (commit abc123)"));
  }

  #[test]
  fn identical_edits_on_both_sides_do_not_conflict() {
    let outcome = three_way_merge("a\nb\nc\n", "a\nX\nc\n", "a\nX\nc\n", "Pijul", "Git");
    assert!(!outcome.has_conflict);
    assert_eq!(outcome.text, "a\nX\nc\n");
  }
}
