//! Deterministically derives a local working-tree path from a repository URL.

use std::path::PathBuf;

use sha2::{Digest, Sha256};

const PREFIX: &str = "/tmp";
const DIGEST_CHARS: usize = 16;

/// `path(url) = "/tmp/" ++ first 16 hex digits of SHA-256(url)`.
///
/// Pure and deterministic: the same URL always maps to the same path, across
/// runs and processes, which is what lets the Fetcher treat "does this
/// directory already exist" as "have we cloned this remote before".
pub fn path(url: &str) -> PathBuf {
  let mut hasher = Sha256::new();
  hasher.update(url.as_bytes());
  let digest = hasher.finalize();
  let hex = hex::encode(digest);
  PathBuf::from(PREFIX).join(&hex[..DIGEST_CHARS])
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn deterministic_for_same_url() {
    let a = path("https://example.com/repo.git");
    let b = path("https://example.com/repo.git");
    assert_eq!(a, b);
  }

  #[test]
  fn differs_for_different_urls() {
    let a = path("https://example.com/repo-one.git");
    let b = path("https://example.com/repo-two.git");
    assert_ne!(a, b);
  }

  #[test]
  fn lives_under_tmp_with_sixteen_hex_chars() {
    let p = path("git@example.com:org/repo.git");
    let file_name = p.file_name().unwrap().to_str().unwrap();
    assert_eq!(p.parent(), Some(std::path::Path::new("/tmp")));
    assert_eq!(file_name.len(), DIGEST_CHARS);
    assert!(file_name.chars().all(|c| c.is_ascii_hexdigit()));
  }

  #[test]
  fn digest_prefix_equality_matches_path_equality() {
    let urls = ["a", "b", "a", "ssh://x@y/z.git"];
    for u1 in &urls {
      for u2 in &urls {
        let mut h1 = Sha256::new();
        h1.update(u1.as_bytes());
        let d1 = hex::encode(h1.finalize());
        let mut h2 = Sha256::new();
        h2.update(u2.as_bytes());
        let d2 = hex::encode(h2.finalize());
        let prefixes_agree = d1[..DIGEST_CHARS] == d2[..DIGEST_CHARS];
        assert_eq!(path(u1) == path(u2), prefixes_agree);
      }
    }
  }
}
