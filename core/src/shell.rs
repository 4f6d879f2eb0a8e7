//! Invokes external VCS binaries and captures their output.
//!
//! Every call site uses argv-style arguments, never shell-string composition:
//! `run_argv` returns the full `Output` for callers that need the exit status
//! (e.g. distinguishing "branch doesn't exist" from a hard failure),
//! `run_argv_text`/`run_argv_checked` build on it for the two common shapes
//! (parse stdout regardless of status; treat non-zero as an error).

use std::path::Path;
use std::process::{Command, Output, Stdio};

use log::debug;

use crate::error::{BridgeError, Result};

/// Runs `program` with `args` in `cwd`, returning the raw `Output`.
///
/// Does not interpret the exit status: every caller has a distinct success
/// shape (some parse stdout regardless of status, some treat non-zero as a
/// conflict rather than a failure), so a unified error channel here would
/// force every caller to re-parse anyway.
pub fn run_argv(program: &str, args: &[&str], cwd: &Path) -> Result<Output> {
  let cmd_str = format!("{} {}", program, args.join(" "));
  debug!("Running '{}' in {}", cmd_str, cwd.display());

  Command::new(program)
    .args(args)
    .current_dir(cwd)
    .output()
    .map_err(|e| BridgeError::Io {
      source: e,
      path: cwd.to_path_buf(),
    })
}

/// Runs `program` with `args` in `cwd` and returns stdout as UTF-8 text,
/// discarding stderr. Never fails on a non-zero exit status: the caller
/// parses whatever stdout came back, treating malformed or empty output as
/// "no information" per the error handling design.
pub fn run_argv_text(program: &str, args: &[&str], cwd: &Path) -> Result<String> {
  let output = run_argv(program, args, cwd)?;
  Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Runs `program` with `args` in `cwd`, returning an error if the command
/// exited non-zero. Use at call sites where failure is never an expected,
/// parseable outcome (plain `git add`, `git commit`, and similar).
pub fn run_argv_checked(program: &str, args: &[&str], cwd: &Path) -> Result<Output> {
  let cmd_str = format!("{} {}", program, args.join(" "));
  let output = run_argv(program, args, cwd)?;
  if !output.status.success() {
    return Err(BridgeError::Command {
      cmd: cmd_str,
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    });
  }
  Ok(output)
}

/// Checks whether `tool_name` exists and is runnable via `--version`.
pub fn check_tool_exists(tool_name: &str) -> Result<()> {
  Command::new(tool_name)
    .arg("--version")
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .status()
    .map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        BridgeError::ToolNotFound(tool_name.to_string())
      } else {
        BridgeError::Io {
          source: e,
          path: std::path::PathBuf::from(tool_name),
        }
      }
    })?;
  Ok(())
}

/// True if `tool_name` can be located and invoked, false otherwise. Used by
/// integration tests to skip patch-side scenarios when `pijul` isn't
/// installed, rather than failing the whole test run.
pub fn tool_available(tool_name: &str) -> bool {
  check_tool_exists(tool_name).is_ok()
}
