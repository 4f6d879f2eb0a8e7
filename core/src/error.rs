use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
  #[error("Configuration error: {0}")]
  Config(String),

  #[error("Configuration file not found at path: {0}\nConsider running `vcsbridge config init` to create a default file.")]
  ConfigNotFound(PathBuf),

  #[error("I/O error at '{path}': {source}")]
  Io {
    source: std::io::Error,
    path: PathBuf,
  },

  #[error("Command failed: {cmd}\nStdout: {stdout}\nStderr: {stderr}")]
  Command {
    cmd: String,
    stdout: String,
    stderr: String,
  },

  #[error("Git operation failed: {0}")]
  GitOperation(String),

  #[error("Pijul operation failed: {0}")]
  PijulOperation(String),

  #[error("Path not found: {0}")]
  PathNotFound(PathBuf),

  #[error("Required tool '{0}' not found in PATH")]
  ToolNotFound(String),

  #[error("TOML parsing error in '{path}': {source}")]
  TomlParse {
    source: toml::de::Error,
    path: PathBuf,
  },

  #[error("TOML serialization error: {0}")]
  TomlSerialize(#[from] toml::ser::Error),

  #[error("Bridge '{0}' not found in configuration")]
  BridgeNotFound(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
