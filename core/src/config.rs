//! `bridges.toml`: global settings plus a map of named bridge definitions.
//! Mirrors the teacher's `ConfigFile`/`ProjectConfig` shape, renamed to this
//! domain's concerns.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalSettings {
  pub default_poll_interval_secs: Option<u64>,
  pub pijul_binary: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct BridgeConfig {
  pub commit_repo_url: String,
  pub patch_repo_url: String,
  pub poll_interval_secs: Option<u64>,
  /// Project identifier a webhook trigger must carry for this bridge to
  /// accept it. Defaults to the bridge's own name if unset.
  pub webhook_project_id: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ConfigFile {
  #[serde(default)]
  pub settings: GlobalSettings,
  #[serde(default)]
  pub bridges: HashMap<String, BridgeConfig>,
}

impl ConfigFile {
  pub fn bridge(&self, bridge_id: &str) -> Result<&BridgeConfig> {
    self
      .bridges
      .get(bridge_id)
      .ok_or_else(|| BridgeError::BridgeNotFound(bridge_id.to_string()))
  }
}

pub fn get_default_config_path() -> Result<PathBuf> {
  match ProjectDirs::from("com", "vcsbridge", "vcsbridge") {
    Some(proj_dirs) => Ok(proj_dirs.config_dir().join("bridges.toml")),
    None => Err(BridgeError::Config(
      "could not determine standard configuration directory".to_string(),
    )),
  }
}

pub fn load_config(path_override: Option<&Path>) -> Result<ConfigFile> {
  let config_path = match path_override {
    Some(p) => p.to_path_buf(),
    None => get_default_config_path()?,
  };

  log::debug!("loading configuration from {}", config_path.display());

  match fs::read_to_string(&config_path) {
    Ok(content) => toml::from_str(&content).map_err(|source| BridgeError::TomlParse {
      source,
      path: config_path,
    }),
    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
      Err(BridgeError::ConfigNotFound(config_path))
    }
    Err(source) => Err(BridgeError::Io {
      source,
      path: config_path,
    }),
  }
}

pub fn save_config(config: &ConfigFile, path_override: Option<&Path>) -> Result<()> {
  let config_path = match path_override {
    Some(p) => p.to_path_buf(),
    None => get_default_config_path()?,
  };
  if let Some(parent) = config_path.parent() {
    fs::create_dir_all(parent).map_err(|source| BridgeError::Io {
      source,
      path: parent.to_path_buf(),
    })?;
  }
  let serialized = toml::to_string_pretty(config)?;
  fs::write(&config_path, serialized).map_err(|source| BridgeError::Io {
    source,
    path: config_path,
  })
}

/// A commented default file, written by `vcsbridge config init`.
pub fn default_config_template() -> String {
  r#"# vcsbridge configuration.
#
# [settings]
# default-poll-interval-secs = 30
# pijul-binary = "pijul"
#
# [bridges.example]
# commit-repo-url = "https://github.com/example/example.git"
# patch-repo-url = "https://nest.pijul.com/example/example"
# poll-interval-secs = 30
"#
  .to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bridge_lookup_reports_missing_bridge_by_name() {
    let config = ConfigFile::default();
    let err = config.bridge("nope").unwrap_err();
    assert!(matches!(err, BridgeError::BridgeNotFound(name) if name == "nope"));
  }
}
