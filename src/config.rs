use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// REST API root; point at `https://HOST/api/v3` for GitHub Enterprise
  #[serde(default = "default_api_url")]
  pub api_url: String,
  /// Owner assumed when a repository is given without one
  pub default_owner: Option<String>,
  /// Page size when `--per-page` isn't given
  pub per_page: Option<u32>,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Database location (default: $XDG_DATA_HOME/ghx/cache.db)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
    }
  }
}

fn default_api_url() -> String {
  "https://api.github.com".to_string()
}

fn default_true() -> bool {
  true
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api_url: default_api_url(),
      default_owner: None,
      per_page: None,
      cache: CacheConfig::default(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./ghx.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/ghx/config.yaml
  ///
  /// With no file anywhere, defaults apply.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("ghx.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("ghx").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file is valid YAML `null`
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Get the GitHub token from environment variables.
  ///
  /// Checks GHX_TOKEN first, then GITHUB_TOKEN and GH_TOKEN. Requests are
  /// sent anonymously when none is set.
  pub fn get_api_token() -> Option<String> {
    ["GHX_TOKEN", "GITHUB_TOKEN", "GH_TOKEN"]
      .iter()
      .filter_map(|name| std::env::var(name).ok())
      .find(|token| !token.trim().is_empty())
  }
}
