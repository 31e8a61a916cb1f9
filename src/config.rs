use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Key of the persisted base URL override in the local store.
pub const API_BASE_URL_KEY: &str = "api_base_url";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
  pub environment: Environment,
  /// Backend base URL. Takes precedence over the environment default.
  pub api_url: Option<String>,
  pub cache: CacheConfig,
  /// Months shown by `trends` when not given on the command line
  pub trend_months: u32,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      environment: Environment::default(),
      api_url: None,
      cache: CacheConfig::default(),
      trend_months: 12,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  #[default]
  Development,
  Test,
  Production,
}

impl Environment {
  pub fn default_base_url(self) -> &'static str {
    match self {
      Environment::Development => "http://localhost:8080",
      Environment::Test => "https://test-api.fintrackr.com",
      Environment::Production => "https://api.fintrackr.com",
    }
  }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
  pub enabled: bool,
  pub ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      ttl_secs: 300,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./fintrackr.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/fintrackr/config.yaml
  ///
  /// Without any file the defaults apply.
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
    let local = PathBuf::from("fintrackr.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("fintrackr").join("config.yaml");
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

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // An empty file deserializes to unit, not to a mapping
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Resolve the backend base URL.
  ///
  /// Precedence: command-line override, then the persisted setting, then
  /// `api_url` from the config file, then the environment default.
  pub fn resolve_base_url<'a>(
    &'a self,
    cli_override: Option<&'a str>,
    persisted: Option<&'a str>,
  ) -> Result<Url> {
    let non_blank = |s: Option<&'a str>| s.map(str::trim).filter(|s| !s.is_empty());
    let raw = non_blank(cli_override)
      .or_else(|| non_blank(persisted))
      .or_else(|| non_blank(self.api_url.as_deref()))
      .unwrap_or_else(|| self.environment.default_base_url());

    Url::parse(raw).map_err(|e| eyre!("Invalid API base URL {:?}: {}", raw, e))
  }

  pub fn cache_ttl(&self) -> chrono::Duration {
    // Clamped well inside the range chrono accepts
    chrono::Duration::seconds(self.cache.ttl_secs.min(u64::from(u32::MAX)) as i64)
  }

  /// Get the login password from the environment.
  ///
  /// Checks FINTRACKR_PASSWORD.
  pub fn get_password() -> Result<String> {
    std::env::var("FINTRACKR_PASSWORD").map_err(|_| {
      eyre!("Password not given. Pass --password or set the FINTRACKR_PASSWORD environment variable.")
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_full_config() {
    let config = Config::parse(
      r#"
environment: production
api_url: https://finance.example.com
cache:
  enabled: false
  ttl_secs: 60
trend_months: 6
"#,
    )
    .unwrap();

    assert_eq!(config.environment, Environment::Production);
    assert_eq!(config.api_url.as_deref(), Some("https://finance.example.com"));
    assert!(!config.cache.enabled);
    assert_eq!(config.cache.ttl_secs, 60);
    assert_eq!(config.trend_months, 6);
  }

  #[test]
  fn test_missing_fields_use_defaults() {
    let config = Config::parse("environment: test\n").unwrap();
    assert_eq!(config.environment, Environment::Test);
    assert_eq!(config.cache, CacheConfig::default());
    assert_eq!(config.trend_months, 12);

    let empty = Config::parse("").unwrap();
    assert_eq!(empty.environment, Environment::Development);
    assert_eq!(empty.trend_months, 12);
  }

  #[test]
  fn test_unknown_environment_is_rejected() {
    assert!(Config::parse("environment: staging\n").is_err());
  }

  #[test]
  fn test_base_url_precedence() {
    let config = Config {
      api_url: Some("https://from-config.example.com".to_string()),
      ..Config::parse("").unwrap()
    };

    let url = config
      .resolve_base_url(Some("http://override:9000"), Some("https://persisted.example.com"))
      .unwrap();
    assert_eq!(url.as_str(), "http://override:9000/");

    let url = config
      .resolve_base_url(None, Some("https://persisted.example.com"))
      .unwrap();
    assert_eq!(url.as_str(), "https://persisted.example.com/");

    let url = config.resolve_base_url(None, None).unwrap();
    assert_eq!(url.as_str(), "https://from-config.example.com/");
  }

  #[test]
  fn test_base_url_falls_back_to_environment_default() {
    let config = Config {
      environment: Environment::Production,
      ..Config::parse("").unwrap()
    };
    let url = config.resolve_base_url(None, Some("  ")).unwrap();
    assert_eq!(url.as_str(), "https://api.fintrackr.com/");
  }

  #[test]
  fn test_blank_persisted_url_is_skipped() {
    let config = Config {
      api_url: Some("https://from-config.example.com".to_string()),
      ..Config::default()
    };
    let url = config.resolve_base_url(None, Some("")).unwrap();
    assert_eq!(url.as_str(), "https://from-config.example.com/");
  }

  #[test]
  fn test_invalid_base_url_is_an_error() {
    let config = Config::parse("").unwrap();
    assert!(config.resolve_base_url(Some("not a url"), None).is_err());
  }

  #[test]
  fn test_explicit_missing_path_is_an_error() {
    assert!(Config::load(Some(Path::new("/nonexistent/fintrackr.yaml"))).is_err());
  }

  #[test]
  fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "cache:\n  ttl_secs: 30\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.cache_ttl(), chrono::Duration::seconds(30));
    assert!(config.cache.enabled);
  }
}
