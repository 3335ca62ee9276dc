use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::db;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Where the app is served from; every manifest path is relative to it
  pub origin: Url,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub notifications: NotificationsConfig,
  #[serde(default)]
  pub calendar: CalendarConfig,
  /// Database file (default: $XDG_DATA_HOME/spendcache/spendcache.db)
  pub database: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Leading part of every cache name
  pub prefix: String,
  /// Version tag. Bump it whenever the manifest changes.
  pub version: String,
  /// Same-origin paths cached at install
  pub manifest: Vec<String>,
  /// Third-party URLs prefetched into the dynamic cache at install
  pub third_party_assets: Vec<Url>,
  /// Hosts whose responses are treated like local scripts and styles
  pub third_party_origins: Vec<String>,
  /// Analytics hosts that are never cached (case-insensitive)
  pub tracking_hosts: Vec<String>,
  /// Document served to navigations when offline
  pub app_shell: String,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      prefix: "budget-tracker".to_string(),
      version: "v1".to_string(),
      manifest: [
        "/",
        "/index.html",
        "/style.css",
        "/app.js",
        "/manifest.json",
        "/icons/icon-72x72.png",
        "/icons/icon-96x96.png",
        "/icons/icon-128x128.png",
        "/icons/icon-144x144.png",
        "/icons/icon-152x152.png",
        "/icons/icon-192x192.png",
        "/icons/icon-384x384.png",
        "/icons/icon-512x512.png",
      ]
      .iter()
      .map(|s| s.to_string())
      .collect(),
      third_party_assets: Vec::new(),
      third_party_origins: [
        "cdn.jsdelivr.net",
        "cdnjs.cloudflare.com",
        "fonts.googleapis.com",
        "fonts.gstatic.com",
      ]
      .iter()
      .map(|s| s.to_string())
      .collect(),
      tracking_hosts: [
        "google-analytics.com",
        "googletagmanager.com",
        "analytics.google.com",
      ]
      .iter()
      .map(|s| s.to_string())
      .collect(),
      app_shell: "/".to_string(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsConfig {
  /// Whether reminders may be shown at all
  #[serde(default)]
  pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarConfig {
  #[serde(default)]
  pub enabled: bool,
  /// Where .ics files go (default: <data dir>/calendar)
  pub export_dir: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./spendcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/spendcache/config.yaml
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
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/spendcache/config.yaml\n\
                 containing at least `origin: https://your-app.example/`."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("spendcache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("spendcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub(crate) fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.cache.version.trim().is_empty() {
      return Err(eyre!("cache.version must not be empty"));
    }
    Ok(config)
  }

  /// Database location.
  ///
  /// Checks SPENDCACHE_DATABASE first, then the config file, then the
  /// default data directory.
  pub fn database_path(&self) -> Result<PathBuf> {
    if let Ok(path) = std::env::var("SPENDCACHE_DATABASE") {
      return Ok(PathBuf::from(path));
    }
    match &self.database {
      Some(path) => Ok(path.clone()),
      None => db::default_path(),
    }
  }

  pub fn calendar_dir(&self) -> Result<PathBuf> {
    match &self.calendar.export_dir {
      Some(dir) => Ok(dir.clone()),
      None => Ok(db::data_dir()?.join("calendar")),
    }
  }

  /// Manifest entries resolved against the origin.
  pub fn manifest_urls(&self) -> Result<Vec<Url>> {
    self
      .cache
      .manifest
      .iter()
      .map(|p| self.resolve(p))
      .collect()
  }

  pub fn app_shell_url(&self) -> Result<Url> {
    self.resolve(&self.cache.app_shell)
  }

  fn resolve(&self, path: &str) -> Result<Url> {
    self
      .origin
      .join(path)
      .map_err(|e| eyre!("Invalid path '{}' in config: {}", path, e))
  }
}
