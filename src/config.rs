//! Top-level application configuration.
//!
//! Configuration is stored in `.issuedeck/config.yaml` (or the per-user
//! config directory) and includes:
//! - Remote tracker location, working project, and API token
//! - Debounce interval, page size, and the primary filter field
//! - Query-language field names and the default-query policy
//! - Sentinel, placeholder, and translation tables for selector texts

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DeckError, Result};
use crate::types::DECK_DIR;

pub const TOKEN_ENV: &str = "ISSUEDECK_TOKEN";
pub const BASE_URL_ENV: &str = "ISSUEDECK_BASE_URL";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Authentication token
    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub ui: UiConfig,

    /// Remote operation timeout in seconds (default: 30)
    #[serde(default = "default_remote_timeout")]
    pub remote_timeout: u64,
}

fn default_remote_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            auth: AuthConfig::default(),
            search: SearchConfig::default(),
            query: QueryConfig::default(),
            ui: UiConfig::default(),
            remote_timeout: default_remote_timeout(),
        }
    }
}

/// Where the tracker lives and which project the default query is scoped to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_project")]
    pub project: String,
}

fn default_project() -> String {
    "CC".to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            project: default_project(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Scheduler and pager settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet period before a filter change runs a search
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// A change to this field always qualifies for auto-search
    #[serde(default = "default_primary_field")]
    pub primary_field: String,
}

fn default_debounce_ms() -> u64 {
    400
}

fn default_page_size() -> u32 {
    50
}

fn default_primary_field() -> String {
    "Cliente".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            page_size: default_page_size(),
            primary_field: default_primary_field(),
        }
    }
}

/// Field names and fixed clauses of the remote query language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_key_field")]
    pub key_field: String,

    #[serde(default = "default_text_field")]
    pub text_field: String,

    #[serde(default = "default_created_field")]
    pub created_field: String,

    #[serde(default = "default_completed_field")]
    pub completed_field: String,

    #[serde(default = "default_order_by")]
    pub order_by: String,

    /// Statuses the default query hides
    #[serde(default = "default_terminal_statuses")]
    pub terminal_statuses: Vec<String>,

    /// Filter name -> query-language field; unmapped names are used quoted
    #[serde(default = "default_field_map")]
    pub fields: IndexMap<String, String>,
}

fn default_key_field() -> String {
    "key".to_string()
}

fn default_text_field() -> String {
    "text".to_string()
}

fn default_created_field() -> String {
    "created".to_string()
}

fn default_completed_field() -> String {
    "resolutiondate".to_string()
}

fn default_order_by() -> String {
    "updated DESC".to_string()
}

fn default_terminal_statuses() -> Vec<String> {
    vec!["Done".to_string(), "Closed".to_string(), "Resolved".to_string()]
}

fn default_field_map() -> IndexMap<String, String> {
    IndexMap::from([
        ("Cliente".to_string(), "\"Cliente\"".to_string()),
        ("Area".to_string(), "component".to_string()),
        ("Stato".to_string(), "status".to_string()),
    ])
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            key_field: default_key_field(),
            text_field: default_text_field(),
            created_field: default_created_field(),
            completed_field: default_completed_field(),
            order_by: default_order_by(),
            terminal_statuses: default_terminal_statuses(),
            fields: default_field_map(),
        }
    }
}

/// Tables used when reading selector and search-box texts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Prefixes that mark a "show all" selection
    #[serde(default = "default_sentinels")]
    pub sentinels: Vec<String>,

    /// Texts the search box shows when empty
    #[serde(default = "default_placeholders")]
    pub placeholders: Vec<String>,

    /// Localized display text -> canonical value
    #[serde(default = "default_translations")]
    pub translations: IndexMap<String, String>,
}

fn default_sentinels() -> Vec<String> {
    ["All", "--", "Tutti", "Tutte"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_placeholders() -> Vec<String> {
    vec!["Search...".to_string(), "Cerca...".to_string()]
}

fn default_translations() -> IndexMap<String, String> {
    IndexMap::from([
        ("Aperto".to_string(), "Open".to_string()),
        ("Chiuso".to_string(), "Closed".to_string()),
        ("In corso".to_string(), "In Progress".to_string()),
    ])
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            sentinels: default_sentinels(),
            placeholders: default_placeholders(),
            translations: default_translations(),
        }
    }
}

/// Keys accepted by `config set`
pub const SETTABLE_KEYS: &[&str] = &[
    "remote.base_url",
    "remote.project",
    "auth.token",
    "remote_timeout",
    "search.debounce_ms",
    "search.page_size",
    "search.primary_field",
    "query.order_by",
];

impl Config {
    /// Get the path to the project-local config file
    pub fn config_path() -> PathBuf {
        PathBuf::from(DECK_DIR).join("config.yaml")
    }

    /// Per-user config file, consulted when no project-local file exists
    pub fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "issuedeck", "issuedeck")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Load configuration, or return default if no file is found
    pub fn load() -> Result<Self> {
        let local = Self::config_path();
        if local.exists() {
            return Self::load_from(&local);
        }

        if let Some(user) = Self::user_config_path()
            && user.exists()
        {
            return Self::load_from(&user);
        }

        Ok(Config::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DeckError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config at {}: {}", path.display(), e),
            ))
        })?;
        let config: Config = serde_yaml_ng::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the project-local file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml_ng::to_string(self)?;
        fs::write(path, content).map_err(|e| {
            DeckError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write config at {}: {}", path.display(), e),
            ))
        })?;

        // The file may hold the API token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.search.page_size == 0 {
            return Err(DeckError::Config(
                "search.page_size must be greater than zero".to_string(),
            ));
        }
        if let Some(ref base_url) = self.remote.base_url {
            parse_base_url(base_url)?;
        }
        Ok(())
    }

    /// Get the API token from the environment or the config file
    pub fn token(&self) -> Option<String> {
        self.token_with(|key| env::var(key).ok())
    }

    fn token_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        if let Some(token) = lookup(TOKEN_ENV)
            && !token.is_empty()
        {
            return Some(token);
        }
        self.auth.token.clone()
    }

    /// Get the tracker base URL from the environment or the config file
    pub fn base_url(&self) -> Result<Url> {
        self.base_url_with(|key| env::var(key).ok())
    }

    fn base_url_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<Url> {
        let raw = lookup(BASE_URL_ENV)
            .filter(|url| !url.is_empty())
            .or_else(|| self.remote.base_url.clone())
            .ok_or_else(|| {
                DeckError::Config(format!(
                    "remote.base_url not configured. Set {BASE_URL_ENV} or run: issuedeck config set remote.base_url <url>"
                ))
            })?;
        parse_base_url(&raw)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }

    /// Set a value by dot-notation key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "remote.base_url" => {
                parse_base_url(value)?;
                self.remote.base_url = Some(value.to_string());
            }
            "remote.project" => self.remote.project = value.to_string(),
            "auth.token" => self.auth.token = Some(value.to_string()),
            "remote_timeout" => self.remote_timeout = parse_number(key, value)?,
            "search.debounce_ms" => self.search.debounce_ms = parse_number(key, value)?,
            "search.page_size" => {
                let size: u32 = parse_number(key, value)?;
                if size == 0 {
                    return Err(DeckError::Config(
                        "search.page_size must be greater than zero".to_string(),
                    ));
                }
                self.search.page_size = size;
            }
            "search.primary_field" => self.search.primary_field = value.to_string(),
            "query.order_by" => self.query.order_by = value.to_string(),
            _ => {
                return Err(DeckError::Config(format!(
                    "unknown config key '{key}'. Valid keys: {}",
                    SETTABLE_KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| DeckError::Config(format!("invalid base URL '{raw}': {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(DeckError::Config(format!(
            "base URL '{raw}' must use http or https"
        )));
    }
    Ok(url)
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| DeckError::Config(format!("'{value}' is not a valid number for {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.remote.base_url.is_none());
        assert!(config.auth.token.is_none());
        assert_eq!(config.remote.project, "CC");
        assert_eq!(config.search.page_size, 50);
        assert_eq!(config.remote_timeout(), Duration::from_secs(30));
        assert_eq!(config.debounce(), Duration::from_millis(400));
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.set("auth.token", "tok_test123").unwrap();
        config
            .set("remote.base_url", "https://tracker.example.com")
            .unwrap();
        config.set("search.page_size", "25").unwrap();

        let yaml = serde_yaml_ng::to_string(&config).unwrap();
        let parsed: Config = serde_yaml_ng::from_str(&yaml).unwrap();

        assert_eq!(parsed.auth.token.as_deref(), Some("tok_test123"));
        assert_eq!(parsed.search.page_size, 25);
        assert_eq!(
            parsed.remote.base_url.as_deref(),
            Some("https://tracker.example.com")
        );
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
remote:
  project: OPS
search:
  debounce_ms: 150
"#;
        let config: Config = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.remote.project, "OPS");
        assert_eq!(config.search.debounce_ms, 150);
        assert_eq!(config.search.page_size, 50);
        assert_eq!(config.remote_timeout, 30);
        assert_eq!(config.query.order_by, "updated DESC");
        assert_eq!(config.ui.sentinels[0], "All");
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut config = Config::default();
        config.auth.token = Some("super-secret".to_string());
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_env_token_takes_precedence() {
        let mut config = Config::default();
        config.auth.token = Some("from-file".to_string());

        let from_env = config.token_with(|key| (key == TOKEN_ENV).then(|| "from-env".to_string()));
        assert_eq!(from_env.as_deref(), Some("from-env"));

        let empty_env = config.token_with(|_| Some(String::new()));
        assert_eq!(empty_env.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_base_url_missing_is_config_error() {
        let config = Config::default();
        let err = config.base_url_with(|_| None).unwrap_err();
        assert!(matches!(err, DeckError::Config(_)));
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("search.page_size", "0").is_err());
        assert!(config.set("search.debounce_ms", "soon").is_err());
        assert!(config.set("remote.base_url", "ftp://example.com").is_err());
        assert!(config.set("nope", "1").is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.set("remote.project", "OPS").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.remote.project, "OPS");
    }
}
