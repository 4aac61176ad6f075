//! Shared configuration for the sitesync CLI.
//!
//! TOML profiles, the local directory layout, credential resolution
//! (env + keyring + plaintext), and translation to
//! `sitesync_core::ControllerConfig` and `sitesync_core::Workspace`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sitesync_core::{
    ControllerConfig, DEFAULT_BACKUP_RETENTION_DAYS, TlsVerification, Workspace,
};

pub const APP_NAME: &str = "sitesync";

/// Meraki Dashboard API root.
pub const DEFAULT_BASE_URL: &str = "https://api.meraki.com/api/v1";

/// Conventional variable holding a Dashboard API key.
pub const API_KEY_ENV: &str = "MERAKI_API_KEY";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Local directory layout.
    #[serde(default)]
    pub paths: Paths,

    /// Named Dashboard profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            paths: Paths::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Retries for throttled or failing requests.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    4
}

/// Where input, output, backups, and the network cache live.
/// Relative paths are taken from the working directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Paths {
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Defaults to the platform cache directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    #[serde(default = "default_retention_days")]
    pub backup_retention_days: u32,

    #[serde(default = "default_cache_ttl_days")]
    pub network_cache_ttl_days: u64,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            backup_dir: default_backup_dir(),
            cache_dir: None,
            backup_retention_days: default_retention_days(),
            network_cache_ttl_days: default_cache_ttl_days(),
        }
    }
}

fn default_input_dir() -> PathBuf {
    "input".into()
}
fn default_output_dir() -> PathBuf {
    "output".into()
}
fn default_backup_dir() -> PathBuf {
    "backups".into()
}
fn default_retention_days() -> u32 {
    DEFAULT_BACKUP_RETENTION_DAYS
}
fn default_cache_ttl_days() -> u64 {
    7
}

impl Paths {
    /// Directory layout with the cache directory resolved.
    pub fn workspace(&self) -> Workspace {
        let cache_dir = self.cache_dir.clone().unwrap_or_else(|| {
            ProjectDirs::from("com", APP_NAME, APP_NAME).map_or_else(
                || self.output_dir.join(".cache"),
                |dirs| dirs.cache_dir().to_path_buf(),
            )
        });
        Workspace {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            backup_dir: self.backup_dir.clone(),
            cache_dir,
        }
    }

    pub fn network_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.network_cache_ttl_days.saturating_mul(24 * 60 * 60))
    }
}

/// A named Dashboard profile: one organization and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Dashboard organization ID.
    pub org_id: Option<String>,

    /// API root; defaults to the public Dashboard.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key (plaintext -- prefer keyring or env var).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Path to a custom CA certificate (proxies that intercept TLS).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Override retry count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            org_id: None,
            base_url: default_base_url(),
            api_key: None,
            api_key_env: None,
            ca_cert: None,
            timeout: None,
            max_retries: None,
        }
    }
}

impl Config {
    /// The requested profile name, else the configured default.
    pub fn profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", APP_NAME, APP_NAME).map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push(APP_NAME);
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing is fine) overlaid with `SITESYNC_*`
/// variables; nested keys use `__`, e.g. `SITESYNC_PATHS__INPUT_DIR`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SITESYNC_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(APP_NAME, &format!("{profile_name}/api-key"))
}

/// Resolve an API key from the credential chain (no CLI flag step).
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Conventional Meraki variable
    if let Ok(val) = std::env::var(API_KEY_ENV) {
        return Ok(SecretString::from(val));
    }

    // 3. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 4. Plaintext in config
    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a profile's API key in the system keyring.
pub fn store_api_key(profile_name: &str, key: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(key.expose_secret())?;
    Ok(())
}

// ── ControllerConfig translation ────────────────────────────────────

/// Build a `ControllerConfig` from a profile and an already-resolved key.
pub fn controller_config(
    profile: &Profile,
    api_key: SecretString,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let org_id = profile
        .org_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ConfigError::Validation {
            field: "org_id".into(),
            reason: "no organization ID configured".into(),
        })?;

    let base_url: url::Url = profile
        .base_url
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "base_url".into(),
            reason: format!("invalid URL: {}", profile.base_url),
        })?;

    let tls = profile
        .ca_cert
        .clone()
        .map_or(TlsVerification::SystemDefaults, TlsVerification::CustomCa);

    Ok(ControllerConfig {
        base_url,
        api_key,
        org_id,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        max_retries: profile.max_retries.unwrap_or(defaults.max_retries),
    })
}
