//! Configuration loading and typed config structures for the Charge service.
//!
//! The canonical configuration lives in `charge-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level service configuration.
///
/// Mirrors the structure of `charge-config.yaml`. Every field has a default,
/// so an empty document is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChargeConfig {
    /// Listener and advertised network identity.
    #[serde(default)]
    pub server: ServerSection,

    /// Progress growth policy and log sizing.
    #[serde(default)]
    pub progress: ProgressConfig,

    /// Ambient (timer-driven) growth.
    #[serde(default)]
    pub ambient: AmbientConfig,

    /// Names that force-complete the session.
    #[serde(default)]
    pub triggers: TriggerConfig,
}

impl ChargeConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `PORT` overrides `server.port`
    /// - `PUBLIC_URL` overrides `server.public_url`
    /// - `SERVER_ADDRESS` overrides `server.advertised_address`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    ///
    /// Environment overrides and validation apply in both cases.
    ///
    /// # Errors
    ///
    /// Same as [`ChargeConfig::from_file`], except that a missing file is
    /// not an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        info!(path = %path.display(), "Config file not found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Unparseable `PORT` values are ignored. `PUBLIC_URL` is trimmed and
    /// loses any trailing `/`; an empty value clears it.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|p| p.trim().parse::<u16>().ok()) {
            self.server.port = port;
        }
        if let Some(url) = lookup("PUBLIC_URL") {
            self.server.public_url = normalize_public_url(&url);
        }
        if let Some(addr) = lookup("SERVER_ADDRESS") {
            let addr = addr.trim();
            if !addr.is_empty() {
                self.server.advertised_address = Some(addr.to_owned());
            }
        }
    }

    /// Check that every value is inside its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ceiling = self.progress.ceiling;
        if !(ceiling > 0.0 && ceiling < charge_types::COMPLETION_PROGRESS) {
            return Err(ConfigError::Invalid(format!(
                "progress.ceiling must be in (0, 100), got {ceiling}"
            )));
        }
        if self.progress.log_cap == 0 {
            return Err(ConfigError::Invalid(String::from(
                "progress.log_cap must be at least 1",
            )));
        }
        if self.progress.target_submitters == 0 {
            return Err(ConfigError::Invalid(String::from(
                "progress.target_submitters must be at least 1",
            )));
        }
        if self.ambient.interval_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "ambient.interval_ms must be at least 1",
            )));
        }
        Ok(())
    }
}

/// Trim a public URL and drop its trailing slash. Empty means unset.
fn normalize_public_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Listener and advertised network identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSection {
    /// Address to bind the HTTP listener to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on (also the advertised port).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address shown to participants. Auto-detected when unset.
    #[serde(default)]
    pub advertised_address: Option<String>,

    /// Public (tunnel) URL shown to participants when set.
    #[serde(default)]
    pub public_url: Option<String>,

    /// Directory holding the built front end, served with SPA fallback.
    #[serde(default)]
    pub static_dir: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            advertised_address: None,
            public_url: None,
            static_dir: None,
        }
    }
}

/// Which increment policy drives organic growth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Five progress bands with shrinking delta ranges.
    #[default]
    DeceleratingBand,
    /// A narrow fixed range sized by a target submitter count.
    FixedTarget,
}

/// Progress growth configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgressConfig {
    /// The increment policy variant.
    #[serde(default)]
    pub policy: PolicyKind,

    /// Submitters expected to carry progress from 0 to ~100
    /// (`fixed_target` only).
    #[serde(default = "default_target_submitters")]
    pub target_submitters: u32,

    /// Upper bound for organic growth. Must be below 100.
    #[serde(default = "default_ceiling")]
    pub ceiling: f64,

    /// Maximum number of retained activity log entries.
    #[serde(default = "default_log_cap")]
    pub log_cap: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            target_submitters: default_target_submitters(),
            ceiling: default_ceiling(),
            log_cap: default_log_cap(),
        }
    }
}

/// Ambient growth configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AmbientConfig {
    /// Whether the ambient ticker runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Milliseconds between ambient ticks.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Submissions required before ambient growth starts.
    #[serde(default = "default_min_submissions")]
    pub min_submissions: u64,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_interval_ms(),
            min_submissions: default_min_submissions(),
        }
    }
}

/// Completion trigger allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TriggerConfig {
    /// Names that trigger completion on an exact match.
    #[serde(default = "default_exact_triggers")]
    pub exact: Vec<String>,

    /// Names that trigger completion ignoring case.
    #[serde(default = "default_case_insensitive_triggers")]
    pub case_insensitive: Vec<String>,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            exact: default_exact_triggers(),
            case_insensitive: default_case_insensitive_triggers(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    3001
}

const fn default_target_submitters() -> u32 {
    300
}

const fn default_ceiling() -> f64 {
    99.99
}

const fn default_log_cap() -> usize {
    50
}

const fn default_true() -> bool {
    true
}

const fn default_interval_ms() -> u64 {
    100
}

const fn default_min_submissions() -> u64 {
    3
}

fn default_exact_triggers() -> Vec<String> {
    vec![
        String::from("START_DEMO_NOW"),
        String::from("张三"),
        String::from("Admin"),
    ]
}

fn default_case_insensitive_triggers() -> Vec<String> {
    vec![String::from("demo")]
}
