//! Configuration loading and resolution
//!
//! Config file location priority:
//! 1. Command-line argument (highest priority)
//! 2. `RSD_CONFIG` environment variable
//! 3. `~/.config/rsd/config.toml` (Linux: falls back to `/etc/rsd/config.toml`)
//! 4. Compiled defaults
//!
//! A missing default-location file is not an error: defaults are used and a
//! warning is logged. Individual settings can then be overridden through
//! `RSD_*` environment variables.

use crate::types::ModelId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5780";
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const ENV_CONFIG_PATH: &str = "RSD_CONFIG";
pub const ENV_API_URL: &str = "RSD_API_URL";
pub const ENV_BIND_ADDR: &str = "RSD_BIND_ADDR";
pub const ENV_IDENTITY_URL: &str = "RSD_IDENTITY_URL";
pub const ENV_IDENTITY_ANON_KEY: &str = "RSD_IDENTITY_ANON_KEY";
pub const ENV_LOG_LEVEL: &str = "RSD_LOG_LEVEL";

/// How the batch aggregator reaches the prediction service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    /// One `POST /predict-batch` call for the whole list
    #[default]
    Native,
    /// One concurrent `POST /predict` call per review
    PerItem,
}

/// Where prediction history is persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryBackend {
    /// Managed store behind the identity provider's REST API
    #[default]
    Remote,
    /// Local SQLite file
    Sqlite,
}

/// One entry of the model table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: ModelId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub available: bool,
}

fn default_true() -> bool {
    true
}

/// Identity/history provider endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
}

impl IdentityConfig {
    /// Both URL and anon key, or a configuration error naming what is missing
    pub fn require(&self) -> Result<(&str, &str)> {
        match (self.url.as_deref(), self.anon_key.as_deref()) {
            (Some(url), Some(key)) if !url.trim().is_empty() && !key.trim().is_empty() => {
                Ok((url.trim_end_matches('/'), key))
            }
            _ => Err(Error::Config(format!(
                "Identity provider not configured. Please configure using one of:\n\
                 1. Environment: {}=https://<project>.supabase.co and {}=<anon key>\n\
                 2. TOML config: [identity] url = \"...\", anon_key = \"...\"",
                ENV_IDENTITY_URL, ENV_IDENTITY_ANON_KEY
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub backend: HistoryBackend,
    /// SQLite file path (sqlite backend only)
    pub database_path: Option<PathBuf>,
    /// Rows shown in the history table
    pub limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: HistoryBackend::default(),
            database_path: None,
            limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Immutable dashboard configuration, passed into every component constructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Prediction service base URL
    pub api_url: String,
    /// Address the dashboard listens on
    pub bind_addr: String,
    /// Optional HTTP client timeout; unset leaves the transport default
    pub request_timeout_secs: Option<u64>,
    pub batch_mode: BatchMode,
    /// Model table in display/iteration order
    pub models: Vec<ModelConfig>,
    /// Products offered in the selectors
    pub products: Vec<String>,
    pub identity: IdentityConfig,
    pub history: HistoryConfig,
    pub logging: LoggingConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            request_timeout_secs: None,
            batch_mode: BatchMode::default(),
            models: default_models(),
            products: default_products(),
            identity: IdentityConfig::default(),
            history: HistoryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_models() -> Vec<ModelConfig> {
    [
        (ModelId::Logreg, "Rápida y eficiente"),
        (ModelId::Lstm, "Red neuronal recurrente"),
        (ModelId::Bert, "Transformer pre-entrenado"),
    ]
    .into_iter()
    .map(|(id, description)| ModelConfig {
        id,
        name: id.display_name().to_string(),
        description: description.to_string(),
        available: true,
    })
    .collect()
}

fn default_products() -> Vec<String> {
    [
        "Café Premium",
        "Chocolate Negro 70%",
        "Miel Orgánica",
        "Aceite de Oliva Virgen",
        "Granola de Frutos Secos",
        "Galletas Integrales",
        "Té Verde",
        "Nueces de Macadamia",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

impl DashboardConfig {
    /// Available models in configuration order
    pub fn enabled_models(&self) -> Vec<ModelId> {
        self.models
            .iter()
            .filter(|m| m.available)
            .map(|m| m.id)
            .collect()
    }

    pub fn is_enabled(&self, model: ModelId) -> bool {
        self.models.iter().any(|m| m.id == model && m.available)
    }

    /// Configured display name, falling back to the built-in one
    pub fn model_name(&self, model: ModelId) -> &str {
        self.models
            .iter()
            .find(|m| m.id == model)
            .map(|m| m.name.as_str())
            .unwrap_or_else(|| model.display_name())
    }

    /// First enabled model, used as the default selection
    pub fn default_model(&self) -> Option<ModelId> {
        self.enabled_models().first().copied()
    }

    /// Structural checks; identity presence is checked separately by callers
    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "api_url must be an http(s) URL, got '{}'",
                self.api_url
            )));
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if !seen.insert(model.id) {
                return Err(Error::Config(format!(
                    "Model '{}' listed more than once",
                    model.id
                )));
            }
        }

        if self.enabled_models().is_empty() {
            return Err(Error::Config("At least one model must be available".to_string()));
        }

        if self.products.iter().all(|p| p.trim().is_empty()) {
            return Err(Error::Config("At least one product must be configured".to_string()));
        }

        if self.history.limit == 0 {
            return Err(Error::Config("history.limit must be greater than 0".to_string()));
        }

        Ok(())
    }

    /// Apply `RSD_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env(ENV_API_URL) {
            info!("Prediction service URL from {}", ENV_API_URL);
            self.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(addr) = non_empty_env(ENV_BIND_ADDR) {
            self.bind_addr = addr;
        }
        if let Some(url) = non_empty_env(ENV_IDENTITY_URL) {
            self.identity.url = Some(url);
        }
        if let Some(key) = non_empty_env(ENV_IDENTITY_ANON_KEY) {
            self.identity.anon_key = Some(key);
        }
        if let Some(level) = non_empty_env(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Resolves which config file to read and produces the final configuration
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Explicitly requested config file (CLI, then environment)
    fn explicit_path(&self) -> Option<PathBuf> {
        self.cli_path
            .clone()
            .or_else(|| non_empty_env(ENV_CONFIG_PATH).map(PathBuf::from))
    }

    /// Resolve, load, override and validate
    ///
    /// An explicitly requested file that is missing is an error; a missing
    /// default-location file falls back to compiled defaults.
    pub fn resolve(&self) -> Result<DashboardConfig> {
        let mut config = match self.explicit_path() {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                load_config_file(&path)?
            }
            None => match default_config_path() {
                Some(path) => load_config_file(&path)?,
                None => {
                    warn!("No config file found, using compiled defaults");
                    DashboardConfig::default()
                }
            },
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

/// Default config file location for the platform, if one exists
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("rsd").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/rsd/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML config file; absent keys take their defaults
pub fn load_config_file(path: &Path) -> Result<DashboardConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: DashboardConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DashboardConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.api_url, "http://127.0.0.1:8000");
        assert_eq!(
            config.enabled_models(),
            vec![ModelId::Logreg, ModelId::Lstm, ModelId::Bert]
        );
        assert_eq!(config.products.len(), 8);
        assert_eq!(config.history.limit, 10);
    }

    #[test]
    fn test_enabled_models_keep_config_order() {
        let mut config = DashboardConfig::default();
        config.models.reverse();
        config.models[1].available = false; // lstm
        assert_eq!(config.enabled_models(), vec![ModelId::Bert, ModelId::Logreg]);
        assert!(!config.is_enabled(ModelId::Lstm));
        assert_eq!(config.default_model(), Some(ModelId::Bert));
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let mut config = DashboardConfig::default();
        config.api_url = "127.0.0.1:8000".to_string();
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        for model in &mut config.models {
            model.available = false;
        }
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        let duplicate = config.models[0].clone();
        config.models.push(duplicate);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_identity_require() {
        let mut identity = IdentityConfig::default();
        assert!(identity.require().is_err());

        identity.url = Some("https://example.supabase.co/".to_string());
        identity.anon_key = Some("anon".to_string());
        let (url, key) = identity.require().unwrap();
        assert_eq!(url, "https://example.supabase.co");
        assert_eq!(key, "anon");
    }

    #[test]
    fn test_model_name_fallback() {
        let mut config = DashboardConfig::default();
        config.models.retain(|m| m.id != ModelId::Bert);
        assert_eq!(config.model_name(ModelId::Bert), "BERT");
        assert_eq!(config.model_name(ModelId::Logreg), "Regresión Logística");
    }
}
