use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vault_core::{Result, VaultError};

pub mod env_substitution;

pub use env_substitution::substitute_env_vars;

const DEFAULT_BASE_URL: &str = "https://convoapi.vaultsuite.store";
const REDACTED: &str = "********";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    pub api: ApiSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub export: ExportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Credential handed to the API client. Never read from ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    pub session_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_batches")]
    pub max_batches: usize,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "default_download_pause_ms")]
    pub download_pause_ms: u64,
    #[serde(default = "default_max_range_months")]
    pub max_range_months: u32,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl VaultConfig {
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| VaultError::ConfigError(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut raw: serde_json::Value = serde_yaml::from_str(yaml)
            .map_err(|e| VaultError::ConfigError(format!("Failed to parse YAML: {}", e)))?;

        substitute_env_vars(&mut raw)?;

        let mut config: VaultConfig = serde_json::from_value(raw)
            .map_err(|e| VaultError::ConfigError(format!("Invalid configuration: {}", e)))?;

        config.expand_env_vars();
        config.validate()?;

        Ok(config)
    }

    /// Build a configuration purely from `CONVOVAULT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let session_token = env::var("CONVOVAULT_SESSION_TOKEN").map_err(|_| {
            VaultError::ConfigError(
                "No config file found and CONVOVAULT_SESSION_TOKEN is not set".into(),
            )
        })?;

        let mut config = VaultConfig {
            api: ApiSettings {
                base_url: env::var("CONVOVAULT_API_URL")
                    .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
                timeout_ms: default_timeout_ms(),
            },
            auth: AuthSettings { session_token },
            export: ExportSettings::default(),
        };

        config.expand_env_vars();
        config.validate()?;

        Ok(config)
    }

    fn expand_env_vars(&mut self) {
        if let Ok(output_dir) = env::var("DOWNLOAD_DIR") {
            self.export.output_dir = PathBuf::from(output_dir);
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(VaultError::ConfigError(
                "API base_url must start with http:// or https://".into(),
            ));
        }
        if self.auth.session_token.trim().is_empty() {
            return Err(VaultError::ConfigError("Session token cannot be empty".into()));
        }
        if self.export.page_size == 0 {
            return Err(VaultError::ConfigError("page_size must be at least 1".into()));
        }
        if self.export.max_batches == 0 {
            return Err(VaultError::ConfigError("max_batches must be at least 1".into()));
        }
        Ok(())
    }

    /// Copy safe to print.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.auth.session_token = REDACTED.to_string();
        config
    }

    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".convo-vault")
            .join("config.yaml")
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ExportSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn download_pause(&self) -> Duration {
        Duration::from_millis(self.download_pause_ms)
    }
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_batches: default_max_batches(),
            cooldown_ms: default_cooldown_ms(),
            download_pause_ms: default_download_pause_ms(),
            max_range_months: default_max_range_months(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_timeout_ms() -> u64 { 30_000 }
fn default_page_size() -> usize { 500 }
fn default_max_batches() -> usize { 20 }
fn default_cooldown_ms() -> u64 { 300 }
fn default_download_pause_ms() -> u64 { 500 }
fn default_max_range_months() -> u32 { 6 }
fn default_output_dir() -> PathBuf { PathBuf::from("./exports") }
