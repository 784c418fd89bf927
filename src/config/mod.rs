use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub trial: TrialConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Code handed to buyers; grants a standard membership
    #[serde(default = "default_member_code")]
    pub member_code: String,
    /// Code that registers an administrator
    #[serde(default = "default_admin_code")]
    pub admin_code: String,
    /// Prefix for codes produced by the admin console
    #[serde(default = "default_code_prefix")]
    pub code_prefix: String,
    /// Honor the `admin=true` launch parameter and the persisted admin flag.
    /// When false, only an admin-code account grants admin privilege.
    #[serde(default = "default_trust_client_admin_signals")]
    pub trust_client_admin_signals: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            member_code: default_member_code(),
            admin_code: default_admin_code(),
            code_prefix: default_code_prefix(),
            trust_client_admin_signals: default_trust_client_admin_signals(),
        }
    }
}

fn default_member_code() -> String {
    "DIFY2024MASTER".to_string()
}

fn default_admin_code() -> String {
    "DIFY2024ADMIN".to_string()
}

fn default_code_prefix() -> String {
    "DIFY".to_string()
}

fn default_trust_client_admin_signals() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrialConfig {
    /// Length of the trial window in days (default: 3)
    #[serde(default = "default_trial_days")]
    pub duration_days: i64,
    /// Download allowance recorded on trial accounts (default: 1)
    #[serde(default = "default_trial_download_limit")]
    pub download_limit: u32,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            duration_days: default_trial_days(),
            download_limit: default_trial_download_limit(),
        }
    }
}

/// Longest accepted trial window (about a century)
pub const MAX_TRIAL_DAYS: i64 = 36_500;

fn default_trial_days() -> i64 {
    3
}

fn default_trial_download_limit() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Directory holding `<folder>/<filename>` assets (default: ./downloads)
    #[serde(default = "default_assets_root")]
    pub assets_root: PathBuf,
    /// Where downloaded assets are copied to (default: ./received)
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            assets_root: default_assets_root(),
            downloads_dir: default_downloads_dir(),
        }
    }
}

fn default_assets_root() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("./received")
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "Failed to parse configuration file")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the portal cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.auth.member_code.is_empty() || self.auth.admin_code.is_empty() {
            anyhow::bail!("auth.member_code and auth.admin_code must not be empty");
        }
        if self.auth.member_code == self.auth.admin_code {
            anyhow::bail!("auth.member_code and auth.admin_code must differ");
        }
        if !(1..=MAX_TRIAL_DAYS).contains(&self.trial.duration_days) {
            anyhow::bail!(
                "trial.duration_days must be between 1 and {}, got {}",
                MAX_TRIAL_DAYS,
                self.trial.duration_days
            );
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            trial: TrialConfig::default(),
            catalog: CatalogConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
