use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::ANONYMOUS_USER;

/// Configuration for the caixa application
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Base directory for the ledger database (defaults to ~/.local/share/caixa)
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Apps Script endpoint the ledger mirrors to
    pub script_url: String,

    /// Spreadsheet identifier sent with every request
    pub sheets_id: String,

    /// Bounded timeout for remote writes, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Bounded timeout for reachability probes, in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    10
}

fn default_probe_timeout() -> u64 {
    5
}

impl RemoteSettings {
    pub fn new(script_url: String, sheets_id: String) -> Self {
        Self {
            script_url,
            sheets_id,
            request_timeout_secs: default_request_timeout(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            // Create default config if it doesn't exist
            let config_dir = config_path
                .parent()
                .context("Config path has no parent directory")?;
            fs::create_dir_all(config_dir).context("Failed to create config directory")?;
            let default_config = Self::default();
            let toml_str = toml::to_string_pretty(&default_config)
                .context("Failed to serialize default config")?;
            fs::write(&config_path, toml_str).context("Failed to write default config file")?;
            return Ok(default_config);
        }
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;
        fs::create_dir_all(config_dir).context("Failed to create config directory")?;
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }

    /// Config file path, honoring the CAIXA_CONFIG override
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(custom_path) = std::env::var("CAIXA_CONFIG") {
            return Ok(PathBuf::from(custom_path));
        }
        // Always use ~/.config/caixa/ regardless of platform
        let home_dir = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home_dir.join(".config").join("caixa").join("config.toml"))
    }

    /// Base data directory, using the default if not configured
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref data_dir) = self.storage.data_dir {
            return Ok(data_dir.clone());
        }
        let home_dir = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home_dir.join(".local").join("share").join("caixa"))
    }

    /// Path of the SQLite database holding records, queue and users
    pub fn ledger_db_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("ledger.db"))
    }
}

/// Machine-specific state that is never mirrored anywhere
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct State {
    /// Login session
    #[serde(default)]
    pub session: SessionState,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionState {
    /// Logged-in user id, if any
    pub user_id: Option<String>,

    /// Display name stamped into records
    pub user_name: Option<String>,
}

impl State {
    /// Load state from the default location
    pub fn load() -> Result<Self> {
        let state_path = Self::state_path()?;
        if !state_path.exists() {
            let state_dir = state_path
                .parent()
                .context("State path has no parent directory")?;
            fs::create_dir_all(state_dir).context("Failed to create state directory")?;
            let default_state = Self::default();
            default_state.save()?;
            return Ok(default_state);
        }
        let content = fs::read_to_string(&state_path)
            .with_context(|| format!("Failed to read state file: {}", state_path.display()))?;
        let state: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", state_path.display()))?;
        Ok(state)
    }

    /// Save state to the default location
    pub fn save(&self) -> Result<()> {
        let state_path = Self::state_path()?;
        let state_dir = state_path
            .parent()
            .context("State path has no parent directory")?;
        fs::create_dir_all(state_dir).context("Failed to create state directory")?;
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize state")?;
        fs::write(&state_path, toml_str).context("Failed to write state file")?;
        Ok(())
    }

    /// State file path, honoring the CAIXA_STATE override
    pub fn state_path() -> Result<PathBuf> {
        if let Ok(custom_path) = std::env::var("CAIXA_STATE") {
            return Ok(PathBuf::from(custom_path));
        }
        let home_dir = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home_dir
            .join(".local")
            .join("share")
            .join("caixa")
            .join("state.toml"))
    }

    /// Name to stamp into `recorded_by`, falling back to the anonymous sentinel
    pub fn recorded_by(&self) -> &str {
        self.session.user_name.as_deref().unwrap_or(ANONYMOUS_USER)
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.user_id.is_some()
    }
}
