//! CLI configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/agilestore/client.toml`
//! - Windows: `%APPDATA%/agilestore/client.toml`

use std::path::{Path, PathBuf};

use agilestore_client::{ClientConfig, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Bytes per piece for `mput`.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Service endpoint and account.
    #[serde(default)]
    pub client: ClientConfig,
}

fn default_chunk_size() -> u64 {
    DEFAULT_CHUNK_SIZE
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            client: ClientConfig::default(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from the default location, or creates a default
    /// file there if none exists.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path()?;

        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = CliConfig::default();
            config.save_to(&path)?;
            Ok(config)
        }
    }

    /// Loads configuration from `path`.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CliConfig = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Saves the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // Restrict permissions on Unix (holds the account password).
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Returns the platform-specific configuration file path.
pub fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("agilestore")
            .join("client.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("agilestore").join("client.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/agilestore/client.toml"))
    }
}
