//! Configuration loading and resolution
//!
//! Every setting is resolved in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! Services parse 1 and 2 together with clap (`#[arg(env = ...)]`) and hand
//! the result to [`ServiceConfig::resolve`] as [`ConfigOverrides`].

use crate::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default bind address for the moderation service
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5810";

/// Database file name inside the data folder
pub const DATABASE_FILE_NAME: &str = "moderation.db";

/// Contents of the TOML config file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FileConfig {
    pub database_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub admin_key: Option<String>,
    pub trust_gateway_headers: Option<bool>,
}

/// Values already resolved from the command line or environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub admin_key: Option<String>,
    pub trust_gateway_headers: Option<bool>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub bind_address: SocketAddr,
    /// Static admin key; `None` disables key authentication
    pub admin_key: Option<String>,
    /// Accept `x-admin-user-id` / `x-admin-role` from an upstream gateway
    pub trust_gateway_headers: bool,
}

impl ServiceConfig {
    /// Merge overrides over the config file over compiled defaults
    pub fn resolve(overrides: ConfigOverrides, file: FileConfig) -> Result<Self> {
        let database_path = overrides
            .database_path
            .or(file.database_path)
            .unwrap_or_else(|| default_data_folder().join(DATABASE_FILE_NAME));

        let bind_raw = overrides
            .bind_address
            .or(file.bind_address)
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address: SocketAddr = bind_raw.trim().parse().map_err(|e| {
            Error::Config(format!("Invalid bind address '{}': {}", bind_raw, e))
        })?;

        // An empty key is the same as no key
        let admin_key = overrides
            .admin_key
            .or(file.admin_key)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let trust_gateway_headers = overrides
            .trust_gateway_headers
            .or(file.trust_gateway_headers)
            .unwrap_or(false);

        Ok(Self {
            database_path,
            bind_address,
            admin_key,
            trust_gateway_headers,
        })
    }
}

/// Load the TOML config file.
///
/// An explicit path must exist and parse. Without one, the platform config
/// locations are tried and a missing file yields the empty config.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_file() {
            Some(path) => path,
            None => {
                debug!("No config file found, using defaults");
                return Ok(FileConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path).map_err(|e| {
        Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
    })?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
}

/// First existing config file for the platform
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("icc").join("moderation.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/icc/moderation.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/icc (or /var/lib/icc for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("icc"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/icc"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("icc"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/icc"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("icc"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\icc"))
    } else {
        PathBuf::from("./icc_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = ServiceConfig::resolve(ConfigOverrides::default(), FileConfig::default())
            .unwrap();
        assert_eq!(config.bind_address.to_string(), DEFAULT_BIND_ADDRESS);
        assert!(config.database_path.ends_with(DATABASE_FILE_NAME));
        assert!(config.admin_key.is_none());
        assert!(!config.trust_gateway_headers);
    }

    #[test]
    fn test_override_beats_file() {
        let overrides = ConfigOverrides {
            bind_address: Some("0.0.0.0:9000".to_string()),
            admin_key: Some("from-cli".to_string()),
            ..Default::default()
        };
        let file = FileConfig {
            bind_address: Some("127.0.0.1:7000".to_string()),
            admin_key: Some("from-file".to_string()),
            trust_gateway_headers: Some(true),
            ..Default::default()
        };

        let config = ServiceConfig::resolve(overrides, file).unwrap();
        assert_eq!(config.bind_address.port(), 9000);
        assert_eq!(config.admin_key.as_deref(), Some("from-cli"));
        // Not overridden, so the file value wins
        assert!(config.trust_gateway_headers);
    }

    #[test]
    fn test_blank_admin_key_disables_key_auth() {
        let overrides = ConfigOverrides {
            admin_key: Some("   ".to_string()),
            ..Default::default()
        };
        let config = ServiceConfig::resolve(overrides, FileConfig::default()).unwrap();
        assert!(config.admin_key.is_none());
    }

    #[test]
    fn test_invalid_bind_address_rejected() {
        let overrides = ConfigOverrides {
            bind_address: Some("not-an-address".to_string()),
            ..Default::default()
        };
        let err = ServiceConfig::resolve(overrides, FileConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
