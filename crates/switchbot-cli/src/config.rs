//! Configuration file management.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Default device address or alias
    #[serde(default)]
    pub device: Option<String>,

    /// Command timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Status log location
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Device aliases (friendly name -> device address)
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("switchbot")
            .join("config.toml")
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from `path`, or return default if missing or unreadable
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    eprintln!("Warning: Failed to read config: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

/// A device resolved from the command line or config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDevice {
    /// Address handed to the transport
    pub address: String,
    /// Label used in status lines: the alias name if one was used, else the address
    pub display_name: String,
}

/// Resolve device from arg, env var, or config.
/// Aliases resolve to their address and keep the alias as display name.
pub fn resolve_device(device: Option<&str>, config: &Config) -> Option<ResolvedDevice> {
    let requested = device.or(config.device.as_deref())?;
    let address = resolve_alias(requested, config);
    Some(ResolvedDevice {
        display_name: requested.to_string(),
        address,
    })
}

/// Resolve an alias to its device address, or return the original if not an alias.
pub fn resolve_alias(device: &str, config: &Config) -> String {
    config
        .aliases
        .get(device)
        .cloned()
        .unwrap_or_else(|| device.to_string())
}

/// Resolve timeout: use provided value, fall back to config, then default
pub fn resolve_timeout(cmd_timeout: u64, config: &Config, default: u64) -> u64 {
    // An explicit value differs from clap's default
    if cmd_timeout != default {
        cmd_timeout
    } else {
        config.timeout.unwrap_or(default)
    }
}

/// Resolve the status log path: flag, then config, then the data directory
pub fn resolve_log_file(flag: Option<&Path>, config: &Config) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| config.log_file.clone())
        .unwrap_or_else(switchbot_core::default_log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_alias() -> Config {
        let mut config = Config::default();
        config
            .aliases
            .insert("kitchen".to_string(), "AA:BB:CC:DD:EE:FF".to_string());
        config
    }

    #[test]
    fn test_resolve_device_prefers_arg() {
        let config = Config {
            device: Some("config-device".to_string()),
            ..Default::default()
        };
        let result = resolve_device(Some("arg-device"), &config).unwrap();
        assert_eq!(result.address, "arg-device");
    }

    #[test]
    fn test_resolve_device_falls_back_to_config() {
        let config = Config {
            device: Some("11:22:33:44:55:66".to_string()),
            ..Default::default()
        };
        let result = resolve_device(None, &config).unwrap();
        assert_eq!(result.address, "11:22:33:44:55:66");
        assert_eq!(result.display_name, "11:22:33:44:55:66");
    }

    #[test]
    fn test_resolve_device_none_when_both_empty() {
        assert_eq!(resolve_device(None, &Config::default()), None);
    }

    #[test]
    fn test_resolve_device_uses_alias_as_display_name() {
        let config = config_with_alias();
        let result = resolve_device(Some("kitchen"), &config).unwrap();
        assert_eq!(
            result,
            ResolvedDevice {
                address: "AA:BB:CC:DD:EE:FF".to_string(),
                display_name: "kitchen".to_string(),
            }
        );
    }

    #[test]
    fn test_resolve_alias_not_found() {
        let config = config_with_alias();
        assert_eq!(resolve_alias("office", &config), "office");
    }

    #[test]
    fn test_resolve_timeout_uses_explicit_value() {
        let config = Config {
            timeout: Some(60),
            ..Default::default()
        };
        assert_eq!(resolve_timeout(10, &config, 30), 10);
    }

    #[test]
    fn test_resolve_timeout_uses_config_when_default() {
        let config = Config {
            timeout: Some(60),
            ..Default::default()
        };
        assert_eq!(resolve_timeout(30, &config, 30), 60);
    }

    #[test]
    fn test_resolve_timeout_uses_default_when_no_config() {
        assert_eq!(resolve_timeout(30, &Config::default(), 30), 30);
    }

    #[test]
    fn test_resolve_log_file_order() {
        let config = Config {
            log_file: Some(PathBuf::from("/tmp/from-config.log")),
            ..Default::default()
        };
        assert_eq!(
            resolve_log_file(Some(Path::new("/tmp/flag.log")), &config),
            PathBuf::from("/tmp/flag.log")
        );
        assert_eq!(
            resolve_log_file(None, &config),
            PathBuf::from("/tmp/from-config.log")
        );
        assert_eq!(
            resolve_log_file(None, &Config::default()),
            switchbot_core::default_log_path()
        );
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switchbot").join("config.toml");
        let config = Config {
            device: Some("kitchen".to_string()),
            timeout: Some(45),
            ..config_with_alias()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn test_load_missing_or_invalid_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert_eq!(Config::load_from(&path), Config::default());

        fs::write(&path, "timeout = \"soon\"").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_partial_config_parses() {
        let config: Config = toml::from_str("device = \"kitchen\"").unwrap();
        assert_eq!(config.device.as_deref(), Some("kitchen"));
        assert!(config.aliases.is_empty());
    }
}
