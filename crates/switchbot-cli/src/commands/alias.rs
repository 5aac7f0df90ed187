//! Alias command implementation.
//!
//! Manages friendly device names (aliases) that map to device addresses.
//! The alias is also the name the status log uses for the device.

use std::path::Path;

use anyhow::{Context, Result, bail};
use tabled::{builder::Builder, settings::Style};

use switchbot_types::PeripheralIdentity;

use crate::config::Config;

/// Alias subcommand actions
pub enum AliasAction {
    /// List all aliases
    List,
    /// Set an alias
    Set { name: String, address: String },
    /// Remove an alias
    Remove { name: String },
}

pub fn cmd_alias(action: AliasAction, config_path: &Path, quiet: bool) -> Result<()> {
    let mut config = Config::load_from(config_path);

    match action {
        AliasAction::List => {
            if config.aliases.is_empty() {
                if !quiet {
                    println!("No aliases configured.");
                    println!();
                    println!("Add an alias with: switchbot alias set <name> <address>");
                }
            } else {
                println!("{}", alias_table(&config));
            }
        }
        AliasAction::Set { name, address } => {
            if PeripheralIdentity::from_address(&name).is_ok() {
                bail!(
                    "Alias name '{}' looks like a device address. \
                     Use a friendly name instead (e.g., 'kitchen', 'coffee-maker').",
                    name
                );
            }
            let identity = PeripheralIdentity::from_address(&address)
                .with_context(|| format!("Invalid device address '{}'", address))?;
            let address = identity.address().to_string();

            let was_update = config.aliases.contains_key(&name);
            config.aliases.insert(name.clone(), address.clone());
            config.save_to(config_path)?;

            if !quiet {
                if was_update {
                    println!("Updated alias '{}' → {}", name, address);
                } else {
                    println!("Added alias '{}' → {}", name, address);
                }
            }
        }
        AliasAction::Remove { name } => {
            if config.aliases.remove(&name).is_some() {
                config.save_to(config_path)?;
                if !quiet {
                    println!("Removed alias '{}'", name);
                }
            } else {
                bail!("Alias '{}' not found", name);
            }
        }
    }

    Ok(())
}

fn alias_table(config: &Config) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Alias", "Device Address"]);

    let mut aliases: Vec<_> = config.aliases.iter().collect();
    aliases.sort_by_key(|(name, _)| name.as_str());
    for (name, address) in aliases {
        builder.push_record([name.as_str(), address.as_str()]);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_normalizes_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        cmd_alias(
            AliasAction::Set {
                name: "kitchen".to_string(),
                address: "aa-bb-cc-dd-ee-ff".to_string(),
            },
            &path,
            true,
        )
        .unwrap();

        let config = Config::load_from(&path);
        assert_eq!(
            config.aliases.get("kitchen").map(String::as_str),
            Some("AA:BB:CC:DD:EE:FF")
        );
    }

    #[test]
    fn test_set_rejects_address_as_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let err = cmd_alias(
            AliasAction::Set {
                name: "AA:BB:CC:DD:EE:FF".to_string(),
                address: "AA:BB:CC:DD:EE:FF".to_string(),
            },
            &path,
            true,
        )
        .unwrap_err();
        assert!(err.to_string().contains("looks like a device address"));
        assert!(!path.exists());
    }

    #[test]
    fn test_set_rejects_bad_address() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let result = cmd_alias(
            AliasAction::Set {
                name: "kitchen".to_string(),
                address: "kitchen-bot".to_string(),
            },
            &path,
            true,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config
            .aliases
            .insert("kitchen".to_string(), "AA:BB:CC:DD:EE:FF".to_string());
        config.save_to(&path).unwrap();

        cmd_alias(
            AliasAction::Remove {
                name: "kitchen".to_string(),
            },
            &path,
            true,
        )
        .unwrap();
        assert!(Config::load_from(&path).aliases.is_empty());

        let err = cmd_alias(
            AliasAction::Remove {
                name: "kitchen".to_string(),
            },
            &path,
            true,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_alias_table_sorted() {
        let mut config = Config::default();
        config
            .aliases
            .insert("office".to_string(), "11:22:33:44:55:66".to_string());
        config
            .aliases
            .insert("kitchen".to_string(), "AA:BB:CC:DD:EE:FF".to_string());

        let table = alias_table(&config);
        let kitchen = table.find("kitchen").unwrap();
        let office = table.find("office").unwrap();
        assert!(kitchen < office);
    }
}
