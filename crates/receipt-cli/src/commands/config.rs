//! Config command - inspect and edit the receipt-ocr configuration file.
//!
//! Every subcommand works on the file named by the global `--config` flag,
//! falling back to the per-user default location.

use std::fs;
use std::path::PathBuf;

use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;
use tracing::debug;

use receipt_core::models::config::ReceiptConfig;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print one value, addressed by a dotted key (e.g. "api.model")
    Get { key: String },

    /// Change one value; JSON literals are parsed, anything else is a string
    Set { key: String, value: String },

    /// Print the configuration file location
    Path,
}

pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let location = ConfigLocation::resolve(config_path);
    debug!("Configuration file: {}", location.path.display());

    match args.command {
        ConfigCommand::Show => {
            if !location.path.exists() {
                println!(
                    "{} No config file at {}, showing defaults.",
                    style("ℹ").blue(),
                    location.path.display()
                );
            }
            let config = location.load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommand::Init { force } => location.init(force)?,
        ConfigCommand::Get { key } => {
            let json = serde_json::to_value(location.load()?)?;
            let value = json
                .pointer(&json_pointer(&key))
                .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        ConfigCommand::Set { key, value } => location.set(&key, &value)?,
        ConfigCommand::Path => {
            let status = if location.path.exists() {
                style("exists").green()
            } else {
                style("not created").yellow()
            };
            println!("Configuration file: {} ({})", location.path.display(), status);
        }
    }

    Ok(())
}

/// Per-user configuration file used when `--config` is not given.
fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("receipt-ocr")
        .join("config.json")
}

/// Load the configuration for commands that only read it.
///
/// An explicit path must exist; the default path may be absent, in which
/// case built-in defaults are used.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ReceiptConfig> {
    ConfigLocation::resolve(config_path).load()
}

/// The configuration file a command operates on.
struct ConfigLocation {
    path: PathBuf,
    explicit: bool,
}

impl ConfigLocation {
    fn resolve(config_path: Option<&str>) -> Self {
        match config_path {
            Some(path) => Self {
                path: PathBuf::from(path),
                explicit: true,
            },
            None => Self {
                path: default_config_path(),
                explicit: false,
            },
        }
    }

    fn load(&self) -> anyhow::Result<ReceiptConfig> {
        if self.path.exists() || self.explicit {
            debug!("Loading configuration from {}", self.path.display());
            Ok(ReceiptConfig::from_file(&self.path)?)
        } else {
            Ok(ReceiptConfig::default())
        }
    }

    fn init(&self, force: bool) -> anyhow::Result<()> {
        if self.path.exists() && !force {
            anyhow::bail!(
                "Config file already exists at {}. Use --force to overwrite.",
                self.path.display()
            );
        }
        self.write(&ReceiptConfig::default())?;

        println!(
            "{} Created configuration file at {}",
            style("✓").green(),
            self.path.display()
        );
        Ok(())
    }

    fn set(&self, key: &str, raw: &str) -> anyhow::Result<()> {
        // Setting a value may create the file
        let current = if self.path.exists() {
            ReceiptConfig::from_file(&self.path)?
        } else {
            ReceiptConfig::default()
        };

        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        let updated = with_value(&current, key, value.clone())?;
        self.write(&updated)?;

        println!(
            "{} Set {} = {}",
            style("✓").green(),
            key,
            serde_json::to_string(&value)?
        );
        Ok(())
    }

    fn write(&self, config: &ReceiptConfig) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        config.save(&self.path)?;
        Ok(())
    }
}

/// `api.model` -> `/api/model`
fn json_pointer(key: &str) -> String {
    key.split('.').fold(String::new(), |mut pointer, part| {
        pointer.push('/');
        pointer.push_str(part);
        pointer
    })
}

/// Replace an existing leaf of `config` and decode the result back into the typed config.
///
/// Only keys the config already has can be set, and the new value must fit
/// the field's type.
fn with_value(config: &ReceiptConfig, key: &str, value: Value) -> anyhow::Result<ReceiptConfig> {
    let mut json = serde_json::to_value(config)?;
    let slot = json
        .pointer_mut(&json_pointer(key))
        .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;
    if slot.is_object() {
        anyhow::bail!("{} is a section; set one of its keys instead", key);
    }
    *slot = value;

    serde_json::from_value(json)
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_pointer() {
        assert_eq!(json_pointer("api.model"), "/api/model");
        assert_eq!(json_pointer("export"), "/export");
    }

    #[test]
    fn test_with_value_updates_leaf() {
        let config = with_value(&ReceiptConfig::default(), "batch.max_documents", json!(3)).unwrap();
        assert_eq!(config.batch.max_documents, 3);

        let config = with_value(&config, "api.model", json!("sonar")).unwrap();
        assert_eq!(config.api.model, "sonar");
        assert_eq!(config.batch.max_documents, 3);
    }

    #[test]
    fn test_with_value_rejects_unknown_keys_and_sections() {
        let config = ReceiptConfig::default();
        assert!(with_value(&config, "nope.model", json!("x")).is_err());
        assert!(with_value(&config, "api.model.deeper", json!("x")).is_err());
        assert!(with_value(&config, "api", json!("x")).is_err());
    }

    #[test]
    fn test_with_value_rejects_wrong_type() {
        let err = with_value(&ReceiptConfig::default(), "batch.max_documents", json!("many"))
            .unwrap_err();
        assert!(err.to_string().contains("batch.max_documents"));
    }

    #[test]
    fn test_load_explicit_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"api": {"model": "sonar"}}"#).unwrap();

        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.api.model, "sonar");
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(load_config(missing.to_str()).is_err());
    }

    #[test]
    fn test_set_creates_explicit_file_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let location = ConfigLocation::resolve(path.to_str());

        location.set("batch.max_documents", "2").unwrap();
        assert_eq!(ReceiptConfig::from_file(&path).unwrap().batch.max_documents, 2);

        assert!(location.set("batch.max_documents", "9").is_err());
        assert_eq!(ReceiptConfig::from_file(&path).unwrap().batch.max_documents, 2);
    }
}
