//! Configuration commands.

use clap::Subcommand;
use refocus_core::{ConfigError, EngineConfig};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "store.default_ttl_days", "priority.weights.recency")
        key: String,
    },
    /// Set a config value; the result is validated before it is saved
    Set {
        /// Config key
        key: String,
        /// New value (tables and arrays take JSON)
        value: String,
    },
    /// Show the whole configuration as it is stored on disk
    List,
    /// Overwrite the config file with defaults
    Reset,
}

pub fn run(action: ConfigAction, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = EngineConfig::path()?;

    match action {
        ConfigAction::Get { key } => {
            let config = EngineConfig::load_from(&path)?;
            let value = config
                .get(&key)
                .ok_or_else(|| ConfigError::UnknownKey(key.clone()))?;
            if json {
                println!("{}", serde_json::json!({ "key": key, "value": value }));
            } else {
                println!("{value}");
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = EngineConfig::load_from(&path)?;
            config.set(&key, &value)?;
            config.save_to(&path)?;
            let stored = config.get(&key).unwrap_or(value);
            if json {
                println!("{}", serde_json::json!({ "key": key, "value": stored }));
            } else {
                println!("{key} = {stored}");
            }
        }
        ConfigAction::List => {
            let config = EngineConfig::load_from(&path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("# {}", path.display());
                print!("{}", config.to_toml()?);
            }
        }
        ConfigAction::Reset => {
            EngineConfig::default().save_to(&path)?;
            if json {
                println!("{}", serde_json::json!({ "reset": true, "path": path }));
            } else {
                println!("Config reset to defaults: {}", path.display());
            }
        }
    }
    Ok(())
}
