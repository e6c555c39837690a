//! Config command implementation

use crate::config::{default_config_path, Config};
use anyhow::Result;

/// Effective configuration rendered as TOML
pub fn show_config(config: &Config) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

/// Write the effective configuration to the default location
pub fn write_default(config: &Config) -> Result<std::path::PathBuf> {
    let path = default_config_path()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, show_config(config)?)?;
    Ok(path)
}
