//! Command implementations

pub mod analyze;
pub mod config;
pub mod replay;

use crate::config::Config;
use anyhow::Result;
use serde::Serialize;

/// Render a value as JSON honoring the output settings
pub(crate) fn to_json<T: Serialize>(value: &T, config: &Config) -> Result<String> {
    let json = if config.output.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}
