//! Profiler configuration

use crate::error::{ProfilerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Where memory readings come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryProbeKind {
    /// Resident memory of the current process
    Process,
    /// No memory introspection, every reading is zero
    None,
}

impl Default for MemoryProbeKind {
    fn default() -> Self {
        MemoryProbeKind::Process
    }
}

/// Profiler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Sampling interval used when the context does not set a sample rate
    pub sample_interval_ms: u64,
    /// Timeline cap used when the context leaves it at zero (0 = unlimited)
    pub max_timeline_entries: usize,
    /// Memory probe backing the sampler
    pub memory_probe: MemoryProbeKind,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 100,
            max_timeline_entries: 0,
            memory_probe: MemoryProbeKind::default(),
        }
    }
}

impl ProfilerConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for hosts without memory introspection
    pub fn without_memory_probe() -> Self {
        Self {
            memory_probe: MemoryProbeKind::None,
            ..Default::default()
        }
    }

    /// Sampling interval for a run with the given sample rate
    ///
    /// A positive rate is interpreted as samples per second.
    pub fn sample_interval(&self, sample_rate: u32) -> Duration {
        if sample_rate > 0 {
            Duration::from_millis((1000 / sample_rate as u64).max(1))
        } else {
            Duration::from_millis(self.sample_interval_ms.max(1))
        }
    }

    /// Check the configuration for values the sampler cannot use
    pub fn validate(&self) -> Result<()> {
        if self.sample_interval_ms == 0 {
            return Err(ProfilerError::config("sample_interval_ms must be positive"));
        }
        Ok(())
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ProfilerError::config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}
