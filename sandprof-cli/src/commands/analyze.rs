//! Analyze command implementation

use crate::config::Config;
use anyhow::{Context, Result};
use sandprof_core::complexity;
use std::path::Path;
use tracing::debug;

pub fn analyze_file(path: &Path, template: Option<&str>, config: &Config) -> Result<String> {
    let code = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    debug!(
        template = template.unwrap_or("unknown"),
        bytes = code.len(),
        "Analyzing {}",
        path.display()
    );

    let report = complexity::analyze(&code);
    super::to_json(&report, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_analyze_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "from flask import Flask\n\ndef index():\n    if (user):\n        return 1\n").unwrap();

        let json = analyze_file(file.path(), Some("python"), &Config::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["cyclomatic"], 2);
        assert_eq!(value["functionsCount"], 1);
        assert_eq!(value["dependencies"][0], "flask");
    }

    #[test]
    fn test_missing_file() {
        let err = analyze_file(Path::new("/nonexistent/app.js"), None, &Config::default())
            .unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
