//! Replay command implementation

use crate::config::Config;
use anyhow::{Context, Result};
use sandprof_core::replay::{self, ReplayLog};
use std::path::Path;
use tracing::info;

/// Output of a replayed run
#[derive(Debug)]
pub struct ReplayOutput {
    pub report_json: String,
    pub recommendations: Vec<String>,
}

pub fn replay_file(
    events: &Path,
    code: Option<&Path>,
    template: Option<String>,
    config: &Config,
) -> Result<ReplayOutput> {
    let mut log = ReplayLog::from_file(events)
        .with_context(|| format!("failed to load event log {}", events.display()))?;

    if let Some(code) = code {
        log.context.code = std::fs::read_to_string(code)
            .with_context(|| format!("failed to read {}", code.display()))?;
    }
    if let Some(template) = template {
        log.context.template = template;
    }

    info!("Replaying {} events from {}", log.events.len(), events.display());
    let (report, recommendations) = replay::replay(&config.profiler, &log)?;

    Ok(ReplayOutput {
        report_json: super::to_json(&report, config)?,
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const EVENTS: &str = r#"{
        "context": { "template": "vanilla" },
        "events": [
            { "event": "stepStart", "at": 0, "id": "main", "name": "Main", "type": "execution" },
            { "event": "stepEnd", "at": 6000, "id": "main", "status": "error" }
        ]
    }"#;

    #[test]
    fn test_replay_with_code_override() {
        let mut events = NamedTempFile::new().unwrap();
        events.write_all(EVENTS.as_bytes()).unwrap();
        let mut code = NamedTempFile::new().unwrap();
        code.write_all(b"for (;;) { if (done) break; }").unwrap();

        let output = replay_file(
            events.path(),
            Some(code.path()),
            Some("react-developer".into()),
            &Config::default(),
        )
        .unwrap();

        let report: serde_json::Value = serde_json::from_str(&output.report_json).unwrap();
        assert_eq!(report["executionTime"], 6000.0);
        assert_eq!(report["codeComplexity"]["cyclomatic"], 3);
        assert_eq!(report["performance"]["bottlenecks"][0]["severity"], "critical");
        assert_eq!(output.recommendations.len(), 1);
    }

    #[test]
    fn test_invalid_log() {
        let mut events = NamedTempFile::new().unwrap();
        events.write_all(b"not json").unwrap();
        let err = replay_file(events.path(), None, None, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("failed to load event log"));
    }
}
