//! Report and input data structures
//!
//! Everything a profiling run consumes or produces lives here so that the
//! session, the detectors and the CLI can share the same serializable
//! shapes. Field names serialize in camelCase to match the JSON report
//! consumed by the execution panel.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One mebibyte, the unit every memory threshold is expressed in
pub const MIB: u64 = 1024 * 1024;

/// Input to a profiling run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfilingContext {
    /// Source text of the code artifact being executed
    pub code: String,
    /// Declared template / language identifier (e.g. `nextjs-developer`)
    pub template: String,
    /// Environment variables handed to the sandbox
    pub environment: BTreeMap<String, String>,
    /// Emit per-step trace events while recording
    pub enable_detailed_profiling: bool,
    /// Memory samples per second (0 = use the configured interval)
    pub sample_rate: u32,
    /// Maximum timeline entries to retain (0 = unlimited)
    pub max_timeline_entries: usize,
}

impl Default for ProfilingContext {
    fn default() -> Self {
        Self {
            code: String::new(),
            template: String::new(),
            environment: BTreeMap::new(),
            enable_detailed_profiling: false,
            sample_rate: 10,
            max_timeline_entries: 1000,
        }
    }
}

impl ProfilingContext {
    /// Create a context for `code` declared as `template`
    pub fn new(code: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            template: template.into(),
            ..Default::default()
        }
    }

    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_detailed_profiling(mut self, enabled: bool) -> Self {
        self.enable_detailed_profiling = enabled;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_max_timeline_entries(mut self, max: usize) -> Self {
        self.max_timeline_entries = max;
        self
    }
}

/// Kind of work a timeline step represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Initialization,
    Execution,
    Cleanup,
    Network,
    Computation,
}

/// Outcome of a timeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Success,
    Error,
    Warning,
}

/// Value stored in step metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Number(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Number(value as f64)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

/// Step metadata, ordered by key so reports diff cleanly
pub type StepMetadata = BTreeMap<String, MetadataValue>;

/// Memory reading captured when a step is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub used: u64,
    pub allocated: u64,
    pub freed: u64,
}

impl MemorySnapshot {
    /// Snapshot from a single usage reading
    pub fn from_usage(usage: u64) -> Self {
        Self {
            used: usage,
            allocated: usage,
            freed: 0,
        }
    }
}

/// A single entry on the execution timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
    /// Caller supplied identifier, not necessarily unique
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Start time in milliseconds since the session origin
    pub start_time: f64,
    /// End time in milliseconds, `0` while the step is open
    pub end_time: f64,
    /// `end_time - start_time` once closed, `0` otherwise
    pub duration: f64,
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StepMetadata>,
    /// Reserved for nested reporting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ExecutionStep>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_snapshot: Option<MemorySnapshot>,
}

/// An outbound network call observed during the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRequest {
    pub url: String,
    pub method: String,
    /// Wall time of the call in milliseconds
    pub duration: f64,
    /// HTTP status, `0` when the call failed before a response arrived
    pub status: u16,
    /// Transferred bytes as reported by `content-length`
    pub size: u64,
    pub start_time: f64,
    pub end_time: f64,
}

/// A periodic memory reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemorySample {
    pub timestamp: f64,
    pub usage: u64,
}

/// Textual complexity metrics of the profiled source
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeComplexity {
    pub cyclomatic: u32,
    pub cognitive: u32,
    pub lines_of_code: u32,
    pub functions_count: u32,
    pub classes_count: u32,
    pub imports: u32,
    pub dependencies: Vec<String>,
}

/// Resource a bottleneck is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BottleneckType {
    Cpu,
    Memory,
    Network,
    Io,
    Database,
}

/// Bottleneck severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Points deducted from the performance score per bottleneck
    pub fn score_penalty(self) -> i32 {
        match self {
            Severity::Critical => 25,
            Severity::High => 15,
            Severity::Medium => 10,
            Severity::Low => 5,
        }
    }

    /// High and critical bottlenecks surface as recommendations
    pub fn is_actionable(self) -> bool {
        self >= Severity::High
    }
}

/// Best-effort location of a bottleneck in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self {
            line: 1,
            column: 1,
            function: None,
        }
    }
}

/// A heuristically detected performance problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceBottleneck {
    #[serde(rename = "type")]
    pub bottleneck_type: BottleneckType,
    pub severity: Severity,
    pub description: String,
    pub location: SourceLocation,
    /// Time attributed to the bottleneck in milliseconds
    pub duration: f64,
    /// Estimated impact as a percentage
    pub impact: f64,
    pub suggestion: String,
}

/// Letter grade derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

/// Memory trend derived from the sample list
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub peak: u64,
    pub average: f64,
    pub initial: u64,
    #[serde(rename = "final")]
    pub final_usage: u64,
}

impl MemoryUsage {
    /// Summarize a list of samples; an empty list yields zeros
    pub fn from_samples(samples: &[MemorySample]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let total: u128 = samples.iter().map(|s| s.usage as u128).sum();
        Self {
            peak: samples.iter().map(|s| s.usage).max().unwrap_or(0),
            average: total as f64 / samples.len() as f64,
            initial: samples.first().map(|s| s.usage).unwrap_or(0),
            final_usage: samples.last().map(|s| s.usage).unwrap_or(0),
        }
    }
}

/// CPU usage summary. Reserved: never computed, always zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CpuUsage {
    pub peak: f64,
    pub average: f64,
}

/// Score, grade and the bottlenecks that drove them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub score: u8,
    pub grade: Grade,
    pub bottlenecks: Vec<PerformanceBottleneck>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CpuBreakdown {
    pub user: f64,
    pub system: f64,
    pub idle: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryBreakdown {
    pub heap: u64,
    pub stack: u64,
    pub external: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IoBreakdown {
    pub read: u64,
    pub write: u64,
    pub operations: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkBreakdown {
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub requests: u64,
}

/// Per-resource breakdown. Only heap, bytes received and request count are
/// populated; CPU, I/O and the remaining fields are reserved zeros.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceUtilization {
    pub cpu: CpuBreakdown,
    pub memory: MemoryBreakdown,
    pub io: IoBreakdown,
    pub network: NetworkBreakdown,
}

impl ResourceUtilization {
    pub fn from_parts(memory: &MemoryUsage, requests: &[NetworkRequest]) -> Self {
        Self {
            memory: MemoryBreakdown {
                heap: memory.peak,
                ..Default::default()
            },
            network: NetworkBreakdown {
                bytes_received: requests
                    .iter()
                    .fold(0u64, |acc, r| acc.saturating_add(r.size)),
                bytes_sent: 0,
                requests: requests.len() as u64,
            },
            ..Default::default()
        }
    }
}

/// The immutable report produced by one profiling session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileMetrics {
    /// Wall time between start and stop in milliseconds
    pub execution_time: f64,
    pub memory_usage: MemoryUsage,
    pub cpu_usage: CpuUsage,
    pub network_requests: Vec<NetworkRequest>,
    pub code_complexity: CodeComplexity,
    pub performance: PerformanceSummary,
    pub timeline: Vec<ExecutionStep>,
    pub resource_utilization: ResourceUtilization,
}

impl ProfileMetrics {
    /// Render the report as pretty-printed JSON
    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Bottlenecks sorted from most to least severe, for presentation
    pub fn bottlenecks_by_severity(&self) -> Vec<&PerformanceBottleneck> {
        let mut sorted: Vec<_> = self.performance.bottlenecks.iter().collect();
        sorted.sort_by(|a, b| b.severity.cmp(&a.severity));
        sorted
    }
}
