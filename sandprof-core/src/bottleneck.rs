//! Bottleneck detection over a finished session
//!
//! Detection runs in a fixed order (slow steps, then the memory trend, then
//! slow requests) and performs no de-duplication. Memory and network
//! findings carry fixed severity and impact values rather than computed
//! ones.

use crate::types::{
    BottleneckType, ExecutionStep, MemorySample, NetworkRequest, PerformanceBottleneck, Severity,
    SourceLocation, MIB,
};

/// Steps longer than this (ms) are CPU bottlenecks
pub const SLOW_STEP_MS: f64 = 1000.0;
/// Steps longer than this (ms) are critical rather than high
pub const CRITICAL_STEP_MS: f64 = 5000.0;
/// Largest tolerated jump between two adjacent memory samples
pub const MEMORY_JUMP_BYTES: u64 = 10 * MIB;
/// Requests longer than this (ms) are network bottlenecks
pub const SLOW_REQUEST_MS: f64 = 2000.0;

const MEMORY_IMPACT: f64 = 75.0;
const NETWORK_IMPACT: f64 = 50.0;

const CPU_SUGGESTION: &str = "Consider optimizing this operation or implementing caching";
const MEMORY_SUGGESTION: &str = "Check for memory leaks or optimize data structures";
const NETWORK_SUGGESTION: &str = "Consider implementing request caching or optimization";

/// Run every detector over the session's buffers
pub fn detect(
    timeline: &[ExecutionStep],
    samples: &[MemorySample],
    requests: &[NetworkRequest],
) -> Vec<PerformanceBottleneck> {
    let mut bottlenecks = slow_steps(timeline);
    bottlenecks.extend(memory_growth(samples));
    bottlenecks.extend(slow_requests(requests));
    bottlenecks
}

/// One CPU bottleneck per step slower than [`SLOW_STEP_MS`]
pub fn slow_steps(timeline: &[ExecutionStep]) -> Vec<PerformanceBottleneck> {
    let total: f64 = timeline.iter().map(|s| s.duration).sum();

    timeline
        .iter()
        .filter(|step| step.duration > SLOW_STEP_MS)
        .map(|step| PerformanceBottleneck {
            bottleneck_type: BottleneckType::Cpu,
            severity: if step.duration > CRITICAL_STEP_MS {
                Severity::Critical
            } else {
                Severity::High
            },
            description: format!("Slow execution in {}", step.name),
            location: SourceLocation::default(),
            duration: step.duration,
            // total > 0 whenever a step passed the filter
            impact: step.duration / total * 100.0,
            suggestion: CPU_SUGGESTION.to_string(),
        })
        .collect()
}

/// Largest increase between two adjacent samples; decreases count as zero
pub fn max_memory_jump(samples: &[MemorySample]) -> u64 {
    samples
        .windows(2)
        .map(|pair| pair[1].usage.saturating_sub(pair[0].usage))
        .max()
        .unwrap_or(0)
}

/// At most one memory bottleneck, when a single jump exceeds [`MEMORY_JUMP_BYTES`]
pub fn memory_growth(samples: &[MemorySample]) -> Option<PerformanceBottleneck> {
    if max_memory_jump(samples) <= MEMORY_JUMP_BYTES {
        return None;
    }

    Some(PerformanceBottleneck {
        bottleneck_type: BottleneckType::Memory,
        severity: Severity::High,
        description: "Significant memory growth detected".to_string(),
        location: SourceLocation::default(),
        duration: 0.0,
        impact: MEMORY_IMPACT,
        suggestion: MEMORY_SUGGESTION.to_string(),
    })
}

/// One network bottleneck per request slower than [`SLOW_REQUEST_MS`]
pub fn slow_requests(requests: &[NetworkRequest]) -> Vec<PerformanceBottleneck> {
    requests
        .iter()
        .filter(|req| req.duration > SLOW_REQUEST_MS)
        .map(|req| PerformanceBottleneck {
            bottleneck_type: BottleneckType::Network,
            severity: Severity::Medium,
            description: format!("Slow network request to {}", req.url),
            location: SourceLocation::default(),
            duration: req.duration,
            impact: NETWORK_IMPACT,
            suggestion: NETWORK_SUGGESTION.to_string(),
        })
        .collect()
}
