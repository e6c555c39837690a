//! Plain-language recommendations derived from a finished report

use crate::types::{ProfileMetrics, MIB};

pub const NO_DATA: &str = "No profiling data available";

/// Suggestions for `report`, in a fixed order. Without a report a single
/// "no data" message is returned.
pub fn recommendations(report: Option<&ProfileMetrics>) -> Vec<String> {
    let Some(profile) = report else {
        return vec![NO_DATA.to_string()];
    };

    let mut recommendations = Vec::new();

    if profile.execution_time > 10_000.0 {
        recommendations.push(
            "Consider optimizing algorithm complexity - execution time exceeds 10 seconds"
                .to_string(),
        );
    }

    if profile.memory_usage.peak > 100 * MIB {
        recommendations
            .push("High memory usage detected - consider memory optimization techniques".to_string());
    }

    if profile.network_requests.len() > 10 {
        recommendations.push("Consider batching network requests or implementing caching".to_string());
    }

    if profile.code_complexity.cyclomatic > 10 {
        recommendations.push(
            "High cyclomatic complexity - consider refactoring into smaller functions".to_string(),
        );
    }

    recommendations.extend(
        profile
            .performance
            .bottlenecks
            .iter()
            .filter(|b| b.severity.is_actionable())
            .map(|b| b.suggestion.clone()),
    );

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;

    fn report() -> ProfileMetrics {
        ProfileMetrics {
            execution_time: 0.0,
            memory_usage: MemoryUsage::default(),
            cpu_usage: CpuUsage::default(),
            network_requests: Vec::new(),
            code_complexity: CodeComplexity::default(),
            performance: PerformanceSummary {
                score: 100,
                grade: Grade::A,
                bottlenecks: Vec::new(),
            },
            timeline: Vec::new(),
            resource_utilization: ResourceUtilization::default(),
        }
    }

    fn bottleneck(severity: Severity, suggestion: &str) -> PerformanceBottleneck {
        PerformanceBottleneck {
            bottleneck_type: BottleneckType::Cpu,
            severity,
            description: String::new(),
            location: SourceLocation::default(),
            duration: 0.0,
            impact: 0.0,
            suggestion: suggestion.to_string(),
        }
    }

    #[test]
    fn test_no_report() {
        assert_eq!(recommendations(None), vec![NO_DATA.to_string()]);
    }

    #[test]
    fn test_clean_report_has_none() {
        assert!(recommendations(Some(&report())).is_empty());
    }

    #[test]
    fn test_thresholds_in_order() {
        let mut profile = report();
        profile.execution_time = 10_001.0;
        profile.memory_usage.peak = 100 * MIB + 1;
        profile.network_requests = vec![
            NetworkRequest {
                url: "https://x".into(),
                method: "GET".into(),
                duration: 1.0,
                status: 200,
                size: 0,
                start_time: 0.0,
                end_time: 1.0,
            };
            11
        ];
        profile.code_complexity.cyclomatic = 11;
        profile.performance.bottlenecks = vec![
            bottleneck(Severity::Medium, "medium"),
            bottleneck(Severity::Critical, "critical"),
            bottleneck(Severity::High, "high"),
            bottleneck(Severity::Low, "low"),
        ];

        let recs = recommendations(Some(&profile));
        assert_eq!(recs.len(), 6);
        assert!(recs[0].contains("10 seconds"));
        assert!(recs[1].contains("memory"));
        assert!(recs[2].contains("batching"));
        assert!(recs[3].contains("cyclomatic"));
        assert_eq!(recs[4], "critical");
        assert_eq!(recs[5], "high");
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        let mut profile = report();
        profile.execution_time = 10_000.0;
        profile.memory_usage.peak = 100 * MIB;
        profile.code_complexity.cyclomatic = 10;
        assert!(recommendations(Some(&profile)).is_empty());
    }
}
