//! Performance score and grade

use crate::types::{Grade, MemoryUsage, PerformanceBottleneck, MIB};

/// Reduce timing, memory and bottlenecks to a score in `0..=100`
pub fn score(
    execution_time: f64,
    memory: &MemoryUsage,
    bottlenecks: &[PerformanceBottleneck],
) -> u8 {
    let mut score: i32 = 100;

    score -= if execution_time > 10_000.0 {
        30
    } else if execution_time > 5_000.0 {
        20
    } else if execution_time > 2_000.0 {
        10
    } else {
        0
    };

    score -= if memory.peak > 100 * MIB {
        20
    } else if memory.peak > 50 * MIB {
        10
    } else {
        0
    };

    for bottleneck in bottlenecks {
        score -= bottleneck.severity.score_penalty();
    }

    score.clamp(0, 100) as u8
}

impl Grade {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => Grade::A,
            80..=89 => Grade::B,
            70..=79 => Grade::C,
            60..=69 => Grade::D,
            _ => Grade::F,
        }
    }
}
