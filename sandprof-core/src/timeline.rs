//! Execution timeline bookkeeping

use crate::types::{ExecutionStep, MemorySnapshot, StepMetadata, StepStatus, StepType};
use tracing::warn;

/// Ordered list of execution steps for one session
#[derive(Debug, Default)]
pub struct TimelineRecorder {
    steps: Vec<ExecutionStep>,
    /// Indices of steps still waiting for their end call, oldest first
    open: Vec<usize>,
    /// Maximum number of steps retained (0 = unlimited)
    max_entries: usize,
    dropped: usize,
}

impl TimelineRecorder {
    /// Create a recorder retaining at most `max_entries` steps (0 = unlimited)
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            ..Default::default()
        }
    }

    /// Record an atomic step that starts and ends at `now`
    pub fn record(
        &mut self,
        id: &str,
        name: &str,
        step_type: StepType,
        metadata: Option<StepMetadata>,
        now: f64,
        snapshot: MemorySnapshot,
    ) -> bool {
        self.record_with_status(id, name, step_type, StepStatus::Success, metadata, now, snapshot)
    }

    /// Record an atomic step with an explicit outcome
    #[allow(clippy::too_many_arguments)]
    pub fn record_with_status(
        &mut self,
        id: &str,
        name: &str,
        step_type: StepType,
        status: StepStatus,
        metadata: Option<StepMetadata>,
        now: f64,
        snapshot: MemorySnapshot,
    ) -> bool {
        self.push(ExecutionStep {
            id: id.to_string(),
            name: name.to_string(),
            start_time: now,
            end_time: now,
            duration: 0.0,
            step_type,
            status,
            metadata,
            children: None,
            memory_snapshot: Some(snapshot),
        })
    }

    /// Open a step that a later [`end`](Self::end) call will close
    pub fn start(
        &mut self,
        id: &str,
        name: &str,
        step_type: StepType,
        now: f64,
        snapshot: MemorySnapshot,
    ) -> bool {
        let pushed = self.push(ExecutionStep {
            id: id.to_string(),
            name: name.to_string(),
            start_time: now,
            end_time: 0.0,
            duration: 0.0,
            step_type,
            status: StepStatus::Success,
            metadata: None,
            children: None,
            memory_snapshot: Some(snapshot),
        });
        if pushed {
            self.open.push(self.steps.len() - 1);
        }
        pushed
    }

    /// Close the most recently opened step with `id`
    ///
    /// Returns `false`, leaving the timeline untouched, when no open step
    /// carries that id.
    pub fn end(&mut self, id: &str, status: StepStatus, now: f64) -> bool {
        let Some(position) = self.open.iter().rposition(|&idx| self.steps[idx].id == id) else {
            return false;
        };
        let idx = self.open.remove(position);

        let step = &mut self.steps[idx];
        step.end_time = now.max(step.start_time);
        step.duration = step.end_time - step.start_time;
        step.status = status;
        true
    }

    fn push(&mut self, step: ExecutionStep) -> bool {
        if self.max_entries > 0 && self.steps.len() >= self.max_entries {
            if self.dropped == 0 {
                warn!(
                    "Timeline limit of {} entries reached; dropping further steps",
                    self.max_entries
                );
            }
            self.dropped += 1;
            return false;
        }
        self.steps.push(step);
        true
    }

    pub fn steps(&self) -> &[ExecutionStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps still waiting for an end call
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Number of steps discarded because the timeline was full
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Sum of all step durations; open steps count as zero
    pub fn total_duration(&self) -> f64 {
        self.steps.iter().map(|s| s.duration).sum()
    }

    /// Freeze the timeline. Open steps keep duration 0.
    pub fn into_steps(self) -> Vec<ExecutionStep> {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap() -> MemorySnapshot {
        MemorySnapshot::from_usage(0)
    }

    #[test]
    fn test_interval_step() {
        let mut timeline = TimelineRecorder::new(0);
        assert!(timeline.start("s1", "Compile", StepType::Computation, 10.0, snap()));
        assert!(timeline.end("s1", StepStatus::Warning, 35.0));

        let step = &timeline.steps()[0];
        assert_eq!(step.end_time, 35.0);
        assert_eq!(step.duration, 25.0);
        assert_eq!(step.status, StepStatus::Warning);
        assert_eq!(timeline.open_count(), 0);
    }

    #[test]
    fn test_end_closes_most_recent_open_step() {
        let mut timeline = TimelineRecorder::new(0);
        timeline.start("fetch", "outer", StepType::Network, 0.0, snap());
        timeline.start("fetch", "inner", StepType::Network, 5.0, snap());

        assert!(timeline.end("fetch", StepStatus::Success, 7.0));
        assert_eq!(timeline.steps()[1].duration, 2.0);
        assert_eq!(timeline.steps()[0].end_time, 0.0);

        assert!(timeline.end("fetch", StepStatus::Error, 20.0));
        assert_eq!(timeline.steps()[0].duration, 20.0);
        assert_eq!(timeline.steps()[0].status, StepStatus::Error);
    }

    #[test]
    fn test_unmatched_end_is_noop() {
        let mut timeline = TimelineRecorder::new(0);
        timeline.record("a", "atomic", StepType::Execution, None, 0.0, snap());
        let before = timeline.steps().to_vec();

        assert!(!timeline.end("a", StepStatus::Error, 50.0));
        assert!(!timeline.end("missing", StepStatus::Error, 50.0));
        assert_eq!(timeline.steps(), before.as_slice());
    }

    #[test]
    fn test_end_never_precedes_start() {
        let mut timeline = TimelineRecorder::new(0);
        timeline.start("s", "s", StepType::Execution, 100.0, snap());
        timeline.end("s", StepStatus::Success, 90.0);
        let step = &timeline.steps()[0];
        assert!(step.end_time >= step.start_time);
        assert_eq!(step.duration, 0.0);
    }

    #[test]
    fn test_open_step_frozen_with_zero_duration() {
        let mut timeline = TimelineRecorder::new(0);
        timeline.start("never", "never closed", StepType::Execution, 3.0, snap());
        let steps = timeline.into_steps();
        assert_eq!(steps[0].end_time, 0.0);
        assert_eq!(steps[0].duration, 0.0);
    }

    #[test]
    fn test_limit_drops_new_steps() {
        let mut timeline = TimelineRecorder::new(2);
        assert!(timeline.record("1", "one", StepType::Execution, None, 0.0, snap()));
        assert!(timeline.start("2", "two", StepType::Execution, 1.0, snap()));
        assert!(!timeline.start("3", "three", StepType::Execution, 2.0, snap()));
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.dropped(), 1);
        assert!(!timeline.end("3", StepStatus::Success, 4.0));
        assert!(timeline.end("2", StepStatus::Success, 4.0));
    }
}
