//! Profiling session state machine
//!
//! A [`ProfilingSession`] owns one run end to end: `Idle → Active → Stopped`.
//! While active, memory is sampled on a background thread, network calls
//! routed through the session's [`NetworkObserver`] are recorded, and the
//! instrumented execution reports its lifecycle through the `record_*`
//! methods (or a cloned [`StepRecorder`]). `stop` freezes everything and
//! folds it into one [`ProfileMetrics`].
//!
//! All buffers sit behind a single `active` flag. Every append checks the
//! flag while holding the buffer's lock, and `stop` clears the flag while
//! holding all of them, so nothing lands in a buffer once the report is
//! being assembled.

use crate::bottleneck;
use crate::clock::{Clock, MonotonicClock};
use crate::complexity;
use crate::config::ProfilerConfig;
use crate::error::{ProfilerError, Result};
use crate::network::{NetworkObserver, RequestSink};
use crate::recommend;
use crate::sampler::{self, MemoryProbe, ResourceSampler, SampleSink};
use crate::score;
use crate::timeline::TimelineRecorder;
use crate::types::*;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Id of the steps recording failures reported by the sandbox
pub const ERROR_STEP_ID: &str = "error";
/// Metadata key holding the failure message of an error step
pub const ERROR_METADATA_KEY: &str = "error";

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    Stopped,
}

struct SessionShared {
    active: AtomicBool,
    detailed: AtomicBool,
    clock: Arc<dyn Clock>,
    probe: Arc<dyn MemoryProbe>,
    timeline: Mutex<TimelineRecorder>,
    samples: Mutex<Vec<MemorySample>>,
    requests: Mutex<Vec<NetworkRequest>>,
}

impl SessionShared {
    fn new(clock: Arc<dyn Clock>, probe: Arc<dyn MemoryProbe>) -> Self {
        Self {
            active: AtomicBool::new(false),
            detailed: AtomicBool::new(false),
            clock,
            probe,
            timeline: Mutex::new(TimelineRecorder::default()),
            samples: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot::from_usage(self.probe.current_usage())
    }

    fn record_step(
        &self,
        id: &str,
        name: &str,
        step_type: StepType,
        status: StepStatus,
        metadata: Option<StepMetadata>,
    ) {
        if !self.is_active() {
            return;
        }
        let now = self.clock.now_ms();
        let snapshot = self.snapshot();

        let mut timeline = self.timeline.lock();
        if !self.is_active() {
            return;
        }
        let recorded =
            timeline.record_with_status(id, name, step_type, status, metadata, now, snapshot);
        if recorded && self.is_detailed() {
            trace!(id, name, ?step_type, ?status, at = now, "step recorded");
        }
    }

    fn record_error(&self, name: &str, message: &str) {
        let mut metadata = StepMetadata::new();
        metadata.insert(ERROR_METADATA_KEY.to_string(), message.into());
        self.record_step(
            ERROR_STEP_ID,
            name,
            StepType::Execution,
            StepStatus::Error,
            Some(metadata),
        );
    }

    fn record_step_start(&self, id: &str, name: &str, step_type: StepType) {
        if !self.is_active() {
            return;
        }
        let now = self.clock.now_ms();
        let snapshot = self.snapshot();

        let mut timeline = self.timeline.lock();
        if !self.is_active() {
            return;
        }
        if timeline.start(id, name, step_type, now, snapshot) && self.is_detailed() {
            trace!(id, name, ?step_type, at = now, "step started");
        }
    }

    fn record_step_end(&self, id: &str, status: StepStatus) {
        if !self.is_active() {
            return;
        }
        let now = self.clock.now_ms();

        let mut timeline = self.timeline.lock();
        if !self.is_active() {
            return;
        }
        let closed = timeline.end(id, status, now);
        if self.is_detailed() {
            trace!(id, ?status, closed, at = now, "step ended");
        }
    }

    fn is_detailed(&self) -> bool {
        self.detailed.load(Ordering::Relaxed)
    }

    /// Clear the active flag while holding every buffer lock
    fn deactivate(&self) {
        let _timeline = self.timeline.lock();
        let _samples = self.samples.lock();
        let _requests = self.requests.lock();
        self.active.store(false, Ordering::SeqCst);
    }
}

impl SampleSink for SessionShared {
    fn is_active(&self) -> bool {
        SessionShared::is_active(self)
    }

    fn push_sample(&self, sample: MemorySample) -> bool {
        let mut samples = self.samples.lock();
        if !self.is_active() {
            return false;
        }
        samples.push(sample);
        true
    }
}

impl RequestSink for SessionShared {
    fn is_active(&self) -> bool {
        SessionShared::is_active(self)
    }

    fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    fn push_request(&self, request: NetworkRequest) -> bool {
        let mut requests = self.requests.lock();
        if !self.is_active() {
            return false;
        }
        requests.push(request);
        true
    }
}

/// Cloneable handle for reporting lifecycle events into a session
///
/// Calls made while the session is not active are ignored.
#[derive(Clone)]
pub struct StepRecorder {
    shared: Arc<SessionShared>,
}

impl StepRecorder {
    /// Record an atomic step that starts and ends now
    pub fn record_step(
        &self,
        id: &str,
        name: &str,
        step_type: StepType,
        metadata: Option<StepMetadata>,
    ) {
        self.shared
            .record_step(id, name, step_type, StepStatus::Success, metadata);
    }

    /// Open a step
    pub fn record_step_start(&self, id: &str, name: &str, step_type: StepType) {
        self.shared.record_step_start(id, name, step_type);
    }

    /// Close the most recently opened step with `id`
    pub fn record_step_end(&self, id: &str, status: StepStatus) {
        self.shared.record_step_end(id, status);
    }

    /// Append an externally observed network request
    pub fn record_network_request(&self, request: NetworkRequest) {
        self.shared.push_request(request);
    }

    /// Record an `error` step for a failure the sandbox reported, such as
    /// an uncaught exception or an unhandled rejection
    pub fn record_error(&self, name: &str, message: &str) {
        self.shared.record_error(name, message);
    }

    /// Run `call` inside a step named `name`
    ///
    /// The step closes with `success` or `error`; on failure an additional
    /// `error` step carries the failure message under the `error` key. The
    /// result is handed back untouched.
    pub fn run_step<T, E, F>(
        &self,
        id: &str,
        name: &str,
        step_type: StepType,
        call: F,
    ) -> std::result::Result<T, E>
    where
        E: fmt::Display,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        self.shared.record_step_start(id, name, step_type);
        let result = call();
        match &result {
            Ok(_) => self.shared.record_step_end(id, StepStatus::Success),
            Err(e) => {
                self.shared.record_step_end(id, StepStatus::Error);
                self.shared.record_error(&format!("{name} failed"), &e.to_string());
            }
        }
        result
    }
}

/// One profiling run over a single code artifact
pub struct ProfilingSession {
    config: ProfilerConfig,
    shared: Arc<SessionShared>,
    state: SessionState,
    context: Option<ProfilingContext>,
    start_time: f64,
    sampler: Option<ResourceSampler>,
    last_report: Option<ProfileMetrics>,
}

impl ProfilingSession {
    /// Create a session with the default configuration
    pub fn new() -> Self {
        Self::with_config(ProfilerConfig::default())
    }

    /// Create a session reading memory from the configured probe
    pub fn with_config(config: ProfilerConfig) -> Self {
        let probe = sampler::probe_for(config.memory_probe);
        Self::with_parts(config, Arc::new(MonotonicClock::new()), probe)
    }

    /// Create a session with an explicit clock and memory probe
    pub fn with_parts(
        config: ProfilerConfig,
        clock: Arc<dyn Clock>,
        probe: Arc<dyn MemoryProbe>,
    ) -> Self {
        Self {
            config,
            shared: Arc::new(SessionShared::new(clock, probe)),
            state: SessionState::Idle,
            context: None,
            start_time: 0.0,
            sampler: None,
            last_report: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Context of the run in progress
    pub fn context(&self) -> Option<&ProfilingContext> {
        self.context.as_ref()
    }

    /// Begin profiling `context`
    pub fn start(&mut self, context: ProfilingContext) -> Result<()> {
        match self.state {
            SessionState::Active => return Err(ProfilerError::AlreadyActive),
            SessionState::Stopped => return Err(ProfilerError::SessionFinished),
            SessionState::Idle => {}
        }

        let max_entries = if context.max_timeline_entries > 0 {
            context.max_timeline_entries
        } else {
            self.config.max_timeline_entries
        };
        let interval = self.config.sample_interval(context.sample_rate);

        *self.shared.timeline.lock() = TimelineRecorder::new(max_entries);
        self.shared.samples.lock().clear();
        self.shared.requests.lock().clear();
        self.shared
            .detailed
            .store(context.enable_detailed_profiling, Ordering::Relaxed);

        self.start_time = self.shared.clock.now_ms();
        self.shared.active.store(true, Ordering::SeqCst);

        let sink: Arc<dyn SampleSink> = self.shared.clone();
        match ResourceSampler::spawn(
            self.shared.probe.clone(),
            self.shared.clock.clone(),
            interval,
            sink,
        ) {
            Ok(sampler) => self.sampler = Some(sampler),
            Err(e) => warn!("Memory sampling unavailable: {}", e),
        }

        info!(
            template = %context.template,
            code_bytes = context.code.len(),
            "Profiling started"
        );
        self.context = Some(context);
        self.state = SessionState::Active;

        self.shared
            .record_step(
                "initialization",
                "Profiling started",
                StepType::Initialization,
                StepStatus::Success,
                None,
            );
        Ok(())
    }

    /// Record an atomic step; ignored unless active
    pub fn record_step(
        &self,
        id: &str,
        name: &str,
        step_type: StepType,
        metadata: Option<StepMetadata>,
    ) {
        self.shared
            .record_step(id, name, step_type, StepStatus::Success, metadata);
    }

    /// Open a step; ignored unless active
    pub fn record_step_start(&self, id: &str, name: &str, step_type: StepType) {
        self.shared.record_step_start(id, name, step_type);
    }

    /// Close the most recently opened step with `id`; ignored unless active
    /// or when no such step is open
    pub fn record_step_end(&self, id: &str, status: StepStatus) {
        self.shared.record_step_end(id, status);
    }

    /// Append a network request; ignored unless active
    pub fn record_network_request(&self, request: NetworkRequest) {
        self.shared.push_request(request);
    }

    /// Record an `error` step for a failure the sandbox reported; ignored
    /// unless active
    pub fn record_error(&self, name: &str, message: &str) {
        self.shared.record_error(name, message);
    }

    /// Append a memory reading reported by the sandbox itself; ignored
    /// unless active. Zero readings are skipped like the sampler's.
    pub fn record_memory_sample(&self, usage: u64) {
        if usage == 0 || !self.shared.is_active() {
            return;
        }
        let timestamp = self.shared.clock.now_ms();
        self.shared.push_sample(MemorySample { timestamp, usage });
    }

    /// Handle for recording from other threads or call sites
    pub fn recorder(&self) -> StepRecorder {
        StepRecorder {
            shared: self.shared.clone(),
        }
    }

    /// Interceptor to route the instrumented execution's network calls through
    pub fn network_observer(&self) -> NetworkObserver {
        NetworkObserver::new(self.shared.clone())
    }

    /// Finish the run and produce its report
    pub fn stop(&mut self) -> Result<ProfileMetrics> {
        if self.state != SessionState::Active {
            return Err(ProfilerError::NotActive);
        }

        let execution_time = (self.shared.clock.now_ms() - self.start_time).max(0.0);
        self.shared
            .record_step(
                "cleanup",
                "Profiling stopped",
                StepType::Cleanup,
                StepStatus::Success,
                None,
            );

        self.shared.deactivate();
        if let Some(sampler) = self.sampler.take() {
            sampler.stop();
        }

        let timeline = std::mem::take(&mut *self.shared.timeline.lock());
        let samples = std::mem::take(&mut *self.shared.samples.lock());
        let requests = std::mem::take(&mut *self.shared.requests.lock());

        if timeline.open_count() > 0 {
            debug!("{} steps still open at stop", timeline.open_count());
        }
        if timeline.dropped() > 0 {
            warn!("{} steps dropped by the timeline limit", timeline.dropped());
        }

        let code = self
            .context
            .take()
            .map(|context| context.code)
            .unwrap_or_default();
        let report = assemble_report(execution_time, &code, timeline.into_steps(), &samples, requests);

        info!(
            execution_time_ms = report.execution_time,
            score = report.performance.score,
            grade = %report.performance.grade,
            bottlenecks = report.performance.bottlenecks.len(),
            "Profiling stopped"
        );

        self.state = SessionState::Stopped;
        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Report produced by the last `stop`
    pub fn last_report(&self) -> Option<&ProfileMetrics> {
        self.last_report.as_ref()
    }

    /// Suggestions derived from the last report
    pub fn performance_recommendations(&self) -> Vec<String> {
        recommend::recommendations(self.last_report.as_ref())
    }
}

impl Default for ProfilingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProfilingSession {
    fn drop(&mut self) {
        if self.state == SessionState::Active {
            self.shared.deactivate();
        }
    }
}

/// Fold the frozen buffers of a run into its report
fn assemble_report(
    execution_time: f64,
    code: &str,
    timeline: Vec<ExecutionStep>,
    samples: &[MemorySample],
    requests: Vec<NetworkRequest>,
) -> ProfileMetrics {
    let memory_usage = MemoryUsage::from_samples(samples);
    let code_complexity = complexity::analyze(code);
    let bottlenecks = bottleneck::detect(&timeline, samples, &requests);
    let score = score::score(execution_time, &memory_usage, &bottlenecks);
    let resource_utilization = ResourceUtilization::from_parts(&memory_usage, &requests);

    ProfileMetrics {
        execution_time,
        memory_usage,
        cpu_usage: CpuUsage::default(),
        network_requests: requests,
        code_complexity,
        performance: PerformanceSummary {
            score,
            grade: Grade::from_score(score),
            bottlenecks,
        },
        timeline,
        resource_utilization,
    }
}
