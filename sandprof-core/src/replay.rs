//! Deterministic replay of recorded lifecycle events
//!
//! A sandbox that cannot host the profiler in-process can ship its
//! lifecycle events (with their own timestamps) back to the host, which
//! replays them through a fresh session driven by a [`ManualClock`].

use crate::clock::ManualClock;
use crate::config::{MemoryProbeKind, ProfilerConfig};
use crate::error::Result;
use crate::network::DEFAULT_METHOD;
use crate::sampler::NullMemoryProbe;
use crate::session::ProfilingSession;
use crate::types::{
    NetworkRequest, ProfileMetrics, ProfilingContext, StepMetadata, StepStatus, StepType,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// A lifecycle event stamped with the sandbox time it happened at (ms)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum LifecycleEvent {
    #[serde(rename_all = "camelCase")]
    StepStart {
        at: f64,
        id: String,
        name: String,
        #[serde(rename = "type")]
        step_type: StepType,
    },
    #[serde(rename_all = "camelCase")]
    StepEnd {
        at: f64,
        id: String,
        #[serde(default)]
        status: StepStatus,
    },
    #[serde(rename_all = "camelCase")]
    Step {
        at: f64,
        id: String,
        name: String,
        #[serde(rename = "type")]
        step_type: StepType,
        #[serde(default)]
        metadata: Option<StepMetadata>,
    },
    /// A finished request that started at `at`. The event does not move
    /// the clock to the request's end, so later events may fall inside it.
    /// `status` is required: `0` would mean the call never completed.
    #[serde(rename_all = "camelCase")]
    Network {
        at: f64,
        url: String,
        #[serde(default = "default_method")]
        method: String,
        duration: f64,
        status: u16,
        #[serde(default)]
        size: u64,
    },
    /// Memory usage reported by the sandbox
    Memory { at: f64, usage: u64 },
}

fn default_method() -> String {
    DEFAULT_METHOD.to_string()
}

impl LifecycleEvent {
    pub fn at(&self) -> f64 {
        match self {
            LifecycleEvent::StepStart { at, .. }
            | LifecycleEvent::StepEnd { at, .. }
            | LifecycleEvent::Step { at, .. }
            | LifecycleEvent::Network { at, .. }
            | LifecycleEvent::Memory { at, .. } => *at,
        }
    }
}

/// A recorded run: its context, its events and when it was stopped
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayLog {
    #[serde(default)]
    pub context: ProfilingContext,
    #[serde(default)]
    pub events: Vec<LifecycleEvent>,
    /// Stop time; defaults to the last event's time
    #[serde(default)]
    pub stop_at: Option<f64>,
}

impl ReplayLog {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// Replay `log` through a fresh session and return its report along with
/// the recommendations derived from it
pub fn replay(config: &ProfilerConfig, log: &ReplayLog) -> Result<(ProfileMetrics, Vec<String>)> {
    let clock = Arc::new(ManualClock::new(0.0));
    let config = ProfilerConfig {
        memory_probe: MemoryProbeKind::None,
        ..config.clone()
    };
    let mut session = ProfilingSession::with_parts(config, clock.clone(), Arc::new(NullMemoryProbe));

    session.start(log.context.clone())?;
    debug!("Replaying {} lifecycle events", log.events.len());

    for event in &log.events {
        clock.set(event.at());
        apply(&session, event);
    }
    if let Some(stop_at) = log.stop_at {
        clock.set(stop_at);
    }

    let report = session.stop()?;
    let recommendations = session.performance_recommendations();
    Ok((report, recommendations))
}

fn apply(session: &ProfilingSession, event: &LifecycleEvent) {
    match event {
        LifecycleEvent::StepStart {
            id,
            name,
            step_type,
            ..
        } => session.record_step_start(id, name, *step_type),
        LifecycleEvent::StepEnd { id, status, .. } => session.record_step_end(id, *status),
        LifecycleEvent::Step {
            id,
            name,
            step_type,
            metadata,
            ..
        } => session.record_step(id, name, *step_type, metadata.clone()),
        LifecycleEvent::Network {
            at,
            url,
            method,
            duration,
            status,
            size,
        } => {
            let duration = duration.max(0.0);
            session.record_network_request(NetworkRequest {
                url: url.clone(),
                method: method.clone(),
                duration,
                status: *status,
                size: *size,
                start_time: *at,
                end_time: at + duration,
            });
        }
        LifecycleEvent::Memory { usage, .. } => session.record_memory_sample(*usage),
    }
}
