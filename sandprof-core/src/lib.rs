//! Sandprof Core
//!
//! Execution profiler for sandboxed code runs. A [`ProfilingSession`]
//! observes one run of a code artifact and produces a [`ProfileMetrics`]
//! report:
//! - Execution timeline built from lifecycle events
//! - Periodic memory sampling and network request recording
//! - Static complexity metrics of the source text
//! - Bottleneck detection, a 0-100 score with a letter grade
//! - Plain-language recommendations
//!
//! Runs recorded elsewhere can be replayed deterministically with
//! [`replay::replay`].

pub mod bottleneck;
pub mod clock;
pub mod complexity;
pub mod config;
pub mod error;
pub mod network;
pub mod recommend;
pub mod replay;
pub mod sampler;
pub mod score;
pub mod session;
pub mod timeline;
pub mod types;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{MemoryProbeKind, ProfilerConfig};
pub use error::{ProfilerError, Result};
pub use network::{HttpRequest, HttpResponse, HttpTransport, NetworkObserver, ObservedTransport};
pub use replay::{LifecycleEvent, ReplayLog};
pub use sampler::{MemoryProbe, NullMemoryProbe, ProcessMemoryProbe};
pub use session::{ProfilingSession, SessionState, StepRecorder};
pub use types::*;

/// Profiler version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        ProfileMetrics, ProfilerConfig, ProfilerError, ProfilingContext, ProfilingSession, Result,
        StepRecorder, StepStatus, StepType,
    };
}
