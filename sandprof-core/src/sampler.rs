//! Periodic memory sampling
//!
//! The sampler runs on its own thread so that step recording on the
//! instrumented call path never waits for a memory reading. Readings come
//! from a [`MemoryProbe`]; a host without memory introspection simply reads
//! zero, which is never treated as an error.

use crate::clock::Clock;
use crate::config::MemoryProbeKind;
use crate::types::MemorySample;
use crossbeam::channel::{self, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::{debug, warn};

/// Source of memory usage readings
pub trait MemoryProbe: Send + Sync {
    /// Current memory usage in bytes, `0` when unavailable
    fn current_usage(&self) -> u64;
}

/// Probe for hosts without memory introspection
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMemoryProbe;

impl MemoryProbe for NullMemoryProbe {
    fn current_usage(&self) -> u64 {
        0
    }
}

/// Resident memory of the current process
pub struct ProcessMemoryProbe {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl ProcessMemoryProbe {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                debug!("Process memory unavailable: {}", e);
                None
            }
        };
        Self {
            pid,
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for ProcessMemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn current_usage(&self) -> u64 {
        let Some(pid) = self.pid else {
            return 0;
        };

        let mut system = self.system.lock();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        system.process(pid).map(|p| p.memory()).unwrap_or(0)
    }
}

/// Build the probe selected by the configuration
pub fn probe_for(kind: MemoryProbeKind) -> Arc<dyn MemoryProbe> {
    match kind {
        MemoryProbeKind::Process => Arc::new(ProcessMemoryProbe::new()),
        MemoryProbeKind::None => Arc::new(NullMemoryProbe),
    }
}

/// Destination for samples taken by the background thread
pub trait SampleSink: Send + Sync {
    /// Whether the owning session still accepts samples
    fn is_active(&self) -> bool;

    /// Append a sample; returns `false` once the session stopped accepting
    fn push_sample(&self, sample: MemorySample) -> bool;
}

/// Handle to a running sampler thread
pub struct ResourceSampler {
    shutdown: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl ResourceSampler {
    /// Start sampling `probe` every `interval` into `sink`
    pub fn spawn(
        probe: Arc<dyn MemoryProbe>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        sink: Arc<dyn SampleSink>,
    ) -> std::io::Result<Self> {
        let (shutdown, shutdown_rx) = channel::bounded::<()>(1);

        let handle = std::thread::Builder::new()
            .name("sandprof-sampler".to_string())
            .spawn(move || loop {
                match shutdown_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if !sink.is_active() {
                            break;
                        }
                        let usage = probe.current_usage();
                        // Zero means "no reading"; it would only drag the averages down.
                        if usage == 0 {
                            continue;
                        }
                        let sample = MemorySample {
                            timestamp: clock.now_ms(),
                            usage,
                        };
                        if !sink.push_sample(sample) {
                            break;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        debug!("Memory sampler started ({:?} interval)", interval);
        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        let _ = self.shutdown.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Memory sampler thread panicked");
            }
        }
    }
}

impl Drop for ResourceSampler {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MonotonicClock;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    struct CountingProbe(AtomicU64);

    impl MemoryProbe for CountingProbe {
        fn current_usage(&self) -> u64 {
            self.0.fetch_add(1024, Ordering::SeqCst) + 1024
        }
    }

    #[derive(Default)]
    struct VecSink {
        active: AtomicBool,
        samples: Mutex<Vec<MemorySample>>,
    }

    impl SampleSink for VecSink {
        fn is_active(&self) -> bool {
            self.active.load(Ordering::SeqCst)
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

    #[test]
    fn test_sampler_collects_until_stopped() {
        let sink = Arc::new(VecSink::default());
        sink.active.store(true, Ordering::SeqCst);

        let sampler = ResourceSampler::spawn(
            Arc::new(CountingProbe(AtomicU64::new(0))),
            Arc::new(MonotonicClock::new()),
            Duration::from_millis(2),
            sink.clone(),
        )
        .unwrap();

        std::thread::sleep(Duration::from_millis(50));
        sink.active.store(false, Ordering::SeqCst);
        sampler.stop();

        let count = sink.samples.lock().len();
        assert!(count > 0);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(sink.samples.lock().len(), count);

        let samples = sink.samples.lock();
        assert!(samples.windows(2).all(|w| w[1].usage > w[0].usage));
    }

    #[test]
    fn test_zero_readings_are_skipped() {
        let sink = Arc::new(VecSink::default());
        sink.active.store(true, Ordering::SeqCst);

        let sampler = ResourceSampler::spawn(
            Arc::new(NullMemoryProbe),
            Arc::new(MonotonicClock::new()),
            Duration::from_millis(1),
            sink.clone(),
        )
        .unwrap();
        std::thread::sleep(Duration::from_millis(20));
        sampler.stop();

        assert!(sink.samples.lock().is_empty());
    }

    #[test]
    fn test_null_probe_reads_zero() {
        assert_eq!(NullMemoryProbe.current_usage(), 0);
        assert_eq!(probe_for(MemoryProbeKind::None).current_usage(), 0);
    }
}
