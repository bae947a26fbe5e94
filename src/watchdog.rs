//! Stall watchdog for the sample dispatcher
//!
//! Low-overhead monitoring using atomic timestamps instead of locks.
//! Each side of the dispatcher stores its wait start time in an atomic
//! variable, and the watchdog periodically scans these timestamps to report
//! a capture thread stuck in `put` or a render thread starved in `get`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Timestamp in milliseconds since UNIX_EPOCH
#[inline(always)]
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

/// Shared state for one monitored wait site
struct WaitState {
    /// Timestamp (ms since epoch) when the current wait started, or 0 if idle
    wait_start: AtomicU64,
    /// Track if we've already warned about this wait being stalled
    has_warned: AtomicBool,
    thread_name: String,
    operation: String, // "put", "get"
}

/// Handle to a wait site's watchdog state (held by the dispatcher)
#[derive(Clone)]
pub struct WatchdogHandle {
    state: Arc<WaitState>,
}

impl WatchdogHandle {
    /// Mark the start of a blocking wait (stores current timestamp)
    #[inline(always)]
    pub fn start_wait(&self) {
        self.state.wait_start.store(now_millis(), Ordering::Relaxed);
        self.state.has_warned.store(false, Ordering::Relaxed);
    }

    /// Mark the end of a blocking wait (clears timestamp to 0)
    #[inline(always)]
    pub fn finish_wait(&self) {
        if self.state.has_warned.load(Ordering::Relaxed) {
            info!(
                "UNBLOCKED: [{}] {} resumed",
                self.state.thread_name, self.state.operation
            );
            self.state.has_warned.store(false, Ordering::Relaxed);
        }
        self.state.wait_start.store(0, Ordering::Relaxed);
    }
}

/// Shared watchdog state
#[derive(Clone)]
pub struct Watchdog {
    sites: Arc<Mutex<Vec<Weak<WaitState>>>>,
    enabled: Arc<AtomicBool>,
}

impl Watchdog {
    pub fn new() -> Self {
        Self {
            sites: Arc::new(Mutex::new(Vec::new())),
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Register a new wait site for monitoring
    pub fn register(&self, thread_name: &str, operation: &str) -> WatchdogHandle {
        let state = Arc::new(WaitState {
            wait_start: AtomicU64::new(0),
            has_warned: AtomicBool::new(false),
            thread_name: thread_name.to_string(),
            operation: operation.to_string(),
        });

        self.sites.lock().unwrap().push(Arc::downgrade(&state));

        WatchdogHandle { state }
    }

    /// Check for stalled waits (>5 seconds)
    pub fn check_for_stalls(&self) {
        let now = now_millis();
        let threshold_ms = 5000;

        let mut sites = self.sites.lock().unwrap();

        // Remove dead weak references and check live ones
        sites.retain(|weak| {
            if let Some(state) = weak.upgrade() {
                let start = state.wait_start.load(Ordering::Relaxed);
                if start > 0 {
                    let duration_ms = now.saturating_sub(start);
                    if duration_ms > threshold_ms
                        && !state.has_warned.swap(true, Ordering::Relaxed)
                    {
                        warn!(
                            "BLOCKED: [{}] {} has been waiting for {:.1}s",
                            state.thread_name,
                            state.operation,
                            duration_ms as f64 / 1000.0
                        );
                    }
                }
                true
            } else {
                false
            }
        });
    }

    /// Start the watchdog monitoring thread
    pub fn start_monitoring_thread(&self) -> std::thread::JoinHandle<()> {
        let watchdog = self.clone();
        std::thread::spawn(move || {
            loop {
                std::thread::sleep(Duration::from_secs(1));

                if !watchdog.enabled.load(Ordering::Relaxed) {
                    break;
                }

                watchdog.check_for_stalls();
            }
        })
    }

    /// Stop the watchdog monitoring thread
    pub fn stop(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for tracking a wait - near-zero cost (just atomic stores)
pub struct WaitGuard<'a> {
    handle: &'a WatchdogHandle,
}

impl<'a> WaitGuard<'a> {
    #[inline(always)]
    pub fn new(handle: &'a WatchdogHandle) -> Self {
        handle.start_wait();
        Self { handle }
    }
}

impl Drop for WaitGuard<'_> {
    #[inline(always)]
    fn drop(&mut self) {
        self.handle.finish_wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_guard_clears_timestamp() {
        let watchdog = Watchdog::new();
        let handle = watchdog.register("capture", "put");

        {
            let _guard = WaitGuard::new(&handle);
            assert!(handle.state.wait_start.load(Ordering::Relaxed) > 0);
        }
        assert_eq!(handle.state.wait_start.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_dead_sites_are_pruned() {
        let watchdog = Watchdog::new();
        let handle = watchdog.register("render", "get");
        assert_eq!(watchdog.sites.lock().unwrap().len(), 1);

        drop(handle);
        watchdog.check_for_stalls();
        assert_eq!(watchdog.sites.lock().unwrap().len(), 0);
    }
}
