//! Application state shared across handlers and the collector.
//!
//! The registry and window store are built once at startup and shared by
//! `Arc`. Handlers only read the windows; the collector's scheduler is the
//! only writer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use time::OffsetDateTime;
use tokio::sync::watch;

use radoneye_core::{PollStats, Registry, WindowStore};
use radoneye_types::Unit;

use crate::dump::SnapshotSink;

/// Shared application state.
pub struct AppState {
    /// Registered devices, fixed for the process lifetime.
    pub registry: Arc<Registry>,
    /// Per-device reading windows.
    pub windows: Arc<WindowStore>,
    /// Unit of every stored value.
    pub unit: Unit,
    /// Mirror for rendered snapshots.
    pub sink: Arc<dyn SnapshotSink>,
    /// Statistics updated by the collector.
    pub stats: Arc<PollStats>,
    /// Collector control state.
    pub collector: CollectorState,
}

impl AppState {
    /// Create state with an empty window for every registered device.
    pub fn new(registry: Arc<Registry>, unit: Unit, sink: Arc<dyn SnapshotSink>) -> Arc<Self> {
        let windows = Arc::new(WindowStore::new(&registry));
        let stats = Arc::new(PollStats::new(&registry));
        Arc::new(Self {
            registry,
            windows,
            unit,
            sink,
            stats,
            collector: CollectorState::new(),
        })
    }
}

/// State for tracking and stopping the collector.
pub struct CollectorState {
    running: AtomicBool,
    /// Unix timestamp of the last start, 0 if never started.
    started_at: AtomicI64,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl CollectorState {
    pub fn new() -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            running: AtomicBool::new(false),
            started_at: AtomicI64::new(0),
            stop_tx,
            stop_rx,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Mark the collector as started or stopped.
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
        if running {
            let now = OffsetDateTime::now_utc().unix_timestamp();
            self.started_at.store(now, Ordering::SeqCst);
        }
    }

    pub fn started_at(&self) -> Option<OffsetDateTime> {
        match self.started_at.load(Ordering::SeqCst) {
            0 => None,
            ts => OffsetDateTime::from_unix_timestamp(ts).ok(),
        }
    }

    /// Receiver for the stop signal.
    pub fn subscribe_stop(&self) -> watch::Receiver<bool> {
        self.stop_rx.clone()
    }

    /// Ask the collector to stop after its current round.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(true);
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Default for CollectorState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::NullSink;
    use radoneye_core::DeviceRegistration;
    use radoneye_types::DeviceType;

    #[test]
    fn test_app_state_creates_windows() {
        let registry = Arc::new(
            Registry::new(vec![DeviceRegistration::new(
                "AA:BB",
                "Bedroom",
                DeviceType::Rd200V2,
            )])
            .unwrap(),
        );
        let state = AppState::new(registry, Unit::Becquerel, Arc::new(NullSink));

        assert_eq!(state.windows.len("AA:BB").unwrap(), 0);
        assert_eq!(state.stats.snapshot().len(), 1);
        assert!(!state.collector.is_running());
    }

    #[test]
    fn test_collector_state_lifecycle() {
        let collector = CollectorState::new();
        assert!(!collector.is_running());
        assert!(collector.started_at().is_none());

        collector.set_running(true);
        assert!(collector.is_running());
        assert!(collector.started_at().is_some());

        let stop = collector.subscribe_stop();
        assert!(!*stop.borrow());
        collector.signal_stop();
        assert!(*stop.borrow());
        assert!(!collector.is_running());
    }
}
