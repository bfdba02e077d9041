//! Background data collector.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use radoneye_core::{DeviceLink, PollConfig, PollScheduler};

use crate::state::AppState;

/// Runs the polling scheduler against the shared state.
pub struct Collector {
    state: Arc<AppState>,
}

impl Collector {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Spawn the polling loop and return its handle.
    ///
    /// Returns `None` without spawning anything when no devices are
    /// registered. The loop ends after [`CollectorState::signal_stop`].
    ///
    /// [`CollectorState::signal_stop`]: crate::state::CollectorState::signal_stop
    pub fn start<L>(&self, link: L, config: PollConfig) -> Option<JoinHandle<()>>
    where
        L: DeviceLink + 'static,
    {
        if self.state.registry.is_empty() {
            info!("No devices configured for collection");
            return None;
        }

        let scheduler = PollScheduler::new(
            Arc::clone(&self.state.registry),
            Arc::clone(&self.state.windows),
            link,
            config,
        )
        .with_stats(Arc::clone(&self.state.stats));

        let stop = self.state.collector.subscribe_stop();
        self.state.collector.set_running(true);

        let state = Arc::clone(&self.state);
        Some(tokio::spawn(async move {
            scheduler.run(stop).await;
            state.collector.set_running(false);
        }))
    }
}
