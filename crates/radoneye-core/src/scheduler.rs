//! Polling scheduler.
//!
//! The scheduler walks every registered device in registration order, gives
//! each one a small budget of read attempts, records the first validated
//! reading into the [`WindowStore`], and then pauses before the next round.
//! Rounds are grouped into cycles of [`PollConfig::rounds_per_cycle`]; the
//! grouping only affects log output, the pause after every round is the
//! same.
//!
//! A failed attempt never escapes the loop. Exhausting the budget leaves the
//! device's window untouched until the next round.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use radoneye_core::{MockLink, PollConfig, PollScheduler, Registry, WindowStore};
//!
//! let registry = Arc::new(Registry::new(devices)?);
//! let windows = Arc::new(WindowStore::new(&registry));
//! let scheduler = PollScheduler::new(registry, windows, MockLink::new(), PollConfig::default());
//!
//! let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
//! let handle = scheduler.spawn(stop_rx);
//! ```

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use radoneye_types::Unit;

use crate::error::{Error, Result};
use crate::link::DeviceLink;
use crate::registry::{DeviceRegistration, Registry};
use crate::validation::validate;
use crate::window::WindowStore;

/// Read attempts per device per round.
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Rounds grouped into one cycle.
pub const DEFAULT_ROUNDS_PER_CYCLE: u32 = 9;

/// Pause after every round.
pub const DEFAULT_ROUND_INTERVAL: Duration = Duration::from_secs(60);

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Maximum read attempts per device per round (at least 1 is always made).
    pub attempts: u32,
    /// Rounds per cycle.
    pub rounds_per_cycle: u32,
    /// Pause after each round.
    pub round_interval: Duration,
    /// Unit recorded into the windows.
    pub unit: Unit,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            rounds_per_cycle: DEFAULT_ROUNDS_PER_CYCLE,
            round_interval: DEFAULT_ROUND_INTERVAL,
            unit: Unit::default(),
        }
    }
}

impl PollConfig {
    #[must_use]
    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    #[must_use]
    pub fn rounds_per_cycle(mut self, rounds: u32) -> Self {
        self.rounds_per_cycle = rounds;
        self
    }

    #[must_use]
    pub fn round_interval(mut self, interval: Duration) -> Self {
        self.round_interval = interval;
        self
    }

    #[must_use]
    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }
}

/// Result of one device's attempt budget within a round.
#[derive(Debug)]
pub enum AcquireOutcome {
    /// A validated reading was stored on the given 1-based attempt.
    Recorded { value: f64, attempt: u32 },
    /// Every attempt failed; nothing was stored.
    Exhausted { attempts: u32, last_error: Error },
}

impl AcquireOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, AcquireOutcome::Recorded { .. })
    }
}

/// Counts for one completed round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundSummary {
    pub recorded: usize,
    pub exhausted: usize,
}

/// Collection statistics for a single device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStats {
    /// Device address.
    pub address: String,
    /// Display name.
    pub name: String,
    /// Rounds in which a reading was stored.
    pub success_count: u64,
    /// Individual failed attempts.
    pub failure_count: u64,
    /// Rounds in which every attempt failed.
    pub exhausted_count: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_success_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_error_at: Option<OffsetDateTime>,
    pub last_error: Option<String>,
}

impl DeviceStats {
    fn new(device: &DeviceRegistration) -> Self {
        Self {
            address: device.address.clone(),
            name: device.name.clone(),
            success_count: 0,
            failure_count: 0,
            exhausted_count: 0,
            last_success_at: None,
            last_error_at: None,
            last_error: None,
        }
    }
}

/// Shared per-device statistics, written by the scheduler.
#[derive(Debug, Default)]
pub struct PollStats {
    devices: RwLock<Vec<DeviceStats>>,
}

impl PollStats {
    pub fn new(registry: &Registry) -> Self {
        Self {
            devices: RwLock::new(registry.iter().map(DeviceStats::new).collect()),
        }
    }

    /// Copy of the current statistics in registration order.
    pub fn snapshot(&self) -> Vec<DeviceStats> {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, address: &str, f: impl FnOnce(&mut DeviceStats)) {
        let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(stats) = devices
            .iter_mut()
            .find(|s| s.address.eq_ignore_ascii_case(address))
        {
            f(stats);
        }
    }

    fn record_success(&self, address: &str) {
        self.update(address, |s| {
            s.success_count += 1;
            s.last_success_at = Some(OffsetDateTime::now_utc());
        });
    }

    fn record_failure(&self, address: &str, error: &Error) {
        self.update(address, |s| {
            s.failure_count += 1;
            s.last_error_at = Some(OffsetDateTime::now_utc());
            s.last_error = Some(error.to_string());
        });
    }

    fn record_exhausted(&self, address: &str) {
        self.update(address, |s| s.exhausted_count += 1);
    }
}

/// Drives the acquisition loop across all registered devices.
pub struct PollScheduler<L> {
    registry: Arc<Registry>,
    windows: Arc<WindowStore>,
    link: L,
    config: PollConfig,
    stats: Arc<PollStats>,
}

impl<L> std::fmt::Debug for PollScheduler<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollScheduler")
            .field("devices", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<L: DeviceLink + 'static> PollScheduler<L> {
    pub fn new(
        registry: Arc<Registry>,
        windows: Arc<WindowStore>,
        link: L,
        config: PollConfig,
    ) -> Self {
        let stats = Arc::new(PollStats::new(&registry));
        Self {
            registry,
            windows,
            link,
            config,
            stats,
        }
    }

    /// Record statistics into an existing handle instead of a private one.
    #[must_use]
    pub fn with_stats(mut self, stats: Arc<PollStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Handle to the statistics this scheduler updates.
    pub fn stats(&self) -> Arc<PollStats> {
        Arc::clone(&self.stats)
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Spend up to `attempts` reads on one device and store the first valid one.
    ///
    /// # Errors
    ///
    /// Only [`Error::UnknownDevice`], when `device` is not part of the
    /// scheduler's registry. Read failures are reported through
    /// [`AcquireOutcome::Exhausted`].
    pub async fn acquire(&self, device: &DeviceRegistration) -> Result<AcquireOutcome> {
        // Fail before touching the radio.
        self.windows.len(&device.address)?;

        let attempts = self.config.attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let result = self
                .link
                .read(&device.address, device.device_type)
                .await
                .and_then(validate);

            match result {
                Ok(reading) => {
                    let value = reading.rounded(self.config.unit);
                    self.windows.append(&device.address, value)?;
                    self.stats.record_success(&device.address);
                    return Ok(AcquireOutcome::Recorded { value, attempt });
                }
                Err(e) => {
                    info!(
                        "Attempt {} failed for {} ({}): {}",
                        attempt, device.name, device.address, e
                    );
                    self.stats.record_failure(&device.address, &e);
                    last_error = Some(e);
                }
            }
        }

        self.stats.record_exhausted(&device.address);
        Ok(AcquireOutcome::Exhausted {
            attempts,
            last_error: last_error.unwrap_or_else(|| Error::DeviceNotFound(device.address.clone())),
        })
    }

    /// Attempt every registered device once.
    pub async fn run_round(&self, round: u32) -> RoundSummary {
        let mut summary = RoundSummary::default();

        for device in self.registry.iter() {
            match self.acquire(device).await {
                Ok(AcquireOutcome::Recorded { value, attempt }) => {
                    summary.recorded += 1;
                    let previous = self.windows.previous(&device.address).unwrap_or_default();
                    info!(
                        "Round {}: radon of {} ({}) on try #{} is {} {} (previous {})",
                        round, device.name, device.address, attempt, value, self.config.unit,
                        previous
                    );
                }
                Ok(AcquireOutcome::Exhausted {
                    attempts,
                    last_error,
                }) => {
                    summary.exhausted += 1;
                    warn!(
                        "Round {}: no reading from {} ({}) after {} attempts, last error: {}",
                        round, device.name, device.address, attempts, last_error
                    );
                }
                Err(e) => {
                    summary.exhausted += 1;
                    error!("Round {}: {}", round, e);
                }
            }
        }

        summary
    }

    /// Poll forever, or until `stop` turns `true`.
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        info!(
            "Starting measurement loop for {} device(s), {} rounds per cycle, {:?} between rounds",
            self.registry.len(),
            self.config.rounds_per_cycle,
            self.config.round_interval
        );

        let rounds = self.config.rounds_per_cycle.max(1);
        let mut cycle: u64 = 0;

        loop {
            for round in 0..rounds {
                if *stop.borrow() {
                    info!("Measurement loop stopped");
                    return;
                }

                let summary = self.run_round(round).await;
                debug!(
                    "Cycle {} round {} done: {} recorded, {} without reading",
                    cycle, round, summary.recorded, summary.exhausted
                );

                if self.pause(&mut stop).await {
                    info!("Measurement loop stopped");
                    return;
                }
            }
            cycle += 1;
        }
    }

    /// Start [`run`](Self::run) on the tokio runtime.
    pub fn spawn(self, stop: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(stop))
    }

    /// Sleep for the round interval. Returns `true` if a stop was requested.
    async fn pause(&self, stop: &mut watch::Receiver<bool>) -> bool {
        let pause = sleep(self.config.round_interval);
        tokio::pin!(pause);

        loop {
            tokio::select! {
                _ = &mut pause => return false,
                changed = stop.changed() => {
                    if changed.is_err() {
                        // Sender gone: nobody can ask us to stop any more.
                        pause.as_mut().await;
                        return false;
                    }
                    if *stop.borrow() {
                        return true;
                    }
                }
            }
        }
    }
}
