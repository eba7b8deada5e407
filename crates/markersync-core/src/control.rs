//! Scheduler control state for runtime management.
//!
//! Shared between the tick scheduler and the operator API: pause, resume,
//! change the tick interval, and request a clean stop without restarting
//! the process.
//!
//! # Architecture
//!
//! Control fields are atomics so the scheduler reads them without locks.
//! Every mutation also bumps a [`watch`] generation counter, which is what
//! wakes the scheduler out of its interval wait.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};

use crate::config::MIN_TICK_INTERVAL_MS;

/// Why the scheduler stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// An operator (or the shutdown path) requested a stop.
    Requested,
    /// The control channel went away.
    ControlClosed,
}

/// Shared scheduler control state.
#[derive(Debug)]
pub struct SchedulerControl {
    /// Whether ticking is paused.
    paused: AtomicBool,

    /// Whether a stop has been requested.
    stop_requested: AtomicBool,

    /// Current tick interval in milliseconds (runtime-adjustable).
    tick_interval_ms: AtomicU64,

    /// Ticks run so far.
    ticks_run: AtomicU64,

    /// Bumped on every control change.
    generation: watch::Sender<u64>,

    /// Wall-clock time the scheduler was created.
    started_at: DateTime<Utc>,

    /// Reason the scheduler stopped, once it has.
    stop_reason: Mutex<Option<StopReason>>,
}

impl SchedulerControl {
    /// Create control state with the given interval.
    pub fn new(tick_interval: Duration) -> Self {
        let ms = u64::try_from(tick_interval.as_millis()).unwrap_or(u64::MAX);
        let (generation, _rx) = watch::channel(0);
        Self {
            paused: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            tick_interval_ms: AtomicU64::new(ms.max(MIN_TICK_INTERVAL_MS)),
            ticks_run: AtomicU64::new(0),
            generation,
            started_at: Utc::now(),
            stop_reason: Mutex::new(None),
        }
    }

    /// Subscribe to control changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    fn bump(&self) {
        self.generation.send_modify(|g| *g = g.wrapping_add(1));
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// Check whether ticking is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Pause. The tick in flight, if any, runs to completion.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
        self.bump();
    }

    /// Resume and wake the scheduler.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.bump();
    }

    /// Wait until not paused, or until a stop is requested.
    pub async fn wait_if_paused(&self) {
        let mut rx = self.subscribe();
        while self.is_paused() && !self.is_stop_requested() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Request a clean stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.bump();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Wait until a stop is requested.
    pub async fn stopped(&self) {
        let mut rx = self.subscribe();
        while !self.is_stop_requested() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    /// Record the reason the scheduler stopped.
    pub async fn set_stop_reason(&self, reason: StopReason) {
        let mut guard = self.stop_reason.lock().await;
        *guard = Some(reason);
    }

    /// The reason the scheduler stopped, if it has.
    pub async fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason.lock().await.clone()
    }

    // -----------------------------------------------------------------------
    // Tick interval
    // -----------------------------------------------------------------------

    /// Get the current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Acquire)
    }

    /// The current tick interval.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms())
    }

    /// Set the tick interval in milliseconds. Must be at least 100ms.
    ///
    /// Returns the previous interval on success, or `None` if the value was
    /// rejected.
    pub fn set_tick_interval_ms(&self, ms: u64) -> Option<u64> {
        if ms < MIN_TICK_INTERVAL_MS {
            return None;
        }
        let prev = self.tick_interval_ms.swap(ms, Ordering::AcqRel);
        self.bump();
        Some(prev)
    }

    // -----------------------------------------------------------------------
    // Counters
    // -----------------------------------------------------------------------

    /// Count one finished tick.
    pub fn record_tick(&self) {
        self.ticks_run.fetch_add(1, Ordering::AcqRel);
    }

    /// Ticks run so far.
    pub fn ticks_run(&self) -> u64 {
        self.ticks_run.load(Ordering::Acquire)
    }

    /// Wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Elapsed seconds since start.
    pub fn elapsed_seconds(&self) -> u64 {
        let elapsed = Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds();
        u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX)
    }

    /// Point-in-time status for the operator API.
    pub async fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            ticks_run: self.ticks_run(),
            paused: self.is_paused(),
            stop_requested: self.is_stop_requested(),
            tick_interval_ms: self.tick_interval_ms(),
            elapsed_seconds: self.elapsed_seconds(),
            stop_reason: self.stop_reason().await,
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

/// JSON-serializable scheduler status for the operator API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    /// Ticks run so far.
    pub ticks_run: u64,
    /// Whether ticking is paused.
    pub paused: bool,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Current tick interval in milliseconds.
    pub tick_interval_ms: u64,
    /// Elapsed wall-clock seconds since start.
    pub elapsed_seconds: u64,
    /// Why the scheduler stopped, if it has.
    pub stop_reason: Option<StopReason>,
    /// RFC 3339 timestamp of when the scheduler started.
    pub started_at: String,
}
