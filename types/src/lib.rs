//! Shared record and configuration types for hourglass
//!
//! This crate contains the serializable types shared between the scheduler
//! core (hourglass-core) and its front ends (the `hourglass` CLI).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Timer Records
// ─────────────────────────────────────────────────────────────────────────────

/// Loop count value meaning "repeat forever".
pub const INFINITE_LOOPS: i32 = -1;

/// Persistable state of a single countdown timer.
///
/// The field order is the on-disk order of a snapshot entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerRecord {
    /// Unique key, immutable once the timer exists
    pub id: String,

    /// Seconds per loop. Must be positive to arm correctly.
    #[serde(default)]
    pub duration: f64,

    /// Remaining loops: -1 = infinite, 0 = finished, N = N loops left
    #[serde(default = "default_loop_times")]
    pub loop_times: i32,

    /// Treat the very first arming as already elapsed (one-shot)
    #[serde(default)]
    pub init_available: bool,

    /// Include this timer in save snapshots
    #[serde(default)]
    pub persistent: bool,

    /// Rearm automatically after a loop completes
    #[serde(default)]
    pub auto_next: bool,

    /// Count down with real (unscaled) time instead of logical time
    #[serde(default)]
    pub realtime_update: bool,

    /// Replay every whole loop that elapsed while suspended
    #[serde(default)]
    pub count_time_overflow_in_background: bool,

    /// When the timer was last armed
    #[serde(default)]
    pub start_epoch: DateTime<Utc>,

    /// Current loop has expired; waiting for rearm or teardown
    #[serde(default)]
    pub is_ready: bool,
}

impl TimerRecord {
    /// A record with default settings: one loop, no flags, zero duration.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            duration: 0.0,
            loop_times: default_loop_times(),
            init_available: false,
            persistent: false,
            auto_next: false,
            realtime_update: false,
            count_time_overflow_in_background: false,
            start_epoch: DateTime::<Utc>::default(),
            is_ready: false,
        }
    }

    /// Returns true if this timer never runs out of loops
    pub fn is_infinite(&self) -> bool {
        self.loop_times == INFINITE_LOOPS
    }

    /// Returns true if every configured loop has completed
    pub fn is_finished(&self) -> bool {
        self.loop_times == 0
    }
}

/// Ordered list of records written by a registry save.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    #[serde(default)]
    pub timers: Vec<TimerRecord>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Scheduler Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime configuration for a scheduler host (persisted with confy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Key the timer snapshot is stored under
    #[serde(default = "default_snapshot_key")]
    pub snapshot_key: String,

    /// Directory for snapshot files. Empty = platform data directory.
    #[serde(default)]
    pub store_directory: String,

    /// Interval between ticks of the driver loop
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Multiplier applied to real time to produce logical time (0 pauses)
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    /// Write a snapshot when the host shuts down
    #[serde(default = "default_true")]
    pub save_on_exit: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            snapshot_key: default_snapshot_key(),
            store_directory: String::new(),
            tick_interval_ms: default_tick_interval_ms(),
            time_scale: default_time_scale(),
            save_on_exit: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Serde Defaults
// ─────────────────────────────────────────────────────────────────────────────

fn default_loop_times() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_snapshot_key() -> String {
    "hourglass".to_string()
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_time_scale() -> f64 {
    1.0
}
