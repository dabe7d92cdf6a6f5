//! Time sources for the scheduler
//!
//! Two kinds of time drive the timers:
//! - **Wall time** (`Clock`): timestamps recorded when a timer is armed and
//!   compared on resume to reconstruct time spent suspended.
//! - **Frame deltas** (`FrameClock`): elapsed real and logical seconds handed
//!   to the registry once per tick.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};

/// Source of wall-clock timestamps
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can hand one clone to a registry
/// and keep another to advance it.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        self.now.set(time);
    }

    /// Move the clock forward by a (possibly fractional) number of seconds
    pub fn advance_secs(&self, secs: f64) {
        let delta = Duration::milliseconds((secs * 1000.0).round() as i64);
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Elapsed time for one tick, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickDelta {
    /// Unscaled time since the previous tick
    pub real: f64,
    /// Time since the previous tick after applying the time scale
    pub logical: f64,
}

impl TickDelta {
    pub fn new(real: f64, logical: f64) -> Self {
        Self { real, logical }
    }

    /// Same elapsed value for real and logical time
    pub fn uniform(secs: f64) -> Self {
        Self::new(secs, secs)
    }
}

/// Produces `TickDelta`s from a monotonic clock.
///
/// Logical time runs at `time_scale` times real time; a scale of 0 pauses
/// logical time while real time keeps flowing.
#[derive(Debug)]
pub struct FrameClock {
    last_frame: Instant,
    time_scale: f64,
}

impl FrameClock {
    pub fn new(time_scale: f64) -> Self {
        Self {
            last_frame: Instant::now(),
            time_scale: time_scale.max(0.0),
        }
    }

    /// Take the delta since the previous call (or since creation)
    pub fn advance(&mut self) -> TickDelta {
        let now = Instant::now();
        let real = now.duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;
        self.delta_for(real)
    }

    /// Scale an externally measured real delta
    pub fn delta_for(&self, real_secs: f64) -> TickDelta {
        TickDelta::new(real_secs, real_secs * self.time_scale)
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Negative scales are treated as 0
    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.max(0.0);
    }

    pub fn is_paused(&self) -> bool {
        self.time_scale == 0.0
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(1.0)
    }
}
