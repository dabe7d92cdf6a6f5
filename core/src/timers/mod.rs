//! Timer system
//!
//! This module provides:
//! - **Timers**: countdown state machines with loop accounting and hooks
//! - **Registry**: owner of every live timer, driven by one periodic tick
//! - **Deferred queue**: callbacks delayed by a number of ticks
//!
//! # Timer Flags
//!
//! Timers can be configured to:
//! - Rearm automatically after each loop (`auto_next`)
//! - Start out already elapsed (`init_available`)
//! - Count down in real instead of logical time (`realtime_update`)
//! - Survive restarts through snapshots (`persistent`)
//! - Replay loops missed while suspended (`count_time_overflow_in_background`)

mod deferred;
mod error;
mod hooks;
mod registry;
mod timer;

#[cfg(test)]
mod registry_tests;

pub use deferred::DeferredQueue;
pub use error::TimerError;
pub use hooks::{TimerCallback, TimerEvent};
pub use registry::{TickReport, TimerRegistry};
pub use timer::{Timer, format_hm, format_hms, format_ms};
