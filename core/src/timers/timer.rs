//! Countdown timer state machine
//!
//! A `Timer` is a shared handle to one countdown. Cloning the handle does not
//! copy the timer: the handle returned by `TimerRegistry::create` configures
//! the same object the registry commits on its next tick.
//!
//! # Lifecycle
//!
//! 1. `start` arms the timer: remaining = duration (or 0 if init-available)
//! 2. Every tick subtracts elapsed time from the remaining time
//! 3. Reaching zero completes a loop → rearm (auto-next) or wait for restart
//! 4. Completing the last loop asks the registry to remove the timer

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use hourglass_types::TimerRecord;

use super::deferred::DeferredQueue;
use super::hooks::{self, TimerCallback, TimerEvent, TimerHooks};
use crate::clock::TickDelta;

/// Background loop count above which a replay is logged as suspicious
const REPLAY_WARN_LOOPS: f64 = 10_000.0;

/// What a timer needs from its registry while it changes state
pub(crate) struct TimerContext<'a> {
    pub now: DateTime<Utc>,
    pub deferred: &'a mut DeferredQueue,
    /// Timers that completed their last loop and must be removed
    pub finished: &'a mut Vec<Timer>,
}

#[derive(Debug)]
struct TimerState {
    record: TimerRecord,
    /// Seconds left in the current loop (not persisted)
    remaining: f64,
}

struct TimerInner {
    id: String,
    state: RefCell<TimerState>,
    hooks: RefCell<TimerHooks>,
}

/// Handle to a countdown timer
#[derive(Clone)]
pub struct Timer {
    inner: Rc<TimerInner>,
}

impl Timer {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self::from_record(TimerRecord::new(id))
    }

    /// Rebuild a timer from saved state. Remaining time starts at zero until
    /// the timer is armed or replayed.
    pub(crate) fn from_record(record: TimerRecord) -> Self {
        Self {
            inner: Rc::new(TimerInner {
                id: record.id.clone(),
                state: RefCell::new(TimerState {
                    record,
                    remaining: 0.0,
                }),
                hooks: RefCell::new(TimerHooks::default()),
            }),
        }
    }

    // ─── Read Surface ───────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn is_ready(&self) -> bool {
        self.inner.state.borrow().record.is_ready
    }

    /// Seconds left in the current loop
    pub fn remaining(&self) -> f64 {
        self.inner.state.borrow().remaining
    }

    /// Remaining time as `HH:MM:SS`
    pub fn remaining_hms(&self) -> String {
        format_hms(self.remaining())
    }

    /// Remaining time as `MM:SS` (minutes not wrapped at the hour)
    pub fn remaining_ms(&self) -> String {
        format_ms(self.remaining())
    }

    /// Remaining time as `HH:MM`
    pub fn remaining_hm(&self) -> String {
        format_hm(self.remaining())
    }

    pub fn duration(&self) -> f64 {
        self.inner.state.borrow().record.duration
    }

    pub fn loop_times(&self) -> i32 {
        self.inner.state.borrow().record.loop_times
    }

    pub fn is_persistent(&self) -> bool {
        self.inner.state.borrow().record.persistent
    }

    pub fn auto_next(&self) -> bool {
        self.inner.state.borrow().record.auto_next
    }

    pub fn init_available(&self) -> bool {
        self.inner.state.borrow().record.init_available
    }

    pub fn realtime_update(&self) -> bool {
        self.inner.state.borrow().record.realtime_update
    }

    pub fn count_time_overflow_in_background(&self) -> bool {
        self.inner
            .state
            .borrow()
            .record
            .count_time_overflow_in_background
    }

    pub fn start_epoch(&self) -> DateTime<Utc> {
        self.inner.state.borrow().record.start_epoch
    }

    /// Copy of the persistable state
    pub fn record(&self) -> TimerRecord {
        self.inner.state.borrow().record.clone()
    }

    /// Number of callbacks registered for an event
    pub fn hook_count(&self, event: TimerEvent) -> usize {
        self.inner.hooks.borrow().count(event)
    }

    /// True if both handles point at the same timer
    pub fn same_timer(&self, other: &Timer) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ─── Configuration ──────────────────────────────────────────────────────

    fn configure(&self, apply: impl FnOnce(&mut TimerRecord)) -> &Self {
        apply(&mut self.inner.state.borrow_mut().record);
        self
    }

    pub fn set_duration(&self, secs: f64) -> &Self {
        self.configure(|r| r.duration = secs)
    }

    pub fn set_loop_times(&self, loop_times: i32) -> &Self {
        self.configure(|r| r.loop_times = loop_times)
    }

    pub fn set_realtime_update(&self, realtime: bool) -> &Self {
        self.configure(|r| r.realtime_update = realtime)
    }

    pub fn set_persistent(&self, persistent: bool) -> &Self {
        self.configure(|r| r.persistent = persistent)
    }

    pub fn set_init_available(&self, init_available: bool) -> &Self {
        self.configure(|r| r.init_available = init_available)
    }

    pub fn set_auto_next(&self, auto_next: bool) -> &Self {
        self.configure(|r| r.auto_next = auto_next)
    }

    pub fn set_count_time_overflow_in_background(&self, count: bool) -> &Self {
        self.configure(|r| r.count_time_overflow_in_background = count)
    }

    /// Copy every configuration field of `record` except the id.
    pub fn apply_record(&self, record: &TimerRecord) -> &Self {
        self.configure(|r| {
            let id = std::mem::take(&mut r.id);
            *r = TimerRecord {
                id,
                ..record.clone()
            };
        })
    }

    // ─── Hooks ──────────────────────────────────────────────────────────────

    pub fn add_hook(&self, event: TimerEvent, callback: TimerCallback) -> &Self {
        self.inner.hooks.borrow_mut().add(event, callback);
        self
    }

    pub fn on_create(&self, callback: impl Fn(&Timer) + 'static) -> &Self {
        self.add_hook(TimerEvent::Create, Rc::new(callback))
    }

    pub fn on_update(&self, callback: impl Fn(&Timer) + 'static) -> &Self {
        self.add_hook(TimerEvent::Update, Rc::new(callback))
    }

    pub fn on_loop_complete(&self, callback: impl Fn(&Timer) + 'static) -> &Self {
        self.add_hook(TimerEvent::LoopComplete, Rc::new(callback))
    }

    pub fn on_all_loops_finished(&self, callback: impl Fn(&Timer) + 'static) -> &Self {
        self.add_hook(TimerEvent::AllLoopsFinished, Rc::new(callback))
    }

    /// Fire an event now. No state borrow is held while callbacks run.
    pub(crate) fn emit(&self, event: TimerEvent) {
        let callbacks = self.inner.hooks.borrow().callbacks(event);
        hooks::invoke(&callbacks, self, event);
    }

    fn emit_maybe_deferred(&self, event: TimerEvent, delayed: bool, ctx: &mut TimerContext<'_>) {
        if delayed {
            let timer = self.clone();
            ctx.deferred.run_after(1, move || timer.emit(event));
        } else {
            self.emit(event);
        }
    }

    // ─── State Machine ──────────────────────────────────────────────────────

    /// Arm the timer for a new loop
    pub(crate) fn start(&self, now: DateTime<Utc>) {
        let mut state = self.inner.state.borrow_mut();
        if state.record.duration <= 0.0 {
            tracing::warn!(
                timer = %self.inner.id,
                duration = state.record.duration,
                "timer duration should be positive"
            );
        }

        if state.record.init_available {
            state.record.is_ready = true;
            state.remaining = 0.0;
            state.record.init_available = false;
        } else {
            state.record.is_ready = false;
            state.remaining = state.record.duration;
        }
        state.record.start_epoch = now;
    }

    /// Advance by one tick. Returns false if the timer sat idle.
    pub(crate) fn tick(&self, delta: TickDelta, ctx: &mut TimerContext<'_>) -> bool {
        let (ready, auto_next) = {
            let state = self.inner.state.borrow();
            (state.record.is_ready, state.record.auto_next)
        };
        if ready {
            if !auto_next {
                return false;
            }
            // The fresh loop consumes this tick's elapsed time as well
            self.start(ctx.now);
        }

        self.emit(TimerEvent::Update);

        let expired = {
            let mut state = self.inner.state.borrow_mut();
            let elapsed = if state.record.realtime_update {
                delta.real
            } else {
                delta.logical
            };
            state.remaining -= elapsed;
            state.remaining <= 0.0
        };
        if expired {
            self.loop_complete(false, true, ctx);
        }
        true
    }

    /// Close the current loop. Returns true if that was the last loop.
    fn loop_complete(&self, delayed: bool, rearm: bool, ctx: &mut TimerContext<'_>) -> bool {
        {
            let mut state = self.inner.state.borrow_mut();
            state.record.is_ready = true;
            state.remaining = state.remaining.max(0.0);
            if !state.record.is_infinite() {
                state.record.loop_times -= 1;
            }
        }

        self.emit_maybe_deferred(TimerEvent::LoopComplete, delayed, ctx);

        let (finished, auto_next) = {
            let state = self.inner.state.borrow();
            (state.record.is_finished(), state.record.auto_next)
        };
        if finished {
            self.all_loops_finished(delayed, ctx);
            return true;
        }
        if auto_next && rearm {
            self.start(ctx.now);
        }
        false
    }

    fn all_loops_finished(&self, delayed: bool, ctx: &mut TimerContext<'_>) {
        tracing::debug!(timer = %self.inner.id, "all loops finished");
        self.emit_maybe_deferred(TimerEvent::AllLoopsFinished, delayed, ctx);
        ctx.finished.push(self.clone());
    }

    /// Reconstruct the loops that elapsed since the timer was last armed.
    ///
    /// Events raised here are delivered one tick later so listeners attached
    /// after a load still receive them.
    pub(crate) fn replay(&self, ctx: &mut TimerContext<'_>) {
        let (auto_next, count_overflow, duration, start_epoch, ready) = {
            let state = self.inner.state.borrow();
            let r = &state.record;
            (
                r.auto_next,
                r.count_time_overflow_in_background,
                r.duration,
                r.start_epoch,
                r.is_ready,
            )
        };
        let elapsed_ms = (ctx.now - start_epoch).num_milliseconds().max(0);
        let mut elapsed = elapsed_ms as f64 / 1000.0;

        if auto_next && count_overflow {
            if duration <= 0.0 {
                tracing::warn!(
                    timer = %self.inner.id,
                    duration,
                    "skipping loop replay for timer without positive duration"
                );
                return;
            }

            let backlog = (elapsed / duration).floor();
            if backlog > REPLAY_WARN_LOOPS {
                tracing::warn!(
                    timer = %self.inner.id,
                    loops = backlog,
                    duration,
                    "replaying a large number of background loops"
                );
            }

            // The timer stays ready; the next tick rearms it through auto-next
            let mut replayed = 0u32;
            let mut finished = false;
            while elapsed >= duration {
                elapsed -= duration;
                replayed += 1;
                // Finished timers are already queued for removal
                if self.loop_complete(true, false, ctx) {
                    finished = true;
                    break;
                }
            }

            let mut state = self.inner.state.borrow_mut();
            state.remaining = if finished { 0.0 } else { duration - elapsed };
            tracing::debug!(
                timer = %self.inner.id,
                replayed,
                remaining = state.remaining,
                "replayed background loops"
            );
        } else if !ready {
            let remaining = duration - elapsed;
            if remaining <= 0.0 {
                self.inner.state.borrow_mut().remaining = 0.0;
                self.loop_complete(true, true, ctx);
            } else {
                self.inner.state.borrow_mut().remaining = remaining;
            }
        }
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Timer")
            .field("record", &state.record)
            .field("remaining", &state.remaining)
            .field("hooks", &*self.inner.hooks.borrow())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Formatting
// ═══════════════════════════════════════════════════════════════════════════

/// Whole seconds, with negative or non-finite values shown as zero
fn whole_seconds(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    }
}

/// Format seconds as `HH:MM:SS`
pub fn format_hms(secs: f64) -> String {
    let total = whole_seconds(secs);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Format seconds as `MM:SS` using total minutes
pub fn format_ms(secs: f64) -> String {
    let total = whole_seconds(secs);
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// Format seconds as `HH:MM`
pub fn format_hm(secs: f64) -> String {
    let total = whole_seconds(secs);
    format!("{:02}:{:02}", total / 3600, (total % 3600) / 60)
}
