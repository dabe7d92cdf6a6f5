//! Multicast event hooks attached to a timer
//!
//! Each event keeps an ordered list of callbacks. Registering never replaces
//! an earlier callback; firing an event calls every callback in registration
//! order, and an empty list is a no-op.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use super::Timer;

/// A callback receiving the timer that raised the event
pub type TimerCallback = Rc<dyn Fn(&Timer)>;

/// Events a timer can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerEvent {
    /// Timer committed to the live map
    Create,
    /// Timer is about to consume the elapsed time of a tick
    Update,
    /// One loop finished
    LoopComplete,
    /// The last loop finished; the timer is about to be removed
    AllLoopsFinished,
}

impl TimerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TimerEvent::Create => "create",
            TimerEvent::Update => "update",
            TimerEvent::LoopComplete => "loop_complete",
            TimerEvent::AllLoopsFinished => "all_loops_finished",
        }
    }
}

#[derive(Default)]
pub(crate) struct TimerHooks {
    create: Vec<TimerCallback>,
    update: Vec<TimerCallback>,
    loop_complete: Vec<TimerCallback>,
    all_loops_finished: Vec<TimerCallback>,
}

impl TimerHooks {
    fn list(&self, event: TimerEvent) -> &Vec<TimerCallback> {
        match event {
            TimerEvent::Create => &self.create,
            TimerEvent::Update => &self.update,
            TimerEvent::LoopComplete => &self.loop_complete,
            TimerEvent::AllLoopsFinished => &self.all_loops_finished,
        }
    }

    pub(crate) fn add(&mut self, event: TimerEvent, callback: TimerCallback) {
        match event {
            TimerEvent::Create => self.create.push(callback),
            TimerEvent::Update => self.update.push(callback),
            TimerEvent::LoopComplete => self.loop_complete.push(callback),
            TimerEvent::AllLoopsFinished => self.all_loops_finished.push(callback),
        }
    }

    /// Copy of the callback list, so callbacks may register more hooks
    /// while the event is being delivered.
    pub(crate) fn callbacks(&self, event: TimerEvent) -> Vec<TimerCallback> {
        self.list(event).clone()
    }

    pub(crate) fn count(&self, event: TimerEvent) -> usize {
        self.list(event).len()
    }
}

impl fmt::Debug for TimerHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHooks")
            .field("create", &self.create.len())
            .field("update", &self.update.len())
            .field("loop_complete", &self.loop_complete.len())
            .field("all_loops_finished", &self.all_loops_finished.len())
            .finish()
    }
}

/// Call each callback in order.
///
/// A panicking callback is logged and skipped so one broken listener cannot
/// stop the tick for every other timer.
pub(crate) fn invoke(callbacks: &[TimerCallback], timer: &Timer, event: TimerEvent) {
    for callback in callbacks {
        let result = panic::catch_unwind(AssertUnwindSafe(|| callback(timer)));
        if result.is_err() {
            tracing::error!(
                timer = %timer.id(),
                event = event.name(),
                "timer callback panicked"
            );
        }
    }
}
