//! Tick-counted deferral of callbacks
//!
//! `run_after(n, cb)` runs `cb` at the end of the n-th tick that starts after
//! the call. Callbacks due on the same tick run in the order they were
//! scheduled. Nothing here blocks: "waiting" is just a due tick number.

use std::fmt;

type DeferredCallback = Box<dyn FnOnce()>;

struct DeferredTask {
    due_tick: u64,
    callback: DeferredCallback,
}

/// Queue of callbacks waiting for a future tick boundary
#[derive(Default)]
pub struct DeferredQueue {
    /// Number of ticks begun so far
    current_tick: u64,
    tasks: Vec<DeferredTask>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `callback` to run after `ticks` future tick boundaries
    pub fn run_after(&mut self, ticks: u64, callback: impl FnOnce() + 'static) {
        self.tasks.push(DeferredTask {
            due_tick: self.current_tick + ticks,
            callback: Box::new(callback),
        });
    }

    /// Mark the start of a new tick
    pub(crate) fn begin_tick(&mut self) {
        self.current_tick += 1;
    }

    /// Remove and return every callback due by the current tick, in
    /// scheduling order.
    pub(crate) fn take_due(&mut self) -> Vec<DeferredCallback> {
        let current = self.current_tick;
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|task| task.due_tick <= current);
        self.tasks = waiting;
        due.into_iter().map(|task| task.callback).collect()
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("current_tick", &self.current_tick)
            .field("pending", &self.tasks.len())
            .finish()
    }
}
