//! Timer registry
//!
//! Owns every live timer by id and drives them from a single tick.
//! Creates and deletes are queued and applied at the start of the next tick,
//! before any timer is updated, so the update pass always walks a stable map
//! and a create followed by a delete in the same tick cancels out.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use hourglass_types::{SchedulerConfig, TimerRecord, TimerSnapshot};
use indexmap::IndexMap;
use uuid::Uuid;

use super::deferred::DeferredQueue;
use super::error::TimerError;
use super::hooks::TimerEvent;
use super::timer::{Timer, TimerContext};
use crate::clock::{Clock, SystemClock, TickDelta};
use crate::context::SchedulerConfigExt;
use crate::storage::{self, FileStore, SnapshotStore, StorageError};

/// Queued change to the live map
enum PendingOp {
    Create(Timer),
    Delete(Timer),
}

impl PendingOp {
    fn is_create_of(&self, id: &str) -> bool {
        matches!(self, PendingOp::Create(timer) if timer.id() == id)
    }

    fn is_delete_of(&self, timer: &Timer) -> bool {
        matches!(self, PendingOp::Delete(queued) if queued.same_timer(timer))
    }
}

/// Outcome of one registry tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Ids committed to the live map this tick
    pub committed: Vec<String>,
    /// Ids removed from the live map this tick
    pub removed: Vec<String>,
    /// Number of timers that consumed the tick (idle ready timers excluded)
    pub updated: usize,
    /// Rejected queue entries (already logged)
    pub errors: Vec<TimerError>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Owns the live timers and applies queued operations once per tick
pub struct TimerRegistry {
    timers: IndexMap<String, Timer>,
    pending: VecDeque<PendingOp>,
    deferred: DeferredQueue,
    clock: Box<dyn Clock>,
    store: Box<dyn SnapshotStore>,
    snapshot_key: String,
}

impl TimerRegistry {
    /// Registry on the system clock, saving into `store`
    pub fn new(store: impl SnapshotStore + 'static) -> Self {
        Self {
            timers: IndexMap::new(),
            pending: VecDeque::new(),
            deferred: DeferredQueue::new(),
            clock: Box::new(SystemClock),
            store: Box::new(store),
            snapshot_key: SchedulerConfig::default().snapshot_key,
        }
    }

    /// Registry backed by a file store at the configured location
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(FileStore::new(config.store_directory()))
            .with_snapshot_key(config.snapshot_key.clone())
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_snapshot_key(mut self, key: impl Into<String>) -> Self {
        self.snapshot_key = key.into();
        self
    }

    // ─── Queue Operations ───────────────────────────────────────────────────

    /// Queue a new timer. A missing or empty id gets a fresh UUID.
    ///
    /// The returned handle can be configured right away; the timer goes live
    /// (on_create, then start) on the next tick.
    pub fn create(&mut self, id: Option<&str>) -> Timer {
        let id = match id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        let timer = Timer::new(id);
        self.pending.push_back(PendingOp::Create(timer.clone()));
        timer
    }

    /// Queue a timer configured from `record`.
    ///
    /// Id precedence: explicit `id`, then the record's id, then a fresh one.
    pub fn create_from_record(&mut self, record: &TimerRecord, id: Option<&str>) -> Timer {
        let id = id
            .filter(|id| !id.is_empty())
            .or_else(|| Some(record.id.as_str()).filter(|id| !id.is_empty()));
        let timer = self.create(id);
        timer.apply_record(record);
        timer
    }

    /// Queue removal of a timer.
    ///
    /// A timer that is still waiting to be committed is cancelled in place
    /// and never goes live.
    pub fn delete(&mut self, id: &str) -> Result<(), TimerError> {
        if let Some(timer) = self.timers.get(id) {
            self.pending.push_back(PendingOp::Delete(timer.clone()));
            return Ok(());
        }

        match self.pending.iter().position(|op| op.is_create_of(id)) {
            Some(index) => {
                self.pending.remove(index);
                tracing::debug!(timer = id, "cancelled pending timer before commit");
                Ok(())
            }
            None => {
                let err = TimerError::NotFound { id: id.to_string() };
                tracing::error!(error = %err, "delete timer failed");
                Err(err)
            }
        }
    }

    pub fn delete_timer(&mut self, timer: &Timer) -> Result<(), TimerError> {
        self.delete(timer.id())
    }

    // ─── Lookup ─────────────────────────────────────────────────────────────

    /// Find a timer by id: live timers first, then timers waiting to commit
    pub fn get(&self, id: &str) -> Option<Timer> {
        self.timers.get(id).cloned().or_else(|| {
            self.pending.iter().find_map(|op| match op {
                PendingOp::Create(timer) if timer.id() == id => Some(timer.clone()),
                _ => None,
            })
        })
    }

    pub fn get_or_create(&mut self, id: &str) -> Timer {
        match self.get(id) {
            Some(timer) => timer,
            None => self.create(Some(id)),
        }
    }

    /// Like `get_or_create`, but only creates when `condition` holds
    pub fn get_or_create_if(&mut self, id: &str, condition: bool) -> Option<Timer> {
        match self.get(id) {
            Some(timer) => Some(timer),
            None if condition => Some(self.create(Some(id))),
            None => None,
        }
    }

    /// Re-arm a timer immediately, bypassing the queue.
    ///
    /// Returns `Ok(false)` when `check_ready` is set and the timer is still
    /// counting down.
    pub fn restart(&mut self, id: &str, check_ready: bool) -> Result<bool, TimerError> {
        match self.get(id) {
            Some(timer) => Ok(self.restart_timer(&timer, check_ready)),
            None => {
                let err = TimerError::NotFound { id: id.to_string() };
                tracing::error!(error = %err, "restart timer failed");
                Err(err)
            }
        }
    }

    pub fn restart_timer(&self, timer: &Timer, check_ready: bool) -> bool {
        if check_ready && !timer.is_ready() {
            return false;
        }
        timer.start(self.clock.now());
        true
    }

    /// Schedule a callback after `ticks` future ticks
    pub fn run_after(&mut self, ticks: u64, callback: impl FnOnce() + 'static) {
        self.deferred.run_after(ticks, callback);
    }

    // ─── Tick ───────────────────────────────────────────────────────────────

    /// Advance every live timer by one step.
    ///
    /// 1. Apply queued creates/deletes in order
    /// 2. Update each live timer in insertion order
    /// 3. Queue removal of timers that finished their last loop
    /// 4. Run deferred callbacks that are now due
    pub fn tick(&mut self, delta: TickDelta) -> TickReport {
        self.deferred.begin_tick();
        let now = self.clock.now();
        let mut report = TickReport::default();

        self.apply_pending(now, &mut report);

        let mut finished = Vec::new();
        let mut ctx = TimerContext {
            now,
            deferred: &mut self.deferred,
            finished: &mut finished,
        };
        report.updated = self
            .timers
            .values()
            .filter(|timer| timer.tick(delta, &mut ctx))
            .count();
        self.request_removal(finished);

        for callback in self.deferred.take_due() {
            if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
                tracing::error!("deferred callback panicked");
            }
        }

        report
    }

    fn apply_pending(&mut self, now: chrono::DateTime<chrono::Utc>, report: &mut TickReport) {
        while let Some(op) = self.pending.pop_front() {
            match op {
                PendingOp::Create(timer) => {
                    if self.timers.contains_key(timer.id()) {
                        let err = TimerError::DuplicateId {
                            id: timer.id().to_string(),
                        };
                        tracing::error!(error = %err, "add timer failed");
                        report.errors.push(err);
                        continue;
                    }
                    self.timers.insert(timer.id().to_string(), timer.clone());
                    timer.emit(TimerEvent::Create);
                    timer.start(now);
                    tracing::debug!(timer = timer.id(), "timer committed");
                    report.committed.push(timer.id().to_string());
                }
                PendingOp::Delete(timer) => {
                    if self.timers.shift_remove(timer.id()).is_some() {
                        tracing::debug!(timer = timer.id(), "timer removed");
                        report.removed.push(timer.id().to_string());
                    } else {
                        let err = TimerError::NotFound {
                            id: timer.id().to_string(),
                        };
                        tracing::error!(error = %err, "delete timer failed");
                        report.errors.push(err);
                    }
                }
            }
        }
    }

    /// Queue deletion of finished timers for the next drain
    fn request_removal(&mut self, finished: Vec<Timer>) {
        for timer in finished {
            if !self.pending.iter().any(|op| op.is_delete_of(&timer)) {
                self.pending.push_back(PendingOp::Delete(timer));
            }
        }
    }

    // ─── Persistence ────────────────────────────────────────────────────────

    /// Write every live persistent timer to the store.
    /// Returns the number of timers saved.
    pub fn save(&mut self) -> Result<usize, StorageError> {
        let snapshot = TimerSnapshot {
            timers: self
                .timers
                .values()
                .filter(|timer| timer.is_persistent())
                .map(Timer::record)
                .collect(),
        };
        let blob = storage::encode_snapshot(&snapshot)?;
        self.store.save_blob(&self.snapshot_key, &blob)?;

        tracing::info!(
            key = %self.snapshot_key,
            count = snapshot.timers.len(),
            "saved timer snapshot"
        );
        Ok(snapshot.timers.len())
    }

    /// Restore timers from the store and replay the time spent away.
    ///
    /// Live timers with a saved id are replayed in place; the rest are
    /// rebuilt from their records and go live immediately, without
    /// on_create or a fresh start. Returns the number of records read.
    pub fn load(&mut self) -> Result<usize, StorageError> {
        let Some(blob) = self.store.load_blob(&self.snapshot_key)? else {
            tracing::debug!(key = %self.snapshot_key, "no timer snapshot to load");
            return Ok(0);
        };
        let snapshot = storage::decode_snapshot(&blob)?;
        let count = snapshot.timers.len();

        let mut finished = Vec::new();
        let mut ctx = TimerContext {
            now: self.clock.now(),
            deferred: &mut self.deferred,
            finished: &mut finished,
        };
        for record in snapshot.timers {
            if record.id.is_empty() {
                tracing::warn!("skipping saved timer without id");
                continue;
            }
            let timer = match self.timers.get(&record.id) {
                Some(live) => live.clone(),
                None => {
                    let timer = Timer::from_record(record);
                    self.timers.insert(timer.id().to_string(), timer.clone());
                    timer
                }
            };
            timer.replay(&mut ctx);
        }
        self.request_removal(finished);

        tracing::info!(key = %self.snapshot_key, count, "loaded timer snapshot");
        Ok(count)
    }

    // ─── Introspection ──────────────────────────────────────────────────────

    /// Number of live timers
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// True if `id` is live (queued timers do not count)
    pub fn contains(&self, id: &str) -> bool {
        self.timers.contains_key(id)
    }

    /// Number of queued creates/deletes
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Live timers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Timer> {
        self.timers.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.timers.keys().map(String::as_str)
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub fn snapshot_key(&self) -> &str {
        &self.snapshot_key
    }
}

impl fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("timers", &self.timers.keys().collect::<Vec<_>>())
            .field("pending", &self.pending.len())
            .field("deferred", &self.deferred)
            .field("snapshot_key", &self.snapshot_key)
            .finish()
    }
}
