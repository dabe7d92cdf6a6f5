//! Tests for TimerRegistry lifecycle handling
//!
//! Verifies that:
//! - Queued creates/deletes are applied before timers update
//! - Loop accounting removes finished timers on the following tick
//! - Snapshots restore configuration and replay time spent suspended

use std::cell::Cell;
use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};

use super::{TickReport, Timer, TimerError, TimerEvent, TimerRegistry};
use crate::clock::{Clock, ManualClock, TickDelta};
use crate::storage::MemoryStore;
use hourglass_types::TimerRecord;

// ═══════════════════════════════════════════════════════════════════════════
// Test Helpers
// ═══════════════════════════════════════════════════════════════════════════

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
}

/// Registry on a manual clock, plus handles to its clock and store
fn make_registry() -> (TimerRegistry, ManualClock, MemoryStore) {
    let clock = ManualClock::new(epoch());
    let store = MemoryStore::new();
    let registry = TimerRegistry::new(store.clone()).with_clock(clock.clone());
    (registry, clock, store)
}

/// Second registry sharing the same clock and store (a restarted process)
fn reopen(clock: &ManualClock, store: &MemoryStore) -> TimerRegistry {
    TimerRegistry::new(store.clone()).with_clock(clock.clone())
}

/// Count how often an event fires on a timer
fn count(timer: &Timer, event: TimerEvent) -> Rc<Cell<u32>> {
    let fired = Rc::new(Cell::new(0));
    let counter = Rc::clone(&fired);
    timer.add_hook(event, Rc::new(move |_: &Timer| counter.set(counter.get() + 1)));
    fired
}

fn step(registry: &mut TimerRegistry, secs: f64) -> TickReport {
    registry.tick(TickDelta::uniform(secs))
}

// ═══════════════════════════════════════════════════════════════════════════
// Create / Delete Queue
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_create_goes_live_on_next_tick() {
    let (mut registry, _, _) = make_registry();

    let timer = registry.create(Some("brew"));
    timer.set_duration(30.0);
    let created = count(&timer, TimerEvent::Create);

    assert!(!registry.contains("brew"));
    assert_eq!(registry.pending_len(), 1);
    assert!(registry.get("brew").unwrap().same_timer(&timer));

    let report = step(&mut registry, 0.0);

    assert_eq!(report.committed, vec!["brew".to_string()]);
    assert!(registry.contains("brew"));
    assert_eq!(created.get(), 1);
    assert_eq!(timer.remaining(), 30.0);
    assert_eq!(timer.start_epoch(), epoch());
}

#[test]
fn test_create_without_id_generates_unique_ids() {
    let (mut registry, _, _) = make_registry();

    let first = registry.create(None);
    let second = registry.create(Some(""));

    assert!(uuid::Uuid::parse_str(first.id()).is_ok());
    assert!(uuid::Uuid::parse_str(second.id()).is_ok());
    assert_ne!(first.id(), second.id());
}

#[test]
fn test_same_tick_create_and_delete_cancel_out() {
    let (mut registry, _, _) = make_registry();

    let timer = registry.create(Some("flash"));
    timer.set_duration(5.0);
    let created = count(&timer, TimerEvent::Create);
    let updated = count(&timer, TimerEvent::Update);

    assert!(registry.delete("flash").is_ok());
    let report = step(&mut registry, 1.0);

    assert!(!registry.contains("flash"));
    assert!(registry.get("flash").is_none());
    assert_eq!(created.get(), 0);
    assert_eq!(updated.get(), 0);
    assert!(report.is_clean());
}

#[test]
fn test_duplicate_create_is_rejected() {
    let (mut registry, _, _) = make_registry();
    registry.create(Some("daily")).set_duration(5.0);
    step(&mut registry, 0.0);

    let duplicate = registry.create(Some("daily"));
    duplicate.set_duration(99.0);
    let duplicate_created = count(&duplicate, TimerEvent::Create);
    let report = step(&mut registry, 1.0);

    assert_eq!(
        report.errors,
        vec![TimerError::DuplicateId {
            id: "daily".to_string()
        }]
    );
    let live = registry.get("daily").unwrap();
    assert!(!live.same_timer(&duplicate));
    assert_eq!(live.duration(), 5.0);
    assert_eq!(live.remaining(), 4.0);
    assert_eq!(duplicate_created.get(), 0);
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_delete_unknown_id_is_reported() {
    let (mut registry, _, _) = make_registry();

    let err = registry.delete("ghost").unwrap_err();

    assert_eq!(err, TimerError::NotFound { id: "ghost".to_string() });
    assert_eq!(registry.pending_len(), 0);
}

#[test]
fn test_second_delete_reports_not_found_at_drain() {
    let (mut registry, _, _) = make_registry();
    registry.create(Some("a")).set_duration(5.0);
    step(&mut registry, 0.0);

    registry.delete("a").unwrap();
    registry.delete("a").unwrap();
    let report = step(&mut registry, 0.0);

    assert_eq!(report.removed, vec!["a".to_string()]);
    assert_eq!(report.errors, vec![TimerError::NotFound { id: "a".to_string() }]);
    assert!(registry.is_empty());
}

#[test]
fn test_deletes_apply_before_updates() {
    let (mut registry, _, _) = make_registry();
    let doomed = registry.create(Some("doomed"));
    doomed.set_duration(5.0);
    let updates = count(&doomed, TimerEvent::Update);
    registry.create(Some("survivor")).set_duration(5.0);

    step(&mut registry, 1.0);
    assert_eq!(updates.get(), 1);

    registry.delete_timer(&doomed).unwrap();
    let report = step(&mut registry, 1.0);

    assert_eq!(updates.get(), 1);
    assert_eq!(report.updated, 1);
    assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["survivor"]);
}

#[test]
fn test_update_order_follows_insertion() {
    let (mut registry, _, _) = make_registry();
    let order = Rc::new(std::cell::RefCell::new(Vec::new()));

    for id in ["c", "a", "b"] {
        let seen = Rc::clone(&order);
        registry
            .create(Some(id))
            .set_duration(10.0)
            .on_update(move |t| seen.borrow_mut().push(t.id().to_string()));
    }
    step(&mut registry, 1.0);

    assert_eq!(*order.borrow(), vec!["c", "a", "b"]);
}

// ═══════════════════════════════════════════════════════════════════════════
// Lookup / Restart
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_get_or_create_reuses_pending_timer() {
    let (mut registry, _, _) = make_registry();

    let first = registry.get_or_create("shared");
    let second = registry.get_or_create("shared");
    first.set_duration(3.0);

    assert!(first.same_timer(&second));
    assert_eq!(registry.pending_len(), 1);
    assert!(step(&mut registry, 0.0).is_clean());
}

#[test]
fn test_get_or_create_if_respects_condition() {
    let (mut registry, _, _) = make_registry();

    assert!(registry.get_or_create_if("maybe", false).is_none());
    assert_eq!(registry.pending_len(), 0);

    let created = registry.get_or_create_if("maybe", true).unwrap();
    assert_eq!(created.id(), "maybe");

    let found = registry.get_or_create_if("maybe", false).unwrap();
    assert!(found.same_timer(&created));
}

#[test]
fn test_create_from_record_id_precedence() {
    let (mut registry, _, _) = make_registry();
    let mut record = TimerRecord::new("from-record");
    record.duration = 7.0;
    record.loop_times = 2;
    record.auto_next = true;

    let by_record = registry.create_from_record(&record, None);
    let by_argument = registry.create_from_record(&record, Some("explicit"));
    record.id.clear();
    let generated = registry.create_from_record(&record, None);

    assert_eq!(by_record.id(), "from-record");
    assert_eq!(by_argument.id(), "explicit");
    assert!(uuid::Uuid::parse_str(generated.id()).is_ok());
    assert_eq!(by_argument.duration(), 7.0);
    assert_eq!(by_argument.loop_times(), 2);
    assert!(by_argument.auto_next());
}

#[test]
fn test_restart_with_ready_check() {
    let (mut registry, clock, _) = make_registry();
    let timer = registry.create(Some("cooldown"));
    timer.set_duration(10.0);
    step(&mut registry, 0.0);
    step(&mut registry, 3.0);
    assert_eq!(timer.remaining(), 7.0);

    assert_eq!(registry.restart("cooldown", true), Ok(false));
    assert_eq!(timer.remaining(), 7.0);

    clock.advance_secs(60.0);
    assert_eq!(registry.restart("cooldown", false), Ok(true));
    assert_eq!(timer.remaining(), 10.0);
    assert_eq!(timer.start_epoch(), epoch() + chrono::Duration::seconds(60));

    assert!(matches!(
        registry.restart("missing", false),
        Err(TimerError::NotFound { .. })
    ));
}

#[test]
fn test_init_available_timer_is_ready_on_commit() {
    let (mut registry, _, _) = make_registry();
    let timer = registry.create(Some("reward"));
    timer.set_duration(60.0).set_init_available(true);

    step(&mut registry, 0.0);
    assert!(timer.is_ready());
    assert_eq!(timer.remaining(), 0.0);
    assert!(!timer.init_available());

    // Without auto-next the timer idles until restarted
    step(&mut registry, 5.0);
    assert!(timer.is_ready());

    assert_eq!(registry.restart("reward", true), Ok(true));
    assert!(!timer.is_ready());
    assert_eq!(timer.remaining(), 60.0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Loop Accounting
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_single_loop_timer_finishes_and_is_removed() {
    let (mut registry, _, _) = make_registry();
    let timer = registry.create(Some("egg"));
    timer.set_duration(10.0).set_loop_times(1);
    let loops = count(&timer, TimerEvent::LoopComplete);
    let finished = count(&timer, TimerEvent::AllLoopsFinished);

    step(&mut registry, 0.0);
    assert_eq!(timer.remaining(), 10.0);

    step(&mut registry, 4.0);
    assert_eq!(timer.remaining(), 6.0);
    assert!(!timer.is_ready());

    step(&mut registry, 6.0);
    assert!(timer.is_ready());
    assert_eq!(timer.loop_times(), 0);
    assert_eq!(loops.get(), 1);
    assert_eq!(finished.get(), 1);
    // Removal waits for the next drain
    assert!(registry.contains("egg"));

    let report = step(&mut registry, 1.0);
    assert_eq!(report.removed, vec!["egg".to_string()]);
    assert!(!registry.contains("egg"));
    assert_eq!(finished.get(), 1);
}

#[test]
fn test_finite_auto_next_runs_exact_loop_count() {
    let (mut registry, _, _) = make_registry();
    let timer = registry.create(Some("wave"));
    timer.set_duration(2.0).set_loop_times(3).set_auto_next(true);
    let loops = count(&timer, TimerEvent::LoopComplete);
    let finished = count(&timer, TimerEvent::AllLoopsFinished);

    step(&mut registry, 0.0);
    for _ in 0..6 {
        step(&mut registry, 1.0);
    }

    assert_eq!(loops.get(), 3);
    assert_eq!(finished.get(), 1);

    step(&mut registry, 1.0);
    assert!(registry.is_empty());
    assert_eq!(loops.get(), 3);
    assert_eq!(finished.get(), 1);
}

#[test]
fn test_infinite_loops_rearm_forever() {
    let (mut registry, _, _) = make_registry();
    let timer = registry.create(Some("heartbeat"));
    timer
        .set_duration(1.0)
        .set_loop_times(crate::INFINITE_LOOPS)
        .set_auto_next(true);
    let loops = count(&timer, TimerEvent::LoopComplete);
    let finished = count(&timer, TimerEvent::AllLoopsFinished);

    step(&mut registry, 0.0);
    for _ in 0..200 {
        step(&mut registry, 1.0);
    }

    assert_eq!(loops.get(), 200);
    assert_eq!(finished.get(), 0);
    assert_eq!(timer.loop_times(), -1);
    assert!(registry.contains("heartbeat"));
}

#[test]
fn test_zero_loop_count_never_finishes() {
    let (mut registry, _, _) = make_registry();
    let timer = registry.create(Some("open-ended"));
    timer.set_duration(1.0).set_loop_times(0).set_auto_next(true);
    let finished = count(&timer, TimerEvent::AllLoopsFinished);

    step(&mut registry, 0.0);
    for _ in 0..3 {
        step(&mut registry, 1.0);
    }

    assert_eq!(timer.loop_times(), -1);
    assert_eq!(finished.get(), 0);
    assert!(registry.contains("open-ended"));
    assert_eq!(registry.pending_len(), 0);
}

#[test]
fn test_idle_ready_timers_are_not_counted_as_updated() {
    let (mut registry, _, _) = make_registry();
    registry
        .create(Some("claimable"))
        .set_duration(10.0)
        .set_init_available(true);
    registry.create(Some("running")).set_duration(10.0);

    let report = step(&mut registry, 1.0);

    assert_eq!(report.updated, 1);
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_realtime_timers_ignore_time_scale() {
    let (mut registry, _, _) = make_registry();
    let scaled = registry.create(Some("scaled"));
    scaled.set_duration(10.0);
    let realtime = registry.create(Some("realtime"));
    realtime.set_duration(10.0).set_realtime_update(true);
    step(&mut registry, 0.0);

    // Logical time paused
    registry.tick(TickDelta::new(2.0, 0.0));

    assert_eq!(scaled.remaining(), 10.0);
    assert_eq!(realtime.remaining(), 8.0);
}

#[test]
fn test_panicking_callback_does_not_block_other_timers() {
    let (mut registry, _, _) = make_registry();
    registry
        .create(Some("broken"))
        .set_duration(5.0)
        .on_update(|_| panic!("listener failure"));
    let healthy = registry.create(Some("healthy"));
    healthy.set_duration(5.0);
    let updates = count(&healthy, TimerEvent::Update);

    let report = step(&mut registry, 1.0);

    assert_eq!(report.updated, 2);
    assert_eq!(updates.get(), 1);
    assert_eq!(healthy.remaining(), 4.0);
}

#[test]
fn test_run_after_fires_on_later_tick() {
    let (mut registry, _, _) = make_registry();
    let fired = Rc::new(Cell::new(false));
    let flag = Rc::clone(&fired);

    registry.run_after(2, move || flag.set(true));

    step(&mut registry, 0.0);
    assert!(!fired.get());
    step(&mut registry, 0.0);
    assert!(fired.get());
}

// ═══════════════════════════════════════════════════════════════════════════
// Save / Load
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_load_without_snapshot_is_empty() {
    let (mut registry, _, _) = make_registry();
    assert_eq!(registry.load().unwrap(), 0);
    assert!(registry.is_empty());
}

#[test]
fn test_save_load_restores_configuration() {
    let (mut registry, clock, store) = make_registry();
    registry
        .create(Some("energy"))
        .set_duration(300.0)
        .set_loop_times(-1)
        .set_auto_next(true)
        .set_persistent(true)
        .set_count_time_overflow_in_background(true);
    registry
        .create(Some("chest"))
        .set_duration(3600.0)
        .set_loop_times(4)
        .set_init_available(true)
        .set_realtime_update(true)
        .set_persistent(true);
    registry
        .create(Some("scratch"))
        .set_duration(10.0)
        .set_persistent(false);
    step(&mut registry, 0.0);

    assert_eq!(registry.save().unwrap(), 2);
    assert_eq!(store.len(), 1);

    let mut restored = reopen(&clock, &store);
    assert_eq!(restored.load().unwrap(), 2);

    assert_eq!(restored.ids().collect::<Vec<_>>(), vec!["energy", "chest"]);
    for id in ["energy", "chest"] {
        let before = registry.get(id).unwrap().record();
        let after = restored.get(id).unwrap().record();
        assert_eq!(after.id, before.id);
        assert_eq!(after.duration, before.duration);
        assert_eq!(after.loop_times, before.loop_times);
        assert_eq!(after.init_available, before.init_available);
        assert_eq!(after.persistent, before.persistent);
        assert_eq!(after.auto_next, before.auto_next);
        assert_eq!(after.realtime_update, before.realtime_update);
        assert_eq!(
            after.count_time_overflow_in_background,
            before.count_time_overflow_in_background
        );
    }
    assert!(!restored.contains("scratch"));
}

#[test]
fn test_resume_replays_background_loops() {
    let (mut registry, clock, store) = make_registry();
    registry
        .create(Some("daily"))
        .set_duration(10.0)
        .set_loop_times(-1)
        .set_auto_next(true)
        .set_count_time_overflow_in_background(true)
        .set_persistent(true);
    step(&mut registry, 0.0);
    registry.save().unwrap();

    // Suspended for 2.5 loops
    clock.advance_secs(25.0);
    let mut restored = reopen(&clock, &store);
    restored.load().unwrap();

    let timer = restored.get("daily").unwrap();
    assert_eq!(timer.remaining(), 5.0);
    assert!(timer.is_ready());
    assert_eq!(timer.start_epoch(), epoch());

    // Listeners attached after the load still see the replayed loops
    let loops = count(&timer, TimerEvent::LoopComplete);
    assert_eq!(loops.get(), 0);

    // First tick rearms through auto-next and consumes its own delta
    step(&mut restored, 1.0);
    assert_eq!(loops.get(), 2);
    assert!(!timer.is_ready());
    assert_eq!(timer.remaining(), 9.0);
    assert_eq!(timer.start_epoch(), clock.now());

    step(&mut restored, 9.0);
    assert_eq!(loops.get(), 3);
    assert_eq!(timer.remaining(), 10.0);
}

#[test]
fn test_resume_finishes_exhausted_timer() {
    let (mut registry, clock, store) = make_registry();
    registry
        .create(Some("limited"))
        .set_duration(10.0)
        .set_loop_times(2)
        .set_auto_next(true)
        .set_count_time_overflow_in_background(true)
        .set_persistent(true);
    step(&mut registry, 0.0);
    registry.save().unwrap();

    clock.advance_secs(100.0);
    let mut restored = reopen(&clock, &store);
    restored.load().unwrap();

    let timer = restored.get("limited").unwrap();
    let loops = count(&timer, TimerEvent::LoopComplete);
    let finished = count(&timer, TimerEvent::AllLoopsFinished);
    assert_eq!(timer.loop_times(), 0);
    assert_eq!(restored.pending_len(), 1);

    let report = step(&mut restored, 0.0);

    assert_eq!(report.removed, vec!["limited".to_string()]);
    assert!(restored.is_empty());
    assert_eq!(loops.get(), 2);
    assert_eq!(finished.get(), 1);
}

#[test]
fn test_resume_without_overflow_completes_one_loop() {
    let (mut registry, clock, store) = make_registry();
    registry
        .create(Some("craft"))
        .set_duration(10.0)
        .set_loop_times(3)
        .set_auto_next(true)
        .set_persistent(true);
    step(&mut registry, 0.0);
    registry.save().unwrap();

    clock.advance_secs(45.0);
    let mut restored = reopen(&clock, &store);
    restored.load().unwrap();

    let timer = restored.get("craft").unwrap();
    let loops = count(&timer, TimerEvent::LoopComplete);
    // One collapsed loop, then an immediate rearm
    assert_eq!(timer.loop_times(), 2);
    assert!(!timer.is_ready());
    assert_eq!(timer.remaining(), 10.0);
    assert_eq!(timer.start_epoch(), clock.now());

    step(&mut restored, 0.0);
    assert_eq!(loops.get(), 1);
}

#[test]
fn test_resume_leaves_ready_timer_ready() {
    let (mut registry, clock, store) = make_registry();
    registry
        .create(Some("claim"))
        .set_duration(10.0)
        .set_init_available(true)
        .set_persistent(true);
    step(&mut registry, 0.0);
    registry.save().unwrap();

    clock.advance_secs(500.0);
    let mut restored = reopen(&clock, &store);
    restored.load().unwrap();

    let timer = restored.get("claim").unwrap();
    assert!(timer.is_ready());
    assert_eq!(timer.remaining(), 0.0);
    assert_eq!(restored.pending_len(), 0);
}

#[test]
fn test_load_replays_live_timer_in_place() {
    let (mut registry, clock, _) = make_registry();
    let timer = registry.create(Some("bread"));
    timer.set_duration(10.0).set_loop_times(5).set_persistent(true);
    step(&mut registry, 0.0);
    registry.save().unwrap();

    clock.advance_secs(4.0);
    assert_eq!(registry.load().unwrap(), 1);

    assert_eq!(registry.len(), 1);
    assert!(registry.get("bread").unwrap().same_timer(&timer));
    assert_eq!(timer.remaining(), 6.0);
}
