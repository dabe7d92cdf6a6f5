use hourglass_core::{
    FrameClock, SchedulerConfig, TickReport, Timer, TimerEvent, TimerRegistry,
};

/// Holds all state for the interactive scheduler.
///
/// The registry is single-threaded, so the context lives on the main task
/// and is handed to commands by `&mut`.
pub struct CliContext {
    pub config: SchedulerConfig,
    pub registry: TimerRegistry,
    pub clock: FrameClock,
}

impl CliContext {
    pub fn new(config: SchedulerConfig) -> Self {
        let registry = TimerRegistry::from_config(&config);
        Self::with_registry(config, registry)
    }

    /// Context around an existing registry (tests use a memory store)
    pub fn with_registry(config: SchedulerConfig, registry: TimerRegistry) -> Self {
        let clock = FrameClock::new(config.time_scale);
        Self {
            config,
            registry,
            clock,
        }
    }

    /// Advance every timer by the time since the previous tick
    pub fn tick(&mut self) -> TickReport {
        let delta = self.clock.advance();
        self.registry.tick(delta)
    }

    /// Load the saved snapshot and attach console hooks to restored timers
    pub fn restore(&mut self) -> Result<usize, String> {
        let count = self.registry.load().map_err(|e| e.to_string())?;
        for timer in self.registry.iter() {
            if timer.hook_count(TimerEvent::LoopComplete) == 0 {
                attach_console_hooks(timer);
            }
        }
        Ok(count)
    }

    /// Save the snapshot if the config asks for it
    pub fn shutdown(&mut self) {
        if !self.config.save_on_exit {
            tracing::info!("save_on_exit disabled, timers not saved");
            return;
        }
        match self.registry.save() {
            Ok(count) => tracing::info!(count, "timers saved on exit"),
            Err(err) => tracing::error!(error = %err, "failed to save timers on exit"),
        }
    }
}

/// Report loop progress through the log
pub fn attach_console_hooks(timer: &Timer) {
    timer
        .on_create(|t| tracing::info!(timer = t.id(), duration = t.duration(), "timer started"))
        .on_loop_complete(|t| {
            tracing::info!(
                timer = t.id(),
                loops_left = t.loop_times(),
                "loop complete"
            )
        })
        .on_all_loops_finished(|t| tracing::info!(timer = t.id(), "all loops finished"));
}
