use hourglass_core::{SchedulerConfigExt, Timer};
use std::io::Write;

use crate::context::{CliContext, attach_console_hooks};

/// Options collected from the `create` command
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub id: Option<String>,
    pub duration: f64,
    pub loops: i32,
    pub auto_next: bool,
    pub persistent: bool,
    pub init_available: bool,
    pub realtime: bool,
    pub count_overflow: bool,
}

pub fn create(ctx: &mut CliContext, options: &CreateOptions) -> Timer {
    let timer = ctx.registry.create(options.id.as_deref());
    timer
        .set_duration(options.duration)
        .set_loop_times(options.loops)
        .set_auto_next(options.auto_next)
        .set_persistent(options.persistent)
        .set_init_available(options.init_available)
        .set_realtime_update(options.realtime)
        .set_count_time_overflow_in_background(options.count_overflow);
    attach_console_hooks(&timer);

    println!("queued timer {}", timer.id());
    timer
}

pub fn delete(ctx: &mut CliContext, id: &str) -> Result<(), String> {
    ctx.registry.delete(id).map_err(|e| e.to_string())?;
    println!("deleting timer {id}");
    Ok(())
}

pub fn restart(ctx: &mut CliContext, id: &str, check_ready: bool) -> Result<(), String> {
    if ctx.registry.restart(id, check_ready).map_err(|e| e.to_string())? {
        println!("restarted {id}");
    } else {
        println!("{id} is still counting down");
    }
    Ok(())
}

pub fn list(ctx: &CliContext) {
    if ctx.registry.is_empty() {
        println!("No timers running");
        return;
    }

    println!("{:<38} {:<10} {:<6} {:<6} Flags", "Id", "Remaining", "Loops", "Ready");
    println!("{}", "-".repeat(80));

    for timer in ctx.registry.iter() {
        let loops = if timer.loop_times() < 0 {
            "inf".to_string()
        } else {
            timer.loop_times().to_string()
        };
        println!(
            "{:<38} {:<10} {:<6} {:<6} {}",
            timer.id(),
            timer.remaining_hms(),
            loops,
            if timer.is_ready() { "yes" } else { "no" },
            flags(timer)
        );
    }
    if ctx.registry.pending_len() > 0 {
        println!("({} queued changes)", ctx.registry.pending_len());
    }
}

fn flags(timer: &Timer) -> String {
    let mut flags = Vec::new();
    if timer.auto_next() {
        flags.push("auto");
    }
    if timer.is_persistent() {
        flags.push("saved");
    }
    if timer.realtime_update() {
        flags.push("realtime");
    }
    if timer.count_time_overflow_in_background() {
        flags.push("overflow");
    }
    flags.join(",")
}

pub fn show(ctx: &CliContext, id: &str) -> Result<(), String> {
    let timer = ctx
        .registry
        .get(id)
        .ok_or_else(|| format!("no timer with id {id}"))?;
    let record = timer.record();

    println!("id:          {}", record.id);
    println!("live:        {}", ctx.registry.contains(id));
    println!("remaining:   {} ({:.1}s)", timer.remaining_hms(), timer.remaining());
    println!("duration:    {}s", record.duration);
    println!("loops left:  {}", record.loop_times);
    println!("ready:       {}", record.is_ready);
    println!(
        "started at:  {}",
        record
            .start_epoch
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
    );
    println!("flags:       {}", flags(&timer));
    Ok(())
}

pub fn suspend(ctx: &mut CliContext) -> Result<(), String> {
    let count = ctx.registry.save().map_err(|e| e.to_string())?;
    println!("saved {count} timers");
    Ok(())
}

pub fn resume(ctx: &mut CliContext) -> Result<(), String> {
    let count = ctx.restore()?;
    println!("loaded {count} timers");
    Ok(())
}

pub fn set_scale(ctx: &mut CliContext, value: f64) -> Result<(), String> {
    if !value.is_finite() {
        return Err(format!("invalid time scale {value}"));
    }
    ctx.clock.set_time_scale(value);
    if ctx.clock.is_paused() {
        println!("logical time paused");
    } else {
        println!("time scale set to {}", ctx.clock.time_scale());
    }
    Ok(())
}

pub fn show_config(ctx: &CliContext) {
    if let Ok(path) = hourglass_core::SchedulerConfig::config_path() {
        println!("config file:   {}", path.display());
    }
    println!("snapshot key:  {}", ctx.config.snapshot_key);
    println!("store:         {}", ctx.config.store_directory().display());
    println!("tick interval: {}ms", ctx.config.tick_interval_ms);
    println!("time scale:    {}", ctx.clock.time_scale());
    println!("save on exit:  {}", ctx.config.save_on_exit);
}

pub fn exit() -> Result<(), String> {
    let mut stdout = std::io::stdout();
    writeln!(stdout, "quitting...").map_err(|e| e.to_string())?;
    stdout.flush().map_err(|e| e.to_string())
}
