use hourglass_cli::commands::{self, CreateOptions};
use hourglass_cli::{CliContext, Commands, logging, parse_line, prompt};
use hourglass_core::{SchedulerConfig, SchedulerConfigExt};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

// Timers are single-threaded handles, so everything runs on one task.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), String> {
    let _log_guard = logging::init();

    let config = SchedulerConfig::load();
    let mut ctx = CliContext::new(config);
    match ctx.restore() {
        Ok(count) => tracing::info!(count, "restored saved timers"),
        Err(err) => tracing::error!(error = %err, "failed to restore saved timers"),
    }

    let mut ticker = tokio::time::interval(Duration::from_millis(ctx.config.tick_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt()?;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                ctx.tick();
            }
            line = lines.next_line() => {
                let Some(line) = line.map_err(|e| e.to_string())? else {
                    break;
                };
                match respond(&line, &mut ctx) {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(err) => println!("{err}"),
                }
                prompt()?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    ctx.shutdown();
    Ok(())
}

/// Run one prompt line. Returns true when the user asked to quit.
fn respond(line: &str, ctx: &mut CliContext) -> Result<bool, String> {
    let Some(command) = parse_line(line)? else {
        return Ok(false);
    };

    match command {
        Commands::Create {
            id,
            duration,
            loops,
            auto_next,
            persistent,
            init_available,
            realtime,
            count_overflow,
        } => {
            let options = CreateOptions {
                id,
                duration,
                loops,
                auto_next,
                persistent,
                init_available,
                realtime,
                count_overflow,
            };
            commands::create(ctx, &options);
        }
        Commands::Delete { id } => commands::delete(ctx, &id)?,
        Commands::Restart { id, check_ready } => commands::restart(ctx, &id, check_ready)?,
        Commands::List => commands::list(ctx),
        Commands::Show { id } => commands::show(ctx, &id)?,
        Commands::Suspend => commands::suspend(ctx)?,
        Commands::Resume => commands::resume(ctx)?,
        Commands::Scale { value } => commands::set_scale(ctx, value)?,
        Commands::Config => commands::show_config(ctx),
        Commands::Exit => {
            commands::exit()?;
            return Ok(true);
        }
    }
    Ok(false)
}
