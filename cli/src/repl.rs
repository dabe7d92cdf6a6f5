//! Line parsing for the interactive prompt
//!
//! Each input line is split with shell quoting rules and parsed as if it
//! were a command line, so `create --id "tea break" -d 180` works as typed.

use clap::{Parser, Subcommand};
use std::io::Write;

#[derive(Parser, Debug)]
#[command(version, about = "hourglass")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Queue a new countdown timer
    Create {
        #[arg(short, long)]
        id: Option<String>,
        /// Length of one loop in seconds
        #[arg(short, long)]
        duration: f64,
        /// Number of loops, -1 for infinite
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        loops: i32,
        #[arg(long)]
        auto_next: bool,
        #[arg(long)]
        persistent: bool,
        #[arg(long)]
        init_available: bool,
        /// Count down in real time regardless of the time scale
        #[arg(long)]
        realtime: bool,
        /// Replay loops that elapsed while suspended
        #[arg(long)]
        count_overflow: bool,
    },
    Delete {
        id: String,
    },
    Restart {
        id: String,
        /// Only restart a timer that has reached zero
        #[arg(long)]
        check_ready: bool,
    },
    List,
    Show {
        id: String,
    },
    /// Save persistent timers
    Suspend,
    /// Load saved timers and replay the time spent away
    Resume,
    /// Set the logical time scale (0 pauses)
    Scale {
        value: f64,
    },
    Config,
    Exit,
}

/// Parse one prompt line. Returns `Ok(None)` for a blank line.
pub fn parse_line(line: &str) -> Result<Option<Commands>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "hourglass".to_string());
    let cli = Cli::try_parse_from(args).map_err(|e| e.to_string())?;
    Ok(cli.command)
}

pub fn prompt() -> Result<(), String> {
    let mut stdout = std::io::stdout();
    write!(stdout, "> ").map_err(|e| e.to_string())?;
    stdout.flush().map_err(|e| e.to_string())
}
