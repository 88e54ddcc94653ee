use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "planner", version, about = "Terminal month planner with notes and emoji stickers")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Default)]
pub struct GlobalOpts {
    /// Directory holding the planner record (overrides config and lookup)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    /// Config file to read instead of the per-user one
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Log level: trace, debug, info, warn, error or off
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a project planner in the current directory
    Init,
    /// Print the month grid and weekly strip
    Show,
    /// Set the note of a cell (empty text clears it)
    Note {
        /// Day of the month, or a weekday (mon..sun) for the weekly strip
        target: String,
        /// Note text
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Drop an emoji on a cell
    Emoji {
        /// Day of the month, or a weekday (mon..sun) for the weekly strip
        target: String,
        /// Glyph to drop
        glyph: String,
    },
    /// Switch the calendar theme
    Theme {
        /// default, spring, sunset, midnight, mint, rose, dusk or charcoal
        name: String,
    },
    /// Regenerate the month grid (month notes and emojis are discarded)
    Month {
        /// Weekday of day 1, 0 = Monday .. 6 = Sunday
        #[arg(long)]
        start_day: Option<String>,
        /// Number of days in the month
        #[arg(long)]
        days: Option<String>,
        /// Match a calendar month instead, as YYYY-MM
        #[arg(long = "for", conflicts_with_all = ["start_day", "days"])]
        for_month: Option<String>,
    },
    /// Clear every note and emoji and delete the saved record
    Clear,
    /// Write the planner as plain text
    Export {
        /// Output file
        path: PathBuf,
    },
    /// Print where the planner record lives
    Path,
    /// Launch the interactive TUI
    Tui,
}
