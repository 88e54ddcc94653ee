mod cli;
mod commands;
mod config;
mod export;
mod grid;
mod logging;
mod model;
mod planner;
mod storage;
mod ui;

use anyhow::Result;
use clap::Parser;
use std::env;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let config = config::load_config(args.global.config.as_deref())?;
    let command = args.command.unwrap_or(cli::Command::Tui);
    let cwd = env::current_dir()?;

    let explicit_dir = args.global.data_dir.or_else(|| config.data_dir.clone());
    let location = storage::locate_data_dir(explicit_dir.as_deref(), &cwd)?;
    let level = args
        .global
        .log_level
        .as_deref()
        .unwrap_or_else(|| config.log_level());
    let _logger = match logging::init_logging(level, &location.log_dir()) {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("warning: logging disabled: {:#}", err);
            None
        }
    };

    let open = move || commands::Session::open(location, config.default_theme());
    match command {
        cli::Command::Init => commands::init(&cwd),
        cli::Command::Show => commands::show(&open()),
        cli::Command::Note { target, text } => commands::note(open(), target, text),
        cli::Command::Emoji { target, glyph } => commands::emoji(open(), target, glyph),
        cli::Command::Theme { name } => commands::theme(open(), name),
        cli::Command::Month {
            start_day,
            days,
            for_month,
        } => commands::month(open(), start_day, days, for_month),
        cli::Command::Clear => commands::clear(open()),
        cli::Command::Export { path } => commands::export(&open(), &path),
        cli::Command::Path => commands::path(&open()),
        cli::Command::Tui => commands::tui(open()),
    }
}
