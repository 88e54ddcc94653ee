use crate::export::{render_text, write_export};
use crate::grid::{parse_weekday, settings_for_month};
use crate::model::{MonthSettings, PlannerError, Theme};
use crate::planner::{CellRef, DropOutcome, Planner};
use crate::storage::{init_project_dir, DataLocation, FileStore, StateStore};
use crate::ui;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use log::info;
use std::path::Path;

/// An opened planner: where it lives, its store and the restored view.
pub struct Session {
    pub location: DataLocation,
    pub store: StateStore<FileStore>,
    pub planner: Planner,
}

impl Session {
    pub fn open(location: DataLocation, default_theme: &str) -> Self {
        let store = StateStore::new(FileStore::new(location.dir.clone()), default_theme);
        let planner = store.load();
        Session {
            location,
            store,
            planner,
        }
    }

    fn persist(&mut self) {
        if !self.store.save(&self.planner) {
            eprintln!(
                "warning: could not save planner to {} (see {})",
                self.store.location(),
                self.location.log_dir().display()
            );
        }
    }
}

pub fn init(cwd: &Path) -> Result<()> {
    let location = init_project_dir(cwd)?;
    info!("initialized project planner at {}", location.dir.display());
    println!("Initialized planner at {}", location.dir.display());
    Ok(())
}

pub fn show(session: &Session) -> Result<()> {
    print!("{}", render_text(&session.planner));
    Ok(())
}

pub fn note(mut session: Session, target: String, text: Vec<String>) -> Result<()> {
    let cell = parse_target(&target)?;
    let text = text.join(" ");
    session
        .planner
        .set_note(cell, &text)
        .with_context(|| format!("setting note on {}", target))?;
    session.persist();
    if text.trim().is_empty() {
        println!("Cleared note on {}", target);
    } else {
        println!("Noted {}", target);
    }
    Ok(())
}

pub fn emoji(mut session: Session, target: String, glyph: String) -> Result<()> {
    let cell = parse_target(&target)?;
    let outcome = session
        .planner
        .drop_emoji(cell, &glyph)
        .with_context(|| format!("dropping emoji on {}", target))?;
    match outcome {
        DropOutcome::Ignored => println!("Nothing to drop"),
        DropOutcome::Replaced | DropOutcome::Appended => {
            session.persist();
            println!(
                "{} now shows {}",
                target,
                session.planner.emoji_for(cell).unwrap_or_default()
            );
        }
    }
    Ok(())
}

pub fn theme(mut session: Session, name: String) -> Result<()> {
    let theme = Theme::parse_strict(&name)?;
    session.planner.set_theme(theme.name());
    session.persist();
    println!("Theme set to {}", theme.name());
    Ok(())
}

pub fn month(
    mut session: Session,
    start_day: Option<String>,
    days: Option<String>,
    for_month: Option<String>,
) -> Result<()> {
    let settings = match for_month {
        Some(raw) => parse_calendar_month(&raw)?,
        None => MonthSettings::from_raw(start_day.as_deref(), days.as_deref()),
    };
    session.planner.regenerate(settings);
    session.persist();
    info!(
        "regenerated month: start_day={} total_days={}",
        settings.start_day, settings.total_days
    );
    println!(
        "Month regenerated: {} days starting on weekday {}",
        settings.total_days, settings.start_day
    );
    Ok(())
}

pub fn clear(mut session: Session) -> Result<()> {
    let had_content = !session.planner.is_empty();
    session.store.clear(&mut session.planner);
    if had_content {
        println!("Cleared all notes and emojis");
    } else {
        println!("Planner was already empty; removed saved record");
    }
    Ok(())
}

pub fn export(session: &Session, path: &Path) -> Result<()> {
    write_export(&session.planner, path)?;
    println!("Exported planner to {}", path.display());
    Ok(())
}

pub fn path(session: &Session) -> Result<()> {
    println!("{} ({})", session.store.location(), session.location.scope_label());
    Ok(())
}

pub fn tui(session: Session) -> Result<()> {
    ui::run(session)
}

pub fn parse_target(raw: &str) -> Result<CellRef, PlannerError> {
    match raw.trim().parse::<u32>() {
        Ok(day) => Ok(CellRef::Month(day)),
        Err(_) => parse_weekday(raw).map(CellRef::Week),
    }
}

fn parse_calendar_month(raw: &str) -> Result<MonthSettings, PlannerError> {
    let date = NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
        .map_err(|_| PlannerError::InvalidMonth(format!("{} (use YYYY-MM)", raw)))?;
    settings_for_month(date.year(), date.month())
}
