use crate::grid::{self, MonthGrid, WeekCell};
use crate::model::{self, CellKey, MonthSettings, PlannerError, PlannerState, Theme};
use chrono::Weekday;
use log::debug;
use std::collections::BTreeMap;

/// A cell addressed the way a user picks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRef {
    Month(u32),
    Week(Weekday),
}

/// Live planner view: the current grid plus whatever content its cells hold.
///
/// Content maps only hold keys that exist in the current grid or the weekly
/// strip. Rendering reads from here; persistence goes through [`Planner::snapshot`]
/// and [`Planner::restore`].
#[derive(Debug, Clone)]
pub struct Planner {
    grid: MonthGrid,
    week: Vec<WeekCell>,
    theme: String,
    notes: BTreeMap<CellKey, String>,
    emojis: BTreeMap<CellKey, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Ignored,
    Replaced,
    Appended,
}

impl Planner {
    pub fn new(theme: impl Into<String>) -> Self {
        Planner {
            grid: MonthGrid::generate(MonthSettings::default()),
            week: grid::weekly_cells(),
            theme: theme.into(),
            notes: BTreeMap::new(),
            emojis: BTreeMap::new(),
        }
    }

    /// Rebuilds a view from a persisted record: month first so the keys exist,
    /// then theme, then content for every key the grid knows about.
    pub fn restore(state: &PlannerState) -> Self {
        let mut planner = Planner::new(state.theme.clone());
        if let Some(month) = state.month {
            planner.regenerate(month);
        }
        let mut ignored = 0usize;
        for (key, value) in &state.notes {
            if planner.has_key(key) && !is_blank(value) {
                planner.notes.insert(key.clone(), value.clone());
            } else {
                ignored += 1;
            }
        }
        for (key, value) in &state.emojis {
            if planner.has_key(key) && !is_blank(value) {
                planner.emojis.insert(key.clone(), value.clone());
            } else {
                ignored += 1;
            }
        }
        if ignored > 0 {
            debug!("restore skipped {} entries with no matching cell", ignored);
        }
        planner
    }

    /// Serializable copy of the view. Blank content is left out.
    pub fn snapshot(&self) -> PlannerState {
        PlannerState {
            notes: non_blank(&self.notes),
            emojis: non_blank(&self.emojis),
            theme: self.theme.clone(),
            month: Some(self.grid.settings()),
        }
    }

    pub fn grid(&self) -> &MonthGrid {
        &self.grid
    }

    pub fn week(&self) -> &[WeekCell] {
        &self.week
    }

    pub fn theme_name(&self) -> &str {
        &self.theme
    }

    pub fn theme(&self) -> Theme {
        Theme::resolve(&self.theme)
    }

    pub fn set_theme(&mut self, name: impl Into<String>) {
        self.theme = name.into();
    }

    pub fn note(&self, key: &str) -> &str {
        self.notes.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn emoji(&self, key: &str) -> &str {
        self.emojis.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.grid.contains_key(key) || grid::is_week_key(key)
    }

    /// `(note_key, emoji_key)` for a cell in the current grid.
    pub fn keys_for(&self, cell: CellRef) -> Result<(CellKey, CellKey), PlannerError> {
        match cell {
            CellRef::Month(day) => {
                let found = self.grid.day(day)?;
                Ok((found.note_key.clone(), found.emoji_key.clone()))
            }
            CellRef::Week(weekday) => Ok((
                grid::week_note_key(weekday),
                grid::week_emoji_key(weekday),
            )),
        }
    }

    pub fn note_for(&self, cell: CellRef) -> Result<&str, PlannerError> {
        let (note_key, _) = self.keys_for(cell)?;
        Ok(self.note(&note_key))
    }

    pub fn emoji_for(&self, cell: CellRef) -> Result<&str, PlannerError> {
        let (_, emoji_key) = self.keys_for(cell)?;
        Ok(self.emoji(&emoji_key))
    }

    pub fn set_note(&mut self, cell: CellRef, text: &str) -> Result<(), PlannerError> {
        let (note_key, _) = self.keys_for(cell)?;
        if is_blank(text) {
            self.notes.remove(&note_key);
        } else {
            self.notes.insert(note_key, text.to_string());
        }
        Ok(())
    }

    /// Month dropzones hold a single glyph; weekly ones accumulate.
    pub fn drop_emoji(&mut self, cell: CellRef, glyph: &str) -> Result<DropOutcome, PlannerError> {
        let (_, emoji_key) = self.keys_for(cell)?;
        let glyph = glyph.trim();
        if glyph.is_empty() {
            return Ok(DropOutcome::Ignored);
        }
        match cell {
            CellRef::Month(_) => {
                let glyph = model::single_glyph(glyph)?;
                self.emojis.insert(emoji_key, glyph.to_string());
                Ok(DropOutcome::Replaced)
            }
            CellRef::Week(_) => {
                self.emojis
                    .entry(emoji_key)
                    .or_default()
                    .push_str(glyph);
                Ok(DropOutcome::Appended)
            }
        }
    }

    pub fn clear_cell(&mut self, cell: CellRef) -> Result<(), PlannerError> {
        let (note_key, emoji_key) = self.keys_for(cell)?;
        self.notes.remove(&note_key);
        self.emojis.remove(&emoji_key);
        Ok(())
    }

    /// Replaces the month grid wholesale. Month content does not carry over;
    /// the weekly strip is untouched.
    pub fn regenerate(&mut self, settings: MonthSettings) {
        self.grid = MonthGrid::generate(settings);
        self.notes.retain(|key, _| grid::is_week_key(key));
        self.emojis.retain(|key, _| grid::is_week_key(key));
    }

    pub fn clear_all(&mut self) {
        self.notes.clear();
        self.emojis.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.emojis.is_empty()
    }
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

fn non_blank(map: &BTreeMap<CellKey, String>) -> BTreeMap<CellKey, String> {
    map.iter()
        .filter(|(_, v)| !is_blank(v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_cells_are_not_in_snapshot() {
        let mut planner = Planner::new("default");
        planner.set_note(CellRef::Month(4), "dentist").unwrap();
        let state = planner.snapshot();
        assert_eq!(state.notes.len(), 1);
        assert_eq!(state.notes.get("month-note-4").map(String::as_str), Some("dentist"));
        assert!(state.emojis.is_empty());
        assert_eq!(state.month, Some(MonthSettings::default()));
    }

    #[test]
    fn blank_note_removes_entry() {
        let mut planner = Planner::new("default");
        planner.set_note(CellRef::Month(1), "gym").unwrap();
        planner.set_note(CellRef::Month(1), "   ").unwrap();
        assert!(planner.snapshot().notes.is_empty());
    }

    #[test]
    fn month_drop_replaces_week_drop_appends() {
        let mut planner = Planner::new("default");
        assert_eq!(
            planner.drop_emoji(CellRef::Month(2), "😀").unwrap(),
            DropOutcome::Replaced
        );
        planner.drop_emoji(CellRef::Month(2), "🎉").unwrap();
        assert_eq!(planner.emoji_for(CellRef::Month(2)).unwrap(), "🎉");

        planner.drop_emoji(CellRef::Week(Weekday::Tue), "☕").unwrap();
        planner.drop_emoji(CellRef::Week(Weekday::Tue), "📚").unwrap();
        assert_eq!(planner.emoji("week-emoji-tue"), "☕📚");

        assert_eq!(
            planner.drop_emoji(CellRef::Month(3), " ").unwrap(),
            DropOutcome::Ignored
        );
        assert_eq!(planner.emoji("month-emoji-3"), "");
    }

    #[test]
    fn month_cell_rejects_more_than_one_glyph() {
        let mut planner = Planner::new("default");
        planner.drop_emoji(CellRef::Month(4), "⭐").unwrap();
        assert_eq!(
            planner.drop_emoji(CellRef::Month(4), "😀🎉☕"),
            Err(PlannerError::NotSingleGlyph("😀🎉☕".into()))
        );
        assert_eq!(planner.emoji("month-emoji-4"), "⭐");

        planner.drop_emoji(CellRef::Month(4), "❤️").unwrap();
        assert_eq!(planner.emoji("month-emoji-4"), "❤️");

        planner.drop_emoji(CellRef::Week(Weekday::Fri), "😀🎉").unwrap();
        assert_eq!(planner.emoji("week-emoji-fri"), "😀🎉");
    }

    #[test]
    fn cells_outside_grid_are_rejected() {
        let mut planner = Planner::new("default");
        assert_eq!(
            planner.set_note(CellRef::Month(31), "x"),
            Err(PlannerError::DayOutOfRange { day: 31, total: 30 })
        );
    }

    #[test]
    fn regenerate_drops_month_content_keeps_week() {
        let mut planner = Planner::new("default");
        planner.set_note(CellRef::Month(1), "a").unwrap();
        planner.set_note(CellRef::Week(Weekday::Mon), "standup").unwrap();
        planner.regenerate(MonthSettings::new(2, 31));
        assert_eq!(planner.note("month-note-1"), "");
        assert_eq!(planner.note("week-note-mon"), "standup");
        assert_eq!(planner.grid().settings(), MonthSettings::new(2, 31));
    }

    #[test]
    fn restore_ignores_stale_keys() {
        let mut state = PlannerState::default();
        state.month = Some(MonthSettings::new(0, 28));
        state.notes.insert("month-note-3".into(), "keep".into());
        state.notes.insert("month-note-31".into(), "stale".into());
        state.emojis.insert("month-emoji-30".into(), "⭐".into());
        state.notes.insert("sidebar-note".into(), "junk".into());

        let planner = Planner::restore(&state);
        assert_eq!(planner.note("month-note-3"), "keep");
        assert_eq!(planner.note("month-note-31"), "");
        assert_eq!(planner.emoji("month-emoji-30"), "");
        let snapshot = planner.snapshot();
        assert_eq!(snapshot.notes.len(), 1);
        assert!(snapshot.emojis.is_empty());
    }

    #[test]
    fn restore_without_month_uses_default_grid() {
        let mut state = PlannerState::default();
        state.theme = "rose".into();
        state.notes.insert("month-note-30".into(), "last".into());
        let planner = Planner::restore(&state);
        assert_eq!(planner.grid().settings(), MonthSettings::default());
        assert_eq!(planner.theme(), Theme::Rose);
        assert_eq!(planner.note("month-note-30"), "last");
    }

    #[test]
    fn unknown_theme_name_is_kept_but_renders_default() {
        let mut planner = Planner::new("default");
        planner.set_theme("neon");
        assert_eq!(planner.theme_name(), "neon");
        assert_eq!(planner.theme(), Theme::Default);
        assert_eq!(planner.snapshot().theme, "neon");
    }
}
