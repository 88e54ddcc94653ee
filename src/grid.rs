use crate::model::{CellKey, MonthSettings, PlannerError};
use chrono::{Datelike, NaiveDate, Weekday};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Blank cell aligning day 1 under its weekday.
    Placeholder,
    Day(DayCell),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub day: u32,
    pub note_key: CellKey,
    pub emoji_key: CellKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekCell {
    pub weekday: Weekday,
    pub note_key: CellKey,
    pub emoji_key: CellKey,
}

#[derive(Debug, Clone)]
pub struct MonthGrid {
    settings: MonthSettings,
    slots: Vec<Slot>,
}

impl MonthGrid {
    pub fn generate(settings: MonthSettings) -> Self {
        let settings = settings.sanitized();
        let mut slots = Vec::with_capacity((settings.start_day + settings.total_days) as usize);
        for _ in 0..settings.start_day {
            slots.push(Slot::Placeholder);
        }
        for day in 1..=settings.total_days {
            slots.push(Slot::Day(DayCell {
                day,
                note_key: month_note_key(day),
                emoji_key: month_emoji_key(day),
            }));
        }
        MonthGrid { settings, slots }
    }

    pub fn settings(&self) -> MonthSettings {
        self.settings
    }

    #[cfg(test)]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn days(&self) -> impl Iterator<Item = &DayCell> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Day(cell) => Some(cell),
            Slot::Placeholder => None,
        })
    }

    pub fn day(&self, day: u32) -> Result<&DayCell, PlannerError> {
        if day == 0 || day > self.settings.total_days {
            return Err(PlannerError::DayOutOfRange {
                day,
                total: self.settings.total_days,
            });
        }
        match &self.slots[self.slot_index(day)] {
            Slot::Day(cell) => Ok(cell),
            Slot::Placeholder => Err(PlannerError::DayOutOfRange {
                day,
                total: self.settings.total_days,
            }),
        }
    }

    pub fn slot_index(&self, day: u32) -> usize {
        (self.settings.start_day + day - 1) as usize
    }

    /// Rows of seven slots; the last row may be short.
    pub fn weeks(&self) -> impl Iterator<Item = &[Slot]> {
        self.slots.chunks(7)
    }

    pub fn week_count(&self) -> usize {
        self.slots.len().div_ceil(7)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.days()
            .any(|cell| cell.note_key == key || cell.emoji_key == key)
    }
}

pub fn month_note_key(day: u32) -> CellKey {
    format!("month-note-{}", day)
}

pub fn month_emoji_key(day: u32) -> CellKey {
    format!("month-emoji-{}", day)
}

pub fn week_note_key(weekday: Weekday) -> CellKey {
    format!("week-note-{}", weekday_slug(weekday))
}

pub fn week_emoji_key(weekday: Weekday) -> CellKey {
    format!("week-emoji-{}", weekday_slug(weekday))
}

pub fn weekday_slug(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

pub fn parse_weekday(raw: &str) -> Result<Weekday, PlannerError> {
    raw.trim()
        .parse::<Weekday>()
        .map_err(|_| PlannerError::InvalidWeekday(raw.to_string()))
}

/// The static weekly strip, Monday first.
pub fn weekly_cells() -> Vec<WeekCell> {
    let mut cells = Vec::with_capacity(7);
    let mut weekday = Weekday::Mon;
    for _ in 0..7 {
        cells.push(WeekCell {
            weekday,
            note_key: week_note_key(weekday),
            emoji_key: week_emoji_key(weekday),
        });
        weekday = weekday.succ();
    }
    cells
}

pub fn is_week_key(key: &str) -> bool {
    weekly_cells()
        .iter()
        .any(|cell| cell.note_key == key || cell.emoji_key == key)
}

/// Settings matching a real calendar month.
pub fn settings_for_month(year: i32, month: u32) -> Result<MonthSettings, PlannerError> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| PlannerError::InvalidMonth(format!("{}-{:02}", year, month)))?;
    Ok(MonthSettings::new(
        first.weekday().num_days_from_monday(),
        days_in_month(year, month)?,
    ))
}

fn days_in_month(year: i32, month: u32) -> Result<u32, PlannerError> {
    let next = if month == 12 {
        year.checked_add(1)
            .and_then(|next_year| NaiveDate::from_ymd_opt(next_year, 1, 1))
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .ok_or_else(|| PlannerError::InvalidMonth(format!("{}-{:02} has no known end", year, month)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monday_start_thirty_days() {
        let grid = MonthGrid::generate(MonthSettings::new(0, 30));
        assert_eq!(grid.slots().len(), 30);
        let keys: Vec<&str> = grid.days().map(|c| c.note_key.as_str()).collect();
        assert_eq!(keys.first(), Some(&"month-note-1"));
        assert_eq!(keys.last(), Some(&"month-note-30"));
        assert!(grid
            .days()
            .enumerate()
            .all(|(i, c)| c.note_key == format!("month-note-{}", i + 1)
                && c.emoji_key == format!("month-emoji-{}", i + 1)));
    }

    #[test]
    fn offset_inserts_leading_placeholders() {
        let grid = MonthGrid::generate(MonthSettings::new(3, 30));
        assert_eq!(grid.slots().len(), 33);
        assert!(grid.slots()[..3].iter().all(|s| *s == Slot::Placeholder));
        match &grid.slots()[3] {
            Slot::Day(cell) => assert_eq!(cell.day, 1),
            Slot::Placeholder => panic!("day 1 should be at position 4"),
        }
        assert_eq!(grid.slot_index(1), 3);
    }

    #[test]
    fn missing_inputs_use_defaults() {
        let grid = MonthGrid::generate(MonthSettings::from_raw(None, Some("nope")));
        assert_eq!(grid.settings(), MonthSettings::new(0, 30));
        assert_eq!(grid.days().count(), 30);
    }

    #[test]
    fn day_lookup_rejects_out_of_range() {
        let grid = MonthGrid::generate(MonthSettings::new(1, 28));
        assert_eq!(grid.day(28).map(|c| c.day), Ok(28));
        assert_eq!(
            grid.day(29),
            Err(PlannerError::DayOutOfRange { day: 29, total: 28 })
        );
        assert!(grid.day(0).is_err());
    }

    #[test]
    fn weeks_are_rows_of_seven() {
        let grid = MonthGrid::generate(MonthSettings::new(6, 31));
        assert_eq!(grid.week_count(), 6);
        let rows: Vec<usize> = grid.weeks().map(|w| w.len()).collect();
        assert_eq!(rows, vec![7, 7, 7, 7, 7, 2]);
    }

    #[test]
    fn weekly_keys_are_static() {
        let cells = weekly_cells();
        assert_eq!(cells.len(), 7);
        assert_eq!(cells[0].note_key, "week-note-mon");
        assert_eq!(cells[6].emoji_key, "week-emoji-sun");
        assert!(is_week_key("week-note-fri"));
        assert!(!is_week_key("month-note-1"));
        assert_eq!(parse_weekday("Wednesday"), Ok(Weekday::Wed));
        assert!(parse_weekday("someday").is_err());
    }

    #[test]
    fn calendar_month_settings() {
        // 2026-10-01 is a Thursday.
        assert_eq!(settings_for_month(2026, 10), Ok(MonthSettings::new(3, 31)));
        assert_eq!(settings_for_month(2024, 2), Ok(MonthSettings::new(3, 29)));
        assert!(settings_for_month(2024, 13).is_err());
    }

    #[test]
    fn last_representable_month_is_an_error_not_a_guess() {
        let last_year = NaiveDate::MAX.year();
        assert!(matches!(
            settings_for_month(last_year, 12),
            Err(PlannerError::InvalidMonth(_))
        ));
        assert_eq!(days_in_month(last_year, 11), Ok(30));
    }
}
