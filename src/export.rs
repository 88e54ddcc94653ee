use crate::grid::{weekday_slug, Slot};
use crate::planner::Planner;
use anyhow::{Context, Result};
use ratatui::text::Span;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

const CELL_WIDTH: usize = 12;
const HEADINGS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Plain-text rendering of the month grid and weekly strip.
pub fn render_text(planner: &Planner) -> String {
    let settings = planner.grid().settings();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Planner: {} days, day 1 on {}, theme {}",
        settings.total_days,
        HEADINGS[settings.start_day as usize],
        planner.theme_name()
    );
    out.push('\n');

    let heading: Vec<String> = HEADINGS
        .iter()
        .map(|h| format!("{:<width$}", h, width = CELL_WIDTH))
        .collect();
    let _ = writeln!(out, "{}", heading.join("|").trim_end());
    let _ = writeln!(out, "{}", "-".repeat((CELL_WIDTH + 1) * 7 - 1));

    for week in planner.grid().weeks() {
        let mut top = Vec::with_capacity(7);
        let mut bottom = Vec::with_capacity(7);
        for slot in week {
            match slot {
                Slot::Placeholder => {
                    top.push(" ".repeat(CELL_WIDTH));
                    bottom.push(" ".repeat(CELL_WIDTH));
                }
                Slot::Day(cell) => {
                    let emoji = planner.emoji(&cell.emoji_key);
                    top.push(pad(&format!("{:>2} {}", cell.day, emoji)));
                    bottom.push(pad(&truncate(first_line(planner.note(&cell.note_key)), CELL_WIDTH)));
                }
            }
        }
        let _ = writeln!(out, "{}", top.join("|").trim_end());
        let _ = writeln!(out, "{}", bottom.join("|").trim_end());
    }

    let days_with_notes: Vec<_> = planner
        .grid()
        .days()
        .filter(|cell| !planner.note(&cell.note_key).is_empty())
        .collect();
    if !days_with_notes.is_empty() {
        out.push_str("\nNotes\n");
        for cell in days_with_notes {
            let _ = writeln!(out, "  {:>2}: {}", cell.day, planner.note(&cell.note_key));
        }
    }

    let week_lines: Vec<String> = planner
        .week()
        .iter()
        .filter_map(|cell| {
            let note = planner.note(&cell.note_key);
            let emoji = planner.emoji(&cell.emoji_key);
            if note.is_empty() && emoji.is_empty() {
                return None;
            }
            Some(format!("  {} {} {}", weekday_slug(cell.weekday), emoji, note))
        })
        .collect();
    if !week_lines.is_empty() {
        out.push_str("\nWeek\n");
        for line in week_lines {
            let _ = writeln!(out, "{}", line.trim_end());
        }
    }
    out
}

pub fn write_export(planner: &Planner, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    fs::write(path, render_text(planner)).with_context(|| format!("writing {:?}", path))?;
    Ok(())
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

/// Terminal columns taken by `text`; emoji are double width.
fn display_width(text: &str) -> usize {
    Span::raw(text).width()
}

fn pad(text: &str) -> String {
    let width = display_width(text);
    if width >= CELL_WIDTH {
        text.to_string()
    } else {
        format!("{}{}", text, " ".repeat(CELL_WIDTH - width))
    }
}

fn truncate(text: &str, max: usize) -> String {
    if display_width(text) <= max {
        return text.to_string();
    }
    let budget = max.saturating_sub(3);
    let mut used = 0;
    let mut out = String::new();
    for glyph in text.graphemes(true) {
        let width = display_width(glyph);
        if used + width > budget {
            break;
        }
        used += width;
        out.push_str(glyph);
    }
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MonthSettings;
    use crate::planner::CellRef;
    use chrono::Weekday;

    #[test]
    fn offset_month_renders_placeholders_before_day_one() {
        let mut planner = Planner::new("rose");
        planner.regenerate(MonthSettings::new(2, 28));
        let text = render_text(&planner);
        assert!(text.starts_with("Planner: 28 days, day 1 on Wed, theme rose"));
        let first_week = text.lines().nth(4).unwrap();
        assert!(first_week.starts_with(&format!("{}|{}| 1", " ".repeat(12), " ".repeat(12))));
    }

    #[test]
    fn notes_and_week_entries_are_listed() {
        let mut planner = Planner::new("default");
        planner
            .set_note(CellRef::Month(5), "a very long note about groceries")
            .unwrap();
        planner.drop_emoji(CellRef::Month(5), "📚").unwrap();
        planner.set_note(CellRef::Week(Weekday::Sat), "hike").unwrap();
        let text = render_text(&planner);
        assert!(text.contains(" 5 📚"));
        assert!(text.contains("a very lo..."));
        assert!(text.contains("   5: a very long note about groceries"));
        assert!(text.contains("  sat  hike"));
    }

    #[test]
    fn export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/plan.txt");
        let planner = Planner::new("default");
        write_export(&planner, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), render_text(&planner));
    }

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("gym", 12), "gym");
        assert_eq!(truncate("abcdefghijklmno", 12), "abcdefghi...");
        assert_eq!(truncate("☕☕☕☕☕☕☕", 12), "☕☕☕☕...");
    }

    #[test]
    fn wide_glyphs_keep_columns_aligned() {
        let mut planner = Planner::new("default");
        planner.drop_emoji(CellRef::Month(2), "📚").unwrap();
        planner.drop_emoji(CellRef::Month(3), "☕").unwrap();
        planner.set_note(CellRef::Month(3), "☕ with ☕ and more ☕").unwrap();
        let text = render_text(&planner);
        let rows: Vec<&str> = text.lines().skip(4).take(2).collect();
        assert!(rows[0].contains(" 2 📚"));
        for row in rows {
            let cells: Vec<&str> = row.split('|').collect();
            assert_eq!(cells.len(), 7, "{}", row);
            for cell in &cells[..6] {
                assert_eq!(display_width(cell), CELL_WIDTH, "{:?} in {}", cell, row);
            }
        }
    }
}
