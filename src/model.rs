use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use unicode_segmentation::UnicodeSegmentation;

pub type CellKey = String;

pub const DEFAULT_START_DAY: u32 = 0;
pub const DEFAULT_TOTAL_DAYS: u32 = 30;
pub const MAX_TOTAL_DAYS: u32 = 31;
pub const DEFAULT_THEME: &str = "default";

/// Everything the planner persists, as one flat record.
///
/// Maps only ever hold non-empty content; an untouched cell has no entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlannerState {
    #[serde(default)]
    pub notes: BTreeMap<CellKey, String>,
    #[serde(default)]
    pub emojis: BTreeMap<CellKey, String>,
    #[serde(default = "default_theme_name")]
    pub theme: String,
    #[serde(
        default,
        deserialize_with = "lenient_month",
        skip_serializing_if = "Option::is_none"
    )]
    pub month: Option<MonthSettings>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonthSettings {
    /// Weekday offset of day 1, counted from Monday.
    pub start_day: u32,
    pub total_days: u32,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PlannerError {
    #[error("day {day} is outside the current month (1-{total})")]
    DayOutOfRange { day: u32, total: u32 },
    #[error("unknown weekday: {0}")]
    InvalidWeekday(String),
    #[error("unknown theme: {0} (expected one of {1})")]
    UnknownTheme(String, String),
    #[error("invalid month settings: {0}")]
    InvalidMonth(String),
    #[error("a month cell holds a single emoji, got {0:?}")]
    NotSingleGlyph(String),
}

impl Default for PlannerState {
    fn default() -> Self {
        PlannerState {
            notes: BTreeMap::new(),
            emojis: BTreeMap::new(),
            theme: default_theme_name(),
            month: None,
        }
    }
}

fn default_theme_name() -> String {
    DEFAULT_THEME.to_string()
}

impl Default for MonthSettings {
    fn default() -> Self {
        MonthSettings {
            start_day: DEFAULT_START_DAY,
            total_days: DEFAULT_TOTAL_DAYS,
        }
    }
}

impl MonthSettings {
    /// Builds settings from already-typed values, substituting the default for
    /// any value outside its valid range.
    pub fn new(start_day: u32, total_days: u32) -> Self {
        let start_day = if start_day <= 6 {
            start_day
        } else {
            DEFAULT_START_DAY
        };
        let total_days = if (1..=MAX_TOTAL_DAYS).contains(&total_days) {
            total_days
        } else {
            DEFAULT_TOTAL_DAYS
        };
        MonthSettings {
            start_day,
            total_days,
        }
    }

    /// Lenient parse of raw form values. Leading digits are taken, anything
    /// unparseable or zero falls back to the default.
    pub fn from_raw(start_day: Option<&str>, total_days: Option<&str>) -> Self {
        let start = start_day.and_then(leading_int).unwrap_or(DEFAULT_START_DAY);
        let total = total_days
            .and_then(leading_int)
            .filter(|n| *n != 0)
            .unwrap_or(DEFAULT_TOTAL_DAYS);
        MonthSettings::new(start, total)
    }

    pub fn sanitized(self) -> Self {
        MonthSettings::new(self.start_day, self.total_days)
    }
}

/// Month values as they may appear in a stored record: numbers, numeric
/// strings from a form, or junk.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Int(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMonth {
    #[serde(default)]
    start_day: Option<RawValue>,
    #[serde(default)]
    total_days: Option<RawValue>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMonthField {
    Month(RawMonth),
    Other(IgnoredAny),
}

impl RawValue {
    fn into_text(self) -> Option<String> {
        match self {
            RawValue::Int(n) => Some(n.to_string()),
            RawValue::Float(f) => Some(f.to_string()),
            RawValue::Text(s) => Some(s),
            RawValue::Other(_) => None,
        }
    }
}

/// Bad month values fall back to defaults instead of failing the whole record.
fn lenient_month<'de, D>(deserializer: D) -> Result<Option<MonthSettings>, D::Error>
where
    D: Deserializer<'de>,
{
    let month = match Option::<RawMonthField>::deserialize(deserializer)? {
        Some(RawMonthField::Month(month)) => month,
        Some(RawMonthField::Other(_)) | None => return Ok(None),
    };
    let start = month.start_day.and_then(RawValue::into_text);
    let total = month.total_days.and_then(RawValue::into_text);
    Ok(Some(MonthSettings::from_raw(start.as_deref(), total.as_deref())))
}

fn leading_int(raw: &str) -> Option<u32> {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Default,
    Spring,
    Sunset,
    Midnight,
    Mint,
    Rose,
    Dusk,
    Charcoal,
}

/// Calendar colours as RGB triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePalette {
    pub background: (u8, u8, u8),
    pub border: (u8, u8, u8),
}

impl Theme {
    pub const ALL: [Theme; 8] = [
        Theme::Default,
        Theme::Spring,
        Theme::Sunset,
        Theme::Midnight,
        Theme::Mint,
        Theme::Rose,
        Theme::Dusk,
        Theme::Charcoal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Theme::Default => "default",
            Theme::Spring => "spring",
            Theme::Sunset => "sunset",
            Theme::Midnight => "midnight",
            Theme::Mint => "mint",
            Theme::Rose => "rose",
            Theme::Dusk => "dusk",
            Theme::Charcoal => "charcoal",
        }
    }

    pub fn from_name(name: &str) -> Option<Theme> {
        let wanted = name.trim().to_ascii_lowercase();
        Theme::ALL.into_iter().find(|t| t.name() == wanted)
    }

    /// Resolves a persisted name; unknown names render with the default colours.
    pub fn resolve(name: &str) -> Theme {
        Theme::from_name(name).unwrap_or(Theme::Default)
    }

    pub fn parse_strict(name: &str) -> Result<Theme, PlannerError> {
        Theme::from_name(name).ok_or_else(|| {
            let known: Vec<&str> = Theme::ALL.iter().map(|t| t.name()).collect();
            PlannerError::UnknownTheme(name.to_string(), known.join(", "))
        })
    }

    pub fn palette(&self) -> ThemePalette {
        let (background, border) = match self {
            Theme::Spring => ((0xE8, 0xFA, 0xD7), (0xC7, 0xE7, 0xAF)),
            Theme::Sunset => ((0xFC, 0xEA, 0xD7), (0xDE, 0xB2, 0x8F)),
            Theme::Midnight => ((0xDD, 0xE4, 0xFF), (0xAE, 0xBA, 0xFF)),
            Theme::Mint => ((0xE0, 0xFF, 0xF7), (0xBE, 0xFE, 0xF2)),
            Theme::Rose => ((0xFC, 0xE7, 0xEF), (0xFF, 0xC1, 0xD5)),
            Theme::Dusk => ((0xE2, 0xDB, 0xFC), (0xC4, 0xB6, 0xFE)),
            Theme::Charcoal => ((0xE5, 0xE7, 0xEB), (0x9C, 0xA3, 0xAF)),
            Theme::Default => ((0xEE, 0xF2, 0xFF), (0xE2, 0xE8, 0xF0)),
        };
        ThemePalette { background, border }
    }

    pub fn next(&self) -> Theme {
        let idx = Theme::ALL.iter().position(|t| t == self).unwrap_or(0);
        Theme::ALL[(idx + 1) % Theme::ALL.len()]
    }

    pub fn prev(&self) -> Theme {
        let idx = Theme::ALL.iter().position(|t| t == self).unwrap_or(0);
        Theme::ALL[(idx + Theme::ALL.len() - 1) % Theme::ALL.len()]
    }
}

/// The glyph in `raw` if it is exactly one user-perceived character.
pub fn single_glyph(raw: &str) -> Result<&str, PlannerError> {
    let trimmed = raw.trim();
    let mut graphemes = trimmed.graphemes(true);
    match (graphemes.next(), graphemes.next()) {
        (Some(glyph), None) => Ok(glyph),
        _ => Err(PlannerError::NotSingleGlyph(raw.to_string())),
    }
}

/// Glyphs offered by the emoji palette.
pub const EMOJI_PALETTE: [&str; 12] = [
    "😀", "😊", "😴", "💪", "📚", "🎉", "❤️", "⭐", "☕", "🏃", "🎂", "✈️",
];
