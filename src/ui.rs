use crate::commands::Session;
use crate::grid::Slot;
use crate::model::{MonthSettings, Theme, ThemePalette, EMOJI_PALETTE};
use crate::planner::{CellRef, DropOutcome, Planner};
use crate::storage::{DataLocation, FileStore, StateStore};
use anyhow::Result;
use chrono::Weekday;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use log::{debug, info};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

const NOTE_PLACEHOLDER: &str = "Plan...";

pub fn run(session: Session) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(session);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    planner: Planner,
    store: StateStore<FileStore>,
    location: DataLocation,
    focus: Focus,
    selected_day: u32,
    selected_weekday: Weekday,
    last_save: Instant,
    status: String,
    mode: Mode,
}

enum Mode {
    Normal,
    EditingNote { cell: CellRef, field: FieldValue },
    Palette { idx: usize },
    MonthForm(MonthForm),
    ConfirmClear,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Focus {
    Month,
    Week,
}

struct MonthForm {
    start_day: FieldValue,
    total_days: FieldValue,
    field: MonthField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum MonthField {
    StartDay,
    TotalDays,
}

/// Editable text with a byte-offset caret.
#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        self.cursor = prev_boundary(&self.value, self.cursor);
    }

    fn move_right(&mut self) {
        self.cursor = next_boundary(&self.value, self.cursor);
    }

    fn move_up(&mut self) {
        let (starts, line, col) = caret_position(&self.value, self.cursor);
        if line > 0 {
            self.cursor = offset_at_col(&self.value, starts[line - 1], col);
        }
    }

    fn move_down(&mut self) {
        let (starts, line, col) = caret_position(&self.value, self.cursor);
        if line + 1 < starts.len() {
            self.cursor = offset_at_col(&self.value, starts[line + 1], col);
        }
    }

    fn home(&mut self) {
        let (starts, line, _) = caret_position(&self.value, self.cursor);
        self.cursor = starts[line];
    }

    fn end(&mut self) {
        let rest = &self.value[self.cursor..];
        self.cursor += rest.find('\n').unwrap_or(rest.len());
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_boundary(&self.value, self.cursor);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn delete(&mut self) {
        let next = next_boundary(&self.value, self.cursor);
        self.value.drain(self.cursor..next);
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }

    /// Shared editing keys. Returns false when the key was not an edit.
    fn apply_edit_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Up => self.move_up(),
            KeyCode::Down => self.move_down(),
            KeyCode::Home => self.home(),
            KeyCode::End => self.end(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert_char(c)
            }
            _ => return false,
        }
        true
    }
}

impl MonthForm {
    fn from_settings(settings: MonthSettings) -> Self {
        MonthForm {
            start_day: FieldValue::new(&settings.start_day.to_string()),
            total_days: FieldValue::new(&settings.total_days.to_string()),
            field: MonthField::StartDay,
        }
    }

    fn toggle_field(&mut self) {
        self.field = match self.field {
            MonthField::StartDay => MonthField::TotalDays,
            MonthField::TotalDays => MonthField::StartDay,
        };
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            MonthField::StartDay => &mut self.start_day,
            MonthField::TotalDays => &mut self.total_days,
        }
    }

    fn settings(&self) -> MonthSettings {
        MonthSettings::from_raw(Some(&self.start_day.value), Some(&self.total_days.value))
    }
}

impl App {
    fn new(session: Session) -> Self {
        let status = format!("Loaded planner from {}", session.store.location());
        App {
            planner: session.planner,
            store: session.store,
            location: session.location,
            focus: Focus::Month,
            selected_day: 1,
            selected_weekday: Weekday::Mon,
            last_save: Instant::now(),
            status,
            mode: Mode::Normal,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if event::poll(Duration::from_millis(200))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        info!("planner tui closed");
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.mode {
            Mode::Normal => return self.handle_normal_key(key),
            Mode::EditingNote { .. } => self.handle_note_key(key),
            Mode::Palette { .. } => self.handle_palette_key(key),
            Mode::MonthForm(_) => self.handle_month_form_key(key),
            Mode::ConfirmClear => self.handle_confirm_key(key),
        }
        false
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Month => Focus::Week,
                    Focus::Week => Focus::Month,
                };
            }
            KeyCode::Left | KeyCode::Char('h') => self.move_selection(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-7),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(7),
            KeyCode::Enter | KeyCode::Char('e') => {
                let cell = self.current_cell();
                let text = self.planner.note_for(cell).unwrap_or_default().to_string();
                self.mode = Mode::EditingNote {
                    cell,
                    field: FieldValue::new(&text),
                };
                self.status = format!(
                    "Editing {} (Ctrl+S save, Enter newline, Esc cancel)",
                    cell_label(cell)
                );
            }
            KeyCode::Char('p') => {
                self.mode = Mode::Palette { idx: 0 };
                self.status = "Pick an emoji (←/→ choose, Enter drop, Esc cancel)".into();
            }
            KeyCode::Char('x') => {
                let cell = self.current_cell();
                match self.planner.clear_cell(cell) {
                    Ok(()) => self.persist(format!("Cleared {}", cell_label(cell))),
                    Err(err) => self.status = err.to_string(),
                }
            }
            KeyCode::Char('t') => self.switch_theme(self.planner.theme().next()),
            KeyCode::Char('T') => self.switch_theme(self.planner.theme().prev()),
            KeyCode::Char('g') => {
                self.mode = Mode::MonthForm(MonthForm::from_settings(
                    self.planner.grid().settings(),
                ));
                self.status = "Month settings (Tab switch field, Enter generate, Esc cancel)".into();
            }
            KeyCode::Char('C') => {
                self.mode = Mode::ConfirmClear;
                self.status = "Clear everything? (y to confirm, n/Esc to cancel)".into();
            }
            _ => {}
        }
        false
    }

    fn handle_note_key(&mut self, key: KeyEvent) {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let mut close = false;
        if let Mode::EditingNote { cell, field } = &mut mode {
            let control = key.modifiers.contains(KeyModifiers::CONTROL);
            match key.code {
                KeyCode::Esc => {
                    close = true;
                    self.status = "Canceled".into();
                }
                KeyCode::Char('s') if control => {
                    close = self.save_note(*cell, &field.value);
                }
                KeyCode::Enter if control => {
                    close = self.save_note(*cell, &field.value);
                }
                KeyCode::Enter => field.insert_char('\n'),
                _ => {
                    field.apply_edit_key(key);
                }
            }
        }
        self.mode = if close { Mode::Normal } else { mode };
    }

    fn handle_palette_key(&mut self, key: KeyEvent) {
        let idx = match self.mode {
            Mode::Palette { idx } => idx,
            _ => return,
        };
        let len = EMOJI_PALETTE.len();
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                self.status = "Canceled".into();
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.mode = Mode::Palette {
                    idx: (idx + len - 1) % len,
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.mode = Mode::Palette {
                    idx: (idx + 1) % len,
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.mode = Mode::Normal;
                self.drop_emoji(EMOJI_PALETTE[idx]);
            }
            _ => {}
        }
    }

    fn handle_month_form_key(&mut self, key: KeyEvent) {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let mut close = false;
        if let Mode::MonthForm(form) = &mut mode {
            match key.code {
                KeyCode::Esc => {
                    close = true;
                    self.status = "Canceled".into();
                }
                KeyCode::Tab | KeyCode::BackTab => form.toggle_field(),
                KeyCode::Enter => {
                    self.regenerate(form.settings());
                    close = true;
                }
                KeyCode::Up | KeyCode::Down => {}
                _ => {
                    form.active_field_mut().apply_edit_key(key);
                }
            }
        }
        self.mode = if close { Mode::Normal } else { mode };
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.store.clear(&mut self.planner);
                self.last_save = Instant::now();
                self.status = "Cleared all notes and emojis".into();
                self.mode = Mode::Normal;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Clear canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
    }

    fn current_cell(&self) -> CellRef {
        match self.focus {
            Focus::Month => CellRef::Month(self.selected_day),
            Focus::Week => CellRef::Week(self.selected_weekday),
        }
    }

    fn move_selection(&mut self, delta: i64) {
        match self.focus {
            Focus::Month => {
                let total = self.planner.grid().settings().total_days as i64;
                let target = self.selected_day as i64 + delta;
                if (1..=total).contains(&target) {
                    self.selected_day = target as u32;
                }
            }
            Focus::Week => {
                if delta == 1 {
                    self.selected_weekday = self.selected_weekday.succ();
                } else if delta == -1 {
                    self.selected_weekday = self.selected_weekday.pred();
                }
            }
        }
    }

    fn save_note(&mut self, cell: CellRef, text: &str) -> bool {
        match self.planner.set_note(cell, text) {
            Ok(()) => {
                self.persist(format!("Saved note for {}", cell_label(cell)));
                true
            }
            Err(err) => {
                self.status = format!("Could not save note: {}", err);
                false
            }
        }
    }

    fn drop_emoji(&mut self, glyph: &str) {
        let cell = self.current_cell();
        match self.planner.drop_emoji(cell, glyph) {
            Ok(DropOutcome::Ignored) => self.status = "Nothing to drop".into(),
            Ok(_) => self.persist(format!("Dropped {} on {}", glyph, cell_label(cell))),
            Err(err) => self.status = format!("Could not drop: {}", err),
        }
    }

    fn switch_theme(&mut self, theme: Theme) {
        self.planner.set_theme(theme.name());
        self.persist(format!("Theme {}", theme.name()));
    }

    fn regenerate(&mut self, settings: MonthSettings) {
        self.planner.regenerate(settings);
        let settings = self.planner.grid().settings();
        self.selected_day = self.selected_day.clamp(1, settings.total_days);
        debug!(
            "tui regenerated month start_day={} total_days={}",
            settings.start_day, settings.total_days
        );
        self.persist(format!(
            "Generated {} days starting {}",
            settings.total_days,
            weekday_name(settings.start_day)
        ));
    }

    fn persist(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.store.save(&self.planner) {
            self.last_save = Instant::now();
            self.status = message;
        } else {
            self.status = format!(
                "{} (not saved, see {})",
                message,
                self.location.log_dir().display()
            );
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(6),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        self.draw_month(f, layout[1]);
        self.draw_week(f, layout[2]);
        self.draw_footer(f, layout[3]);

        match &self.mode {
            Mode::EditingNote { cell, field } => self.draw_note_editor(f, *cell, field),
            Mode::Palette { idx } => self.draw_palette(f, *idx),
            Mode::MonthForm(form) => self.draw_month_form(f, form),
            Mode::ConfirmClear => self.draw_confirm(f),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let palette = self.planner.theme().palette();
        let title = Line::from(vec![
            Span::styled(
                "planner ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("theme {}", self.planner.theme_name()),
                Style::default().fg(rgb(palette.border)),
            ),
            Span::raw("  •  "),
            Span::styled(
                self.location.scope_label(),
                Style::default().fg(Color::Green),
            ),
            Span::raw("  •  "),
            Span::styled(self.store.location(), Style::default().fg(Color::DarkGray)),
            Span::raw("  •  "),
            Span::styled(
                format!("saved {}", format_elapsed(self.last_save)),
                Style::default().fg(Color::Gray),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_month(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let palette = self.planner.theme().palette();
        let focused = self.focus == Focus::Month;
        let settings = self.planner.grid().settings();
        let block = frame_block(
            format!(
                "Month • {} days • day 1 on {}",
                settings.total_days,
                weekday_name(settings.start_day)
            ),
            palette,
            focused,
        );
        let inner = block.inner(area);
        f.render_widget(block, area);

        let weeks = self.planner.grid().week_count().max(1) as u32;
        let mut constraints = vec![Constraint::Length(1)];
        constraints.extend((0..weeks).map(|_| Constraint::Ratio(1, weeks)));
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(inner);

        let headings = seven_columns(rows[0]);
        for (idx, name) in ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
            .iter()
            .enumerate()
        {
            let heading = Paragraph::new(Span::styled(*name, Style::default().fg(Color::Gray)))
                .alignment(Alignment::Center);
            f.render_widget(heading, headings[idx]);
        }

        for (week_idx, week) in self.planner.grid().weeks().enumerate() {
            let columns = seven_columns(rows[week_idx + 1]);
            for (col, slot) in week.iter().enumerate() {
                let cell = match slot {
                    Slot::Day(cell) => cell,
                    Slot::Placeholder => continue,
                };
                let widget = cell_widget(
                    format!("{:>2}", cell.day),
                    self.planner.emoji(&cell.emoji_key),
                    self.planner.note(&cell.note_key),
                    focused && cell.day == self.selected_day,
                    palette,
                );
                f.render_widget(widget, columns[col]);
            }
        }
    }

    fn draw_week(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let palette = self.planner.theme().palette();
        let focused = self.focus == Focus::Week;
        let block = frame_block("This week".to_string(), palette, focused);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let columns = seven_columns(inner);
        for (idx, cell) in self.planner.week().iter().enumerate() {
            let widget = cell_widget(
                cell.weekday.to_string(),
                self.planner.emoji(&cell.emoji_key),
                self.planner.note(&cell.note_key),
                focused && cell.weekday == self.selected_weekday,
                palette,
            );
            f.render_widget(widget, columns[idx]);
        }
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, rows[1]);
    }

    fn draw_note_editor(&self, f: &mut ratatui::Frame<'_>, cell: CellRef, field: &FieldValue) {
        let area = centered_rect(60, 50, f.size());
        let mut lines = field_lines("Note", field, true);
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Ctrl+S to save • Esc to cancel • Enter adds a newline • empty clears",
            Style::default().fg(Color::Gray),
        )));
        let dialog = Paragraph::new(lines)
            .block(overlay_block(
                format!("Note for {}", cell_label(cell)),
                Color::Cyan,
            ))
            .wrap(Wrap { trim: false });
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_palette(&self, f: &mut ratatui::Frame<'_>, selected: usize) {
        let area = centered_rect(60, 20, f.size());
        let mut spans = Vec::new();
        for (idx, glyph) in EMOJI_PALETTE.iter().enumerate() {
            let style = if idx == selected {
                Style::default()
                    .bg(Color::Cyan)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            spans.push(Span::styled(format!(" {} ", glyph), style));
            spans.push(Span::raw(" "));
        }
        let target = cell_label(self.current_cell());
        let body = vec![
            Line::from(spans),
            Line::from(""),
            Line::from(Span::styled(
                format!("Enter drops on {} • Esc to cancel", target),
                Style::default().fg(Color::Gray),
            )),
        ];
        let dialog = Paragraph::new(body)
            .alignment(Alignment::Center)
            .block(overlay_block("Emoji".to_string(), Color::LightYellow));
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_month_form(&self, f: &mut ratatui::Frame<'_>, form: &MonthForm) {
        let area = centered_rect(50, 40, f.size());
        let mut lines = Vec::new();
        lines.extend(field_lines(
            "Day 1 weekday (0 = Mon .. 6 = Sun)",
            &form.start_day,
            form.field == MonthField::StartDay,
        ));
        lines.extend(field_lines(
            "Days in month (28-31)",
            &form.total_days,
            form.field == MonthField::TotalDays,
        ));
        lines.push(Line::from(Span::styled(
            "Enter regenerates the grid and discards month notes • Esc to cancel",
            Style::default().fg(Color::LightRed),
        )));
        let dialog = Paragraph::new(lines)
            .block(overlay_block("Generate Month".to_string(), Color::Cyan))
            .wrap(Wrap { trim: true });
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>) {
        let area = centered_rect(50, 30, f.size());
        let body = vec![
            Line::from(Span::styled(
                "Clear every note and emoji?",
                Style::default()
                    .fg(Color::LightRed)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("The saved planner is deleted as well."),
            Line::from("Press y to confirm, n or Esc to cancel"),
        ];
        let dialog = Paragraph::new(body)
            .alignment(Alignment::Center)
            .block(overlay_block("Confirm Clear".to_string(), Color::LightRed));
        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }
}

fn footer_help_line() -> Line<'static> {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::LightCyan));
    Line::from(vec![
        key("←↑↓→ / h j k l"),
        Span::raw(" move  "),
        key("Tab"),
        Span::raw(" month/week  "),
        key("e"),
        Span::raw(" note  "),
        key("p"),
        Span::raw(" emoji  "),
        key("x"),
        Span::raw(" clear cell  "),
        key("t/T"),
        Span::raw(" theme  "),
        key("g"),
        Span::raw(" month  "),
        key("C"),
        Span::raw(" clear all  "),
        key("q"),
        Span::raw(" quit"),
    ])
}

fn frame_block(title: String, palette: ThemePalette, focused: bool) -> Block<'static> {
    let color = if focused {
        rgb(palette.border)
    } else {
        Color::DarkGray
    };
    Block::default()
        .title(Span::styled(
            title,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

fn overlay_block(title: String, color: Color) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            title,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

fn cell_widget(
    label: String,
    emoji: &str,
    note: &str,
    selected: bool,
    palette: ThemePalette,
) -> Paragraph<'static> {
    let mut title = vec![Span::styled(
        label,
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if !emoji.is_empty() {
        title.push(Span::raw(" "));
        title.push(Span::raw(emoji.to_string()));
    }
    let body: Vec<Line<'static>> = if note.trim().is_empty() {
        vec![Line::from(Span::styled(
            NOTE_PLACEHOLDER,
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        ))]
    } else {
        note.lines().map(|l| Line::from(l.to_string())).collect()
    };
    let mut block = Block::default()
        .title(Line::from(title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(rgb(palette.border)));
    if selected {
        block = block
            .style(Style::default().bg(rgb(palette.background)).fg(Color::Black))
            .border_style(
                Style::default()
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            );
    }
    Paragraph::new(body).block(block).wrap(Wrap { trim: true })
}

fn field_lines(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let label_style = if active {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    let mut lines = vec![Line::from(Span::styled(format!("{}:", label), label_style))];
    for part in text.split('\n') {
        lines.push(Line::from(format!("  {}", part)));
    }
    lines
}

fn seven_columns(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 7); 7])
        .split(area)
        .to_vec()
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(r, g, b)
}

fn cell_label(cell: CellRef) -> String {
    match cell {
        CellRef::Month(day) => format!("day {}", day),
        CellRef::Week(weekday) => weekday.to_string(),
    }
}

fn weekday_name(offset: u32) -> &'static str {
    match offset {
        0 => "Mon",
        1 => "Tue",
        2 => "Wed",
        3 => "Thu",
        4 => "Fri",
        5 => "Sat",
        _ => "Sun",
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn prev_boundary(text: &str, cursor: usize) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_boundary(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

/// Line start offsets, the caret's line index and its column in chars.
fn caret_position(text: &str, cursor: usize) -> (Vec<usize>, usize, usize) {
    let mut starts = vec![0];
    starts.extend(
        text.char_indices()
            .filter(|(_, ch)| *ch == '\n')
            .map(|(idx, _)| idx + 1),
    );
    let line = starts.iter().rposition(|start| *start <= cursor).unwrap_or(0);
    let col = text[starts[line]..cursor].chars().count();
    (starts, line, col)
}

fn offset_at_col(text: &str, start: usize, col: usize) -> usize {
    let line = &text[start..];
    let line = &line[..line.find('\n').unwrap_or(line.len())];
    line.char_indices()
        .nth(col)
        .map(|(idx, _)| start + idx)
        .unwrap_or(start + line.len())
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent {
            modifiers: KeyModifiers::CONTROL,
            ..press(KeyCode::Char(ch))
        }
    }

    fn app_in(dir: &std::path::Path) -> App {
        let location = DataLocation {
            dir: dir.to_path_buf(),
            scope: crate::storage::DataScope::Explicit,
        };
        App::new(Session::open(location, "default"))
    }

    fn reload(dir: &std::path::Path) -> Planner {
        StateStore::new(FileStore::new(dir.to_path_buf()), "default").load()
    }

    #[test]
    fn key_mutations_are_saved_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());

        app.handle_key(press(KeyCode::Char('t')));
        assert_eq!(reload(dir.path()).theme(), Theme::Spring);

        app.handle_key(press(KeyCode::Char('l')));
        app.handle_key(press(KeyCode::Char('e')));
        app.handle_key(press(KeyCode::Char('h')));
        app.handle_key(press(KeyCode::Char('i')));
        app.handle_key(ctrl('s'));
        assert_eq!(reload(dir.path()).note("month-note-2"), "hi");

        app.handle_key(press(KeyCode::Char('p')));
        app.handle_key(press(KeyCode::Enter));
        assert_eq!(reload(dir.path()).emoji("month-emoji-2"), EMOJI_PALETTE[0]);

        app.handle_key(press(KeyCode::Char('x')));
        let planner = reload(dir.path());
        assert_eq!(planner.note("month-note-2"), "");
        assert_eq!(planner.emoji("month-emoji-2"), "");

        app.handle_key(press(KeyCode::Tab));
        app.handle_key(press(KeyCode::Char('p')));
        app.handle_key(press(KeyCode::Right));
        app.handle_key(press(KeyCode::Enter));
        assert_eq!(reload(dir.path()).emoji("week-emoji-mon"), EMOJI_PALETTE[1]);

        app.handle_key(press(KeyCode::Char('g')));
        app.handle_key(press(KeyCode::Backspace));
        app.handle_key(press(KeyCode::Char('4')));
        app.handle_key(press(KeyCode::Enter));
        let planner = reload(dir.path());
        assert_eq!(planner.grid().settings(), MonthSettings::new(4, 30));
        assert_eq!(planner.emoji("week-emoji-mon"), EMOJI_PALETTE[1]);
        assert_eq!(planner.theme(), Theme::Spring);

        app.handle_key(press(KeyCode::Char('C')));
        app.handle_key(press(KeyCode::Char('y')));
        assert!(reload(dir.path()).is_empty());
        assert!(!FileStore::new(dir.path().to_path_buf())
            .path_for(crate::storage::STATE_KEY)
            .exists());
    }

    #[test]
    fn field_editing_moves_across_lines() {
        let mut field = FieldValue::new("ab\ncdef");
        field.move_up();
        assert_eq!(field.cursor, 2);
        field.move_down();
        field.end();
        assert_eq!(field.cursor, field.value.len());
        field.home();
        assert_eq!(field.cursor, 3);
        field.backspace();
        assert_eq!(field.value, "abcdef");
    }

    #[test]
    fn field_handles_multibyte_glyphs() {
        let mut field = FieldValue::new("☕x");
        field.move_left();
        field.move_left();
        assert_eq!(field.cursor, 0);
        field.delete();
        assert_eq!(field.value, "x");
        assert!(field.apply_edit_key(press(KeyCode::Char('y'))));
        assert_eq!(field.value, "yx");
        assert!(!field.apply_edit_key(press(KeyCode::F(2))));
    }

    #[test]
    fn month_form_parses_leniently() {
        let mut form = MonthForm::from_settings(MonthSettings::new(2, 31));
        assert_eq!(form.settings(), MonthSettings::new(2, 31));
        form.active_field_mut().backspace();
        form.active_field_mut().insert_char('9');
        form.toggle_field();
        form.active_field_mut().value = "x".into();
        assert_eq!(form.settings(), MonthSettings::new(0, 30));
    }

    #[test]
    fn caret_position_counts_chars() {
        let (starts, line, col) = caret_position("hé\nyo", 6);
        assert_eq!(starts, vec![0, 4]);
        assert_eq!(line, 1);
        assert_eq!(col, 2);
    }
}
