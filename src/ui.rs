pub mod history;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{App, AppState};
use typespeed::{
    clock::Clock,
    controller::Notice,
    matcher::{highlight, CompletedWord, Highlight},
    passage::Difficulty,
    score::{self, format_clock, TimerUrgency},
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn hint(text: &str) -> Paragraph<'_> {
    Paragraph::new(Span::styled(
        text,
        Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
}

/// Splits `area` into a vertically centred block of `height` rows plus a
/// footer row at the bottom.
fn centred(area: Rect, height: u16) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);
    (chunks[1], chunks[3])
}

impl<K: Clock> Widget for &App<K> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state() {
            AppState::Menu => render_menu(self, area, buf),
            AppState::Countdown => render_countdown(self, area, buf),
            AppState::Typing => render_typing(self, area, buf),
            AppState::Results => render_results(self, area, buf),
            // Drawn by the history screen with a frame; fall back to the menu.
            AppState::History => render_menu(self, area, buf),
        }
    }
}

fn render_menu<K: Clock>(app: &App<K>, area: Rect, buf: &mut Buffer) {
    let selected = app.controller.selected_difficulty();
    let mut lines = vec![
        Line::from(Span::styled("typespeed", bold().fg(Color::Cyan))),
        Line::from(Span::styled(
            format!("{} second typing test", app.controller.state().config().time_limit),
            dim(),
        )),
        Line::default(),
    ];

    for (idx, difficulty) in Difficulty::ALL.iter().enumerate() {
        let is_cursor = idx == app.menu_cursor;
        let marker = if selected == Some(*difficulty) { "●" } else { "○" };
        let style = if selected == Some(*difficulty) {
            bold().fg(Color::Green)
        } else if is_cursor {
            bold()
        } else {
            dim()
        };
        lines.push(Line::from(Span::styled(
            format!("{} ({}) {}", marker, idx + 1, difficulty),
            style,
        )));
    }

    lines.push(Line::default());
    lines.push(Line::from(if selected.is_some() {
        Span::styled("press enter to start", bold().fg(Color::Yellow))
    } else {
        Span::styled("choose a difficulty", dim())
    }));

    let (body, footer) = centred(area, lines.len() as u16);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(body, buf);
    hint("(1-3) difficulty | (enter) start | (h)istory | (q)uit").render(footer, buf);
}

fn render_countdown<K: Clock>(app: &App<K>, area: Rect, buf: &mut Buffer) {
    let lines = vec![
        Line::from(Span::styled("Get ready...", dim())),
        Line::default(),
        Line::from(Span::styled(
            app.controller.countdown_remaining().to_string(),
            bold().fg(Color::Yellow),
        )),
    ];
    let (body, footer) = centred(area, lines.len() as u16);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(body, buf);
    hint("(esc) back to menu").render(footer, buf);
}

fn urgency_style(remaining: u32) -> Style {
    match TimerUrgency::for_remaining(remaining) {
        TimerUrgency::Calm => bold(),
        TimerUrgency::Warning => bold().fg(Color::Yellow),
        TimerUrgency::Critical => bold().fg(Color::Red),
    }
}

/// Words of the current line: finished ones green or red, the word under the
/// cursor underlined and tinted by how the partial input matches.
fn line_spans<'a>(
    line: &'a [String],
    word_index: usize,
    completed: &[CompletedWord],
    typed: &str,
) -> Vec<Span<'a>> {
    let mut spans = Vec::with_capacity(line.len() * 2);
    for (idx, word) in line.iter().enumerate() {
        let style = if idx < word_index {
            match completed.get(idx) {
                Some(done) if done.correct => bold().fg(Color::Green),
                Some(_) => bold().fg(Color::Red),
                None => dim(),
            }
        } else if idx == word_index {
            let underlined = bold().add_modifier(Modifier::UNDERLINED);
            match highlight(word, typed) {
                Highlight::Pending => underlined.fg(Color::Cyan),
                Highlight::CorrectSoFar => underlined.fg(Color::Green),
                Highlight::IncorrectSoFar => underlined.fg(Color::Red),
            }
        } else {
            dim()
        };
        if idx > 0 {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(word.as_str(), style));
    }
    spans
}

fn render_typing<K: Clock>(app: &App<K>, area: Rect, buf: &mut Buffer) {
    let controller = &app.controller;
    let Some(line) = controller.current_line() else {
        return;
    };

    let max_width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1) as usize;
    let line_width = line.iter().map(|w| w.width() + 1).sum::<usize>();
    let line_rows = (line_width / max_width + 1) as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(line_rows),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let remaining = controller.time_remaining();
    let stats = Line::from(vec![
        Span::styled(format_clock(remaining), urgency_style(remaining)),
        Span::styled("   wpm ", dim()),
        Span::styled(controller.live_wpm().to_string(), bold()),
        Span::styled("   acc ", dim()),
        Span::styled(format!("{}%", controller.live_accuracy()), bold()),
    ]);
    Paragraph::new(stats)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let state = controller.state();
    if let Some(passage) = state.passage() {
        let progress = format!(
            "line {}/{}  {} · {}",
            state.line_index() + 1,
            passage.line_count(),
            passage.difficulty,
            passage.category
        );
        Paragraph::new(Span::styled(progress, dim()))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
    }

    let typed = controller.input_buffer();
    Paragraph::new(Line::from(line_spans(
        line,
        controller.word_index(),
        controller.completed_words(),
        typed,
    )))
    .alignment(if line_rows == 1 {
        Alignment::Center
    } else {
        Alignment::Left
    })
    .wrap(Wrap { trim: true })
    .render(chunks[3], buf);

    let input_hint = if state.timer_armed() {
        ""
    } else {
        "start typing, the timer begins with your first key"
    };
    Paragraph::new(Span::styled(typed, bold()))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(input_hint, dim())),
        )
        .render(chunks[5], buf);

    hint("(esc) restart").render(chunks[7], buf);
}

fn render_results<K: Clock>(app: &App<K>, area: Rect, buf: &mut Buffer) {
    let Some(record) = app.controller.last_record() else {
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled("Test complete", bold().fg(Color::Cyan))),
        Line::default(),
        Line::from(vec![
            Span::styled(format!("{} wpm", record.wpm), bold().fg(Color::Green)),
            Span::styled(format!("  ({} cpm)", score::cpm(record.wpm)), dim()),
        ]),
        Line::from(vec![
            Span::styled(format!("{}% accuracy", record.accuracy), bold()),
            Span::styled(
                format!("  ({}/{} words)", record.correct_words, record.total_typed_words),
                dim(),
            ),
        ]),
        Line::from(vec![
            Span::styled(format!("{} words typed", record.total_typed_words), bold()),
            Span::styled(
                format!(
                    "  ({} words/sec)",
                    score::words_per_second(record.total_typed_words)
                ),
                dim(),
            ),
        ]),
        Line::from(vec![
            Span::styled("rating ", dim()),
            Span::styled(record.rating().to_string(), bold().fg(Color::Magenta)),
            Span::styled(format!("  · {}", record.difficulty), dim()),
        ]),
        Line::default(),
    ];

    lines.push(match app.controller.notice() {
        Some(Notice::Saved) => Line::from(Span::styled("result saved", Style::default().fg(Color::Green))),
        Some(Notice::SaveFailed(reason)) => Line::from(Span::styled(
            format!("could not save result: {reason}"),
            Style::default().fg(Color::Red),
        )),
        None if app.controller.has_persistence() => Line::from(Span::styled("saving...", dim())),
        None => Line::from(Span::styled("not saved", dim())),
    });

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(lines.len() as u16),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(chunks[1], buf);
    hint("(enter) new test | (h)istory | (q)uit").render(chunks[3], buf);
}

pub fn ui<K: Clock>(app: &App<K>, f: &mut Frame) {
    screen::current_screen::<K>(app.state()).render(app, f);
}
