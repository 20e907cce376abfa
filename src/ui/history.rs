use chrono::{DateTime, Local};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use time_humanize::{Accuracy, HumanTime, Tense};
use typespeed::{clock::Clock, results::StoredResult, score::Rating};

use crate::App;

/// "3 minutes ago" style label for a stored timestamp.
pub fn relative_time(then: DateTime<Local>, now: DateTime<Local>) -> String {
    let elapsed = (now - then).to_std().unwrap_or_default();
    HumanTime::from(elapsed).to_text_en(Accuracy::Rough, Tense::Past)
}

fn rating_color(rating: Rating) -> Color {
    match rating {
        Rating::Beginner => Color::Gray,
        Rating::Intermediate => Color::Blue,
        Rating::AboveAverage => Color::Green,
        Rating::Fast => Color::Yellow,
        Rating::Professional => Color::Magenta,
    }
}

/// Pure presenter for one history row.
pub fn present_row(result: &StoredResult, now: DateTime<Local>) -> Row<'static> {
    let record = &result.record;
    let rating = record.rating();
    Row::new(vec![
        Cell::from(relative_time(record.timestamp, now)),
        Cell::from(record.difficulty.to_string()),
        Cell::from(record.wpm.to_string()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(format!("{}%", record.accuracy)),
        Cell::from(format!(
            "{}/{}",
            record.correct_words, record.total_typed_words
        )),
        Cell::from(rating.to_string()).style(Style::default().fg(rating_color(rating))),
    ])
}

fn results_table(rows: &[StoredResult], title: String, now: DateTime<Local>) -> Table<'static> {
    let header = Row::new(vec!["When", "Level", "WPM", "Acc", "Words", "Rating"])
        .style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED));
    Table::new(
        rows.iter().map(|r| present_row(r, now)),
        [
            Constraint::Length(18),
            Constraint::Length(8),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Length(8),
            Constraint::Min(13),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title(title))
}

pub fn render_history<K: Clock>(app: &App<K>, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(f.area());

    if app.history.is_empty() {
        let message = if app.has_history_store() {
            "No results yet.\nFinish a test to see it here!"
        } else {
            "History is unavailable: no results database."
        };
        let empty = Paragraph::new(message)
            .block(Block::default().borders(Borders::ALL).title("History"))
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
        f.render_widget(empty, chunks[0]);
    } else {
        let now = Local::now();
        let limit = app.history_limit;
        f.render_widget(
            results_table(&app.history, format!("History: last {limit}"), now),
            chunks[0],
        );
        f.render_widget(
            results_table(&app.best, format!("Best {limit}"), now),
            chunks[1],
        );
    }

    let instructions = Paragraph::new("(b)ack | (esc)ape | (q)uit")
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC))
        .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use typespeed::{passage::Difficulty, results::ScoreRecord, score::FinalScore};

    #[test]
    fn test_relative_time() {
        let now = Local::now();
        let label = relative_time(now - Duration::minutes(5), now);
        assert!(label.contains("ago"), "{label}");
    }

    #[test]
    fn test_relative_time_future_clamps() {
        let now = Local::now();
        // clock skew must not panic
        let _ = relative_time(now + Duration::minutes(5), now);
    }

    #[test]
    fn test_present_row_builds() {
        let now = Local::now();
        let record = ScoreRecord::new(FinalScore::compute(82, 90, 60), Difficulty::Hard, now);
        let _row = present_row(&StoredResult { id: 3, record }, now);
        assert_eq!(rating_color(Rating::Professional), Color::Magenta);
    }
}
