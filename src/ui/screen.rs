use ratatui::Frame;
use typespeed::clock::Clock;

use crate::{ui::history::render_history, App, AppState};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen<K: Clock> {
    fn render(&self, app: &App<K>, f: &mut Frame);
}

/// Menu, countdown, typing and results all draw through the `App` widget.
pub struct SessionScreen;

impl<K: Clock> Screen<K> for SessionScreen {
    fn render(&self, app: &App<K>, f: &mut Frame) {
        f.render_widget(app, f.area());
    }
}

/// History table - uses dedicated renderer
pub struct HistoryScreen;

impl<K: Clock> Screen<K> for HistoryScreen {
    fn render(&self, app: &App<K>, f: &mut Frame) {
        render_history(app, f);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen<K: Clock>(state: AppState) -> Box<dyn Screen<K>> {
    match state {
        AppState::History => Box::new(HistoryScreen),
        AppState::Menu | AppState::Countdown | AppState::Typing | AppState::Results => {
            Box::new(SessionScreen)
        }
    }
}
