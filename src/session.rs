use crate::matcher::{match_input, Boundary, CompletedWord, MatchEvent, WORD_SEPARATOR};
use crate::passage::{Difficulty, Passage};
use crate::score::{self, FinalScore, TIME_LIMIT};
use tracing::debug;

/// Units counted down before typing begins.
pub const COUNTDOWN_FROM: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub time_limit: u32,
    pub countdown: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time_limit: TIME_LIMIT,
            countdown: COUNTDOWN_FROM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Idle,
    Countdown,
    Running,
    Complete,
}

/// Everything that can happen to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Begin the countdown for a selected passage.
    Start(Passage),
    /// The whole input buffer after a change.
    Input(String),
    /// One time unit passed.
    Tick,
    Restart,
}

/// What a reduced event did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Ignored,
    CountdownStarted,
    CountedDown,
    /// The countdown hit zero and typing may begin.
    Running,
    Typing,
    WordCompleted(CompletedWord),
    LineCompleted(CompletedWord),
    TimerTicked,
    Completed(FinalScore),
    Reset,
}

/// Typing session state. Mutated only through [`SessionState::reduce`].
///
/// The timer does not move when the session enters `Running`; it is armed by
/// the first character that reaches the input buffer, so time spent reading
/// the passage before typing is never counted.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    config: SessionConfig,
    phase: Phase,
    passage: Option<Passage>,
    line_index: usize,
    word_index: usize,
    input_buffer: String,
    completed_words: Vec<CompletedWord>,
    total_typed_words: u32,
    correct_words: u32,
    time_remaining: u32,
    countdown_remaining: u32,
    timer_armed: bool,
    /// Set when a line closed on an exact match of its last word; the
    /// separator the user types next belongs to that word.
    separator_pending: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl SessionState {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            passage: None,
            line_index: 0,
            word_index: 0,
            input_buffer: String::new(),
            completed_words: Vec::new(),
            total_typed_words: 0,
            correct_words: 0,
            time_remaining: config.time_limit,
            countdown_remaining: config.countdown,
            timer_armed: false,
            separator_pending: false,
        }
    }

    pub fn reduce(&mut self, event: SessionEvent) -> Transition {
        match event {
            SessionEvent::Start(passage) => self.start(passage),
            SessionEvent::Input(raw) => self.input(raw),
            SessionEvent::Tick => self.tick(),
            SessionEvent::Restart => {
                *self = Self::new(self.config);
                Transition::Reset
            }
        }
    }

    fn start(&mut self, passage: Passage) -> Transition {
        if self.phase != Phase::Idle {
            return Transition::Ignored;
        }
        debug!(passage = %passage.id, difficulty = %passage.difficulty, "countdown started");
        self.passage = Some(passage);
        self.phase = Phase::Countdown;
        self.countdown_remaining = self.config.countdown;
        if self.countdown_remaining == 0 {
            self.enter_running();
            return Transition::Running;
        }
        Transition::CountdownStarted
    }

    fn enter_running(&mut self) {
        self.phase = Phase::Running;
        self.line_index = 0;
        self.word_index = 0;
        self.input_buffer.clear();
        self.completed_words.clear();
        self.total_typed_words = 0;
        self.correct_words = 0;
        self.time_remaining = self.config.time_limit;
        self.timer_armed = false;
        self.separator_pending = false;
    }

    fn tick(&mut self) -> Transition {
        match self.phase {
            Phase::Countdown => {
                self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
                if self.countdown_remaining == 0 {
                    self.enter_running();
                    debug!("session running");
                    Transition::Running
                } else {
                    Transition::CountedDown
                }
            }
            Phase::Running if self.timer_armed => {
                self.time_remaining = self.time_remaining.saturating_sub(1);
                if self.time_remaining == 0 {
                    debug!("time limit reached");
                    self.complete()
                } else {
                    Transition::TimerTicked
                }
            }
            _ => Transition::Ignored,
        }
    }

    fn input(&mut self, raw: String) -> Transition {
        if self.phase != Phase::Running || self.time_remaining == 0 {
            return Transition::Ignored;
        }
        if !self.timer_armed && !raw.is_empty() {
            self.timer_armed = true;
        }
        if std::mem::take(&mut self.separator_pending) && is_lone_separator(&raw) {
            self.input_buffer.clear();
            return Transition::Typing;
        }
        self.input_buffer = raw;

        let event = match self.current_line() {
            Some(line) => match_input(line, self.word_index, &self.input_buffer),
            None => MatchEvent::None,
        };

        match event {
            MatchEvent::None => Transition::Typing,
            MatchEvent::Completed { word, boundary } => self.complete_word(word, boundary),
        }
    }

    fn complete_word(&mut self, word: CompletedWord, boundary: Boundary) -> Transition {
        self.total_typed_words += 1;
        if word.correct {
            self.correct_words += 1;
        }
        self.completed_words.push(word.clone());

        match boundary {
            Boundary::Word => {
                self.word_index += 1;
                self.input_buffer.clear();
                Transition::WordCompleted(word)
            }
            Boundary::Line if self.line_index + 1 < self.line_count() => {
                self.separator_pending = !self.input_buffer.ends_with(WORD_SEPARATOR);
                self.line_index += 1;
                self.word_index = 0;
                self.completed_words.clear();
                self.input_buffer.clear();
                Transition::LineCompleted(word)
            }
            Boundary::Line => {
                self.input_buffer.clear();
                debug!("final word typed");
                self.complete()
            }
        }
    }

    /// Shared by the timer and the final word; only the first caller wins.
    fn complete(&mut self) -> Transition {
        if self.phase == Phase::Complete {
            return Transition::Ignored;
        }
        self.phase = Phase::Complete;
        self.timer_armed = false;
        Transition::Completed(FinalScore::compute(
            self.correct_words,
            self.total_typed_words,
            self.elapsed_secs(),
        ))
    }

    fn line_count(&self) -> usize {
        self.passage.as_ref().map_or(0, Passage::line_count)
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn passage(&self) -> Option<&Passage> {
        self.passage.as_ref()
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        self.passage.as_ref().map(|p| p.difficulty)
    }

    pub fn current_line(&self) -> Option<&[String]> {
        self.passage.as_ref()?.line(self.line_index)
    }

    pub fn line_index(&self) -> usize {
        self.line_index
    }

    pub fn word_index(&self) -> usize {
        self.word_index
    }

    pub fn input_buffer(&self) -> &str {
        &self.input_buffer
    }

    pub fn completed_words(&self) -> &[CompletedWord] {
        &self.completed_words
    }

    pub fn total_typed_words(&self) -> u32 {
        self.total_typed_words
    }

    pub fn correct_words(&self) -> u32 {
        self.correct_words
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.countdown_remaining
    }

    pub fn timer_armed(&self) -> bool {
        self.timer_armed
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.config.time_limit.saturating_sub(self.time_remaining)
    }

    pub fn live_wpm(&self) -> u32 {
        score::wpm(self.correct_words, self.elapsed_secs())
    }

    pub fn live_accuracy(&self) -> u32 {
        score::accuracy(self.correct_words, self.total_typed_words)
    }
}

fn is_lone_separator(raw: &str) -> bool {
    let mut chars = raw.chars();
    chars.next() == Some(WORD_SEPARATOR) && chars.next().is_none()
}
