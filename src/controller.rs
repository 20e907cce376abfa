use crate::clock::{Clock, Metronome};
use crate::error::ResultsError;
use crate::matcher::CompletedWord;
use crate::passage::{Difficulty, Passage, PassageCatalog};
use crate::persist::{PersistOutcome, PersistWorker};
use crate::results::ScoreRecord;
use crate::session::{Phase, SessionConfig, SessionEvent, SessionState, Transition};
use chrono::Local;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Transient message about the last save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Saved,
    SaveFailed(String),
}

/// Drives one typing session at a time: picks the passage, converts wall time
/// into timer ticks, and hands the final score to the persistence worker.
///
/// Every start and restart bumps `generation`; save outcomes tagged with an
/// older generation are dropped so they cannot touch a newer session.
#[derive(Debug)]
pub struct Controller<C: PassageCatalog, K: Clock> {
    catalog: C,
    clock: K,
    rng: StdRng,
    metronome: Metronome,
    state: SessionState,
    difficulty: Option<Difficulty>,
    generation: u64,
    persistence: Option<PersistWorker>,
    last_record: Option<ScoreRecord>,
    notice: Option<Notice>,
}

impl<C: PassageCatalog, K: Clock> Controller<C, K> {
    pub fn new(catalog: C, clock: K, config: SessionConfig) -> Self {
        Self {
            catalog,
            clock,
            rng: StdRng::from_entropy(),
            metronome: Metronome::default(),
            state: SessionState::new(config),
            difficulty: None,
            generation: 0,
            persistence: None,
            last_record: None,
            notice: None,
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_persistence(mut self, worker: PersistWorker) -> Self {
        self.persistence = Some(worker);
        self
    }

    /// Only honoured on the menu.
    pub fn select_difficulty(&mut self, difficulty: Difficulty) {
        if self.state.phase() == Phase::Idle {
            self.difficulty = Some(difficulty);
        }
    }

    /// Begins the countdown with a random passage of the selected difficulty.
    /// Does nothing when no difficulty is selected.
    pub fn start(&mut self) -> Transition {
        let Some(difficulty) = self.difficulty else {
            debug!("start ignored, no difficulty selected");
            return Transition::Ignored;
        };
        if self.state.phase() != Phase::Idle {
            return Transition::Ignored;
        }
        match self.catalog.pick(difficulty, &mut self.rng) {
            Some(passage) => self.start_with(passage),
            None => {
                warn!(%difficulty, "no passage available");
                Transition::Ignored
            }
        }
    }

    /// Begins the countdown with a known passage.
    pub fn start_with(&mut self, passage: Passage) -> Transition {
        if self.state.phase() != Phase::Idle {
            return Transition::Ignored;
        }
        self.difficulty = Some(passage.difficulty);
        self.generation += 1;
        self.last_record = None;
        self.notice = None;
        info!(passage = %passage.id, generation = self.generation, "session starting");

        let transition = self.state.reduce(SessionEvent::Start(passage));
        if transition == Transition::CountdownStarted {
            self.metronome.reset(self.clock.now());
        }
        self.apply(transition)
    }

    /// Feeds the full contents of the input field after a change.
    pub fn handle_input(&mut self, buffer: &str) -> Transition {
        let was_armed = self.state.timer_armed();
        let transition = self.state.reduce(SessionEvent::Input(buffer.to_string()));
        if !was_armed && self.state.timer_armed() {
            debug!("timer armed");
            self.metronome.reset(self.clock.now());
        }
        self.apply(transition)
    }

    /// Advances the countdown or timer by exactly one unit.
    pub fn tick(&mut self) -> Transition {
        let transition = self.state.reduce(SessionEvent::Tick);
        self.apply(transition)
    }

    /// Applies every whole unit that passed since the last call.
    pub fn advance_clock(&mut self) -> Vec<Transition> {
        let units = self.metronome.elapsed_units(self.clock.now());
        let mut transitions = Vec::new();
        for _ in 0..units {
            transitions.push(self.tick());
            if !self.metronome.is_running() {
                break;
            }
        }
        transitions
    }

    /// Back to the menu from any phase. Clears the selected difficulty.
    pub fn restart(&mut self) -> Transition {
        self.generation += 1;
        self.difficulty = None;
        self.last_record = None;
        self.notice = None;
        self.metronome.stop();
        debug!(generation = self.generation, "session restarted");
        self.state.reduce(SessionEvent::Restart)
    }

    /// Collects finished saves without blocking. Returns true when the notice
    /// changed.
    pub fn poll_persistence(&mut self) -> bool {
        let mut changed = false;
        while let Some(outcome) = self.persistence.as_ref().and_then(PersistWorker::try_recv) {
            changed |= self.accept(outcome);
        }
        changed
    }

    /// Blocks up to `timeout` for one save outcome.
    pub fn await_persistence(&mut self, timeout: Duration) -> bool {
        match self
            .persistence
            .as_ref()
            .and_then(|worker| worker.recv_timeout(timeout))
        {
            Some(outcome) => self.accept(outcome),
            None => false,
        }
    }

    fn accept(&mut self, outcome: PersistOutcome) -> bool {
        if outcome.generation != self.generation {
            debug!(
                stale = outcome.generation,
                current = self.generation,
                "dropping stale save outcome"
            );
            return false;
        }
        self.notice = Some(match outcome.result {
            Ok(stored) => {
                info!(id = stored.id, "result saved");
                Notice::Saved
            }
            Err(e) => e.into(),
        });
        true
    }

    fn apply(&mut self, transition: Transition) -> Transition {
        match &transition {
            Transition::Running => {
                // Typing time is measured from the first keystroke.
                self.metronome.stop();
            }
            Transition::Completed(score) => {
                self.metronome.stop();
                match self.state.difficulty() {
                    Some(difficulty) => {
                        let record = ScoreRecord::new(*score, difficulty, Local::now());
                        info!(
                            wpm = record.wpm,
                            accuracy = record.accuracy,
                            rating = %record.rating(),
                            "session complete"
                        );
                        self.persist(record.clone());
                        self.last_record = Some(record);
                    }
                    None => warn!("completed session has no passage; result not recorded"),
                }
            }
            _ => {}
        }
        transition
    }

    fn persist(&mut self, record: ScoreRecord) {
        let Some(worker) = &self.persistence else {
            return;
        };
        if let Err(e) = worker.submit(self.generation, record) {
            warn!(error = %e, "could not queue result");
            self.notice = Some(e.into());
        }
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn selected_difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_line(&self) -> Option<&[String]> {
        self.state.current_line()
    }

    pub fn word_index(&self) -> usize {
        self.state.word_index()
    }

    pub fn completed_words(&self) -> &[CompletedWord] {
        self.state.completed_words()
    }

    pub fn input_buffer(&self) -> &str {
        self.state.input_buffer()
    }

    pub fn time_remaining(&self) -> u32 {
        self.state.time_remaining()
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.state.countdown_remaining()
    }

    pub fn live_wpm(&self) -> u32 {
        self.state.live_wpm()
    }

    pub fn live_accuracy(&self) -> u32 {
        self.state.live_accuracy()
    }

    pub fn last_record(&self) -> Option<&ScoreRecord> {
        self.last_record.as_ref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn has_persistence(&self) -> bool {
        self.persistence.is_some()
    }
}

impl From<ResultsError> for Notice {
    fn from(e: ResultsError) -> Self {
        Notice::SaveFailed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::passage::{Category, EmbeddedCatalog};
    use crate::results::{MemoryResultsStore, ResultsStore};
    use assert_matches::assert_matches;

    const WAIT: Duration = Duration::from_secs(2);

    fn passage(lines: &[&str]) -> Passage {
        Passage::new("p", Difficulty::Medium, Category::Science, lines).unwrap()
    }

    fn controller(clock: &ManualClock) -> Controller<EmbeddedCatalog, ManualClock> {
        Controller::new(EmbeddedCatalog::new(), clock.clone(), SessionConfig::default())
            .with_rng(StdRng::seed_from_u64(42))
    }

    fn type_words(controller: &mut Controller<EmbeddedCatalog, ManualClock>, words: &[&str]) {
        for word in words {
            controller.handle_input(&format!("{word} "));
        }
    }

    fn run_countdown(controller: &mut Controller<EmbeddedCatalog, ManualClock>, clock: &ManualClock) {
        clock.advance(Duration::from_secs(3));
        let transitions = controller.advance_clock();
        assert_eq!(transitions.last(), Some(&Transition::Running));
        assert_eq!(controller.phase(), Phase::Running);
    }

    #[test]
    fn test_start_without_difficulty_is_noop() {
        let clock = ManualClock::new();
        let mut c = controller(&clock);
        assert_eq!(c.start(), Transition::Ignored);
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.generation(), 0);
    }

    #[test]
    fn test_start_picks_passage_of_selected_difficulty() {
        let clock = ManualClock::new();
        let mut c = controller(&clock);
        c.select_difficulty(Difficulty::Hard);
        assert_eq!(c.start(), Transition::CountdownStarted);
        assert_eq!(c.phase(), Phase::Countdown);
        assert_eq!(c.state().difficulty(), Some(Difficulty::Hard));
        assert_eq!(c.countdown_remaining(), 3);
    }

    #[test]
    fn test_start_with_empty_category_is_noop() {
        let clock = ManualClock::new();
        let catalog = EmbeddedCatalog::new().with_category(Some(Category::Literature));
        let mut c = Controller::new(catalog, clock.clone(), SessionConfig::default());
        c.select_difficulty(Difficulty::Easy);
        assert_eq!(c.start(), Transition::Ignored);
        assert_eq!(c.phase(), Phase::Idle);
    }

    #[test]
    fn test_countdown_follows_wall_clock() {
        let clock = ManualClock::new();
        let mut c = controller(&clock);
        c.start_with(passage(&["a b"]));

        clock.advance(Duration::from_millis(1500));
        assert_eq!(c.advance_clock(), vec![Transition::CountedDown]);
        assert_eq!(c.countdown_remaining(), 2);

        clock.advance(Duration::from_millis(1500));
        assert_eq!(
            c.advance_clock(),
            vec![Transition::CountedDown, Transition::Running]
        );
        assert_eq!(c.phase(), Phase::Running);
    }

    #[test]
    fn test_timer_starts_on_first_keystroke() {
        let clock = ManualClock::new();
        let mut c = controller(&clock);
        c.start_with(passage(&["alpha beta gamma"]));
        run_countdown(&mut c, &clock);

        // Reading time is free.
        clock.advance(Duration::from_secs(20));
        assert!(c.advance_clock().is_empty());
        assert_eq!(c.time_remaining(), 60);

        c.handle_input("a");
        clock.advance(Duration::from_millis(2500));
        assert_eq!(c.advance_clock().len(), 2);
        assert_eq!(c.time_remaining(), 58);
    }

    #[test]
    fn test_timer_expiry_completes_and_persists_once() {
        let clock = ManualClock::new();
        let store = MemoryResultsStore::new();
        let mut c = controller(&clock).with_persistence(PersistWorker::spawn(store.clone()));
        c.start_with(passage(&["alpha beta gamma delta"]));
        run_countdown(&mut c, &clock);

        type_words(&mut c, &["alpha", "beta"]);
        clock.advance(Duration::from_secs(75));
        let transitions = c.advance_clock();
        assert_eq!(transitions.len(), 60);
        assert_matches!(transitions.last(), Some(Transition::Completed(score)) if score.wpm == 2);
        assert_eq!(c.phase(), Phase::Complete);

        clock.advance(Duration::from_secs(5));
        assert!(c.advance_clock().is_empty());

        assert!(c.await_persistence(WAIT));
        assert_eq!(c.notice(), Some(&Notice::Saved));
        assert_eq!(store.len(), 1);
        let saved = &store.recent(10).unwrap()[0].record;
        assert_eq!(saved.difficulty, Difficulty::Medium);
        assert_eq!(saved.correct_words, 2);
    }

    #[test]
    fn test_record_takes_difficulty_from_passage() {
        let clock = ManualClock::new();
        let store = MemoryResultsStore::new();
        let mut c = controller(&clock).with_persistence(PersistWorker::spawn(store.clone()));
        c.select_difficulty(Difficulty::Easy);
        let hard = Passage::new("h", Difficulty::Hard, Category::Science, &["go"]).unwrap();
        c.start_with(hard);
        run_countdown(&mut c, &clock);

        assert_matches!(c.handle_input("go"), Transition::Completed(_));
        assert_eq!(c.last_record().unwrap().difficulty, Difficulty::Hard);
        assert!(c.await_persistence(WAIT));
        assert_eq!(store.recent(1).unwrap()[0].record.difficulty, Difficulty::Hard);
    }

    #[test]
    fn test_last_word_completes_session() {
        let clock = ManualClock::new();
        let store = MemoryResultsStore::new();
        let mut c = controller(&clock).with_persistence(PersistWorker::spawn(store.clone()));
        c.start_with(passage(&["one two", "three"]));
        run_countdown(&mut c, &clock);

        type_words(&mut c, &["one", "two"]);
        clock.advance(Duration::from_secs(6));
        c.advance_clock();
        assert_matches!(c.handle_input("three"), Transition::Completed(_));

        let record = c.last_record().expect("record");
        assert_eq!(record.correct_words, 3);
        assert_eq!(record.total_typed_words, 3);
        assert_eq!(record.accuracy, 100);
        assert_eq!(record.wpm, 30);

        // A late tick in the same unit does not complete twice.
        clock.advance(Duration::from_secs(1));
        assert!(c.advance_clock().is_empty());
        assert_eq!(c.tick(), Transition::Ignored);

        assert!(c.await_persistence(WAIT));
        assert!(!c.await_persistence(Duration::from_millis(100)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_failed_save_surfaces_notice() {
        let clock = ManualClock::new();
        let mut c =
            controller(&clock).with_persistence(PersistWorker::spawn(MemoryResultsStore::failing()));
        c.start_with(passage(&["x"]));
        run_countdown(&mut c, &clock);
        c.handle_input("x");

        assert!(c.await_persistence(WAIT));
        assert_matches!(c.notice(), Some(Notice::SaveFailed(_)));
        // Still usable afterwards.
        c.restart();
        assert_eq!(c.phase(), Phase::Idle);
        assert!(c.notice().is_none());
    }

    #[test]
    fn test_stale_save_outcome_is_ignored() {
        let clock = ManualClock::new();
        let store = MemoryResultsStore::new();
        let mut c = controller(&clock).with_persistence(PersistWorker::spawn(store.clone()));
        c.start_with(passage(&["solo"]));
        run_countdown(&mut c, &clock);
        c.handle_input("solo");
        let finished_generation = c.generation();

        c.restart();
        c.start_with(passage(&["next session"]));
        assert!(c.generation() > finished_generation);

        assert!(!c.await_persistence(WAIT));
        assert!(c.notice().is_none());
        assert!(c.last_record().is_none());
        assert_eq!(c.phase(), Phase::Countdown);
        // The write itself still landed.
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_restart_mid_running_persists_nothing() {
        let clock = ManualClock::new();
        let store = MemoryResultsStore::new();
        let mut c = controller(&clock).with_persistence(PersistWorker::spawn(store.clone()));
        c.select_difficulty(Difficulty::Easy);
        c.start();
        run_countdown(&mut c, &clock);
        c.handle_input("abc ");
        clock.advance(Duration::from_secs(4));
        c.advance_clock();

        assert_eq!(c.restart(), Transition::Reset);
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.selected_difficulty(), None);
        assert_eq!(c.state().total_typed_words(), 0);
        assert_eq!(c.time_remaining(), 60);

        clock.advance(Duration::from_secs(120));
        assert!(c.advance_clock().is_empty());
        assert!(!c.await_persistence(Duration::from_millis(100)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_restart_twice_matches_once() {
        let clock = ManualClock::new();
        let mut c = controller(&clock);
        c.start_with(passage(&["a"]));
        c.restart();
        let state = c.state().clone();
        c.restart();
        assert_eq!(c.state(), &state);
        assert_eq!(c.phase(), Phase::Idle);
    }

    #[test]
    fn test_select_difficulty_ignored_while_running() {
        let clock = ManualClock::new();
        let mut c = controller(&clock);
        c.start_with(passage(&["a b"]));
        c.select_difficulty(Difficulty::Hard);
        assert_eq!(c.selected_difficulty(), Some(Difficulty::Medium));
    }

    #[test]
    fn test_without_persistence_still_records() {
        let clock = ManualClock::new();
        let mut c = controller(&clock);
        assert!(!c.has_persistence());
        c.start_with(passage(&["hi"]));
        run_countdown(&mut c, &clock);
        c.handle_input("hi");
        assert!(c.last_record().is_some());
        assert!(!c.poll_persistence());
        assert!(c.notice().is_none());
    }
}
