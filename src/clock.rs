use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Length of one timer unit: the countdown and the test timer both move once
/// per unit.
pub const TIME_UNIT: Duration = Duration::from_secs(1);

/// Source of wall-clock time for the session timer.
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven clock for deterministic tests. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// Turns wall-clock readings into whole elapsed units.
///
/// Fractions of a unit carry over to the next poll, so polling more often
/// than once per unit never drifts.
#[derive(Debug, Clone)]
pub struct Metronome {
    unit: Duration,
    last: Option<Instant>,
}

impl Metronome {
    pub fn new(unit: Duration) -> Self {
        Self { unit, last: None }
    }

    /// Start counting from `now`.
    pub fn reset(&mut self, now: Instant) {
        self.last = Some(now);
    }

    pub fn stop(&mut self) {
        self.last = None;
    }

    pub fn is_running(&self) -> bool {
        self.last.is_some()
    }

    pub fn elapsed_units(&mut self, now: Instant) -> u32 {
        let Some(last) = self.last else {
            return 0;
        };
        let unit_nanos = self.unit.as_nanos().max(1);
        let units = (now.saturating_duration_since(last).as_nanos() / unit_nanos) as u32;
        self.last = Some(last + self.unit * units);
        units
    }
}

impl Default for Metronome {
    fn default() -> Self {
        Self::new(TIME_UNIT)
    }
}
