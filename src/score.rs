/// Seconds a timed test runs for unless configured otherwise.
pub const TIME_LIMIT: u32 = 60;

/// Fixed characters-per-word assumption used for CPM.
pub const AVERAGE_WORD_LENGTH: u32 = 5;

const SECS_PER_MINUTE: f64 = 60.0;

/// Words per minute from correctly typed words.
///
/// Zero when no time has elapsed yet.
pub fn wpm(correct_words: u32, elapsed_secs: u32) -> u32 {
    if elapsed_secs == 0 {
        return 0;
    }
    let elapsed_minutes = elapsed_secs as f64 / SECS_PER_MINUTE;
    (correct_words as f64 / elapsed_minutes).round() as u32
}

/// Percentage of typed words that were correct, 0 when nothing was typed.
pub fn accuracy(correct_words: u32, total_typed_words: u32) -> u32 {
    if total_typed_words == 0 {
        return 0;
    }
    ((correct_words as f64 / total_typed_words as f64) * 100.0).round() as u32
}

pub fn cpm(wpm: u32) -> u32 {
    wpm * AVERAGE_WORD_LENGTH
}

/// Display-only pace figure shown next to the total word count.
pub fn words_per_second(total_typed_words: u32) -> u32 {
    (total_typed_words as f64 / SECS_PER_MINUTE).round() as u32
}

/// Figures fixed at the moment a session completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalScore {
    pub wpm: u32,
    pub accuracy: u32,
    pub correct_words: u32,
    pub total_typed_words: u32,
}

impl FinalScore {
    pub fn compute(correct_words: u32, total_typed_words: u32, elapsed_secs: u32) -> Self {
        Self {
            wpm: wpm(correct_words, elapsed_secs),
            accuracy: accuracy(correct_words, total_typed_words),
            correct_words,
            total_typed_words,
        }
    }

    pub fn rating(&self) -> Rating {
        Rating::for_wpm(self.wpm)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum_macros::Display)]
pub enum Rating {
    Beginner,
    Intermediate,
    #[strum(serialize = "Above Average")]
    AboveAverage,
    Fast,
    Professional,
}

impl Rating {
    pub fn for_wpm(wpm: u32) -> Self {
        match wpm {
            0..=19 => Rating::Beginner,
            20..=39 => Rating::Intermediate,
            40..=59 => Rating::AboveAverage,
            60..=79 => Rating::Fast,
            _ => Rating::Professional,
        }
    }
}

/// How close the running timer is to expiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerUrgency {
    Calm,
    Warning,
    Critical,
}

impl TimerUrgency {
    pub fn for_remaining(secs: u32) -> Self {
        match secs {
            0..=10 => TimerUrgency::Critical,
            11..=30 => TimerUrgency::Warning,
            _ => TimerUrgency::Calm,
        }
    }
}

/// `m:ss`
pub fn format_clock(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wpm_full_minute() {
        assert_eq!(wpm(30, 60), 30);
    }

    #[test]
    fn test_wpm_partial_minute() {
        // 10 words in 15 seconds
        assert_eq!(wpm(10, 15), 40);
        // 7 words in 9 seconds = 46.67
        assert_eq!(wpm(7, 9), 47);
    }

    #[test]
    fn test_wpm_zero_elapsed() {
        assert_eq!(wpm(0, 0), 0);
        assert_eq!(wpm(12, 0), 0);
    }

    #[test]
    fn test_wpm_no_correct_words() {
        assert_eq!(wpm(0, 60), 0);
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(2, 3), 67);
        assert_eq!(accuracy(3, 3), 100);
        assert_eq!(accuracy(1, 8), 13);
        assert_eq!(accuracy(0, 5), 0);
    }

    #[test]
    fn test_accuracy_nothing_typed() {
        assert_eq!(accuracy(0, 0), 0);
    }

    #[test]
    fn test_accuracy_bounds() {
        for total in 0..50u32 {
            for correct in 0..=total {
                assert!(accuracy(correct, total) <= 100);
            }
        }
    }

    #[test]
    fn test_final_score_compute() {
        let score = FinalScore::compute(30, 32, 60);
        assert_eq!(score.wpm, 30);
        assert_eq!(score.accuracy, 94);
        assert_eq!(score.rating(), Rating::Intermediate);

        let idle = FinalScore::compute(0, 0, 60);
        assert_eq!(idle.wpm, 0);
        assert_eq!(idle.accuracy, 0);
    }

    #[test]
    fn test_rating_tiers() {
        assert_eq!(Rating::for_wpm(0), Rating::Beginner);
        assert_eq!(Rating::for_wpm(19), Rating::Beginner);
        assert_eq!(Rating::for_wpm(20), Rating::Intermediate);
        assert_eq!(Rating::for_wpm(30), Rating::Intermediate);
        assert_eq!(Rating::for_wpm(40), Rating::AboveAverage);
        assert_eq!(Rating::for_wpm(59), Rating::AboveAverage);
        assert_eq!(Rating::for_wpm(60), Rating::Fast);
        assert_eq!(Rating::for_wpm(79), Rating::Fast);
        assert_eq!(Rating::for_wpm(80), Rating::Professional);
        assert_eq!(Rating::for_wpm(250), Rating::Professional);
    }

    #[test]
    fn test_rating_display() {
        assert_eq!(Rating::AboveAverage.to_string(), "Above Average");
        assert_eq!(Rating::Professional.to_string(), "Professional");
    }

    #[test]
    fn test_cpm_and_words_per_second() {
        assert_eq!(cpm(42), 210);
        assert_eq!(words_per_second(90), 2);
        assert_eq!(words_per_second(20), 0);
    }

    #[test]
    fn test_timer_urgency() {
        assert_eq!(TimerUrgency::for_remaining(60), TimerUrgency::Calm);
        assert_eq!(TimerUrgency::for_remaining(31), TimerUrgency::Calm);
        assert_eq!(TimerUrgency::for_remaining(30), TimerUrgency::Warning);
        assert_eq!(TimerUrgency::for_remaining(11), TimerUrgency::Warning);
        assert_eq!(TimerUrgency::for_remaining(10), TimerUrgency::Critical);
        assert_eq!(TimerUrgency::for_remaining(0), TimerUrgency::Critical);
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(60), "1:00");
        assert_eq!(format_clock(59), "0:59");
        assert_eq!(format_clock(5), "0:05");
        assert_eq!(format_clock(0), "0:00");
    }
}
