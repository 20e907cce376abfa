/// Separator that closes a word in the input buffer.
pub const WORD_SEPARATOR: char = ' ';

/// A word the user finished, as it was typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedWord {
    pub word: String,
    pub correct: bool,
}

/// Where the cursor sits relative to the end of the line after a word closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// More words remain on this line.
    Word,
    /// Last word of the line; the caller advances to the next line or
    /// finishes the session when this was the last line.
    Line,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchEvent {
    None,
    Completed {
        word: CompletedWord,
        boundary: Boundary,
    },
}

/// Classifies the input buffer against the word under the cursor.
///
/// A word closes when the buffer ends with a separator, or, on the last word
/// of a line only, as soon as the buffer equals the reference word.
pub fn match_input(line: &[String], word_index: usize, buffer: &str) -> MatchEvent {
    let Some(expected) = line.get(word_index) else {
        return MatchEvent::None;
    };
    let is_last = word_index + 1 == line.len();
    let boundary = if is_last {
        Boundary::Line
    } else {
        Boundary::Word
    };

    if let Some(before) = buffer.strip_suffix(WORD_SEPARATOR) {
        // Only the text after the last earlier separator belongs to this word.
        let typed = before
            .rsplit(WORD_SEPARATOR)
            .next()
            .unwrap_or_default()
            .to_string();
        let correct = typed == *expected;
        return MatchEvent::Completed {
            word: CompletedWord {
                word: typed,
                correct,
            },
            boundary,
        };
    }

    if is_last && buffer == expected.as_str() {
        return MatchEvent::Completed {
            word: CompletedWord {
                word: buffer.to_string(),
                correct: true,
            },
            boundary,
        };
    }

    MatchEvent::None
}

/// Presentation state of the word under the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Pending,
    CorrectSoFar,
    IncorrectSoFar,
}

/// Compares a partially typed word against its reference.
pub fn highlight(expected: &str, typed: &str) -> Highlight {
    let typed = typed
        .rsplit(WORD_SEPARATOR)
        .next()
        .unwrap_or_default();
    if typed.is_empty() {
        Highlight::Pending
    } else if expected.starts_with(typed) {
        Highlight::CorrectSoFar
    } else {
        Highlight::IncorrectSoFar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn line(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_partial_input_is_no_event() {
        let words = line("the quick fox");
        assert_eq!(match_input(&words, 0, ""), MatchEvent::None);
        assert_eq!(match_input(&words, 0, "th"), MatchEvent::None);
        assert_eq!(match_input(&words, 1, "quic"), MatchEvent::None);
    }

    #[test]
    fn test_space_closes_correct_word() {
        let words = line("the quick fox");
        assert_eq!(
            match_input(&words, 0, "the "),
            MatchEvent::Completed {
                word: CompletedWord {
                    word: "the".into(),
                    correct: true
                },
                boundary: Boundary::Word,
            }
        );
    }

    #[test]
    fn test_space_closes_typo_as_incorrect() {
        let words = line("the quick fox");
        assert_matches!(
            match_input(&words, 0, "teh "),
            MatchEvent::Completed { word: CompletedWord { ref word, correct: false }, boundary: Boundary::Word } if word == "teh"
        );
    }

    #[test]
    fn test_full_word_without_space_only_closes_last_word() {
        let words = line("the quick fox");
        assert_eq!(match_input(&words, 0, "the"), MatchEvent::None);
        assert_eq!(match_input(&words, 1, "quick"), MatchEvent::None);
        assert_matches!(
            match_input(&words, 2, "fox"),
            MatchEvent::Completed {
                word: CompletedWord { correct: true, .. },
                boundary: Boundary::Line
            }
        );
    }

    #[test]
    fn test_last_word_with_trailing_space_is_line_boundary() {
        let words = line("the quick fox");
        assert_matches!(
            match_input(&words, 2, "fox "),
            MatchEvent::Completed {
                word: CompletedWord { correct: true, .. },
                boundary: Boundary::Line
            }
        );
    }

    #[test]
    fn test_wrong_last_word_needs_space() {
        let words = line("the quick fox");
        assert_eq!(match_input(&words, 2, "fix"), MatchEvent::None);
        assert_matches!(
            match_input(&words, 2, "fix "),
            MatchEvent::Completed {
                word: CompletedWord { correct: false, .. },
                boundary: Boundary::Line
            }
        );
    }

    #[test]
    fn test_empty_word_counts_as_incorrect() {
        let words = line("the quick fox");
        assert_eq!(
            match_input(&words, 0, " "),
            MatchEvent::Completed {
                word: CompletedWord {
                    word: String::new(),
                    correct: false
                },
                boundary: Boundary::Word,
            }
        );
    }

    #[test]
    fn test_only_text_after_earlier_space_is_compared() {
        // A pasted "a b " closes only the segment after the last inner space.
        let words = line("b c");
        assert_matches!(
            match_input(&words, 0, "a b "),
            MatchEvent::Completed { word: CompletedWord { ref word, correct: true }, .. } if word == "b"
        );
    }

    #[test]
    fn test_cursor_past_line_is_no_event() {
        let words = line("one");
        assert_eq!(match_input(&words, 1, "one "), MatchEvent::None);
    }

    #[test]
    fn test_punctuation_is_exact() {
        let words = line("detail. Good");
        assert_matches!(
            match_input(&words, 0, "detail "),
            MatchEvent::Completed {
                word: CompletedWord { correct: false, .. },
                ..
            }
        );
    }

    #[test]
    fn test_highlight() {
        assert_eq!(highlight("quick", ""), Highlight::Pending);
        assert_eq!(highlight("quick", "qu"), Highlight::CorrectSoFar);
        assert_eq!(highlight("quick", "quick"), Highlight::CorrectSoFar);
        assert_eq!(highlight("quick", "qa"), Highlight::IncorrectSoFar);
        assert_eq!(highlight("quick", "quickly"), Highlight::IncorrectSoFar);
    }
}
