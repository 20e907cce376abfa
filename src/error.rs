use thiserror::Error;

/// Failures surfaced by a results store or the persistence worker.
///
/// None of these ever block a session from completing; the controller turns
/// them into a transient notice.
#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("results database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("results i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid score record: {0}")]
    InvalidRecord(String),

    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("persistence worker is not running")]
    WorkerGone,
}

/// A passage whose data cannot be typed against.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedPassage {
    #[error("passage {0} has no lines")]
    NoLines(String),

    #[error("passage {id} has an empty line at index {line}")]
    EmptyLine { id: String, line: usize },
}

pub type ResultsResult<T> = std::result::Result<T, ResultsError>;
