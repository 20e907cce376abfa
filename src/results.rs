use crate::error::{ResultsError, ResultsResult};
use crate::passage::Difficulty;
use crate::score::{FinalScore, Rating};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use itertools::Itertools;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Outcome of one completed session. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub wpm: u32,
    pub accuracy: u32,
    pub correct_words: u32,
    pub total_typed_words: u32,
    pub difficulty: Difficulty,
    pub timestamp: DateTime<Local>,
}

impl ScoreRecord {
    pub fn new(score: FinalScore, difficulty: Difficulty, timestamp: DateTime<Local>) -> Self {
        Self {
            wpm: score.wpm,
            accuracy: score.accuracy,
            correct_words: score.correct_words,
            total_typed_words: score.total_typed_words,
            difficulty,
            timestamp,
        }
    }

    pub fn rating(&self) -> Rating {
        Rating::for_wpm(self.wpm)
    }

    /// Rejects records no session could have produced.
    pub fn validate(&self) -> ResultsResult<()> {
        if self.accuracy > 100 {
            return Err(ResultsError::InvalidRecord(format!(
                "accuracy {} is above 100",
                self.accuracy
            )));
        }
        if self.correct_words > self.total_typed_words {
            return Err(ResultsError::InvalidRecord(format!(
                "{} correct words out of {} typed",
                self.correct_words, self.total_typed_words
            )));
        }
        Ok(())
    }
}

/// A record as handed back by a store, with the id the store assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResult {
    pub id: i64,
    pub record: ScoreRecord,
}

/// Append-only storage for completed sessions.
pub trait ResultsStore {
    fn save(&mut self, record: &ScoreRecord) -> ResultsResult<StoredResult>;
    /// Newest first.
    fn recent(&self, limit: usize) -> ResultsResult<Vec<StoredResult>>;
    /// Highest WPM first, newest first among ties.
    fn best(&self, limit: usize) -> ResultsResult<Vec<StoredResult>>;
    /// Oldest first.
    fn all(&self) -> ResultsResult<Vec<StoredResult>>;
}

/// SQLite-backed results history.
#[derive(Debug)]
pub struct SqliteResultsStore {
    conn: Connection,
}

impl SqliteResultsStore {
    pub fn open<P: AsRef<Path>>(path: P) -> ResultsResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> ResultsResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> ResultsResult<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS test_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                wpm INTEGER NOT NULL,
                accuracy INTEGER NOT NULL,
                correct_words INTEGER NOT NULL,
                total_typed_words INTEGER NOT NULL,
                difficulty TEXT NOT NULL,
                timestamp TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_test_results_timestamp ON test_results(timestamp)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_test_results_wpm ON test_results(wpm)",
            [],
        )?;

        Ok(Self { conn })
    }

    fn query(&self, sql: &str, limit: Option<usize>) -> ResultsResult<Vec<StoredResult>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = match limit {
            Some(limit) => stmt.query_map([limit as i64], row_to_result)?,
            None => stmt.query_map([], row_to_result)?,
        };

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Clear all results (for testing or reset purposes)
    pub fn clear(&self) -> ResultsResult<()> {
        self.conn.execute("DELETE FROM test_results", [])?;
        Ok(())
    }
}

fn row_to_result(row: &Row<'_>) -> rusqlite::Result<StoredResult> {
    let difficulty_str: String = row.get(5)?;
    let difficulty = Difficulty::parse(&difficulty_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(
            5,
            "difficulty".to_string(),
            rusqlite::types::Type::Text,
        )
    })?;

    let timestamp_str: String = row.get(6)?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                6,
                "timestamp".to_string(),
                rusqlite::types::Type::Text,
            )
        })?
        .with_timezone(&Local);

    Ok(StoredResult {
        id: row.get(0)?,
        record: ScoreRecord {
            wpm: row.get(1)?,
            accuracy: row.get(2)?,
            correct_words: row.get(3)?,
            total_typed_words: row.get(4)?,
            difficulty,
            timestamp,
        },
    })
}

/// Timestamps are stored as UTC text with a fixed width so that string order
/// is time order across offset changes.
fn stored_timestamp(timestamp: &DateTime<Local>) -> String {
    timestamp
        .with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

const SELECT_COLUMNS: &str =
    "SELECT id, wpm, accuracy, correct_words, total_typed_words, difficulty, timestamp FROM test_results";

impl ResultsStore for SqliteResultsStore {
    fn save(&mut self, record: &ScoreRecord) -> ResultsResult<StoredResult> {
        record.validate()?;

        self.conn.execute(
            r#"
            INSERT INTO test_results
            (wpm, accuracy, correct_words, total_typed_words, difficulty, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.wpm,
                record.accuracy,
                record.correct_words,
                record.total_typed_words,
                record.difficulty.to_string(),
                stored_timestamp(&record.timestamp),
            ],
        )?;

        Ok(StoredResult {
            id: self.conn.last_insert_rowid(),
            record: record.clone(),
        })
    }

    fn recent(&self, limit: usize) -> ResultsResult<Vec<StoredResult>> {
        self.query(
            &format!("{SELECT_COLUMNS} ORDER BY timestamp DESC, id DESC LIMIT ?1"),
            Some(limit),
        )
    }

    fn best(&self, limit: usize) -> ResultsResult<Vec<StoredResult>> {
        self.query(
            &format!("{SELECT_COLUMNS} ORDER BY wpm DESC, timestamp DESC, id DESC LIMIT ?1"),
            Some(limit),
        )
    }

    fn all(&self) -> ResultsResult<Vec<StoredResult>> {
        self.query(&format!("{SELECT_COLUMNS} ORDER BY id ASC"), None)
    }
}

/// In-process store. Clones share the same results, so a test can keep a
/// handle while another clone is moved into the persistence worker.
#[derive(Debug, Clone, Default)]
pub struct MemoryResultsStore {
    results: Arc<Mutex<Vec<StoredResult>>>,
    fail_saves: bool,
}

impl MemoryResultsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every save fails, for exercising the warning path.
    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<StoredResult> {
        match self.results.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ResultsStore for MemoryResultsStore {
    fn save(&mut self, record: &ScoreRecord) -> ResultsResult<StoredResult> {
        if self.fail_saves {
            return Err(ResultsError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "results store unavailable",
            )));
        }
        record.validate()?;

        let mut results = self
            .results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let stored = StoredResult {
            id: results.len() as i64 + 1,
            record: record.clone(),
        };
        results.push(stored.clone());
        Ok(stored)
    }

    fn recent(&self, limit: usize) -> ResultsResult<Vec<StoredResult>> {
        Ok(self
            .snapshot()
            .into_iter()
            .sorted_by(|a, b| {
                b.record
                    .timestamp
                    .cmp(&a.record.timestamp)
                    .then(b.id.cmp(&a.id))
            })
            .take(limit)
            .collect())
    }

    fn best(&self, limit: usize) -> ResultsResult<Vec<StoredResult>> {
        Ok(self
            .snapshot()
            .into_iter()
            .sorted_by(|a, b| {
                b.record
                    .wpm
                    .cmp(&a.record.wpm)
                    .then(b.record.timestamp.cmp(&a.record.timestamp))
                    .then(b.id.cmp(&a.id))
            })
            .take(limit)
            .collect())
    }

    fn all(&self) -> ResultsResult<Vec<StoredResult>> {
        Ok(self.snapshot())
    }
}

const CSV_HEADER: [&str; 7] = [
    "id",
    "timestamp",
    "difficulty",
    "wpm",
    "accuracy",
    "correct_words",
    "total_typed_words",
];

#[derive(Serialize)]
struct CsvRow {
    id: i64,
    timestamp: String,
    difficulty: String,
    wpm: u32,
    accuracy: u32,
    correct_words: u32,
    total_typed_words: u32,
}

/// Writes results as CSV. The header row is written even when there are no
/// results.
pub fn export_csv<W: Write>(results: &[StoredResult], writer: W) -> ResultsResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for stored in results {
        let r = &stored.record;
        wtr.serialize(CsvRow {
            id: stored.id,
            timestamp: r.timestamp.to_rfc3339(),
            difficulty: r.difficulty.to_string(),
            wpm: r.wpm,
            accuracy: r.accuracy,
            correct_words: r.correct_words,
            total_typed_words: r.total_typed_words,
        })?;
    }
    wtr.flush()?;
    Ok(())
}
