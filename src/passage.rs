use crate::error::MalformedPassage;
use clap::ValueEnum;
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

static PASSAGE_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/passages");

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Technology,
    Science,
    Literature,
    General,
}

#[derive(Deserialize)]
struct RawPassage {
    id: String,
    difficulty: Difficulty,
    category: Category,
    text: Vec<String>,
}

/// Reference text a session is typed against, split into lines of words.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawPassage")]
pub struct Passage {
    pub id: String,
    pub difficulty: Difficulty,
    pub category: Category,
    lines: Vec<Vec<String>>,
}

impl TryFrom<RawPassage> for Passage {
    type Error = MalformedPassage;

    fn try_from(raw: RawPassage) -> Result<Self, Self::Error> {
        Passage::new(raw.id, raw.difficulty, raw.category, &raw.text)
    }
}

impl Passage {
    /// Splits every line on whitespace. Passages without lines, or with a line
    /// that has no words, are rejected.
    pub fn new<S: AsRef<str>>(
        id: impl Into<String>,
        difficulty: Difficulty,
        category: Category,
        text: &[S],
    ) -> Result<Self, MalformedPassage> {
        let id = id.into();
        if text.is_empty() {
            return Err(MalformedPassage::NoLines(id));
        }

        let mut lines = Vec::with_capacity(text.len());
        for (idx, line) in text.iter().enumerate() {
            let words: Vec<String> = line
                .as_ref()
                .split_whitespace()
                .map(str::to_string)
                .collect();
            if words.is_empty() {
                return Err(MalformedPassage::EmptyLine { id, line: idx });
            }
            lines.push(words);
        }

        Ok(Self {
            id,
            difficulty,
            category,
            lines,
        })
    }

    pub fn lines(&self) -> &[Vec<String>] {
        &self.lines
    }

    pub fn line(&self, idx: usize) -> Option<&[String]> {
        self.lines.get(idx).map(Vec::as_slice)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn word_count(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }
}

/// Read-only source of passages.
pub trait PassageCatalog {
    fn by_difficulty(&self, difficulty: Difficulty) -> Vec<&Passage>;

    /// Uniformly random pick among the passages of `difficulty`.
    fn pick<R: Rng + ?Sized>(&self, difficulty: Difficulty, rng: &mut R) -> Option<Passage>
    where
        Self: Sized,
    {
        self.by_difficulty(difficulty)
            .choose(rng)
            .map(|p| (*p).clone())
    }
}

/// Passages compiled into the binary from `src/passages/*.json`.
#[derive(Debug, Clone)]
pub struct EmbeddedCatalog {
    passages: Vec<Passage>,
    category: Option<Category>,
}

impl EmbeddedCatalog {
    pub fn new() -> Self {
        let mut passages: Vec<Passage> = PASSAGE_DIR
            .files()
            .filter(|f| f.path().extension().is_some_and(|ext| ext == "json"))
            .flat_map(|f| {
                let contents = f
                    .contents_utf8()
                    .expect("Unable to interpret passage file as a string");
                serde_json::from_str::<Vec<Passage>>(contents)
                    .unwrap_or_else(|e| panic!("Malformed passage file {:?}: {e}", f.path()))
            })
            .collect();
        passages.sort_by(|a, b| a.id.cmp(&b.id));

        Self {
            passages,
            category: None,
        }
    }

    /// Restrict lookups to a single category.
    pub fn with_category(mut self, category: Option<Category>) -> Self {
        self.category = category;
        self
    }

    pub fn from_passages(passages: Vec<Passage>) -> Self {
        Self {
            passages,
            category: None,
        }
    }

    pub fn all(&self) -> &[Passage] {
        &self.passages
    }
}

impl Default for EmbeddedCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl PassageCatalog for EmbeddedCatalog {
    fn by_difficulty(&self, difficulty: Difficulty) -> Vec<&Passage> {
        self.passages
            .iter()
            .filter(|p| p.difficulty == difficulty)
            .filter(|p| self.category.map_or(true, |c| p.category == c))
            .collect()
    }
}
