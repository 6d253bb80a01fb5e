//! Domain types shared by the loader, the pipeline and the store.

use serde::{Deserialize, Serialize};

pub type PaperId = String;

/// One row of paper metadata as read from the dataset.
///
/// - `id`: upsert key, always present and non-blank
/// - `abstract_text`: source text for the embedding; absent is treated as `""`
/// - every other field is optional and stored as-is (`publication_year` stays text)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    #[serde(default)]
    pub id: PaperId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Option<String>,
    #[serde(default)]
    pub publication_year: Option<String>,
    #[serde(default)]
    pub journal_name: Option<String>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Paper {
    pub fn new(id: impl Into<PaperId>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    /// The abstract, or the empty string when the dataset had none.
    pub fn abstract_or_empty(&self) -> &str {
        self.abstract_text.as_deref().unwrap_or("")
    }
}

/// Outcome counters for one ingestion run.
///
/// `attempted == upserted + skipped + failed` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub attempted: usize,
    pub upserted: usize,
    /// Rows dropped because their embedding came back empty.
    pub skipped: usize,
    /// Rows whose upsert failed and was rolled back.
    pub failed: usize,
}

/// A stored paper ranked against a query vector. Lower distance is closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperHit {
    pub paper: Paper,
    pub distance: f64,
}
