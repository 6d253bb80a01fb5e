//! Dataset loading: CSV or JSON files of paper metadata.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Paper;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Csv,
    Json,
}

impl DatasetFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(Self::Csv),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            _ => Err(Error::UnsupportedDataset(path.to_path_buf())),
        }
    }
}

/// Loads every paper from `path`, choosing the parser by file extension.
///
/// The extension is checked before the file is opened.
pub fn load_papers(path: &Path) -> Result<Vec<Paper>> {
    let papers = match DatasetFormat::from_path(path)? {
        DatasetFormat::Csv => read_csv(fs::File::open(path)?)?,
        DatasetFormat::Json => read_json(&fs::read(path)?)?,
    };
    tracing::info!(count = papers.len(), path = %path.display(), "Loaded papers");
    Ok(papers)
}

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Paper>> {
    let mut csv_reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut papers = Vec::new();
    for (row_idx, result) in csv_reader.deserialize::<Paper>().enumerate() {
        let paper = result?;
        papers.push(require_id(paper, row_idx)?);
    }
    Ok(papers)
}

/// Accepts an array of record objects or a column-oriented object
/// (`{"column": {"<row index>": value}}`).
pub fn read_json(bytes: &[u8]) -> Result<Vec<Paper>> {
    let root: Value = serde_json::from_slice(bytes)?;
    let rows = match root {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(row_idx, item)| match item {
                Value::Object(fields) => Ok(fields),
                other => Err(Error::MalformedDataset(format!(
                    "row {}: expected an object, got {}",
                    row_idx + 1,
                    json_kind(&other)
                ))),
            })
            .collect::<Result<Vec<_>>>()?,
        Value::Object(columns) => pivot_columns(columns)?,
        other => {
            return Err(Error::MalformedDataset(format!(
                "expected an array or an object at the top level, got {}",
                json_kind(&other)
            )))
        }
    };
    rows.iter()
        .enumerate()
        .map(|(row_idx, fields)| require_id(paper_from_fields(fields), row_idx))
        .collect()
}

fn pivot_columns(columns: Map<String, Value>) -> Result<Vec<Map<String, Value>>> {
    let mut rows: BTreeMap<u64, Map<String, Value>> = BTreeMap::new();
    for (column, cells) in columns {
        let Value::Object(cells) = cells else {
            return Err(Error::MalformedDataset(format!(
                "column '{}': expected an object of row index to value",
                column
            )));
        };
        for (index, value) in cells {
            let row: u64 = index.parse().map_err(|_| {
                Error::MalformedDataset(format!("column '{}': bad row index '{}'", column, index))
            })?;
            rows.entry(row).or_default().insert(column.clone(), value);
        }
    }
    Ok(rows.into_values().collect())
}

fn paper_from_fields(fields: &Map<String, Value>) -> Paper {
    let text = |key: &str| fields.get(key).and_then(value_to_text);
    Paper {
        id: text("id").unwrap_or_default(),
        title: text("title"),
        authors: text("authors"),
        publication_year: text("publication_year"),
        journal_name: text("journal_name"),
        abstract_text: text("abstract"),
        doi: text("doi"),
        url: text("url"),
    }
}

fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn require_id(paper: Paper, row_idx: usize) -> Result<Paper> {
    if paper.id.trim().is_empty() {
        return Err(Error::MalformedDataset(format!("row {}: missing id", row_idx + 1)));
    }
    Ok(paper)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
