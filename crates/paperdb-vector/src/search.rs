use anyhow::{Context, Result};
use pgvector::Vector;
use tokio_postgres::{Client, Row};

use paperdb_core::types::{Paper, PaperHit};

use crate::table::TableName;

/// Nearest papers to `query` by cosine distance on the abstract embedding, closest first.
pub async fn search_papers(client: &Client, table: &TableName, query: &[f32], limit: usize) -> Result<Vec<PaperHit>> {
    anyhow::ensure!(!query.is_empty(), "query embedding is empty");
    let sql = format!(
        "SELECT id, title, authors, publication_year, journal_name, abstract, doi, url, \
         (abstract_embedding <=> $1)::float8 AS distance \
         FROM {} \
         WHERE abstract_embedding IS NOT NULL \
         ORDER BY abstract_embedding <=> $1 \
         LIMIT $2",
        table.qualified()
    );
    let limit = i64::try_from(limit).context("search limit exceeds i64 range")?;
    let rows = client
        .query(&sql, &[&Vector::from(query.to_vec()), &limit])
        .await
        .context("failed to run similarity search")?;
    rows.iter().map(hit_from_row).collect()
}

fn hit_from_row(row: &Row) -> Result<PaperHit> {
    let paper = Paper {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        authors: row.try_get("authors")?,
        publication_year: row.try_get("publication_year")?,
        journal_name: row.try_get("journal_name")?,
        abstract_text: row.try_get("abstract")?,
        doi: row.try_get("doi")?,
        url: row.try_get("url")?,
    };
    Ok(PaperHit { paper, distance: row.try_get("distance")? })
}

/// Renders hits as a plain-text context block, one entry per paper.
pub fn format_context(hits: &[PaperHit]) -> String {
    hits.iter()
        .map(|hit| {
            let p = &hit.paper;
            format!(
                "Title: {}\nAbstract: {}\nDOI: {}\nURL: {}\n---",
                p.title.as_deref().unwrap_or("N/A"),
                p.abstract_or_empty(),
                p.doi.as_deref().unwrap_or("N/A"),
                p.url.as_deref().unwrap_or("N/A"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
