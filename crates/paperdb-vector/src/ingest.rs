//! Sequential embed-and-upsert pipeline.
//!
//! Rows are processed in order, one embedding call and one upsert at a time.
//! Embedding failures skip the row; upsert failures undo the row; neither stops
//! the run. The batch is committed once, after the loop.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use paperdb_core::config::Settings;
use paperdb_core::dataset::load_papers;
use paperdb_core::traits::{Embedder, PaperSink};
use paperdb_core::types::{IngestReport, Paper};
use paperdb_embed::embed_or_empty;

use crate::table::{ensure_paper_table, ensure_vector_extension, open_db, TableName};
use crate::writer::PgPaperWriter;

/// Rows from `start` onwards, or `None` when the offset leaves nothing to process.
pub fn select_from_offset(papers: &[Paper], start: usize) -> Option<&[Paper]> {
    if start < papers.len() { Some(&papers[start..]) } else { None }
}

/// Embeds and upserts every paper into `sink`. Committing is left to the caller.
pub async fn ingest_papers<S>(papers: &[Paper], embedder: &dyn Embedder, sink: &mut S) -> Result<IngestReport>
where
    S: PaperSink + ?Sized,
{
    let mut report = IngestReport::default();
    let pb = ProgressBar::new(papers.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} papers ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );

    for paper in papers {
        report.attempted += 1;
        pb.set_message(paper.id.clone());
        let embedding = embed_or_empty(embedder, paper.abstract_or_empty()).await;
        if embedding.is_empty() {
            tracing::warn!(paper_id = %paper.id, "Skipping paper {} due to embedding error.", paper.id);
            report.skipped += 1;
        } else {
            match sink.upsert(paper, &embedding).await {
                Ok(()) => {
                    tracing::info!(
                        paper_id = %paper.id,
                        "Inserted/Updated paper: {} - '{}'",
                        paper.id,
                        paper.title.as_deref().unwrap_or("")
                    );
                    report.upserted += 1;
                }
                Err(err) => {
                    tracing::error!(paper_id = %paper.id, error = %format!("{err:#}"), "Error inserting paper {}", paper.id);
                    report.failed += 1;
                }
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(report)
}

/// Full run: load → select offset → connect → (prepare) → ingest → commit → close.
///
/// The dataset is loaded before any connection is attempted, so an unsupported
/// file fails fast. The connection is closed on every exit path after connecting.
pub async fn run_ingest(settings: &Settings, embedder: &dyn Embedder) -> Result<IngestReport> {
    let dataset = settings.ingest.dataset_path();
    tracing::info!("Starting data ingestion from {}...", dataset.display());
    let papers = load_papers(&dataset)?;
    tracing::info!("Loaded {} records from {}.", papers.len(), dataset.display());

    let start = settings.ingest.start_offset;
    let Some(selected) = select_from_offset(&papers, start) else {
        tracing::info!(
            "Dataset has only {} rows. No rows to process from index {}.",
            papers.len(),
            start
        );
        return Ok(IngestReport::default());
    };
    tracing::info!(
        "Processing a subset of {} records, starting from row {}.",
        selected.len(),
        start + 1
    );

    let table = TableName::from_settings(&settings.database)?;
    let mut db = match open_db(&settings.database).await {
        Ok(db) => db,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "Database connection error");
            return Err(err);
        }
    };
    let result = ingest_into(db.client(), &table, settings.database.prepare_table, selected, embedder).await;
    db.close().await;
    result
}

async fn ingest_into(
    client: &mut tokio_postgres::Client,
    table: &TableName,
    prepare_table: bool,
    papers: &[Paper],
    embedder: &dyn Embedder,
) -> Result<IngestReport> {
    if prepare_table {
        ensure_vector_extension(client).await?;
        ensure_paper_table(client, table, embedder.dim()).await?;
    }
    let mut writer = PgPaperWriter::begin(client, table).await?;
    let report = ingest_papers(papers, embedder, &mut writer).await?;
    let committed = writer.commit().await?;
    tracing::info!(
        committed,
        skipped = report.skipped,
        failed = report.failed,
        "Data ingestion complete!"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn papers(n: usize) -> Vec<Paper> {
        (0..n).map(|i| Paper::new(i.to_string())).collect()
    }

    #[test]
    fn offset_inside_range_keeps_the_tail() {
        let all = papers(5);
        let tail = select_from_offset(&all, 3).unwrap();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].id, "3");
        assert_eq!(select_from_offset(&all, 0).unwrap().len(), 5);
    }

    #[test]
    fn offset_at_or_past_end_selects_nothing() {
        let all = papers(5);
        assert!(select_from_offset(&all, 5).is_none());
        assert!(select_from_offset(&all, 24).is_none());
        assert!(select_from_offset(&[], 0).is_none());
    }
}
