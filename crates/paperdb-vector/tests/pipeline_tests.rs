use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use paperdb_core::config::Settings;
use paperdb_core::error::Error;
use paperdb_core::traits::{EmbedTask, Embedder, PaperSink};
use paperdb_core::types::Paper;
use paperdb_embed::FakeEmbedder;
use paperdb_vector::{ingest_papers, run_ingest, select_from_offset};

/// Fake embedder that fails for any text containing "FAIL" and counts calls.
struct ScriptedEmbedder {
    inner: FakeEmbedder,
    calls: AtomicUsize,
}

impl ScriptedEmbedder {
    fn new() -> Self { Self { inner: FakeEmbedder::new(16), calls: AtomicUsize::new(0) } }
    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

#[async_trait]
impl Embedder for ScriptedEmbedder {
    fn model_id(&self) -> &str { "scripted" }
    fn dim(&self) -> usize { 16 }
    async fn embed(&self, text: &str, task: EmbedTask) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::ensure!(!text.contains("FAIL"), "simulated provider outage");
        self.inner.embed(text, task).await
    }
}

/// Keyed in-memory table with a pending batch, mirroring one transaction.
#[derive(Default)]
struct MemorySink {
    committed: BTreeMap<String, (Paper, Vec<f32>)>,
    pending: BTreeMap<String, (Paper, Vec<f32>)>,
    reject_ids: HashSet<String>,
    upsert_calls: usize,
}

impl MemorySink {
    fn rejecting(ids: &[&str]) -> Self {
        Self { reject_ids: ids.iter().map(|s| s.to_string()).collect(), ..Self::default() }
    }

    fn commit(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        self.committed.extend(pending);
    }
}

#[async_trait]
impl PaperSink for MemorySink {
    async fn upsert(&mut self, paper: &Paper, embedding: &[f32]) -> anyhow::Result<()> {
        self.upsert_calls += 1;
        anyhow::ensure!(!self.reject_ids.contains(&paper.id), "simulated constraint violation");
        self.pending.insert(paper.id.clone(), (paper.clone(), embedding.to_vec()));
        Ok(())
    }
}

fn paper(id: &str, title: &str, abstract_text: Option<&str>) -> Paper {
    Paper {
        title: Some(title.to_string()),
        abstract_text: abstract_text.map(str::to_string),
        ..Paper::new(id)
    }
}

#[tokio::test]
async fn empty_or_absent_abstracts_are_skipped_without_embedding() -> anyhow::Result<()> {
    let papers = vec![
        paper("1", "has text", Some("soil carbon")),
        paper("2", "empty", Some("")),
        paper("3", "absent", None),
    ];
    let embedder = ScriptedEmbedder::new();
    let mut sink = MemorySink::default();

    let report = ingest_papers(&papers, &embedder, &mut sink).await?;
    sink.commit();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.upserted, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(embedder.calls(), 1, "no provider call for empty text");
    assert_eq!(sink.upsert_calls, 1, "skipped rows never reach the store");
    assert_eq!(sink.committed.keys().collect::<Vec<_>>(), ["1"]);
    Ok(())
}

#[tokio::test]
async fn reingesting_an_id_overwrites_instead_of_duplicating() -> anyhow::Result<()> {
    let embedder = ScriptedEmbedder::new();
    let mut sink = MemorySink::default();

    ingest_papers(&[paper("42", "First title", Some("old abstract"))], &embedder, &mut sink).await?;
    sink.commit();
    ingest_papers(&[paper("42", "Second title", Some("new abstract"))], &embedder, &mut sink).await?;
    sink.commit();

    assert_eq!(sink.committed.len(), 1);
    let (stored, vector) = &sink.committed["42"];
    assert_eq!(stored.title.as_deref(), Some("Second title"));
    assert_eq!(stored.abstract_or_empty(), "new abstract");
    assert_eq!(vector, &embedder.inner.embed("new abstract", EmbedTask::Document).await?);
    Ok(())
}

#[tokio::test]
async fn offset_limits_attempts_to_the_tail() -> anyhow::Result<()> {
    let papers: Vec<Paper> = (0..10).map(|i| paper(&i.to_string(), "t", Some("text"))).collect();
    let embedder = ScriptedEmbedder::new();
    let mut sink = MemorySink::default();

    let selected = select_from_offset(&papers, 7).expect("rows remain");
    let report = ingest_papers(selected, &embedder, &mut sink).await?;

    assert_eq!(report.attempted, 3);
    assert_eq!(sink.pending.keys().collect::<Vec<_>>(), ["7", "8", "9"]);
    assert!(select_from_offset(&papers, 10).is_none());
    Ok(())
}

#[tokio::test]
async fn embedding_failure_does_not_stop_later_rows() -> anyhow::Result<()> {
    let papers = vec![
        paper("a", "ok", Some("first")),
        paper("b", "broken", Some("FAIL here")),
        paper("c", "ok", Some("third")),
    ];
    let embedder = ScriptedEmbedder::new();
    let mut sink = MemorySink::default();

    let report = ingest_papers(&papers, &embedder, &mut sink).await?;
    sink.commit();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.upserted, 2);
    assert_eq!(sink.committed.keys().collect::<Vec<_>>(), ["a", "c"]);
    Ok(())
}

#[tokio::test]
async fn upsert_failure_only_undoes_that_row() -> anyhow::Result<()> {
    let papers = vec![
        paper("a", "before", Some("first")),
        paper("b", "rejected", Some("second")),
        paper("c", "after", Some("third")),
    ];
    let embedder = ScriptedEmbedder::new();
    let mut sink = MemorySink::rejecting(&["b"]);

    let report = ingest_papers(&papers, &embedder, &mut sink).await?;
    sink.commit();

    assert_eq!(report.failed, 1);
    assert_eq!(report.upserted, 2);
    assert_eq!(report.attempted, report.upserted + report.skipped + report.failed);
    assert_eq!(sink.committed.keys().collect::<Vec<_>>(), ["a", "c"]);
    Ok(())
}

fn unreachable_settings(dataset: &std::path::Path, start_offset: usize) -> Settings {
    let mut settings = Settings::default();
    settings.ingest.dataset = dataset.to_string_lossy().to_string();
    settings.ingest.start_offset = start_offset;
    // Nothing listens here; any connection attempt fails the run.
    settings.database.host = "127.0.0.1".to_string();
    settings.database.port = 1;
    settings
}

#[tokio::test]
async fn unsupported_dataset_fails_before_connecting() {
    let tmp = tempfile::tempdir().expect("tmp");
    let path = tmp.path().join("papers.txt");
    fs::write(&path, "id,title\n1,a\n").expect("write");
    let embedder = ScriptedEmbedder::new();

    let err = run_ingest(&unreachable_settings(&path, 0), &embedder).await.unwrap_err();

    assert!(
        matches!(err.downcast_ref::<Error>(), Some(Error::UnsupportedDataset(_))),
        "expected dataset error, got {err:#}"
    );
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn offset_past_end_processes_nothing_and_never_connects() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("papers.csv");
    fs::write(&path, "id,title,abstract\n1,a,alpha\n2,b,beta\n")?;
    let embedder = ScriptedEmbedder::new();

    let report = run_ingest(&unreachable_settings(&path, 2), &embedder).await?;

    assert_eq!(report.attempted, 0);
    assert_eq!(embedder.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn connection_failure_is_fatal() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("papers.csv");
    fs::write(&path, "id,title,abstract\n1,a,alpha\n")?;
    let embedder = ScriptedEmbedder::new();

    let err = run_ingest(&unreachable_settings(&path, 0), &embedder).await.unwrap_err();

    assert!(format!("{err:#}").contains("failed to connect"), "{err:#}");
    assert_eq!(embedder.calls(), 0, "no embedding before the connection exists");
    Ok(())
}
