use async_trait::async_trait;

use crate::types::Paper;

/// Which side of a retrieval the text is embedded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedTask {
    Document,
    Query,
}

impl EmbedTask {
    pub fn as_str(self) -> &'static str {
        match self {
            EmbedTask::Document => "RETRIEVAL_DOCUMENT",
            EmbedTask::Query => "RETRIEVAL_QUERY",
        }
    }
}

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `vertex:text-embedding-004:d768`).
    fn model_id(&self) -> &str;
    /// Embedding dimensionality; every successful `embed` returns exactly this many values.
    fn dim(&self) -> usize;
    async fn embed(&self, text: &str, task: EmbedTask) -> anyhow::Result<Vec<f32>>;
}

/// Destination for enriched papers within one pending batch.
///
/// A failed `upsert` must leave no trace of that row while keeping earlier
/// rows of the batch pending.
#[async_trait]
pub trait PaperSink: Send {
    async fn upsert(&mut self, paper: &Paper, embedding: &[f32]) -> anyhow::Result<()>;
}
