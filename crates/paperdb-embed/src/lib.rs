//! Embedding providers and the per-record embedding step of ingestion.

use anyhow::Result;

use paperdb_core::config::EmbeddingSettings;
use paperdb_core::traits::{EmbedTask, Embedder};

pub mod fake;
pub mod vertex;

pub use fake::FakeEmbedder;
pub use vertex::{VertexEmbedder, DEFAULT_VERTEX_DIM};

/// Number of characters of the failing text quoted in the failure log.
const LOG_PREVIEW_CHARS: usize = 50;

/// Vertex AI by default; `APP_USE_FAKE_EMBEDDINGS=1` switches to [`FakeEmbedder`].
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        tracing::info!("Using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(settings.dimensions.unwrap_or(DEFAULT_VERTEX_DIM))));
    }
    let embedder = VertexEmbedder::new(settings)?;
    tracing::info!(model = embedder.model_id(), endpoint = embedder.endpoint(), "Using Vertex AI embedder");
    Ok(Box::new(embedder))
}

/// Embeds an abstract for storage.
///
/// Empty text returns an empty vector without calling the provider. A provider
/// failure is logged and also yields an empty vector; callers treat empty as "skip".
pub async fn embed_or_empty(embedder: &dyn Embedder, text: &str) -> Vec<f32> {
    if text.is_empty() {
        return Vec::new();
    }
    match embedder.embed(text, EmbedTask::Document).await {
        Ok(vector) => vector,
        Err(err) => {
            let preview: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
            tracing::warn!(error = %err, "Error generating embedding for text: '{}...'", preview);
            Vec::new()
        }
    }
}
