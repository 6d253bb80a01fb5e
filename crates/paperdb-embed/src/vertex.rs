//! Vertex AI text-embedding client (`:predict` REST endpoint).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use paperdb_core::config::EmbeddingSettings;
use paperdb_core::error::Error;
use paperdb_core::traits::{EmbedTask, Embedder};

/// Output size of `text-embedding-004` and its siblings when no dimensionality is requested.
pub const DEFAULT_VERTEX_DIM: usize = 768;

pub struct VertexEmbedder {
    client: Client,
    endpoint: String,
    dimensions: Option<usize>,
    dim: usize,
    id: String,
}

impl VertexEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        anyhow::ensure!(!settings.model.trim().is_empty(), "missing embedding model name");
        let endpoint = match &settings.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => {
                let project = settings
                    .project
                    .as_deref()
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| Error::InvalidConfig("embedding.project (GCP_PROJECT_ID) is required".into()))?;
                predict_url(project, &settings.region, &settings.model)
            }
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        match settings.access_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => {
                let auth = format!("Bearer {}", token);
                headers.insert(AUTHORIZATION, HeaderValue::from_str(&auth).context("invalid access token")?);
            }
            _ => tracing::warn!("No embedding access token configured; requests are sent unauthenticated"),
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build Vertex AI HTTP client")?;

        let dim = settings.dimensions.unwrap_or(DEFAULT_VERTEX_DIM);
        let id = format!("vertex:{}:d{}", settings.model, dim);
        Ok(Self { client, endpoint, dimensions: settings.dimensions, dim, id })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

pub fn predict_url(project: &str, region: &str, model: &str) -> String {
    format!(
        "https://{region}-aiplatform.googleapis.com/v1/projects/{project}/locations/{region}/publishers/google/models/{model}:predict"
    )
}

#[async_trait]
impl Embedder for VertexEmbedder {
    fn model_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    async fn embed(&self, text: &str, task: EmbedTask) -> Result<Vec<f32>> {
        let request = PredictRequest {
            instances: [Instance { content: text, task_type: task.as_str() }],
            parameters: self.dimensions.map(|n| Parameters { output_dimensionality: n }),
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .context("Vertex AI embedding request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("Vertex AI embedding request failed ({}): {}", status, body);
        }
        let parsed: PredictResponse = resp.json().await.context("failed to parse Vertex AI embedding response")?;
        let values = parsed
            .predictions
            .into_iter()
            .next()
            .map(|p| p.embeddings.values)
            .ok_or_else(|| anyhow::anyhow!("Vertex AI returned no predictions"))?;
        anyhow::ensure!(
            values.len() == self.dim,
            "dim mismatch: got {} expected {}",
            values.len(),
            self.dim
        );
        Ok(values)
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: [Instance<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Parameters>,
}

#[derive(Serialize)]
struct Instance<'a> {
    content: &'a str,
    task_type: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters {
    output_dimensionality: usize,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    embeddings: PredictionEmbeddings,
}

#[derive(Debug, Deserialize)]
struct PredictionEmbeddings {
    values: Vec<f32>,
}
