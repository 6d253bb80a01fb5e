use std::hash::{Hash, Hasher};

use anyhow::Result;
use async_trait::async_trait;
use twox_hash::XxHash64;

use paperdb_core::traits::{EmbedTask, Embedder};

/// Deterministic bag-of-tokens embedder; no network, L2-normalised output.
pub struct FakeEmbedder {
    dim: usize,
    id: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, id: format!("fake:xxhash64:d{}", dim) }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    async fn embed(&self, text: &str, _task: EmbedTask) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }
}
