//! Embedding client
//!
//! Turns class bodies into fixed-length vectors. The default backend speaks the
//! OpenAI-compatible `/v1/embeddings` protocol (served by Ollama, vLLM, TEI and
//! the hosted APIs alike).

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::{Result, VulnLensError};
use crate::http::ModelClient;

/// Text → vector capability
pub trait Embedder {
    /// Embed `texts`, returning one vector per input in input order
    fn embed(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>>> + Send;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// [`Embedder`] over an OpenAI-compatible embeddings endpoint
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: ModelClient,
    endpoint: String,
    model: String,
}

impl HttpEmbedder {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        Ok(Self {
            client: ModelClient::new(config)?,
            endpoint: config.embedding_endpoint.clone(),
            model: config.embedding_model.clone(),
        })
    }
}

impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let response: EmbeddingResponse = self
            .client
            .post_json("embeddings", &self.endpoint, &request)
            .await?;
        order_embeddings(response.data, texts.len())
    }
}

/// Put response items back in request order and check the count
fn order_embeddings(mut items: Vec<EmbeddingItem>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if items.len() != expected {
        return Err(VulnLensError::model(
            "embeddings",
            format!("expected {} vectors, got {}", expected, items.len()),
        ));
    }
    if items.iter().all(|i| i.index.is_some()) {
        items.sort_by_key(|i| i.index);
    }
    let vectors: Vec<Vec<f32>> = items.into_iter().map(|i| i.embedding).collect();
    if vectors.iter().any(|v| v.is_empty()) {
        return Err(VulnLensError::model("embeddings", "empty vector in response"));
    }
    Ok(vectors)
}

/// Embed `texts` in batches, isolating failures to single texts
///
/// Empty texts are never sent. A failed batch is retried one text at a time so
/// a single bad input only costs its own vector. The result has one slot per
/// input; `None` marks a text that could not be embedded.
pub async fn embed_all<E: Embedder>(embedder: &E, texts: &[String], batch_size: usize) -> Vec<Option<Vec<f32>>> {
    let mut out: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
    let indices: Vec<usize> = (0..texts.len()).filter(|&i| !texts[i].trim().is_empty()).collect();

    for chunk in indices.chunks(batch_size.max(1)) {
        let batch: Vec<String> = chunk.iter().map(|&i| texts[i].clone()).collect();
        match embedder.embed(&batch).await {
            Ok(vectors) => {
                for (&i, v) in chunk.iter().zip(vectors) {
                    out[i] = Some(v);
                }
            }
            Err(e) if chunk.len() > 1 => {
                tracing::warn!("Embedding batch of {} failed ({}), retrying individually", chunk.len(), e);
                for &i in chunk {
                    match embedder.embed(std::slice::from_ref(&texts[i])).await {
                        Ok(mut v) if v.len() == 1 => out[i] = v.pop(),
                        Ok(_) => tracing::warn!("Embedding for input {} returned no vector", i),
                        Err(e) => tracing::warn!("Embedding failed for input {}: {}", i, e),
                    }
                }
            }
            Err(e) => tracing::warn!("Embedding failed for input {}: {}", chunk[0], e),
        }
    }

    out
}
