use std::cell::Cell;
use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ServiceError;
use crate::index::identity::sha1_hex;
use crate::retry::RetryPolicy;

/// Turns texts into vectors, one per input, in input order.
pub trait Embedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ServiceError>;

    fn embed_one(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.embed(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Shape("embedding service returned no vectors".into()))
    }
}

// ============================================================================
// OpenAI-compatible HTTP embedder
// ============================================================================

pub struct HttpEmbedder {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    retry: RetryPolicy,
    http: HttpClient,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    encoding_format: &'static str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

impl HttpEmbedder {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: Option<String>,
        retry: RetryPolicy,
    ) -> Result<Self, ServiceError> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|source| ServiceError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key,
            retry,
            http,
        })
    }

    fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ServiceError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            encoding_format: "float",
        };

        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().map_err(|source| ServiceError::Http {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        let status = response.status();
        let text = response.text().map_err(|source| ServiceError::Http {
            endpoint: self.endpoint.clone(),
            source,
        })?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: EmbeddingResponse =
            serde_json::from_str(&text).map_err(|source| ServiceError::Decode {
                context: "embedding response".into(),
                source,
            })?;
        order_vectors(parsed.data, texts.len())
    }
}

/// Put vectors back in request order; the service may tag them with `index`.
fn order_vectors(mut items: Vec<EmbeddingItem>, expected: usize) -> Result<Vec<Vec<f32>>, ServiceError> {
    if items.len() != expected {
        return Err(ServiceError::Shape(format!(
            "asked for {} embeddings, got {}",
            expected,
            items.len()
        )));
    }
    if items.iter().all(|i| i.index.is_some()) {
        items.sort_by_key(|i| i.index);
    }
    Ok(items.into_iter().map(|i| i.embedding).collect())
}

impl Embedder for HttpEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = texts.len(), model = %self.model, "embedding texts");
        self.retry.run("embedding request", |_| self.request(texts))
    }
}

// ============================================================================
// HashingEmbedder: offline bag-of-words vectors
// ============================================================================

/// Feature-hashed bag of lowercase words. Deterministic and offline; texts
/// sharing words get high cosine similarity.
pub struct HashingEmbedder {
    pub dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self { dimensions: 256 }
    }
}

impl HashingEmbedder {
    pub fn vector(&self, text: &str) -> Vec<f32> {
        let dims = self.dimensions.max(1);
        let mut v = vec![0.0f32; dims];
        for token in tokenize(text) {
            let hex = sha1_hex(token.as_bytes());
            let bucket = usize::from_str_radix(&hex[..8], 16).unwrap_or(0) % dims;
            v[bucket] += 1.0;
        }
        v
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ServiceError> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

/// Lowercase alphanumeric words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

// ============================================================================
// StaticEmbedder: fixed lookup table (tests)
// ============================================================================

/// Returns pre-registered vectors and counts how often it was called.
#[derive(Default)]
pub struct StaticEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    calls: Cell<usize>,
}

impl StaticEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    /// Number of `embed` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Embedder for StaticEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ServiceError> {
        self.calls.set(self.calls.get() + 1);
        texts
            .iter()
            .map(|t| {
                self.vectors
                    .get(*t)
                    .cloned()
                    .ok_or_else(|| ServiceError::Shape(format!("no vector registered for '{}'", t)))
            })
            .collect()
    }
}
