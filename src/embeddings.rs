use crate::error::BackendError;
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_EMBEDDINGS_URL: &str =
    "https://api-inference.huggingface.co/pipeline/feature-extraction";
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

/// Capability that turns text into a vector
///
/// Implementations must be deterministic for a fixed model and credential.
#[allow(async_fn_in_trait)]
pub trait Embedder {
    async fn embed(&self, text: &str) -> std::result::Result<Embedding, BackendError>;
}

/// Configuration for the Hugging Face feature-extraction API
#[derive(Clone, Debug)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub embeddings_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl EmbeddingConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key =
            lookup("HUGGINGFACEHUB_API_TOKEN").context("HUGGINGFACEHUB_API_TOKEN not set")?;
        let embeddings_url =
            lookup("EMBEDDINGS_URL").unwrap_or_else(|| DEFAULT_EMBEDDINGS_URL.to_string());
        let model =
            lookup("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
        let timeout_secs = crate::config::parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 60)?;

        Ok(EmbeddingConfig {
            api_key,
            embeddings_url,
            model,
            timeout_secs,
        })
    }
}

/// Client for the Hugging Face inference API
#[derive(Clone)]
pub struct HuggingFaceEmbedder {
    config: EmbeddingConfig,
    client: reqwest::Client,
}

impl HuggingFaceEmbedder {
    /// Create a new embedding client with a request timeout
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build embeddings HTTP client")?;
        Ok(HuggingFaceEmbedder { config, client })
    }

    /// Get the client configuration
    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    fn model_url(&self) -> String {
        format!(
            "{}/{}",
            self.config.embeddings_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

impl Embedder for HuggingFaceEmbedder {
    async fn embed(&self, text: &str) -> std::result::Result<Embedding, BackendError> {
        let timeout = self.config.timeout_secs;
        let request = EmbeddingRequest {
            inputs: text,
            options: EmbeddingOptions {
                wait_for_model: true,
            },
        };

        let response = self
            .client
            .post(self.model_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(e, timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BackendError::Status { status, body });
        }

        let response_data: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| BackendError::from_reqwest(e, timeout))?;

        let values = response_data.into_vector()?;
        debug!("Embedded text into {} dimensions", values.len());

        Ok(Embedding { values })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    inputs: &'a str,
    options: EmbeddingOptions,
}

#[derive(Serialize)]
struct EmbeddingOptions {
    wait_for_model: bool,
}

/// Sentence-transformer pipelines return a pooled vector; plain models return
/// one vector per token, possibly wrapped in a batch dimension
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum EmbeddingResponse {
    Pooled(Vec<f32>),
    Tokens(Vec<Vec<f32>>),
    Batched(Vec<Vec<Vec<f32>>>),
}

impl EmbeddingResponse {
    fn into_vector(self) -> std::result::Result<Vec<f32>, BackendError> {
        let values = match self {
            EmbeddingResponse::Pooled(values) => values,
            EmbeddingResponse::Tokens(tokens) => mean_pool(tokens)?,
            EmbeddingResponse::Batched(batch) => {
                let tokens = batch
                    .into_iter()
                    .next()
                    .ok_or_else(|| BackendError::Malformed("empty embedding batch".into()))?;
                mean_pool(tokens)?
            }
        };

        if values.is_empty() {
            return Err(BackendError::Malformed("empty embedding vector".into()));
        }
        Ok(values)
    }
}

/// Average token vectors into a single sentence vector
fn mean_pool(tokens: Vec<Vec<f32>>) -> std::result::Result<Vec<f32>, BackendError> {
    let dimension = tokens
        .first()
        .map(Vec::len)
        .ok_or_else(|| BackendError::Malformed("no token embeddings".into()))?;

    let mut sum = vec![0.0f32; dimension];
    for token in &tokens {
        if token.len() != dimension {
            return Err(BackendError::Malformed(format!(
                "token embedding has {} dimensions, expected {}",
                token.len(),
                dimension
            )));
        }
        for (acc, value) in sum.iter_mut().zip(token) {
            *acc += value;
        }
    }

    let count = tokens.len() as f32;
    Ok(sum.into_iter().map(|v| v / count).collect())
}
