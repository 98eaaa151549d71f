//! Embedding provider implementations.
//!
//! Concrete backends for the core [`EmbeddingProvider`] trait:
//! - **[`DisabledEmbedder`]**: returns errors; used when embeddings are not configured.
//! - **[`OpenAIEmbedder`]**: calls the OpenAI embeddings API.
//!
//! # Provider Selection
//!
//! Use [`create_embedder`] to instantiate the appropriate provider based
//! on the configuration:
//!
//! ```rust,no_run
//! # use osint_harness::config::EmbeddingConfig;
//! # use osint_harness::credentials::Credentials;
//! # use osint_harness::embedding::create_embedder;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let embedder = create_embedder(&config, &Credentials::default()).unwrap();
//! assert_eq!(embedder.model_name(), "disabled");
//! ```
//!
//! Failures are reported once as
//! [`Error::EmbeddingFailure`](osint_harness_core::Error::EmbeddingFailure);
//! there is no retry. A vector whose length differs from the configured
//! `dims` is rejected with
//! [`Error::DimensionMismatch`](osint_harness_core::Error::DimensionMismatch).

use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;

use osint_harness_core::embedding::EmbeddingProvider;
use osint_harness_core::{Error, Result};

use crate::config::{EmbeddingConfig, OPENAI_BASE_URL};
use crate::credentials::Credentials;

pub const DEFAULT_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_DIMS: usize = 1536;

// ============ Disabled Provider ============

/// A no-op embedding provider that always returns errors.
pub struct DisabledEmbedder;

#[async_trait]
impl EmbeddingProvider for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::EmbeddingFailure(
            "Embedding provider is disabled".to_string(),
        ))
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using `POST /v1/embeddings`.
pub struct OpenAIEmbedder {
    api_key: String,
    model: String,
    dims: usize,
    endpoint: String,
    client: reqwest::Client,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let base = config.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
        Ok(Self {
            api_key: api_key.to_string(),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            dims: config.dims.unwrap_or(DEFAULT_DIMS),
            endpoint: format!("{}/embeddings", base.trim_end_matches('/')),
            client,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": text,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::EmbeddingFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::EmbeddingFailure(format!(
                "OpenAI API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::EmbeddingFailure(e.to_string()))?;
        let vector = parse_openai_response(&json)?;

        if vector.len() != self.dims {
            return Err(Error::DimensionMismatch {
                expected: self.dims,
                got: vector.len(),
            });
        }
        Ok(vector)
    }
}

/// Extract `data[0].embedding` from an embeddings response.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<f32>> {
    let embedding = json
        .get("data")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|item| item.get("embedding"))
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            Error::EmbeddingFailure("Invalid OpenAI response: missing embedding".to_string())
        })?;

    embedding
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_f64().map(|x| x as f32).ok_or_else(|| {
                Error::EmbeddingFailure(format!(
                    "Invalid OpenAI response: embedding[{}] is not a number",
                    i
                ))
            })
        })
        .collect()
}

/// Create the appropriate [`EmbeddingProvider`] based on configuration.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledEmbedder`] |
/// | `"openai"` | [`OpenAIEmbedder`] (needs `OPENAI_API_KEY`) |
pub fn create_embedder(
    config: &EmbeddingConfig,
    credentials: &Credentials,
) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "openai" => {
            let Some(key) = credentials.openai.as_deref() else {
                bail!("OPENAI_API_KEY environment variable not set");
            };
            Ok(Arc::new(OpenAIEmbedder::new(config, key)?))
        }
        other => bail!("Unknown embedding provider: {}", other),
    }
}
