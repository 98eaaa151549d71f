//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement, plus pure helpers for vector serialization and for building
//! the text a case is embedded from.
//!
//! Concrete provider implementations (OpenAI, disabled) live in the
//! `osint-harness` app crate.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::Case;

/// Trait for embedding providers.
///
/// `embed` failures are reported as
/// [`Error::EmbeddingFailure`](crate::Error::EmbeddingFailure) and are not
/// retried by callers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
    /// Embed one text into a vector of length [`dims`](EmbeddingProvider::dims).
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Build the text a case is embedded from.
///
/// Only the fields that describe the investigation take part, so edits to
/// notes or raw results never force a new vector.
pub fn embedding_text(case: &Case) -> String {
    format!(
        "Title: {}\nQuery: {}\nType: {}\nRisk Level: {}\nSummary: {}",
        case.title, case.query, case.query_type, case.risk_level, case.summary
    )
}

/// SHA-256 hex digest of an embedding text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// # Example
///
/// ```rust
/// use osint_harness_core::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12); // 3 × 4 bytes
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
