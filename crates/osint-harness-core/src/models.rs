//! Core data models used throughout OSINT Harness.
//!
//! These types represent the queries, cases, and embedding records that flow
//! through investigation dispatch and similarity retrieval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::classify::classify;

/// Indicator type of an investigation query.
///
/// `Auto` asks the classifier to decide; it never survives resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Ip,
    Domain,
    Email,
    Hash,
    Url,
    Unknown,
    Auto,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Ip => "ip",
            QueryType::Domain => "domain",
            QueryType::Email => "email",
            QueryType::Hash => "hash",
            QueryType::Url => "url",
            QueryType::Unknown => "unknown",
            QueryType::Auto => "auto",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ip" => Ok(QueryType::Ip),
            "domain" => Ok(QueryType::Domain),
            "email" => Ok(QueryType::Email),
            "hash" => Ok(QueryType::Hash),
            "url" => Ok(QueryType::Url),
            "unknown" => Ok(QueryType::Unknown),
            "auto" => Ok(QueryType::Auto),
            other => anyhow::bail!(
                "invalid query type: '{}'. Must be ip, domain, email, hash, url, unknown, or auto.",
                other
            ),
        }
    }
}

/// A single investigation query, alive for the duration of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub raw: String,
    pub query_type: QueryType,
}

impl Query {
    /// Build a query with a resolved type.
    ///
    /// An explicit type other than `Auto` bypasses classification; `None` or
    /// `Some(Auto)` runs [`classify`] over the trimmed input.
    pub fn resolve(raw: &str, requested: Option<QueryType>) -> Self {
        let raw = raw.trim().to_string();
        let query_type = match requested {
            Some(QueryType::Auto) | None => classify(&raw),
            Some(explicit) => explicit,
        };
        Self { raw, query_type }
    }
}

/// Risk classification produced by the analysis collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::High => "high",
            RiskLevel::Medium => "medium",
            RiskLevel::Low => "low",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(RiskLevel::High),
            "medium" => Ok(RiskLevel::Medium),
            "low" => Ok(RiskLevel::Low),
            other => anyhow::bail!("invalid risk level: '{}'", other),
        }
    }
}

/// A persisted investigation. The case is authoritative; its embedding
/// record is derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: String,
    pub title: String,
    pub query: String,
    pub query_type: QueryType,
    /// Calendar day of the investigation (`YYYY-MM-DD`).
    pub date: String,
    pub risk_level: RiskLevel,
    pub summary: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub results: serde_json::Value,
    #[serde(default)]
    pub analysis: serde_json::Value,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
    pub fn metadata(&self) -> CaseMetadata {
        CaseMetadata {
            title: self.title.clone(),
            query: self.query.clone(),
            query_type: self.query_type,
            risk_level: self.risk_level,
            summary: self.summary.clone(),
            date: self.date.clone(),
        }
    }
}

/// Filter for listing cases. Results are ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub risk_level: Option<RiskLevel>,
    pub query_type: Option<QueryType>,
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

impl CaseFilter {
    pub fn matches(&self, case: &Case) -> bool {
        self.risk_level.map_or(true, |r| case.risk_level == r)
            && self.query_type.map_or(true, |t| case.query_type == t)
            && self
                .user_id
                .as_deref()
                .map_or(true, |u| case.user_id.as_deref() == Some(u))
    }
}

/// Case fields copied onto an embedding record for display with matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseMetadata {
    pub title: String,
    pub query: String,
    pub query_type: QueryType,
    pub risk_level: RiskLevel,
    pub summary: String,
    pub date: String,
}

/// A stored case embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingRecord {
    pub id: String,
    pub case_id: String,
    pub vector: Vec<f32>,
    pub metadata: CaseMetadata,
    /// SHA-256 of the text the vector was computed from.
    pub content_hash: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

/// One ranked hit from [`find_similar`](crate::similarity::find_similar) or
/// [`semantic_search`](crate::similarity::semantic_search).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityMatch {
    /// Embedding record id.
    pub id: String,
    pub case_id: String,
    pub score: f32,
    pub metadata: CaseMetadata,
}
