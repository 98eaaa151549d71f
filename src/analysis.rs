//! Risk analysis over aggregated provider results.
//!
//! The analyzer is a collaborator behind the [`RiskAnalyzer`] trait. The
//! OpenAI implementation asks a chat model for a structured assessment
//! constrained by a JSON schema; the disabled implementation always errors.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use osint_harness_core::models::{Query, RiskLevel};

use crate::config::{AnalysisConfig, OPENAI_BASE_URL};
use crate::credentials::Credentials;
use crate::dispatch::AggregatedResult;

pub const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysis {
    pub risk_level: RiskLevel,
    pub summary: String,
    pub key_findings: Vec<String>,
    pub recommended_actions: Vec<String>,
}

#[async_trait]
pub trait RiskAnalyzer: Send + Sync {
    fn name(&self) -> &str;
    async fn analyze(&self, query: &Query, results: &AggregatedResult) -> Result<RiskAnalysis>;
}

pub struct DisabledAnalyzer;

#[async_trait]
impl RiskAnalyzer for DisabledAnalyzer {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn analyze(&self, _query: &Query, _results: &AggregatedResult) -> Result<RiskAnalysis> {
        bail!("Risk analysis is disabled")
    }
}

pub struct OpenAIAnalyzer {
    api_key: String,
    model: String,
    endpoint: String,
    client: reqwest::Client,
}

impl OpenAIAnalyzer {
    pub fn new(config: &AnalysisConfig, api_key: &str) -> Result<Self> {
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
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            client,
        })
    }
}

#[async_trait]
impl RiskAnalyzer for OpenAIAnalyzer {
    fn name(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, query: &Query, results: &AggregatedResult) -> Result<RiskAnalysis> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": analysis_prompt(query, results)? }
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "risk_analysis",
                    "strict": true,
                    "schema": analysis_schema(),
                }
            }
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("analysis request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, body_text);
        }

        let json: Value = response.json().await?;
        parse_completion(&json)
    }
}

fn analysis_prompt(query: &Query, results: &AggregatedResult) -> Result<String> {
    let data = serde_json::to_string_pretty(results)?;
    Ok(format!(
        "Analyze the following OSINT data for {} \"{}\" and provide a comprehensive risk assessment:\n{}\n\n\
         Based on this data, determine the risk level (high, medium, or low), provide a summary of findings, \
         list key findings as bullet points, and recommend actions to take.",
        query.query_type, query.raw, data
    ))
}

fn analysis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "riskLevel": { "type": "string", "enum": ["high", "medium", "low"] },
            "summary": { "type": "string" },
            "keyFindings": { "type": "array", "items": { "type": "string" } },
            "recommendedActions": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["riskLevel", "summary", "keyFindings", "recommendedActions"],
        "additionalProperties": false
    })
}

fn parse_completion(json: &Value) -> Result<RiskAnalysis> {
    let content = json
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))?;
    serde_json::from_str(content).context("analysis did not match the expected schema")
}

/// Create the analyzer named by `config.provider`.
pub fn create_analyzer(
    config: &AnalysisConfig,
    credentials: &Credentials,
) -> Result<Arc<dyn RiskAnalyzer>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledAnalyzer)),
        "openai" => {
            let Some(key) = credentials.openai.as_deref() else {
                bail!("OPENAI_API_KEY environment variable not set");
            };
            Ok(Arc::new(OpenAIAnalyzer::new(config, key)?))
        }
        other => bail!("Unknown analysis provider: {}", other),
    }
}
