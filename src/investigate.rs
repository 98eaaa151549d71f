//! One-shot investigation: classify, dispatch, analyze, optionally save.

use std::sync::Arc;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use osint_harness_core::models::{Case, Query, QueryType, RiskLevel};

use crate::analysis::{RiskAnalysis, RiskAnalyzer};
use crate::cases::{case_title, today, CaseService, NewCase};
use crate::dispatch::{AggregatedResult, QueryDispatcher};

pub const DEFAULT_USER_ID: &str = "demo-user";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestigateRequest {
    pub query: String,
    /// `ip`, `domain`, `email`, `hash`, `url`, `unknown`, or `auto`.
    #[serde(default)]
    pub query_type: Option<String>,
    #[serde(default)]
    pub save_as_case: bool,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestigateResponse {
    pub query: String,
    pub query_type: QueryType,
    pub results: AggregatedResult,
    pub analysis: Option<RiskAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<Case>,
}

pub struct Investigator {
    dispatcher: QueryDispatcher,
    analyzer: Arc<dyn RiskAnalyzer>,
    cases: Option<Arc<CaseService>>,
}

impl Investigator {
    pub fn new(
        dispatcher: QueryDispatcher,
        analyzer: Arc<dyn RiskAnalyzer>,
        cases: Option<Arc<CaseService>>,
    ) -> Self {
        Self {
            dispatcher,
            analyzer,
            cases,
        }
    }

    pub fn dispatcher(&self) -> &QueryDispatcher {
        &self.dispatcher
    }

    pub async fn investigate(&self, request: InvestigateRequest) -> Result<InvestigateResponse> {
        if request.query.trim().is_empty() {
            bail!("Query is required");
        }
        let requested = request
            .query_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(str::parse::<QueryType>)
            .transpose()?;
        if request.save_as_case && self.cases.is_none() {
            bail!("Saving cases requires a case store");
        }

        let query = Query::resolve(&request.query, requested);
        let results = self.dispatcher.dispatch(&query).await;

        // A failed analysis leaves the raw results usable.
        let analysis = match self.analyzer.analyze(&query, &results).await {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                tracing::warn!(analyzer = self.analyzer.name(), error = %e, "risk analysis failed");
                None
            }
        };

        let case = match (&self.cases, request.save_as_case) {
            (Some(cases), true) => {
                let (risk_level, summary) = analysis
                    .as_ref()
                    .map(|a| (a.risk_level, a.summary.clone()))
                    .unwrap_or((RiskLevel::Low, String::new()));
                let new = NewCase {
                    title: Some(case_title(&query.raw, query.query_type)),
                    query: query.raw.clone(),
                    query_type: query.query_type,
                    date: Some(today()),
                    risk_level,
                    summary,
                    notes: None,
                    tags: Vec::new(),
                    results: results.to_value(),
                    analysis: analysis
                        .as_ref()
                        .and_then(|a| serde_json::to_value(a).ok())
                        .unwrap_or(Value::Null),
                    user_id: Some(
                        request
                            .user_id
                            .clone()
                            .unwrap_or_else(|| DEFAULT_USER_ID.to_string()),
                    ),
                };
                Some(cases.create_case(new).await?)
            }
            _ => None,
        };

        Ok(InvestigateResponse {
            query: query.raw,
            query_type: query.query_type,
            results,
            analysis,
            case,
        })
    }
}
