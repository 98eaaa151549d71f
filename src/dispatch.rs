//! Multi-source query dispatch.
//!
//! [`QueryDispatcher::dispatch`] selects every client whose applicability
//! covers the query's resolved type, asks each for its call plan, runs all
//! calls concurrently, and merges the outcomes into one
//! [`AggregatedResult`] keyed by source name.
//!
//! Dispatch never fails as a whole. A provider error lands in that
//! provider's entry. A panicking call is caught and reported the same way,
//! and also sets the aggregate [`diagnostic`](AggregatedResult::diagnostic).
//! Calls are awaited together on the caller's task with `join_all`, so
//! nothing is detached and nothing outlives the dispatch.
//!
//! # Result layout
//!
//! ```text
//! {
//!   "shodan":  { ...payload },
//!   "hibp":    { "breaches": [...], "pastesError": "API request failed: 503 - ..." },
//!   "censys":  { "error": "Rate limit exceeded for censys. Please try again later." },
//!   "error":   "optional diagnostic"
//! }
//! ```

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

use osint_harness_core::models::{Query, QueryType};

use crate::sources::{Call, Slot, SourceClient};

const PANIC_DIAGNOSTIC: &str = "One or more sources failed unexpectedly";

/// Outcome of all calls made to one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceResult {
    /// Payload of the root call, if it succeeded.
    pub data: Option<Value>,
    /// Payloads and error messages of field calls, by slot key.
    pub fields: BTreeMap<String, Value>,
    /// Error message of the root call, if it failed.
    pub error: Option<String>,
}

impl SourceResult {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// The primary error message, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or_else(|| self.fields.get("error").and_then(Value::as_str))
    }

    fn apply(&mut self, call: Call, outcome: Result<Value, String>) {
        match (call.slot, outcome) {
            (Slot::Root, Ok(value)) => self.data = Some(value),
            (Slot::Root, Err(message)) => self.error = Some(message),
            (Slot::Field { key, .. }, Ok(value)) => {
                self.fields.insert(key.to_string(), value);
            }
            (Slot::Field { error_key, .. }, Err(message)) => {
                self.fields
                    .insert(error_key.to_string(), Value::String(message));
            }
        }
    }
}

impl Serialize for SourceResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match &self.data {
            Some(Value::Object(object)) => {
                for (k, v) in object {
                    if !self.fields.contains_key(k) && !(k == "error" && self.error.is_some()) {
                        map.serialize_entry(k, v)?;
                    }
                }
            }
            Some(other) => map.serialize_entry("data", other)?,
            None => {}
        }
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        if let Some(error) = &self.error {
            map.serialize_entry("error", error)?;
        }
        map.end()
    }
}

/// Per-source outcomes of one dispatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedResult {
    pub sources: BTreeMap<String, SourceResult>,
    /// Set when dispatch could not run or something failed unexpectedly.
    pub diagnostic: Option<String>,
}

impl AggregatedResult {
    fn with_diagnostic(message: impl Into<String>) -> Self {
        Self {
            sources: BTreeMap::new(),
            diagnostic: Some(message.into()),
        }
    }

    pub fn get(&self, source: &str) -> Option<&SourceResult> {
        self.sources.get(source)
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for AggregatedResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (name, result) in &self.sources {
            map.serialize_entry(name, result)?;
        }
        if let Some(diagnostic) = &self.diagnostic {
            map.serialize_entry("error", diagnostic)?;
        }
        map.end()
    }
}

struct CallOutcome {
    source: String,
    call: Call,
    result: Result<Value, String>,
    panicked: bool,
}

/// Fans a query out to the applicable provider clients.
#[derive(Clone)]
pub struct QueryDispatcher {
    clients: Vec<Arc<dyn SourceClient>>,
}

impl QueryDispatcher {
    pub fn new(clients: Vec<Arc<dyn SourceClient>>) -> Self {
        Self { clients }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.clients.iter().map(|c| c.name()).collect()
    }

    /// Clients that would be dispatched to for a resolved type.
    pub fn applicable(&self, query_type: QueryType) -> Vec<Arc<dyn SourceClient>> {
        self.clients
            .iter()
            .filter(|c| c.accepts(query_type))
            .cloned()
            .collect()
    }

    pub async fn dispatch(&self, query: &Query) -> AggregatedResult {
        if query.raw.trim().is_empty() {
            return AggregatedResult::with_diagnostic("Query must not be empty");
        }
        if query.query_type == QueryType::Auto {
            return AggregatedResult::with_diagnostic("Query type must be resolved before dispatch");
        }

        let selected = self.applicable(query.query_type);
        tracing::info!(
            query_type = %query.query_type,
            sources = selected.len(),
            "dispatching query"
        );

        let mut aggregated = AggregatedResult::default();
        let mut pending = Vec::new();
        for client in &selected {
            let plan = client.plan(query);
            if plan.is_empty() {
                aggregated.sources.insert(
                    client.name().to_string(),
                    SourceResult::failed(format!(
                        "No lookup available for query type {}",
                        query.query_type
                    )),
                );
                continue;
            }
            aggregated
                .sources
                .insert(client.name().to_string(), SourceResult::default());
            for call in plan {
                pending.push(run_call(client.clone(), call, query.raw.clone()));
            }
        }

        for outcome in join_all(pending).await {
            if outcome.panicked {
                aggregated.diagnostic = Some(PANIC_DIAGNOSTIC.to_string());
            }
            if let Some(result) = aggregated.sources.get_mut(&outcome.source) {
                result.apply(outcome.call, outcome.result);
            }
        }

        aggregated
    }
}

async fn run_call(client: Arc<dyn SourceClient>, call: Call, input: String) -> CallOutcome {
    let source = client.name().to_string();
    let caught = AssertUnwindSafe(client.execute(call.op, &input))
        .catch_unwind()
        .await;

    let (result, panicked) = match caught {
        Ok(Ok(value)) => (Ok(value), false),
        Ok(Err(e)) => {
            tracing::warn!(source = %source, op = %call.op, error = %e, "source call failed");
            (Err(e.to_string()), false)
        }
        Err(_) => {
            tracing::error!(source = %source, op = %call.op, "source call panicked");
            (Err(format!("{} failed unexpectedly", source)), true)
        }
    };

    CallOutcome {
        source,
        call,
        result,
        panicked,
    }
}
