//! Have I Been Pwned v3: breached accounts, pastes, and domain breaches.
//!
//! HIBP answers 404 for an account with no breaches or pastes; the account
//! lookups turn that into an empty list.

use async_trait::async_trait;
use serde_json::Value;

use osint_harness_core::models::{Query, QueryType};

use super::{
    Call, GuardedHttp, Operation, RequestOptions, SourceClient, SourceError,
    SourceId,
};

pub struct HibpClient {
    api_key: String,
    http: GuardedHttp,
}

impl HibpClient {
    pub fn new(api_key: &str, http: GuardedHttp) -> Self {
        Self {
            api_key: api_key.to_string(),
            http,
        }
    }

    fn get(&self) -> RequestOptions {
        RequestOptions::get().header("hibp-api-key", self.api_key.clone())
    }

    pub async fn breached_account(&self, email: &str) -> Result<Value, SourceError> {
        let path = ["breachedaccount", email];
        not_found_is_empty(self.http.request(&path, self.get()).await)
    }

    pub async fn pastes(&self, email: &str) -> Result<Value, SourceError> {
        let path = ["pasteaccount", email];
        not_found_is_empty(self.http.request(&path, self.get()).await)
    }

    pub async fn domain_breaches(&self, domain: &str) -> Result<Value, SourceError> {
        let opts = self.get().param("domain", domain);
        self.http.request(&["breaches"], opts).await
    }

    /// Every breach in the system.
    pub async fn all_breaches(&self) -> Result<Value, SourceError> {
        self.http.request(&["breaches"], self.get()).await
    }

    /// One breach by name.
    pub async fn breach(&self, name: &str) -> Result<Value, SourceError> {
        let path = ["breach", name];
        self.http.request(&path, self.get()).await
    }
}

fn not_found_is_empty(result: Result<Value, SourceError>) -> Result<Value, SourceError> {
    match result {
        Err(SourceError::Upstream { status: 404, .. }) => Ok(Value::Array(Vec::new())),
        other => other,
    }
}

#[async_trait]
impl SourceClient for HibpClient {
    fn name(&self) -> &str {
        SourceId::Hibp.as_str()
    }

    fn applicability(&self) -> &[QueryType] {
        SourceId::Hibp.applicability()
    }

    fn plan(&self, query: &Query) -> Vec<Call> {
        match query.query_type {
            QueryType::Email => vec![
                Call::field(Operation::BreachedAccount, "breaches", "error"),
                Call::field(Operation::Pastes, "pastes", "pastesError"),
            ],
            QueryType::Domain => vec![Call::field(
                Operation::DomainBreaches,
                "domainBreaches",
                "error",
            )],
            _ => Vec::new(),
        }
    }

    async fn search(&self, query: &str) -> Result<Value, SourceError> {
        self.breached_account(query).await
    }

    async fn get_details(&self, id: &str) -> Result<Value, SourceError> {
        self.breach(id).await
    }

    async fn execute(&self, op: Operation, input: &str) -> Result<Value, SourceError> {
        match op {
            Operation::BreachedAccount | Operation::Search => self.breached_account(input).await,
            Operation::Pastes => self.pastes(input).await,
            Operation::DomainBreaches => self.domain_breaches(input).await,
            Operation::Details => self.get_details(input).await,
            other => Err(SourceError::Unsupported {
                provider: self.name().to_string(),
                op: other,
            }),
        }
    }
}
