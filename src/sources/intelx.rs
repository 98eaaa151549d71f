//! Intelligence X two-step search and phonebook lookups.
//!
//! A search first submits the term and receives a search id, then fetches
//! the results for that id. Each step goes through the rate limiter.

use async_trait::async_trait;
use serde_json::{json, Value};

use osint_harness_core::models::{Query, QueryType};

use super::{Call, GuardedHttp, Operation, RequestOptions, SourceClient, SourceError, SourceId};

const MAX_RESULTS: u32 = 10;

pub struct IntelXClient {
    api_key: String,
    http: GuardedHttp,
}

impl IntelXClient {
    pub fn new(api_key: &str, http: GuardedHttp) -> Self {
        Self {
            api_key: api_key.to_string(),
            http,
        }
    }

    fn auth(&self, opts: RequestOptions) -> RequestOptions {
        opts.header("x-key", self.api_key.clone())
    }

    async fn submit(&self, term: &str) -> Result<String, SourceError> {
        let body = json!({
            "term": term,
            "maxresults": MAX_RESULTS,
            "media": 0,
            "sort": 2,
            "terminate": [],
        });
        let submitted = self
            .http
            .request(
                &["intelligent", "search"],
                self.auth(RequestOptions::post_json(body)),
            )
            .await?;
        search_id(&submitted)
    }

    pub async fn phonebook(&self, term: &str) -> Result<Value, SourceError> {
        let opts = self.auth(RequestOptions::get().param("term", term));
        self.http.request(&["phonebook", "search"], opts).await
    }
}

fn search_id(submitted: &Value) -> Result<String, SourceError> {
    match submitted.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(SourceError::Decode(
            "search submission returned no id".to_string(),
        )),
    }
}

#[async_trait]
impl SourceClient for IntelXClient {
    fn name(&self) -> &str {
        SourceId::IntelX.as_str()
    }

    fn applicability(&self) -> &[QueryType] {
        SourceId::IntelX.applicability()
    }

    fn plan(&self, query: &Query) -> Vec<Call> {
        let mut calls = vec![Call::root(Operation::Search)];
        if query.query_type == QueryType::Email {
            calls.push(Call::field(Operation::EmailIntel, "emailData", "emailError"));
        }
        calls
    }

    async fn search(&self, query: &str) -> Result<Value, SourceError> {
        let id = self.submit(query).await?;
        let opts = self.auth(RequestOptions::get().param("id", id));
        self.http.request(&["intelligent", "search", "result"], opts).await
    }

    async fn get_details(&self, id: &str) -> Result<Value, SourceError> {
        let opts = self.auth(
            RequestOptions::get()
                .param("id", id)
                .param("status", "1"),
        );
        self.http.request(&["intelligent", "search", "result"], opts).await
    }

    async fn execute(&self, op: Operation, input: &str) -> Result<Value, SourceError> {
        match op {
            Operation::Search => self.search(input).await,
            Operation::Details => self.get_details(input).await,
            Operation::EmailIntel => self.phonebook(input).await,
            other => Err(SourceError::Unsupported {
                provider: self.name().to_string(),
                op: other,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn client() -> IntelXClient {
        let http = GuardedHttp::for_source(SourceId::IntelX, &Config::default()).unwrap();
        IntelXClient::new("k", http)
    }

    #[test]
    fn test_accepts_every_type() {
        let c = client();
        for t in [
            QueryType::Ip,
            QueryType::Domain,
            QueryType::Email,
            QueryType::Hash,
            QueryType::Url,
            QueryType::Unknown,
        ] {
            assert!(c.accepts(t), "{}", t);
        }
    }

    #[test]
    fn test_email_plan_adds_phonebook() {
        let c = client();
        let plan = c.plan(&Query::resolve("bob@example.org", None));
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[1].op, Operation::EmailIntel);
        let plan = c.plan(&Query::resolve("free text", None));
        assert_eq!(plan, vec![Call::root(Operation::Search)]);
    }

    #[test]
    fn test_search_id_extraction() {
        assert_eq!(search_id(&json!({"id": "abc", "status": 0})).unwrap(), "abc");
        assert_eq!(search_id(&json!({"id": 42})).unwrap(), "42");
        assert!(search_id(&json!({"status": 2})).is_err());
    }
}
