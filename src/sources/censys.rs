//! Censys search (v2 hosts, v1 certificates and IPv4 view).
//!
//! Authenticates with HTTP Basic over the API id and secret.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};

use osint_harness_core::models::{Query, QueryType};

use super::{
    Call, GuardedHttp, Operation, RequestOptions, SourceClient, SourceError,
    SourceId,
};

pub struct CensysClient {
    authorization: String,
    http: GuardedHttp,
}

impl CensysClient {
    pub fn new(api_id: &str, api_secret: &str, http: GuardedHttp) -> Self {
        Self {
            authorization: basic_auth(api_id, api_secret),
            http,
        }
    }

    fn auth(&self, opts: RequestOptions) -> RequestOptions {
        opts.header("authorization", self.authorization.clone())
            .header("accept", "application/json")
    }

    /// v2 host record.
    pub async fn host(&self, ip: &str) -> Result<Value, SourceError> {
        let path = ["v2", "hosts", ip];
        self.http
            .request(&path, self.auth(RequestOptions::get()))
            .await
    }

    /// v1 IPv4 view, the secondary lookup for IP investigations.
    pub async fn view_ipv4(&self, ip: &str) -> Result<Value, SourceError> {
        let path = ["v1", "view", "ipv4", ip];
        self.http
            .request(&path, self.auth(RequestOptions::get()))
            .await
    }

    pub async fn search_certificates(&self, query: &str) -> Result<Value, SourceError> {
        let opts = self.auth(RequestOptions::post_json(json!({ "query": query })));
        self.http.request(&["v1", "search", "certificates"], opts).await
    }
}

fn basic_auth(id: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", id, secret)))
}

#[async_trait]
impl SourceClient for CensysClient {
    fn name(&self) -> &str {
        SourceId::Censys.as_str()
    }

    fn applicability(&self) -> &[QueryType] {
        SourceId::Censys.applicability()
    }

    fn plan(&self, query: &Query) -> Vec<Call> {
        let mut calls = vec![Call::root(Operation::Search)];
        if query.query_type == QueryType::Ip {
            calls.push(Call::field(Operation::HostView, "details", "detailsError"));
        }
        calls
    }

    async fn search(&self, query: &str) -> Result<Value, SourceError> {
        let opts = self.auth(RequestOptions::post_json(json!({ "q": query })));
        self.http.request(&["v2", "hosts", "search"], opts).await
    }

    async fn get_details(&self, id: &str) -> Result<Value, SourceError> {
        self.host(id).await
    }

    async fn execute(&self, op: Operation, input: &str) -> Result<Value, SourceError> {
        match op {
            Operation::Search => self.search(input).await,
            Operation::Details => self.get_details(input).await,
            Operation::HostView => self.view_ipv4(input).await,
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

    fn client() -> CensysClient {
        let http = GuardedHttp::for_source(SourceId::Censys, &Config::default()).unwrap();
        CensysClient::new("id", "secret", http)
    }

    #[test]
    fn test_basic_auth_header() {
        assert_eq!(basic_auth("id", "secret"), "Basic aWQ6c2VjcmV0");
    }

    #[test]
    fn test_ip_plan_adds_details() {
        let c = client();
        let plan = c.plan(&Query::resolve("192.0.2.1", None));
        assert_eq!(
            plan,
            vec![
                Call::root(Operation::Search),
                Call::field(Operation::HostView, "details", "detailsError"),
            ]
        );
        let plan = c.plan(&Query::resolve("example.com", None));
        assert_eq!(plan, vec![Call::root(Operation::Search)]);
    }

    #[test]
    fn test_limiter_capacity() {
        assert_eq!(client().http.limiter().capacity(), 120);
    }
}
