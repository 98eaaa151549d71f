//! Shodan host search.
//!
//! The API key travels as the `key` query parameter on every request.

use async_trait::async_trait;
use serde_json::Value;

use osint_harness_core::models::QueryType;

use super::{GuardedHttp, RequestOptions, SourceClient, SourceError, SourceId};

pub struct ShodanClient {
    api_key: String,
    http: GuardedHttp,
}

impl ShodanClient {
    pub fn new(api_key: &str, http: GuardedHttp) -> Self {
        Self {
            api_key: api_key.to_string(),
            http,
        }
    }

    fn get(&self) -> RequestOptions {
        RequestOptions::get().param("key", self.api_key.clone())
    }

    /// Full host record for one IP.
    pub async fn host_details(&self, ip: &str) -> Result<Value, SourceError> {
        let path = ["shodan", "host", ip];
        self.http.request(&path, self.get()).await
    }

    /// Resolve hostnames to IPs.
    pub async fn dns_resolve(&self, hostnames: &[&str]) -> Result<Value, SourceError> {
        let opts = self.get().param("hostnames", hostnames.join(","));
        self.http.request(&["dns", "resolve"], opts).await
    }

    /// Reverse-resolve IPs to hostnames.
    pub async fn dns_reverse(&self, ips: &[&str]) -> Result<Value, SourceError> {
        let opts = self.get().param("ips", ips.join(","));
        self.http.request(&["dns", "reverse"], opts).await
    }

    /// Plan and credit information for the key.
    pub async fn api_info(&self) -> Result<Value, SourceError> {
        self.http.request(&["api-info"], self.get()).await
    }

    /// Ports the crawlers scan.
    pub async fn ports(&self) -> Result<Value, SourceError> {
        self.http.request(&["shodan", "ports"], self.get()).await
    }
}

#[async_trait]
impl SourceClient for ShodanClient {
    fn name(&self) -> &str {
        SourceId::Shodan.as_str()
    }

    fn applicability(&self) -> &[QueryType] {
        SourceId::Shodan.applicability()
    }

    async fn search(&self, query: &str) -> Result<Value, SourceError> {
        let opts = self.get().param("query", query);
        self.http.request(&["shodan", "host", "search"], opts).await
    }

    async fn get_details(&self, id: &str) -> Result<Value, SourceError> {
        self.host_details(id).await
    }
}
