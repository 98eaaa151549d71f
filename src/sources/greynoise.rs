//! GreyNoise community, quick-check, RIOT, and GNQL lookups.

use async_trait::async_trait;
use serde_json::{json, Value};

use osint_harness_core::models::QueryType;

use super::{GuardedHttp, RequestOptions, SourceClient, SourceError, SourceId};

pub struct GreyNoiseClient {
    api_key: String,
    http: GuardedHttp,
}

impl GreyNoiseClient {
    pub fn new(api_key: &str, http: GuardedHttp) -> Self {
        Self {
            api_key: api_key.to_string(),
            http,
        }
    }

    fn auth(&self, opts: RequestOptions) -> RequestOptions {
        opts.header("key", self.api_key.clone())
    }

    async fn get(&self, path: &[&str]) -> Result<Value, SourceError> {
        self.http
            .request(path, self.auth(RequestOptions::get()))
            .await
    }

    pub async fn community(&self, ip: &str) -> Result<Value, SourceError> {
        self.get(&["community", ip]).await
    }

    pub async fn quick(&self, ip: &str) -> Result<Value, SourceError> {
        self.get(&["noise", "quick", ip]).await
    }

    pub async fn multi_quick(&self, ips: &[&str]) -> Result<Value, SourceError> {
        let opts = self.auth(RequestOptions::post_json(json!({ "ips": ips })));
        self.http.request(&["noise", "multi", "quick"], opts).await
    }

    /// Known-benign service lookup.
    pub async fn riot(&self, ip: &str) -> Result<Value, SourceError> {
        self.get(&["riot", ip]).await
    }

    pub async fn gnql(&self, query: &str) -> Result<Value, SourceError> {
        let opts = self.auth(RequestOptions::post_json(json!({ "query": query })));
        self.http.request(&["experimental", "gnql"], opts).await
    }
}

#[async_trait]
impl SourceClient for GreyNoiseClient {
    fn name(&self) -> &str {
        SourceId::GreyNoise.as_str()
    }

    fn applicability(&self) -> &[QueryType] {
        SourceId::GreyNoise.applicability()
    }

    /// The community endpoint is the primary lookup for an IP.
    async fn search(&self, query: &str) -> Result<Value, SourceError> {
        self.community(query).await
    }

    async fn get_details(&self, id: &str) -> Result<Value, SourceError> {
        self.community(id).await
    }
}
