//! VirusTotal v3 reports for IPs, domains, URLs, and file hashes.
//!
//! URL reports are addressed by the unpadded URL-safe base64 of the URL.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

use osint_harness_core::models::{Query, QueryType};

use super::{
    Call, GuardedHttp, Operation, RequestOptions, SourceClient, SourceError,
    SourceId,
};

pub struct VirusTotalClient {
    api_key: String,
    http: GuardedHttp,
}

impl VirusTotalClient {
    pub fn new(api_key: &str, http: GuardedHttp) -> Self {
        Self {
            api_key: api_key.to_string(),
            http,
        }
    }

    fn auth(&self, opts: RequestOptions) -> RequestOptions {
        opts.header("x-apikey", self.api_key.clone())
    }

    async fn get(&self, path: &[&str]) -> Result<Value, SourceError> {
        self.http
            .request(path, self.auth(RequestOptions::get()))
            .await
    }

    pub async fn ip_report(&self, ip: &str) -> Result<Value, SourceError> {
        self.get(&["ip_addresses", ip]).await
    }

    pub async fn domain_report(&self, domain: &str) -> Result<Value, SourceError> {
        self.get(&["domains", domain]).await
    }

    pub async fn url_report(&self, url: &str) -> Result<Value, SourceError> {
        self.get(&["urls", url_id(url).as_str()]).await
    }

    pub async fn file_report(&self, hash: &str) -> Result<Value, SourceError> {
        self.get(&["files", hash]).await
    }

    /// Submit a URL for scanning.
    pub async fn scan_url(&self, url: &str) -> Result<Value, SourceError> {
        let opts = self.auth(RequestOptions::post_form(vec![("url", url.to_string())]));
        self.http.request(&["urls"], opts).await
    }
}

/// VirusTotal URL identifier.
pub fn url_id(url: &str) -> String {
    URL_SAFE_NO_PAD.encode(url.as_bytes())
}

#[async_trait]
impl SourceClient for VirusTotalClient {
    fn name(&self) -> &str {
        SourceId::VirusTotal.as_str()
    }

    fn applicability(&self) -> &[QueryType] {
        SourceId::VirusTotal.applicability()
    }

    fn plan(&self, query: &Query) -> Vec<Call> {
        let op = match query.query_type {
            QueryType::Ip => Operation::IpReport,
            QueryType::Domain => Operation::DomainReport,
            QueryType::Url => Operation::UrlReport,
            QueryType::Hash => Operation::Details,
            _ => Operation::Search,
        };
        vec![Call::root(op)]
    }

    async fn search(&self, query: &str) -> Result<Value, SourceError> {
        let opts = self.auth(RequestOptions::get().param("query", query));
        self.http.request(&["intelligence", "search"], opts).await
    }

    async fn get_details(&self, id: &str) -> Result<Value, SourceError> {
        self.file_report(id).await
    }

    async fn execute(&self, op: Operation, input: &str) -> Result<Value, SourceError> {
        match op {
            Operation::IpReport => self.ip_report(input).await,
            Operation::DomainReport => self.domain_report(input).await,
            Operation::UrlReport => self.url_report(input).await,
            Operation::Details => self.get_details(input).await,
            Operation::Search => self.search(input).await,
            other => Err(SourceError::Unsupported {
                provider: self.name().to_string(),
                op: other,
            }),
        }
    }
}
