//! Threat-intelligence provider clients.
//!
//! Every provider is a [`SourceClient`]: a common capability set
//! (`search`, `get_details`) plus the provider-specific lookups the
//! dispatcher schedules through [`SourceClient::execute`]. Shared behavior
//! is composed in through [`GuardedHttp`], the one request primitive all
//! network calls funnel through:
//!
//! 1. `try_acquire` on the client's [`RateLimiter`]; a full window fails
//!    with [`SourceError::RateLimitExceeded`] before any I/O.
//! 2. Send the request.
//! 3. Non-2xx → [`SourceError::Upstream`] carrying status and body.
//! 4. 2xx → parsed JSON (`null` for an empty body).
//!
//! # Providers
//!
//! | Source | Base URL | Requests/min | Auth |
//! |--------|----------|--------------|------|
//! | [`shodan`] | `https://api.shodan.io` | 10 | `key` query parameter |
//! | [`virustotal`] | `https://www.virustotal.com/api/v3` | 4 | `x-apikey` header |
//! | [`hibp`] | `https://haveibeenpwned.com/api/v3` | 10 | `hibp-api-key` header |
//! | [`censys`] | `https://search.censys.io/api` | 120 | HTTP Basic |
//! | [`greynoise`] | `https://api.greynoise.io/v3` | 60 | `key` header |
//! | [`intelx`] | `https://2.intelx.io` | 30 | `x-key` header |

pub mod censys;
pub mod greynoise;
pub mod hibp;
pub mod intelx;
pub mod shodan;
pub mod status;
pub mod virustotal;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Method, Url};
use serde_json::Value;
use thiserror::Error;

use osint_harness_core::models::{Query, QueryType};

use crate::config::Config;
use crate::credentials::Credentials;
use crate::ratelimit::RateLimiter;

/// Identifier of a built-in provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceId {
    Shodan,
    VirusTotal,
    Hibp,
    Censys,
    GreyNoise,
    IntelX,
}

impl SourceId {
    pub const ALL: [SourceId; 6] = [
        SourceId::Shodan,
        SourceId::VirusTotal,
        SourceId::Hibp,
        SourceId::Censys,
        SourceId::GreyNoise,
        SourceId::IntelX,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Shodan => "shodan",
            SourceId::VirusTotal => "virustotal",
            SourceId::Hibp => "hibp",
            SourceId::Censys => "censys",
            SourceId::GreyNoise => "greynoise",
            SourceId::IntelX => "intelx",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            SourceId::Shodan => "https://api.shodan.io",
            SourceId::VirusTotal => "https://www.virustotal.com/api/v3",
            SourceId::Hibp => "https://haveibeenpwned.com/api/v3",
            SourceId::Censys => "https://search.censys.io/api",
            SourceId::GreyNoise => "https://api.greynoise.io/v3",
            SourceId::IntelX => "https://2.intelx.io",
        }
    }

    /// Requests allowed per 60-second window.
    pub fn rate_limit(&self) -> usize {
        match self {
            SourceId::Shodan => 10,
            SourceId::VirusTotal => 4,
            SourceId::Hibp => 10,
            SourceId::Censys => 120,
            SourceId::GreyNoise => 60,
            SourceId::IntelX => 30,
        }
    }

    /// Indicator types the dispatcher sends to this source.
    pub fn applicability(&self) -> &'static [QueryType] {
        match self {
            SourceId::Shodan => &[QueryType::Ip, QueryType::Domain],
            SourceId::VirusTotal => &[
                QueryType::Ip,
                QueryType::Domain,
                QueryType::Url,
                QueryType::Hash,
            ],
            SourceId::Hibp => &[QueryType::Email, QueryType::Domain],
            SourceId::Censys => &[QueryType::Ip, QueryType::Domain],
            SourceId::GreyNoise => &[QueryType::Ip],
            SourceId::IntelX => &[QueryType::Auto],
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        SourceId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown source: '{}'. Must be one of shodan, virustotal, hibp, censys, greynoise, intelx.",
                    s
                )
            })
    }
}

/// Failure of a single provider call.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("Rate limit exceeded for {provider}. Please try again later.")]
    RateLimitExceeded { provider: String },

    #[error("API request failed: {status} - {body}")]
    Upstream { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("{provider} does not support {op}")]
    Unsupported { provider: String, op: Operation },
}

/// Every lookup a dispatch plan can schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Search,
    Details,
    IpReport,
    DomainReport,
    UrlReport,
    BreachedAccount,
    Pastes,
    DomainBreaches,
    HostView,
    EmailIntel,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Search => "search",
            Operation::Details => "details",
            Operation::IpReport => "ip_report",
            Operation::DomainReport => "domain_report",
            Operation::UrlReport => "url_report",
            Operation::BreachedAccount => "breached_account",
            Operation::Pastes => "pastes",
            Operation::DomainBreaches => "domain_breaches",
            Operation::HostView => "host_view",
            Operation::EmailIntel => "email_intel",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where one call's outcome lands inside its source's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The payload is the source's primary result; a failure is `error`.
    Root,
    /// The payload goes under `key`; a failure under `error_key`.
    Field {
        key: &'static str,
        error_key: &'static str,
    },
}

/// One scheduled call: which lookup to run and where its outcome goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    pub op: Operation,
    pub slot: Slot,
}

impl Call {
    pub fn root(op: Operation) -> Self {
        Self {
            op,
            slot: Slot::Root,
        }
    }

    pub fn field(op: Operation, key: &'static str, error_key: &'static str) -> Self {
        Self {
            op,
            slot: Slot::Field { key, error_key },
        }
    }
}

/// A provider client.
///
/// Implementations hold their own [`GuardedHttp`] (and thus their own rate
/// window); share one instance per credential through the
/// [`ClientRegistry`](crate::registry::ClientRegistry).
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Source name used as the key in aggregated results.
    fn name(&self) -> &str;

    /// Indicator types this source accepts. An entry of
    /// [`QueryType::Auto`] accepts every type.
    fn applicability(&self) -> &[QueryType];

    fn accepts(&self, query_type: QueryType) -> bool {
        let types = self.applicability();
        types.contains(&QueryType::Auto) || types.contains(&query_type)
    }

    /// The calls to issue for one query. Each call must own a distinct slot.
    fn plan(&self, _query: &Query) -> Vec<Call> {
        vec![Call::root(Operation::Search)]
    }

    /// Free-text search.
    async fn search(&self, query: &str) -> Result<Value, SourceError>;

    /// Detail lookup by provider-specific identifier.
    async fn get_details(&self, id: &str) -> Result<Value, SourceError>;

    /// Run one planned operation against `input`.
    async fn execute(&self, op: Operation, input: &str) -> Result<Value, SourceError> {
        match op {
            Operation::Search => self.search(input).await,
            Operation::Details => self.get_details(input).await,
            other => Err(SourceError::Unsupported {
                provider: self.name().to_string(),
                op: other,
            }),
        }
    }
}

/// Request body shapes used by the providers.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(&'static str, String)>),
}

/// Per-request options for [`GuardedHttp::request`].
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub query: Vec<(&'static str, String)>,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<RequestBody>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: Method::GET,
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post_json(body: Value) -> Self {
        Self {
            method: Method::POST,
            query: Vec::new(),
            headers: Vec::new(),
            body: Some(RequestBody::Json(body)),
        }
    }

    pub fn post_form(fields: Vec<(&'static str, String)>) -> Self {
        Self {
            method: Method::POST,
            query: Vec::new(),
            headers: Vec::new(),
            body: Some(RequestBody::Form(fields)),
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.query.push((name, value.into()));
        self
    }
}

/// Rate-limited HTTP access to one provider base URL.
pub struct GuardedHttp {
    provider: String,
    base_url: Url,
    client: reqwest::Client,
    limiter: RateLimiter,
}

impl GuardedHttp {
    pub fn new(
        provider: impl Into<String>,
        base_url: &str,
        limiter: RateLimiter,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let provider = provider.into();
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("invalid base URL for {}: {}", provider, base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("base URL for {} cannot carry a path: {}", provider, base_url);
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            provider,
            base_url,
            client,
            limiter,
        })
    }

    /// Build the guarded transport for a built-in source from config.
    pub fn for_source(id: SourceId, config: &Config) -> Result<Self> {
        Self::new(
            id.as_str(),
            &config.base_url(id),
            RateLimiter::new(id.rate_limit()),
            Duration::from_secs(config.http.timeout_secs),
            &config.http.user_agent,
        )
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append `path` to the base URL, one percent-encoded segment per
    /// element. A `/` inside an element is escaped, never a separator.
    pub fn endpoint_url(&self, path: &[&str]) -> Result<Url, SourceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                SourceError::Transport(format!("base URL cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }

    /// Perform one rate-limited request against the base URL joined with
    /// `path`.
    pub async fn request(&self, path: &[&str], options: RequestOptions) -> Result<Value, SourceError> {
        let url = self.endpoint_url(path)?;
        let endpoint = url.path();
        if !self.limiter.try_acquire() {
            tracing::warn!(source = %self.provider, endpoint, "rate limit exceeded");
            return Err(SourceError::RateLimitExceeded {
                provider: self.provider.clone(),
            });
        }

        let mut req = self.client.request(options.method.clone(), url.clone());
        if !options.query.is_empty() {
            req = req.query(&options.query);
        }
        for (name, value) in &options.headers {
            req = req.header(*name, value);
        }
        match &options.body {
            Some(RequestBody::Json(v)) => req = req.json(v),
            Some(RequestBody::Form(fields)) => req = req.form(fields),
            None => {}
        }

        tracing::debug!(source = %self.provider, method = %options.method, endpoint, "provider request");

        let response = req
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::debug!(source = %self.provider, status = status.as_u16(), endpoint, "provider error");
            return Err(SourceError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| SourceError::Decode(e.to_string()))
    }
}

/// Construct the client for a built-in source, or `None` when its
/// credentials are missing.
pub fn build_client(
    id: SourceId,
    credentials: &Credentials,
    config: &Config,
) -> Result<Option<Arc<dyn SourceClient>>> {
    let Some(parts) = credentials.for_source(id) else {
        return Ok(None);
    };
    let http = GuardedHttp::for_source(id, config)?;
    let client: Arc<dyn SourceClient> = match id {
        SourceId::Shodan => Arc::new(shodan::ShodanClient::new(parts[0], http)),
        SourceId::VirusTotal => Arc::new(virustotal::VirusTotalClient::new(parts[0], http)),
        SourceId::Hibp => Arc::new(hibp::HibpClient::new(parts[0], http)),
        SourceId::Censys => Arc::new(censys::CensysClient::new(parts[0], parts[1], http)),
        SourceId::GreyNoise => Arc::new(greynoise::GreyNoiseClient::new(parts[0], http)),
        SourceId::IntelX => Arc::new(intelx::IntelXClient::new(parts[0], http)),
    };
    Ok(Some(client))
}
