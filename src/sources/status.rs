use serde::Serialize;

use osint_harness_core::models::QueryType;

use super::SourceId;
use crate::config::Config;
use crate::credentials::Credentials;

/// Whether a built-in source will be dispatched to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStatus {
    pub name: &'static str,
    pub configured: bool,
    pub enabled: bool,
    pub base_url: String,
    pub rate_limit: usize,
    pub query_types: Vec<QueryType>,
}

impl SourceStatus {
    pub fn active(&self) -> bool {
        self.configured && self.enabled
    }

    fn label(&self) -> &'static str {
        match (self.configured, self.enabled) {
            (true, true) => "OK",
            (true, false) => "DISABLED",
            (false, _) => "NOT CONFIGURED",
        }
    }
}

pub fn source_statuses(config: &Config, credentials: &Credentials) -> Vec<SourceStatus> {
    SourceId::ALL
        .into_iter()
        .map(|id| SourceStatus {
            name: id.as_str(),
            configured: credentials.has(id),
            enabled: config.source_enabled(id),
            base_url: config.base_url(id),
            rate_limit: id.rate_limit(),
            query_types: id.applicability().to_vec(),
        })
        .collect()
}

pub fn list_sources(config: &Config, credentials: &Credentials) {
    println!("{:<12} {:<16} {:<9} TYPES", "SOURCE", "STATUS", "PER MIN");
    for status in source_statuses(config, credentials) {
        let types: Vec<&str> = status.query_types.iter().map(|t| t.as_str()).collect();
        println!(
            "{:<12} {:<16} {:<9} {}",
            status.name,
            status.label(),
            status.rate_limit,
            types.join(",")
        );
    }
}
