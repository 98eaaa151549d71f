use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use osint_harness_core::similarity::{
    SimilarityOptions, DEFAULT_MAX_RESULTS, DEFAULT_MIN_SCORE, DEFAULT_SEARCH_LIMIT,
};

use crate::sources::SourceId;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Per-source overrides keyed by source name (`shodan`, `virustotal`, ...).
    #[serde(default)]
    pub sources: BTreeMap<String, SourceOverride>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/osint.sqlite"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7341".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimilarityConfig {
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

fn default_min_score() -> f32 {
    DEFAULT_MIN_SCORE
}
fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}
fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            max_results: DEFAULT_MAX_RESULTS,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl SimilarityConfig {
    pub fn options(&self) -> SimilarityOptions {
        SimilarityOptions {
            min_score: self.min_score,
            max_results: self.max_results,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Replaces `https://api.openai.com/v1`.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            timeout_secs: 30,
            base_url: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_analysis_timeout_secs")]
    pub timeout_secs: u64,
    /// Replaces `https://api.openai.com/v1`.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            timeout_secs: 120,
            base_url: None,
        }
    }
}

impl AnalysisConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_analysis_timeout_secs() -> u64 {
    120
}

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Settings shared by every provider client.
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    "OSINT Intelligence Framework".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: default_user_agent(),
        }
    }
}

/// Optional per-source settings. Absent sources use their built-in
/// defaults and are enabled whenever their credentials are present.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceOverride {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Replaces the provider's pinned base URL (mirrors, test doubles).
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl Config {
    pub fn source(&self, id: SourceId) -> Option<&SourceOverride> {
        self.sources.get(id.as_str())
    }

    pub fn source_enabled(&self, id: SourceId) -> bool {
        self.source(id).map_or(true, |s| s.enabled)
    }

    pub fn base_url(&self, id: SourceId) -> String {
        self.source(id)
            .and_then(|s| s.base_url.clone())
            .unwrap_or_else(|| id.base_url().to_string())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate similarity
    if !(-1.0..=1.0).contains(&config.similarity.min_score) {
        anyhow::bail!("similarity.min_score must be in [-1.0, 1.0]");
    }
    if config.similarity.max_results < 1 {
        anyhow::bail!("similarity.max_results must be >= 1");
    }
    if config.similarity.search_limit < 1 {
        anyhow::bail!("similarity.search_limit must be >= 1");
    }

    // Validate embedding
    if config.embedding.is_enabled() && config.embedding.dims == Some(0) {
        anyhow::bail!(
            "embedding.dims must be > 0 when provider is '{}'",
            config.embedding.provider
        );
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    match config.analysis.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown analysis provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    // Validate sources
    for name in config.sources.keys() {
        name.parse::<SourceId>()
            .with_context(|| format!("Invalid [sources.{}] section", name))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.similarity.min_score, 0.7);
        assert_eq!(cfg.similarity.max_results, 5);
        assert_eq!(cfg.similarity.search_limit, 10);
        assert!(!cfg.embedding.is_enabled());
        assert!(cfg.source_enabled(SourceId::Shodan));
        assert_eq!(cfg.base_url(SourceId::Shodan), "https://api.shodan.io");
    }

    #[test]
    fn test_source_override() {
        let cfg = parse(
            r#"
[sources.greynoise]
base_url = "http://127.0.0.1:9999"

[sources.intelx]
enabled = false
"#,
        )
        .unwrap();
        assert_eq!(cfg.base_url(SourceId::GreyNoise), "http://127.0.0.1:9999");
        assert!(!cfg.source_enabled(SourceId::IntelX));
        assert!(cfg.source_enabled(SourceId::Censys));
    }

    #[test]
    fn test_rejects_unknown_source() {
        let err = parse("[sources.maltego]\nenabled = true\n").unwrap_err();
        assert!(format!("{:#}", err).contains("sources.maltego"));
    }

    #[test]
    fn test_rejects_bad_similarity() {
        assert!(parse("[similarity]\nmin_score = 1.5\n").is_err());
        assert!(parse("[similarity]\nmax_results = 0\n").is_err());
    }

    #[test]
    fn test_rejects_unknown_provider() {
        assert!(parse("[embedding]\nprovider = \"local\"\n").is_err());
        assert!(parse("[analysis]\nprovider = \"claude\"\n").is_err());
    }

    #[test]
    fn test_example_config_is_valid() {
        let cfg = parse(include_str!("../config/osint.example.toml")).unwrap();
        assert!(cfg.embedding.is_enabled());
        assert_eq!(cfg.embedding.dims, Some(1536));
        assert!(!cfg.source_enabled(SourceId::Censys));
        assert!(cfg.source_enabled(SourceId::IntelX));
    }
}
