//! Process-wide wiring shared by the CLI and the HTTP server.

use std::sync::Arc;

use anyhow::Result;

use crate::analysis::create_analyzer;
use crate::cases::CaseService;
use crate::config::Config;
use crate::credentials::Credentials;
use crate::db;
use crate::dispatch::QueryDispatcher;
use crate::embedding::create_embedder;
use crate::investigate::Investigator;
use crate::registry::ClientRegistry;

pub struct App {
    pub config: Arc<Config>,
    pub credentials: Credentials,
    pub registry: Arc<ClientRegistry>,
    pub cases: Arc<CaseService>,
    pub investigator: Arc<Investigator>,
}

impl App {
    /// Open the database and build every collaborator from config.
    pub async fn open(config: Config, credentials: Credentials) -> Result<Self> {
        let store = Arc::new(db::open_store(&config).await?);
        let embedder = create_embedder(&config.embedding, &credentials)?;
        let analyzer = create_analyzer(&config.analysis, &credentials)?;

        let mut cases = CaseService::new(
            store.clone(),
            store,
            embedder,
            config.similarity.options(),
        )
        .with_search_limit(config.similarity.search_limit);
        if !config.embedding.is_enabled() {
            cases = cases.without_indexing();
        }
        let cases = Arc::new(cases);

        let registry = Arc::new(ClientRegistry::new());
        let clients = registry.configured_clients(&credentials, &config)?;
        tracing::info!(sources = clients.len(), "provider clients ready");

        let investigator = Arc::new(Investigator::new(
            QueryDispatcher::new(clients),
            analyzer,
            Some(cases.clone()),
        ));

        Ok(Self {
            config: Arc::new(config),
            credentials,
            registry,
            cases,
            investigator,
        })
    }
}
