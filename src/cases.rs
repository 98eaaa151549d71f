//! Case lifecycle: persistence of investigations plus their embeddings.
//!
//! The case document is authoritative. Its [`EmbeddingRecord`] is derived
//! from [`embedding_text`] and regenerated only when the hash of that text
//! changes, so edits to notes, tags, or raw results never cost an
//! embedding call.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;

use osint_harness_core::embedding::{content_hash, embedding_text, EmbeddingProvider};
use osint_harness_core::models::{
    Case, CaseFilter, EmbeddingRecord, QueryType, RiskLevel, SimilarityMatch,
};
use osint_harness_core::similarity::{self, SimilarityOptions, DEFAULT_SEARCH_LIMIT};
use osint_harness_core::store::{CaseStore, VectorStore};
use osint_harness_core::{Error, Result};

/// Fields supplied when creating a case.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCase {
    #[serde(default)]
    pub title: Option<String>,
    pub query: String,
    pub query_type: QueryType,
    /// Defaults to today (`YYYY-MM-DD`).
    #[serde(default)]
    pub date: Option<String>,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub results: Value,
    #[serde(default)]
    pub analysis: Value,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseUpdate {
    pub title: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub summary: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub results: Option<Value>,
    pub analysis: Option<Value>,
}

/// Default title for an investigation of `query`.
pub fn case_title(query: &str, query_type: QueryType) -> String {
    let prefix = match query_type {
        QueryType::Ip => "IP Address Analysis",
        QueryType::Domain => "Domain Investigation",
        QueryType::Email => "Email Breach Check",
        QueryType::Hash => "File Hash Analysis",
        QueryType::Url => "URL Analysis",
        _ => "OSINT Investigation",
    };
    format!("{}: {}", prefix, query)
}

pub fn today() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

pub struct CaseService {
    cases: Arc<dyn CaseStore>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    options: SimilarityOptions,
    search_limit: usize,
    indexing: bool,
}

impl CaseService {
    pub fn new(
        cases: Arc<dyn CaseStore>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        options: SimilarityOptions,
    ) -> Self {
        Self {
            cases,
            vectors,
            embedder,
            options,
            search_limit: DEFAULT_SEARCH_LIMIT,
            indexing: true,
        }
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    /// Persist cases without computing embeddings. Similarity lookups
    /// still go through the embedder and fail if it is disabled.
    pub fn without_indexing(mut self) -> Self {
        self.indexing = false;
        self
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    pub async fn create_case(&self, new: NewCase) -> Result<Case> {
        let now = Utc::now();
        let case = Case {
            id: uuid::Uuid::new_v4().to_string(),
            title: new
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| case_title(&new.query, new.query_type)),
            query: new.query,
            query_type: new.query_type,
            date: new.date.unwrap_or_else(today),
            risk_level: new.risk_level,
            summary: new.summary,
            notes: new.notes,
            tags: new.tags,
            results: new.results,
            analysis: new.analysis,
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
        };

        self.cases.put_case(&case).await?;
        tracing::info!(case_id = %case.id, query_type = %case.query_type, "case created");

        if self.indexing {
            self.index(&case, None).await?;
        }
        Ok(case)
    }

    pub async fn update_case(&self, id: &str, update: CaseUpdate) -> Result<Case> {
        let mut case = self
            .cases
            .get_case(id)
            .await?
            .ok_or_else(|| Error::CaseNotFound(id.to_string()))?;

        if let Some(title) = update.title {
            case.title = title;
        }
        if let Some(risk_level) = update.risk_level {
            case.risk_level = risk_level;
        }
        if let Some(summary) = update.summary {
            case.summary = summary;
        }
        if let Some(notes) = update.notes {
            case.notes = Some(notes);
        }
        if let Some(tags) = update.tags {
            case.tags = tags;
        }
        if let Some(results) = update.results {
            case.results = results;
        }
        if let Some(analysis) = update.analysis {
            case.analysis = analysis;
        }
        case.updated_at = Utc::now();

        self.cases.put_case(&case).await?;

        if self.indexing {
            let existing = self.vectors.get_embedding_by_case(&case.id).await?;
            let hash = content_hash(&embedding_text(&case));
            match existing {
                Some(record) if record.content_hash == hash => {
                    tracing::debug!(case_id = %case.id, "embedding text unchanged");
                }
                other => {
                    self.index(&case, other.map(|r| r.id)).await?;
                }
            }
        }
        Ok(case)
    }

    async fn index(&self, case: &Case, record_id: Option<String>) -> Result<EmbeddingRecord> {
        let text = embedding_text(case);
        let vector = self.embedder.embed(&text).await?;
        let record = EmbeddingRecord {
            id: record_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            case_id: case.id.clone(),
            vector,
            metadata: case.metadata(),
            content_hash: content_hash(&text),
            model: self.embedder.model_name().to_string(),
            created_at: Utc::now(),
        };
        self.vectors.put_embedding(&record).await?;
        tracing::debug!(case_id = %case.id, dims = record.vector.len(), "case embedded");
        Ok(record)
    }

    pub async fn get_case(&self, id: &str) -> Result<Option<Case>> {
        self.cases.get_case(id).await
    }

    pub async fn list_cases(&self, filter: &CaseFilter) -> Result<Vec<Case>> {
        self.cases.query_cases(filter).await
    }

    /// Delete a case and its embeddings. Returns `false` if it did not exist.
    pub async fn delete_case(&self, id: &str) -> Result<bool> {
        let removed = self.vectors.delete_embeddings_for_case(id).await?;
        let existed = self.cases.delete_case(id).await?;
        if existed {
            tracing::info!(case_id = id, embeddings = removed, "case deleted");
        }
        Ok(existed)
    }

    /// Cases similar to an existing one, excluding the case itself.
    pub async fn similar_cases(
        &self,
        case_id: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<SimilarityMatch>> {
        let case = self
            .cases
            .get_case(case_id)
            .await?
            .ok_or_else(|| Error::CaseNotFound(case_id.to_string()))?;

        let vector = match self.vectors.get_embedding_by_case(case_id).await? {
            Some(record) => record.vector,
            None => self.embedder.embed(&embedding_text(&case)).await?,
        };

        let mut options = self.options;
        if let Some(max) = max_results {
            options.max_results = max;
        }
        similarity::find_similar(self.vectors.as_ref(), &vector, Some(case_id), options).await
    }

    /// Free-text search over all stored cases.
    pub async fn semantic_search(
        &self,
        text: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SimilarityMatch>> {
        similarity::semantic_search(
            self.vectors.as_ref(),
            self.embedder.as_ref(),
            text,
            limit.unwrap_or(self.search_limit),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use osint_harness_core::store::memory::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic embedder: a vector keyed on the query type with the
    /// text length folded into the last component.
    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dims(&self) -> usize {
            3
        }
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let axis = if text.contains("Type: ip") {
                [1.0, 0.0]
            } else {
                [0.0, 1.0]
            };
            Ok(vec![axis[0], axis[1], (text.len() % 7) as f32 * 0.01])
        }
    }

    fn service() -> (CaseService, Arc<CountingEmbedder>, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let embedder = Arc::new(CountingEmbedder::new());
        let svc = CaseService::new(
            store.clone(),
            store.clone(),
            embedder.clone(),
            SimilarityOptions::default(),
        );
        (svc, embedder, store)
    }

    fn new_case(query: &str, query_type: QueryType) -> NewCase {
        NewCase {
            title: None,
            query: query.into(),
            query_type,
            date: None,
            risk_level: RiskLevel::Medium,
            summary: "summary".into(),
            notes: None,
            tags: Vec::new(),
            results: Value::Null,
            analysis: Value::Null,
            user_id: Some("demo-user".into()),
        }
    }

    #[test]
    fn test_case_titles() {
        assert_eq!(case_title("8.8.8.8", QueryType::Ip), "IP Address Analysis: 8.8.8.8");
        assert_eq!(
            case_title("a@b.co", QueryType::Email),
            "Email Breach Check: a@b.co"
        );
        assert_eq!(case_title("x", QueryType::Unknown), "OSINT Investigation: x");
    }

    #[tokio::test]
    async fn test_create_case_stores_embedding() {
        let (svc, embedder, store) = service();
        let case = svc
            .create_case(new_case("8.8.8.8", QueryType::Ip))
            .await
            .unwrap();
        assert_eq!(case.title, "IP Address Analysis: 8.8.8.8");
        assert_eq!(case.date.len(), 10);

        let record = store.get_embedding_by_case(&case.id).await.unwrap().unwrap();
        assert_eq!(record.metadata.query, "8.8.8.8");
        assert_eq!(record.model, "counting");
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_update_reembeds_only_on_text_change() {
        let (svc, embedder, store) = service();
        let case = svc
            .create_case(new_case("example.com", QueryType::Domain))
            .await
            .unwrap();
        let first = store.get_embedding_by_case(&case.id).await.unwrap().unwrap();

        svc.update_case(
            &case.id,
            CaseUpdate {
                notes: Some("checked with registrar".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);

        svc.update_case(
            &case.id,
            CaseUpdate {
                summary: Some("parked domain with MX records".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);

        let second = store.get_embedding_by_case(&case.id).await.unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_ne!(second.content_hash, first.content_hash);
        assert_eq!(second.metadata.summary, "parked domain with MX records");
    }

    #[tokio::test]
    async fn test_update_missing_case() {
        let (svc, _, _) = service();
        let err = svc
            .update_case("nope", CaseUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CaseNotFound(_)));
    }

    #[tokio::test]
    async fn test_similar_cases_excludes_self() {
        let (svc, _, _) = service();
        let a = svc.create_case(new_case("1.1.1.1", QueryType::Ip)).await.unwrap();
        let b = svc.create_case(new_case("8.8.8.8", QueryType::Ip)).await.unwrap();
        svc.create_case(new_case("example.com", QueryType::Domain))
            .await
            .unwrap();

        let matches = svc.similar_cases(&a.id, None).await.unwrap();
        assert!(matches.iter().all(|m| m.case_id != a.id));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].case_id, b.id);
    }

    #[tokio::test]
    async fn test_similar_cases_unknown_case() {
        let (svc, _, _) = service();
        let err = svc.similar_cases("missing", None).await.unwrap_err();
        assert!(matches!(err, Error::CaseNotFound(_)));
    }

    #[tokio::test]
    async fn test_similar_cases_without_stored_vector() {
        let store = Arc::new(InMemoryStore::new());
        let embedder = Arc::new(CountingEmbedder::new());
        let unindexed = CaseService::new(
            store.clone(),
            store.clone(),
            embedder.clone(),
            SimilarityOptions::default(),
        )
        .without_indexing();
        let lone = unindexed
            .create_case(new_case("9.9.9.9", QueryType::Ip))
            .await
            .unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);

        let indexed = CaseService::new(
            store.clone(),
            store.clone(),
            embedder.clone(),
            SimilarityOptions::default(),
        );
        let other = indexed
            .create_case(new_case("1.0.0.1", QueryType::Ip))
            .await
            .unwrap();

        let matches = indexed.similar_cases(&lone.id, Some(3)).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].case_id, other.id);
    }

    #[tokio::test]
    async fn test_delete_removes_embeddings() {
        let (svc, _, store) = service();
        let case = svc
            .create_case(new_case("example.com", QueryType::Domain))
            .await
            .unwrap();
        assert!(svc.delete_case(&case.id).await.unwrap());
        assert!(store.get_embedding_by_case(&case.id).await.unwrap().is_none());
        assert!(svc.get_case(&case.id).await.unwrap().is_none());
        assert!(!svc.delete_case(&case.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_semantic_search_default_limit() {
        let (svc, _, _) = service();
        for i in 0..12 {
            svc.create_case(new_case(&format!("10.0.0.{}", i), QueryType::Ip))
                .await
                .unwrap();
        }
        let hits = svc.semantic_search("Type: ip", None).await.unwrap();
        assert_eq!(hits.len(), DEFAULT_SEARCH_LIMIT);
        let hits = svc.semantic_search("Type: ip", Some(3)).await.unwrap();
        assert_eq!(hits.len(), 3);
    }
}
