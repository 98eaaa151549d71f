//! CLI command bodies. Results go to stdout; diagnostics go through
//! `tracing`.

use anyhow::{bail, Result};

use osint_harness_core::classify::classify;
use osint_harness_core::models::SimilarityMatch;

use crate::app::App;
use crate::investigate::InvestigateRequest;

pub fn run_classify(query: &str) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        bail!("Query must not be empty");
    }
    println!("{}", classify(query));
    Ok(())
}

pub async fn run_investigate(
    app: &App,
    query: &str,
    query_type: Option<String>,
    save: bool,
) -> Result<()> {
    if save && !app.config.embedding.is_enabled() {
        tracing::warn!("embeddings disabled; the case will not appear in similarity search");
    }

    let response = app
        .investigator
        .investigate(InvestigateRequest {
            query: query.to_string(),
            query_type,
            save_as_case: save,
            user_id: None,
        })
        .await?;

    if response.results.is_empty() && response.results.diagnostic.is_none() {
        println!(
            "No configured source handles {} queries. Run `osint sources` to check credentials.",
            response.query_type
        );
    }
    println!("{}", serde_json::to_string_pretty(&response)?);

    if let Some(case) = &response.case {
        println!();
        println!("Saved case {} ({})", case.id, case.title);
    }
    Ok(())
}

pub async fn run_similar(app: &App, case_id: &str, limit: Option<usize>) -> Result<()> {
    require_embeddings(app)?;
    let matches = app.cases.similar_cases(case_id, limit).await?;
    print_matches(&matches);
    Ok(())
}

pub async fn run_search(app: &App, text: &str, limit: Option<usize>) -> Result<()> {
    if text.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }
    require_embeddings(app)?;
    let matches = app.cases.semantic_search(text, limit).await?;
    print_matches(&matches);
    Ok(())
}

fn require_embeddings(app: &App) -> Result<()> {
    if !app.config.embedding.is_enabled() {
        bail!("Similarity search requires embeddings. Set [embedding] provider in config.");
    }
    Ok(())
}

fn print_matches(matches: &[SimilarityMatch]) {
    if matches.is_empty() {
        println!("No results.");
        return;
    }
    for (i, m) in matches.iter().enumerate() {
        println!(
            "{}. [{:.3}] {} ({})",
            i + 1,
            m.score,
            m.metadata.title,
            m.metadata.risk_level
        );
        println!("    query: {} ({})", m.metadata.query, m.metadata.query_type);
        println!("    date: {}", m.metadata.date);
        if !m.metadata.summary.is_empty() {
            println!("    summary: {}", m.metadata.summary);
        }
        println!("    case: {}", m.case_id);
        println!();
    }
}
