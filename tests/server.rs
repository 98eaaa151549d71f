//! End-to-end HTTP API tests. A fake OpenAI endpoint and a fake GreyNoise
//! endpoint stand in for the network.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Path,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;

use osint_harness::app::App;
use osint_harness::config::Config;
use osint_harness::credentials::Credentials;
use osint_harness::server;

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if client
            .get(format!("http://127.0.0.1:{}/health", port))
            .send()
            .await
            .is_ok()
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("server did not start on port {}", port);
}

async fn fake_embeddings(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer sk-test") {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let text = body["input"].as_str().unwrap_or_default();
    let vector = if text.contains("Type: ip") || text.contains("scanner") {
        [1.0, 0.0, 0.0]
    } else if text.contains("Type: domain") {
        [0.8, 0.6, 0.0]
    } else {
        [0.0, 0.0, 1.0]
    };
    Json(json!({ "data": [{ "embedding": vector, "index": 0 }] })).into_response()
}

async fn fake_completion(Json(body): Json<Value>) -> Json<Value> {
    assert_eq!(body["response_format"]["type"], "json_schema");
    let content = json!({
        "riskLevel": "high",
        "summary": "Host is a known mass scanner",
        "keyFindings": ["Seen scanning the internet"],
        "recommendedActions": ["Block at the perimeter"],
    });
    Json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content.to_string() } }]
    }))
}

async fn fake_greynoise(Path(ip): Path<String>) -> Json<Value> {
    Json(json!({ "ip": ip, "noise": true, "classification": "malicious" }))
}

async fn start_fake_upstream() -> String {
    let app = Router::new()
        .route("/openai/embeddings", post(fake_embeddings))
        .route("/openai/chat/completions", post(fake_completion))
        .route("/greynoise/community/{ip}", get(fake_greynoise));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Starts the API with OpenAI and GreyNoise pointed at the fakes. With
/// `embeddings` false the embedding provider stays disabled.
async fn start_api(tmp: &TempDir, embeddings: bool) -> String {
    let upstream = start_fake_upstream().await;
    let port = find_free_port();
    let embedding = if embeddings {
        format!(
            "[embedding]\nprovider = \"openai\"\ndims = 3\nbase_url = \"{}/openai\"\n",
            upstream
        )
    } else {
        String::new()
    };
    let content = format!(
        r#"
[db]
path = "{db}"

[server]
bind = "127.0.0.1:{port}"

[analysis]
provider = "openai"
base_url = "{upstream}/openai"

[sources.greynoise]
base_url = "{upstream}/greynoise"

{embedding}
"#,
        db = tmp.path().join("osint.sqlite").display(),
    );
    let config: Config = toml::from_str(&content).unwrap();
    let credentials = Credentials {
        greynoise: Some("gn-key".into()),
        openai: Some("sk-test".into()),
        ..Default::default()
    };

    let app = Arc::new(App::open(config, credentials).await.unwrap());
    tokio::spawn(async move {
        server::run_server(app).await.unwrap();
    });
    wait_for_server(port).await;
    format!("http://127.0.0.1:{}", port)
}

async fn investigate(client: &reqwest::Client, base: &str, query: &str) -> Value {
    let resp = client
        .post(format!("{}/api/osint", base))
        .json(&json!({ "query": query, "saveAsCase": true, "userId": "analyst-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn test_health_and_sources() {
    let tmp = TempDir::new().unwrap();
    let base = start_api(&tmp, true).await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let sources: Value = client
        .get(format!("{}/api/sources", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let list = sources["sources"].as_array().unwrap();
    assert_eq!(list.len(), 6);
    let greynoise = list.iter().find(|s| s["name"] == "greynoise").unwrap();
    assert_eq!(greynoise["configured"], true);
    assert_eq!(greynoise["rateLimit"], 60);
    let shodan = list.iter().find(|s| s["name"] == "shodan").unwrap();
    assert_eq!(shodan["configured"], false);
}

#[tokio::test]
async fn test_investigation_lifecycle() {
    let tmp = TempDir::new().unwrap();
    let base = start_api(&tmp, true).await;
    let client = reqwest::Client::new();

    let first = investigate(&client, &base, "192.0.2.1").await;
    assert_eq!(first["queryType"], "ip");
    assert_eq!(first["results"]["greynoise"]["classification"], "malicious");
    assert_eq!(first["analysis"]["riskLevel"], "high");
    assert_eq!(first["case"]["riskLevel"], "high");
    assert_eq!(first["case"]["title"], "IP Address Analysis: 192.0.2.1");
    assert_eq!(first["case"]["userId"], "analyst-1");
    let first_id = first["case"]["id"].as_str().unwrap().to_string();

    let second = investigate(&client, &base, "192.0.2.2").await;
    let second_id = second["case"]["id"].as_str().unwrap().to_string();
    let email = investigate(&client, &base, "someone@example.com").await;
    assert_eq!(email["queryType"], "email");
    assert!(email["results"].get("greynoise").is_none());

    let listed: Value = client
        .get(format!("{}/api/cases?queryType=ip", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["cases"].as_array().unwrap().len(), 2);
    assert_eq!(listed["cases"][0]["id"], second_id.as_str());

    let similar: Value = client
        .post(format!("{}/api/similar-cases", base))
        .json(&json!({ "caseId": first_id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let similar = similar["similarCases"].as_array().unwrap();
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0]["caseId"], second_id.as_str());
    assert_eq!(similar[0]["metadata"]["query"], "192.0.2.2");

    let search: Value = client
        .get(format!("{}/api/similar-cases?query=mass%20scanner&limit=5", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(search["results"].as_array().unwrap().len(), 3);
    assert_eq!(search["results"][2]["metadata"]["queryType"], "email");

    let patched: Value = client
        .patch(format!("{}/api/cases/{}", base, first_id))
        .json(&json!({ "notes": "blocked at edge" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(patched["notes"], "blocked at edge");

    let fetched: Value = client
        .get(format!("{}/api/cases/{}", base, first_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["notes"], "blocked at edge");

    let deleted = client
        .delete(format!("{}/api/cases?id={}", base, second_id))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 200);
    let body: Value = deleted.json().await.unwrap();
    assert_eq!(body["success"], true);

    let again = client
        .delete(format!("{}/api/cases?id={}", base, second_id))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), 404);
    let body: Value = again.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_bad_requests() {
    let tmp = TempDir::new().unwrap();
    let base = start_api(&tmp, true).await;
    let client = reqwest::Client::new();

    for body in [
        json!({ "query": "   " }),
        json!({ "query": "192.0.2.1", "queryType": "phone" }),
    ] {
        let resp = client
            .post(format!("{}/api/osint", base))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let err: Value = resp.json().await.unwrap();
        assert_eq!(err["error"]["code"], "bad_request");
    }

    let resp = client
        .post(format!("{}/api/similar-cases", base))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .get(format!("{}/api/similar-cases", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(format!("{}/api/similar-cases", base))
        .json(&json!({ "caseId": "no-such-case" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .get(format!("{}/api/cases/no-such-case", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "not_found");

    let resp = client
        .delete(format!("{}/api/cases", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_saved_case_without_embeddings() {
    let tmp = TempDir::new().unwrap();
    let base = start_api(&tmp, false).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/cases", base))
        .json(&json!({
            "query": "evil.example",
            "queryType": "domain",
            "results": { "greynoise": {} },
            "aiAnalysis": {
                "riskLevel": "medium",
                "summary": "Recently registered",
                "keyFindings": [],
                "recommendedActions": [],
            },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["success"], true);
    assert_eq!(created["case"]["userId"], "demo-user");
    assert_eq!(created["case"]["title"], "Domain Investigation: evil.example");
    let id = created["case"]["id"].as_str().unwrap();

    let resp = client
        .post(format!("{}/api/similar-cases", base))
        .json(&json!({ "caseId": id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "embeddings_disabled");

    let resp = client
        .get(format!("{}/api/similar-cases?query=anything", base))
        .send()
        .await
        .unwrap();
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["error"]["code"], "embeddings_disabled");
}
