//! HTTP read API tests against a live server on a free port.

use async_trait::async_trait;
use chrono::Utc;
use info_sieve::config::Config;
use info_sieve::error::ScoringError;
use info_sieve::models::{Item, ScoreResult};
use info_sieve::server::{run_server, AppState};
use info_sieve::store::{ItemStore, SqliteStore};
use info_sieve::traits::Scorer;
use info_sieve::{db, migrate};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::watch;

/// Answers every question unless `fail` is set; counts ask calls.
struct EchoScorer {
    fail: bool,
    asks: AtomicUsize,
}

#[async_trait]
impl Scorer for EchoScorer {
    async fn score(&self, _item: &Item) -> Result<ScoreResult, ScoringError> {
        Err(ScoringError::EmptyResponse)
    }

    async fn ask(&self, item: &Item, question: &str) -> Result<String, ScoringError> {
        self.asks.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ScoringError::Status {
                status: 503,
                body: "overloaded".into(),
            });
        }
        Ok(format!("About {}: {}", item.title, question))
    }
}

struct TestServer {
    base: String,
    store: Arc<SqliteStore>,
    scorer: Arc<EchoScorer>,
    shutdown: watch::Sender<bool>,
    _tmp: TempDir,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

fn scored_item(source: &str, title: &str, url: &str, scarcity: i64) -> Item {
    let mut item = Item::new(source, title, url, "a description", "someone", Utc::now());
    item.apply_score(
        ScoreResult {
            scarcity,
            actionable: 25,
            leverage: 20,
            importance: 5,
            benefit: 5,
            noble: 5,
            reason: "worth reading".into(),
            ..Default::default()
        }
        .finalize(),
    );
    item
}

/// Seeds three items: totals 85 (HackerNews), 70 (Lobsters), 60 (Lobsters).
async fn start_server(fail_ask: bool) -> TestServer {
    let tmp = TempDir::new().unwrap();
    let mut cfg = Config::default();
    cfg.db.path = tmp.path().join("sieve.sqlite");
    let pool = db::connect(&cfg).await.unwrap();
    migrate::migrate_pool(&pool).await.unwrap();
    let store = Arc::new(SqliteStore::new(pool));

    for item in [
        scored_item("HackerNews", "Top story", "https://hn.test/1", 25),
        scored_item("Lobsters", "Good post", "https://lob.test/1", 10),
        scored_item("Lobsters", "Weak post", "https://lob.test/2", 0),
    ] {
        store.insert_item(&item).await.unwrap();
    }

    let scorer = Arc::new(EchoScorer {
        fail: fail_ask,
        asks: AtomicUsize::new(0),
    });
    let state = AppState {
        store: store.clone(),
        scorer: scorer.clone(),
        threshold: 70,
    };

    let port = find_free_port();
    let (tx, rx) = watch::channel(false);
    let bind = format!("127.0.0.1:{}", port);
    tokio::spawn(async move { run_server(&bind, state, rx).await });
    wait_for_server(port).await;

    TestServer {
        base: format!("http://127.0.0.1:{}", port),
        store,
        scorer,
        shutdown: tx,
        _tmp: tmp,
    }
}

#[tokio::test]
async fn test_health() {
    let server = start_server(false).await;
    let body: Value = reqwest::get(server.url("/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "info-sieve");
    let _ = server.shutdown.send(true);
}

#[tokio::test]
async fn test_items_default_to_threshold_and_filter_by_source() {
    let server = start_server(false).await;

    let body: Value = reqwest::get(server.url("/api/items"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 2);
    for item in body["items"].as_array().unwrap() {
        assert!(item["total_score"].as_i64().unwrap() >= 70);
    }

    let body: Value = reqwest::get(server.url("/api/items?min_score=0&source=Lobsters"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 2);
    let sources: Vec<_> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["source"].as_str().unwrap().to_string())
        .collect();
    assert!(sources.iter().all(|s| s == "Lobsters"));

    let body: Value = reqwest::get(server.url("/api/items?min_score=0&limit=1"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_items_rejects_non_numeric_params() {
    let server = start_server(false).await;
    let resp = reqwest::get(server.url("/api/items?limit=lots")).await.unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_today_is_sorted_by_score() {
    let server = start_server(false).await;
    let body: Value = reqwest::get(server.url("/api/items/today"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let totals: Vec<i64> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["total_score"].as_i64().unwrap())
        .collect();
    assert_eq!(totals, vec![85, 70]);
}

#[tokio::test]
async fn test_get_item_and_not_found() {
    let server = start_server(false).await;

    let body: Value = reqwest::get(server.url("/api/items/1"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["url"], "https://hn.test/1");
    assert_eq!(body["resonance_score"], 15);

    let resp = reqwest::get(server.url("/api/items/999")).await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_stats() {
    let server = start_server(false).await;
    let body: Value = reqwest::get(server.url("/api/stats"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 3);
    assert_eq!(body["qualified"], 2);
    let avg = body["avg_score"].as_f64().unwrap();
    assert!((avg - 215.0 / 3.0).abs() < 0.01);
    assert_eq!(body["sources"][0]["source"], "Lobsters");
    assert_eq!(body["sources"][0]["count"], 2);
}

#[tokio::test]
async fn test_ask_records_answer() {
    let server = start_server(false).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/api/items/2/ask"))
        .json(&json!({ "question": "  Is it any good?  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["answer"], "About Good post: Is it any good?");

    let questions = server.store.questions_for(2).await.unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].question, "Is it any good?");
    assert_eq!(body["question_id"], questions[0].id);
}

#[tokio::test]
async fn test_ask_unknown_item_writes_nothing() {
    let server = start_server(false).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/api/items/999/ask"))
        .json(&json!({ "question": "hello?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    assert_eq!(server.scorer.asks.load(Ordering::SeqCst), 0);
    assert!(server.store.questions_for(999).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ask_requires_question() {
    let server = start_server(false).await;
    let client = reqwest::Client::new();

    for body in [json!({ "question": "   " }), json!({})] {
        let resp = client
            .post(server.url("/api/items/1/ask"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
    }

    let resp = client
        .post(server.url("/api/items/1/ask"))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    assert_eq!(server.scorer.asks.load(Ordering::SeqCst), 0);
    assert!(server.store.questions_for(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ask_upstream_failure_is_502() {
    let server = start_server(true).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(server.url("/api/items/1/ask"))
        .json(&json!({ "question": "why?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "upstream_error");
    assert!(server.store.questions_for(1).await.unwrap().is_empty());
}
