#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use movie_review_api::auth::StaticVerifier;
use movie_review_api::catalog::{CatalogError, Film, MovieCatalog};
use movie_review_api::config::{AppConfig, DocumentStoreKind, Environment, SentimentProviderKind};
use movie_review_api::sentiment::{
    MockSentiment, Sentiment, SentimentError, SentimentProvider,
};
use movie_review_api::state::AppState;
use movie_review_api::store::MemoryStore;

pub const ALICE_TOKEN: &str = "token-alice";
pub const ALICE_UID: &str = "uid-alice";
pub const BOB_TOKEN: &str = "token-bob";
pub const BOB_UID: &str = "uid-bob";

/// Catalog serving a fixed film list and counting upstream calls, so tests
/// can assert which endpoints touch the catalog at all.
pub struct FixtureCatalog {
    calls: AtomicUsize,
}

impl FixtureCatalog {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MovieCatalog for FixtureCatalog {
    async fn films(&self) -> Result<Vec<Film>, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(fixture_films())
    }
}

fn fixture_films() -> Vec<Film> {
    let film = |id: &str, title: &str, year: &str, score: &str| Film {
        id: id.to_string(),
        title: title.to_string(),
        release_date: Some(year.to_string()),
        rt_score: Some(score.to_string()),
        description: Some(format!("A film called {}", title)),
        director: Some("Hayao Miyazaki".to_string()),
        running_time: Some("120".to_string()),
        ..Film::default()
    };
    vec![
        film("1", "Castle in the Sky", "1986", "95"),
        film("2", "My Neighbor Totoro", "1988", "93"),
        film("3", "Howl's Moving Castle", "2004", "87"),
    ]
}

/// Sentiment provider that always fails, for degradation tests.
pub struct FailingSentiment;

#[async_trait]
impl SentimentProvider for FailingSentiment {
    async fn classify(&self, _text: &str) -> Result<Sentiment, SentimentError> {
        Err(SentimentError::Transport("forced failure".to_string()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub catalog: Arc<FixtureCatalog>,
}

pub fn test_app() -> TestApp {
    test_app_with_sentiment(Arc::new(MockSentiment::new()))
}

pub fn test_app_with_sentiment(sentiment: Arc<dyn SentimentProvider>) -> TestApp {
    let config = Arc::new(AppConfig {
        environment: Environment::Development,
        port: 0,
        ghibli_films_url: String::new(),
        sentiment_provider: SentimentProviderKind::Mock,
        document_store: DocumentStoreKind::Memory,
        openai_api_key: String::new(),
        firebase: None,
    });

    let verifier = StaticVerifier::new()
        .with_user(ALICE_TOKEN, ALICE_UID, "alice@example.com")
        .with_user(BOB_TOKEN, BOB_UID, "bob@example.com");

    let catalog = Arc::new(FixtureCatalog::new());

    let state = AppState {
        config,
        store: Arc::new(MemoryStore::new()),
        verifier: Arc::new(verifier),
        catalog: catalog.clone(),
        sentiment,
    };

    TestApp {
        router: movie_review_api::app(state),
        catalog,
    }
}

impl TestApp {
    pub async fn get(&self, path: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("request");
        self.send(req).await
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .expect("request");
        self.send(req).await
    }

    pub async fn send_json(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: &Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = builder
            .body(Body::from(serde_json::to_vec(body).expect("body")))
            .expect("request");
        self.send(req).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("DELETE").uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = builder.body(Body::empty()).expect("request");
        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("router call failed");
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("body read failed");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response was not JSON")
        };
        (status, json)
    }
}

/// Create a review as `token` and return its generated id.
pub async fn create_review(app: &TestApp, token: &str, movie_id: &str, rating: i64, body: &str) -> String {
    let (status, json) = app
        .send_json(
            "POST",
            "/reviews",
            Some(token),
            &serde_json::json!({ "movie_id": movie_id, "rating": rating, "body": body }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body: {}", json);
    json["id"].as_str().expect("created review id").to_string()
}
