use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use movie_review_api::auth::{FirebaseVerifier, StaticVerifier, TokenVerifier};
use movie_review_api::catalog::GhibliCatalog;
use movie_review_api::config::{AppConfig, DocumentStoreKind, SentimentProviderKind};
use movie_review_api::sentiment::{MockSentiment, OpenAiSentiment, SentimentProvider};
use movie_review_api::state::AppState;
use movie_review_api::store::{DocumentStore, FirestoreStore, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up credentials and provider
    // selection without exporting them by hand.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env()?;
    tracing::info!("starting movie-review-api in {:?} mode", config.environment);

    let state = build_state(config)?;
    let app = movie_review_api::app(state.clone());

    let bind_addr = format!("0.0.0.0:{}", state.config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

/// Wire up the collaborators selected by configuration.
fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
    let config = Arc::new(config);

    // Sentiment inference gets a longer timeout than catalog/store calls.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("failed to build http client")?;
    let sentiment_http = reqwest::Client::builder()
        .timeout(Duration::from_secs(20))
        .build()
        .context("failed to build sentiment http client")?;

    let store: Arc<dyn DocumentStore> = match config.document_store {
        DocumentStoreKind::Firestore => {
            let key = config
                .firebase
                .clone()
                .context("Firestore store requires Firebase credentials")?;
            Arc::new(FirestoreStore::new(http.clone(), key))
        }
        DocumentStoreKind::Memory => {
            tracing::warn!("using the in-memory document store; data will not survive restarts");
            Arc::new(MemoryStore::new())
        }
    };

    let verifier: Arc<dyn TokenVerifier> = match &config.firebase {
        Some(key) => Arc::new(FirebaseVerifier::new(http.clone(), key.project_id.clone())),
        None => {
            tracing::warn!("no Firebase credentials; all authenticated routes will reject");
            Arc::new(StaticVerifier::new())
        }
    };

    let catalog = Arc::new(GhibliCatalog::new(http, config.ghibli_films_url.clone()));

    let sentiment: Arc<dyn SentimentProvider> = match config.sentiment_provider {
        SentimentProviderKind::OpenAi => Arc::new(OpenAiSentiment::new(
            sentiment_http,
            config.openai_api_key.clone(),
        )),
        SentimentProviderKind::Mock => Arc::new(MockSentiment::new()),
    };

    Ok(AppState {
        config,
        store,
        verifier,
        catalog,
        sentiment,
    })
}
