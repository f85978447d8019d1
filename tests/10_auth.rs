mod common;

use anyhow::Result;
use axum::http::StatusCode;

use common::{test_app, ALICE_TOKEN, ALICE_UID};

#[tokio::test]
async fn healthz_is_alive_and_touches_no_upstream() -> Result<()> {
    let app = test_app();

    let (status, body) = app.get("/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    // Liveness must not depend on any collaborator
    assert_eq!(app.catalog.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn root_serves_a_welcome_body() -> Result<()> {
    let app = test_app();
    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("Movie Review"));
    Ok(())
}

#[tokio::test]
async fn me_requires_a_bearer_token() -> Result<()> {
    let app = test_app();

    let (status, body) = app.get("/auth/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.get_auth("/auth/me", "not-a-real-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn me_creates_the_user_lazily_and_is_stable() -> Result<()> {
    let app = test_app();

    let (status, first) = app.get_auth("/auth/me", ALICE_TOKEN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["uid"], ALICE_UID);
    assert_eq!(first["email"], "alice@example.com");
    assert!(first["created_at"].is_string());

    // Second call returns the stored record, not a fresh one
    let (status, second) = app.get_auth("/auth/me", ALICE_TOKEN).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["created_at"], first["created_at"]);
    Ok(())
}
