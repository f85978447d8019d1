use axum::Json;
use serde_json::{json, Value};

/// GET / - welcome body
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to the Movie Review Backend.",
        "name": "movie-review-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /healthz - liveness only. Deliberately checks no dependencies and
/// makes no upstream calls.
pub async fn healthz() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
