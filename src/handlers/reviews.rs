use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::review::{self, Review, ReviewCreate, ReviewUpdate};
use crate::sentiment::{Sentiment, SentimentProvider};
use crate::state::AppState;
use crate::store::Order;

/// POST /reviews - create a review for the authenticated caller.
///
/// Sentiment is computed synchronously before the write, but a provider
/// failure is non-fatal: the review is stored with null sentiment fields.
pub async fn create_review(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<ReviewCreate>,
) -> Result<(StatusCode, Json<Review>), ApiError> {
    payload.validate()?;

    // One review per user per movie
    let existing = state
        .store
        .query(
            review::COLLECTION,
            &[
                ("movie_id", Value::String(payload.movie_id.clone())),
                ("user_id", Value::String(caller.uid.clone())),
            ],
            None,
        )
        .await?;
    if !existing.is_empty() {
        return Err(ApiError::conflict("You already reviewed this movie"));
    }

    let sentiment = classify_or_degrade(state.sentiment.as_ref(), &payload.body).await;
    let fields = payload.to_fields(&caller.uid, sentiment.as_ref(), Utc::now());

    let doc = state.store.create(review::COLLECTION, fields).await?;
    let created = Review::from_document(doc)?;
    tracing::info!(review_id = %created.id, movie_id = %created.movie_id, "review created");

    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    pub movie_id: Option<String>,
}

/// GET /reviews - list reviews, newest first, optionally filtered by movie.
/// No pagination cap; the response covers the whole matching set.
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<Vec<Review>>, ApiError> {
    let mut filters: Vec<(&str, Value)> = Vec::new();
    if let Some(movie_id) = &query.movie_id {
        filters.push(("movie_id", Value::String(movie_id.clone())));
    }

    let docs = state
        .store
        .query(
            review::COLLECTION,
            &filters,
            Some(("created_at", Order::Desc)),
        )
        .await?;

    let reviews: Result<Vec<Review>, _> = docs.into_iter().map(Review::from_document).collect();
    Ok(Json(reviews?))
}

/// GET /reviews/:review_id
pub async fn get_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
) -> Result<Json<Review>, ApiError> {
    let review = fetch_review(&state, &review_id).await?;
    Ok(Json(review))
}

/// PATCH /reviews/:review_id - owner-only partial update.
///
/// Merges the supplied fields, recomputes sentiment only when the body
/// changed, and bumps `updated_at`. `user_id` and `created_at` never change.
pub async fn update_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<ReviewUpdate>,
) -> Result<Json<Review>, ApiError> {
    payload.validate()?;

    let review = fetch_review(&state, &review_id).await?;
    ensure_owner(&review, &caller)?;

    let mut fields = Map::new();
    fields.insert(
        "updated_at".to_string(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
    );

    if let Some(rating) = payload.rating {
        fields.insert("rating".to_string(), Value::from(rating));
    }

    if let Some(body) = &payload.body {
        fields.insert("body".to_string(), Value::String(body.clone()));
        let sentiment = classify_or_degrade(state.sentiment.as_ref(), body).await;
        fields.insert(
            "sentiment_label".to_string(),
            sentiment
                .as_ref()
                .map_or(Value::Null, |s| Value::String(s.label.clone())),
        );
        fields.insert(
            "sentiment_score".to_string(),
            sentiment.as_ref().map_or(Value::Null, |s| {
                serde_json::Number::from_f64(s.score).map_or(Value::Null, Value::Number)
            }),
        );
    }

    let doc = state
        .store
        .update(review::COLLECTION, &review_id, fields)
        .await?;
    Ok(Json(Review::from_document(doc)?))
}

/// DELETE /reviews/:review_id - owner-only; deletion is terminal and a
/// repeat delete of the same id is a 404.
pub async fn delete_review(
    State(state): State<AppState>,
    Path(review_id): Path<String>,
    Extension(caller): Extension<AuthUser>,
) -> Result<StatusCode, ApiError> {
    let review = fetch_review(&state, &review_id).await?;
    ensure_owner(&review, &caller)?;

    state.store.delete(review::COLLECTION, &review_id).await?;
    tracing::info!(review_id = %review_id, "review deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_review(state: &AppState, review_id: &str) -> Result<Review, ApiError> {
    let doc = state
        .store
        .get(review::COLLECTION, review_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Review not found"))?;
    Ok(Review::from_document(doc)?)
}

fn ensure_owner(review: &Review, caller: &AuthUser) -> Result<(), ApiError> {
    if review.user_id != caller.uid {
        return Err(ApiError::forbidden("Not your review"));
    }
    Ok(())
}

/// Sentiment failures degrade to null fields rather than failing the write.
async fn classify_or_degrade(provider: &dyn SentimentProvider, body: &str) -> Option<Sentiment> {
    match provider.classify(body).await {
        Ok(sentiment) => Some(sentiment),
        Err(err) => {
            tracing::warn!("sentiment classification failed, storing null sentiment: {}", err);
            None
        }
    }
}
