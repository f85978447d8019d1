use axum::{extract::State, Extension, Json};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::user::{self, User};
use crate::state::AppState;

/// GET /auth/me - return the authenticated caller's user record, creating it
/// on first sight. The uid is provider-issued and doubles as the document id.
pub async fn me(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<User>, ApiError> {
    if let Some(doc) = state.store.get(user::COLLECTION, &caller.uid).await? {
        return Ok(Json(User::from_document(doc)?));
    }

    let record = User::new(&caller.uid, &caller.email);
    let stored = state
        .store
        .set(user::COLLECTION, &record.uid, record.to_fields())
        .await?;
    tracing::info!(uid = %record.uid, "created user record on first authenticated request");

    // Answer with the persisted fields so the first response is
    // byte-identical to every later read (timestamps are stored at
    // microsecond precision).
    Ok(Json(User::from_document(stored)?))
}
