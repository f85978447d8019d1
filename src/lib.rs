pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod sentiment;
pub mod state;
pub mod store;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::require_auth;
use crate::state::AppState;

/// Assemble the full application router over the given collaborators.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::root))
        .route("/healthz", get(handlers::health::healthz))
        .merge(movie_routes())
        .merge(auth_routes(state.clone()))
        .merge(review_routes(state.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn movie_routes() -> Router<AppState> {
    use handlers::movies;

    Router::new()
        .route("/movies", get(movies::list_movies))
        .route("/movies/:movie_id", get(movies::get_movie))
        .route("/movies/:movie_id/sentiment", get(movies::movie_sentiment))
}

fn auth_routes(state: AppState) -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth/me", get(auth::me))
        .route_layer(from_fn_with_state(state, require_auth))
}

fn review_routes(state: AppState) -> Router<AppState> {
    use axum::routing::{patch, post};
    use handlers::reviews;

    // Reads are public; writes require an authenticated owner
    let public = Router::new()
        .route("/reviews", get(reviews::list_reviews))
        .route("/reviews/:review_id", get(reviews::get_review));

    let protected = Router::new()
        .route("/reviews", post(reviews::create_review))
        .route(
            "/reviews/:review_id",
            patch(reviews::update_review).delete(reviews::delete_review),
        )
        .route_layer(from_fn_with_state(state, require_auth));

    public.merge(protected)
}
