pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::{ApiState, HealthProbe};

use std::time::Duration;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::infra::http::middleware::{enforce_timeout, log_responses, set_request_context};

pub fn build_api_router(state: ApiState, request_timeout: Duration) -> Router {
    Router::new()
        .route(
            "/api/v1/authors",
            post(handlers::create_author).get(handlers::list_authors),
        )
        .route(
            "/api/v1/authors/{id}",
            get(handlers::get_author)
                .patch(handlers::update_author)
                .delete(handlers::delete_author),
        )
        .route(
            "/api/v1/genres",
            post(handlers::create_genre).get(handlers::list_genres),
        )
        .route(
            "/api/v1/genres/{id}",
            get(handlers::get_genre)
                .put(handlers::update_genre)
                .delete(handlers::delete_genre),
        )
        .route(
            "/api/v1/books",
            post(handlers::create_book).get(handlers::list_books),
        )
        .route(
            "/api/v1/books/{id}",
            get(handlers::get_book)
                .patch(handlers::update_book)
                .delete(handlers::delete_book),
        )
        .route("/api/v1/health", get(handlers::health))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            request_timeout,
            enforce_timeout,
        ))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
