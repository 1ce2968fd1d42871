use axum::extract::State;
use axum::response::Response;

use crate::infra::http::api::state::ApiState;
use crate::infra::http::db_health_response;

pub async fn health(State(state): State<ApiState>) -> Response {
    db_health_response(state.health.check().await)
}
