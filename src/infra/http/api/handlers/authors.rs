//! Authors handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::application::error::ServiceError;
use crate::domain::entities::{AuthorPatch, NewAuthor};

use super::{json_body, parse_id, service_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

#[derive(Debug, Default, Deserialize)]
pub struct AuthorListQuery {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub async fn create_author(
    State(state): State<ApiState>,
    payload: Result<Json<NewAuthor>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let author = state
        .authors
        .create_author(json_body(payload)?)
        .await
        .map_err(service_to_api)?;

    Ok((StatusCode::CREATED, Json(AuthorEnvelope { author })))
}

/// Lists every author, or the single exact match when both name parts are given.
pub async fn list_authors(
    State(state): State<ApiState>,
    Query(query): Query<AuthorListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let authors = match (query.first_name, query.last_name) {
        (Some(first_name), Some(last_name)) => {
            match state
                .authors
                .get_author_by_name(&first_name, &last_name)
                .await
            {
                Ok(author) => vec![author],
                Err(ServiceError::NotFound { .. }) => Vec::new(),
                Err(err) => return Err(service_to_api(err)),
            }
        }
        (None, None) => state.authors.list_authors().await.map_err(service_to_api)?,
        _ => {
            return Err(ApiError::bad_request(
                "Incomplete name filter",
                Some("first_name and last_name must be given together".to_string()),
            ));
        }
    };

    Ok(Json(AuthorsEnvelope { authors }))
}

pub async fn get_author(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let author = state
        .authors
        .get_author_by_id(id)
        .await
        .map_err(service_to_api)?;

    Ok(Json(AuthorEnvelope { author }))
}

pub async fn update_author(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    payload: Result<Json<AuthorPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let author = state
        .authors
        .update_author(id, json_body(payload)?)
        .await
        .map_err(service_to_api)?;

    Ok(Json(AuthorEnvelope { author }))
}

pub async fn delete_author(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    state
        .authors
        .delete_author(id)
        .await
        .map_err(service_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}
