//! Genres handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::domain::entities::{GenrePatch, NewGenre};

use super::{json_body, parse_id, service_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn create_genre(
    State(state): State<ApiState>,
    payload: Result<Json<NewGenre>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let genre = state
        .genres
        .create_genre(json_body(payload)?)
        .await
        .map_err(service_to_api)?;

    Ok((StatusCode::CREATED, Json(GenreEnvelope { genre })))
}

pub async fn list_genres(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let genres = state.genres.list_genres().await.map_err(service_to_api)?;
    Ok(Json(GenresEnvelope { genres }))
}

pub async fn get_genre(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let genre = state
        .genres
        .get_genre_by_id(id)
        .await
        .map_err(service_to_api)?;

    Ok(Json(GenreEnvelope { genre }))
}

pub async fn update_genre(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    payload: Result<Json<GenrePatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let genre = state
        .genres
        .update_genre(id, json_body(payload)?)
        .await
        .map_err(service_to_api)?;

    Ok(Json(GenreEnvelope { genre }))
}

pub async fn delete_genre(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    state
        .genres
        .delete_genre(id)
        .await
        .map_err(service_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}
