//! Books handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::domain::entities::{BookPatch, NewBook};

use super::{json_body, parse_id, service_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::*;
use crate::infra::http::api::state::ApiState;

pub async fn create_book(
    State(state): State<ApiState>,
    payload: Result<Json<NewBook>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let book = state
        .books
        .create_book(json_body(payload)?)
        .await
        .map_err(service_to_api)?;

    Ok((StatusCode::CREATED, Json(BookDetailsEnvelope { book })))
}

pub async fn list_books(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let books = state.books.list_books().await.map_err(service_to_api)?;
    Ok(Json(BooksEnvelope { books }))
}

pub async fn get_book(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let book = state
        .books
        .get_book_by_id(id)
        .await
        .map_err(service_to_api)?;

    Ok(Json(BookDetailsEnvelope { book }))
}

pub async fn update_book(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    payload: Result<Json<BookPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let book = state
        .books
        .update_book(id, json_body(payload)?)
        .await
        .map_err(service_to_api)?;

    Ok(Json(BookEnvelope { book }))
}

pub async fn delete_book(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    state.books.delete_book(id).await.map_err(service_to_api)?;

    Ok(StatusCode::NO_CONTENT)
}
