//! API handlers organized by resource type.
//!
//! Shared extraction helpers and the service error mapping live here.

mod authors;
mod books;
mod genres;
mod health;

pub use authors::*;
pub use books::*;
pub use genres::*;
pub use health::*;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

use crate::application::error::{ErrorKind, ServiceError};
use crate::application::repos::RepoError;

use super::error::{ApiError, codes};

/// Parse a path identifier; anything other than a positive integer is rejected.
pub(crate) fn parse_id(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(ApiError::invalid_id(raw)),
    }
}

pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| {
            ApiError::bad_request("Malformed request body", Some(rejection.body_text()))
        })
}

pub(crate) fn service_to_api(err: ServiceError) -> ApiError {
    match err.kind() {
        ErrorKind::NotFound => ApiError::not_found("Resource not found", Some(err.to_string())),
        ErrorKind::EntityExists => {
            let hint = match &err {
                ServiceError::GenreExists(genre) => {
                    format!("genre `{}` already exists with id {}", genre.name, genre.id)
                }
                other => other.to_string(),
            };
            ApiError::new(
                StatusCode::BAD_REQUEST,
                codes::ENTITY_EXISTS,
                "Entity already exists",
                Some(hint),
            )
        }
        ErrorKind::Integrity => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Request conflicts with stored data",
            Some(err.to_string()),
        ),
        ErrorKind::Invalid => match err {
            ServiceError::Validation(errors) => ApiError::validation(errors),
            other => ApiError::bad_request("Invalid request", Some(other.to_string())),
        },
        ErrorKind::Internal => match err {
            ServiceError::Repo(RepoError::Timeout) => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::UNAVAILABLE,
                "Database did not respond in time",
                Some(RepoError::Timeout.to_string()),
            ),
            ServiceError::Repo(RepoError::InvalidInput { message }) => {
                ApiError::bad_request("Invalid request", Some(message))
            }
            other => ApiError::internal(Some(other.to_string())),
        },
    }
}
