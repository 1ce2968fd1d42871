//! Book catalogue service: authors, genres and books stored in Postgres behind a
//! read-through cache, exposed as a JSON API.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
