//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::Date;

use crate::domain::entities::{Author, Book, Genre};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateAuthorParams {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct CreateBookParams {
    pub title: String,
    pub publish_date: Date,
    pub isbn: String,
    pub pages: i32,
    pub authors: Vec<i64>,
    pub genres: Vec<i64>,
}

#[async_trait]
pub trait AuthorsRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Author>, RepoError>;

    /// Rows matching `ids` in no particular order. Unknown IDs are skipped.
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Author>, RepoError>;

    async fn find_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Author>, RepoError>;

    async fn list_all(&self) -> Result<Vec<Author>, RepoError>;
}

#[async_trait]
pub trait AuthorsWriteRepo: Send + Sync {
    /// Fails with [`RepoError::Duplicate`] when an author with the same first and last name exists.
    async fn create_author(&self, params: CreateAuthorParams) -> Result<Author, RepoError>;

    async fn update_author(&self, author: &Author) -> Result<(), RepoError>;

    /// Detaches the author from every book, then removes the row.
    async fn delete_author(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait GenresRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Genre>, RepoError>;

    /// Rows matching `ids` in no particular order. Unknown IDs are skipped.
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Genre>, RepoError>;

    async fn list_all(&self) -> Result<Vec<Genre>, RepoError>;
}

#[async_trait]
pub trait GenresWriteRepo: Send + Sync {
    async fn create_genre(&self, name: &str) -> Result<Genre, RepoError>;

    async fn update_genre(&self, genre: &Genre) -> Result<(), RepoError>;

    /// Detaches the genre from every book, then removes the row.
    async fn delete_genre(&self, id: i64) -> Result<(), RepoError>;
}

#[async_trait]
pub trait BooksRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, RepoError>;

    async fn list_all(&self) -> Result<Vec<Book>, RepoError>;
}

#[async_trait]
pub trait BooksWriteRepo: Send + Sync {
    /// Inserts the book and its association rows atomically. A referenced author or genre that
    /// does not exist yields [`RepoError::Integrity`] and nothing is persisted.
    async fn create_book(&self, params: CreateBookParams) -> Result<Book, RepoError>;

    /// Overwrites the scalar fields and replaces both association sets.
    async fn update_book(&self, book: &Book) -> Result<(), RepoError>;

    async fn delete_book(&self, id: i64) -> Result<(), RepoError>;
}
