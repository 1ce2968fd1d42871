//! JSON envelopes returned by the API. Every payload is wrapped under its entity name.

use serde::Serialize;

use crate::domain::entities::{Author, Book, BookWithDetails, Genre};

#[derive(Debug, Serialize)]
pub struct AuthorEnvelope {
    pub author: Author,
}

#[derive(Debug, Serialize)]
pub struct AuthorsEnvelope {
    pub authors: Vec<Author>,
}

#[derive(Debug, Serialize)]
pub struct GenreEnvelope {
    pub genre: Genre,
}

#[derive(Debug, Serialize)]
pub struct GenresEnvelope {
    pub genres: Vec<Genre>,
}

#[derive(Debug, Serialize)]
pub struct BookDetailsEnvelope {
    pub book: BookWithDetails,
}

#[derive(Debug, Serialize)]
pub struct BookEnvelope {
    pub book: Book,
}

#[derive(Debug, Serialize)]
pub struct BooksEnvelope {
    pub books: Vec<Book>,
}
