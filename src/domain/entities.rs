//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// A book row together with the IDs it is associated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub publish_date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub isbn: String,
    pub pages: i32,
    pub authors: Vec<i64>,
    pub genres: Vec<i64>,
}

/// Read model returned by book lookups: the book with its authors and genres expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookWithDetails {
    pub id: i64,
    pub title: String,
    pub publish_date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub isbn: String,
    pub pages: i32,
    pub authors: Vec<Author>,
    pub genres: Vec<Genre>,
}

impl BookWithDetails {
    pub fn assemble(book: Book, authors: Vec<Author>, genres: Vec<Genre>) -> Self {
        Self {
            id: book.id,
            title: book.title,
            publish_date: book.publish_date,
            created_at: book.created_at,
            isbn: book.isbn,
            pages: book.pages,
            authors,
            genres,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewAuthor {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthorPatch {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl AuthorPatch {
    /// Overwrite the fields of `author` that this patch carries.
    ///
    /// An empty middle name clears it.
    pub fn apply(self, author: &mut Author) {
        if let Some(first_name) = self.first_name {
            author.first_name = first_name;
        }
        if let Some(middle_name) = self.middle_name {
            author.middle_name = (!middle_name.is_empty()).then_some(middle_name);
        }
        if let Some(last_name) = self.last_name {
            author.last_name = last_name;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewGenre {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenrePatch {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub publish_date: Date,
    pub isbn: String,
    pub pages: i32,
    pub authors: Vec<i64>,
    pub genres: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BookPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub publish_date: Option<Date>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub pages: Option<i32>,
    #[serde(default)]
    pub authors: Option<Vec<i64>>,
    #[serde(default)]
    pub genres: Option<Vec<i64>>,
}

impl BookPatch {
    /// Overwrite the fields of `book` that this patch carries. Association lists are replaced
    /// wholesale, never merged.
    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(publish_date) = self.publish_date {
            book.publish_date = publish_date;
        }
        if let Some(isbn) = self.isbn {
            book.isbn = isbn;
        }
        if let Some(pages) = self.pages {
            book.pages = pages;
        }
        if let Some(authors) = self.authors {
            book.authors = authors;
        }
        if let Some(genres) = self.genres {
            book.genres = genres;
        }
    }
}

/// Remove repeated IDs, keeping the first occurrence of each.
pub fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::BTreeSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
