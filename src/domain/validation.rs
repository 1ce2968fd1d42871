//! Request-level validation rules for the catalogue DTOs.
//!
//! Every check records at most one message per field; the first failing rule wins.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use time::Date;

use super::entities::{AuthorPatch, BookPatch, NewAuthor, NewBook};

pub const CANT_BE_EMPTY: &str = "can't be empty";
pub const ONLY_LATIN_LETTERS: &str = "must contain only latin letters";
pub const ONLY_LETTERS_SPACES_HYPHENS: &str = "must contain only letters, spaces and hyphens";
pub const ONLY_IN_THE_PAST: &str = "publish date can't be in future";
pub const CANT_BE_LESS_THAN_ONE: &str = "can't be less than 1";
pub const CANT_BE_BIGGER_THAN_5K: &str = "must be at most 5000";
pub const POSITIVE_IDS: &str = "must contain only positive ids";

pub const MAX_PAGES: i32 = 5000;

/// Field name to message map describing why a payload was rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<&'static str, String> {
        &self.0
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn check(&mut self, ok: bool, field: &'static str, message: &str) {
        if !ok {
            self.add(field, message);
        }
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed")?;
        for (index, (field, message)) in self.0.iter().enumerate() {
            let sep = if index == 0 { ": " } else { ", " };
            write!(f, "{sep}{field} {message}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

fn is_latin_word(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic())
}

fn is_genre_name(value: &str) -> bool {
    value.chars().any(char::is_alphabetic)
        && value
            .chars()
            .all(|c| c.is_alphabetic() || c == ' ' || c == '-')
}

fn check_name(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    errors.check(!value.is_empty(), field, CANT_BE_EMPTY);
    errors.check(is_latin_word(value), field, ONLY_LATIN_LETTERS);
}

fn check_middle_name(errors: &mut ValidationErrors, value: Option<&str>) {
    if let Some(value) = value.filter(|value| !value.is_empty()) {
        errors.check(is_latin_word(value), "middle_name", ONLY_LATIN_LETTERS);
    }
}

pub fn validate_new_author(author: &NewAuthor) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_name(&mut errors, "first_name", &author.first_name);
    check_middle_name(&mut errors, author.middle_name.as_deref());
    check_name(&mut errors, "last_name", &author.last_name);
    errors.into_result()
}

pub fn validate_author_patch(patch: &AuthorPatch) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if let Some(first_name) = patch.first_name.as_deref() {
        check_name(&mut errors, "first_name", first_name);
    }
    check_middle_name(&mut errors, patch.middle_name.as_deref());
    if let Some(last_name) = patch.last_name.as_deref() {
        check_name(&mut errors, "last_name", last_name);
    }
    errors.into_result()
}

pub fn validate_genre_name(name: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = name.trim();
    errors.check(!name.is_empty(), "name", CANT_BE_EMPTY);
    errors.check(is_genre_name(name), "name", ONLY_LETTERS_SPACES_HYPHENS);
    errors.into_result()
}

fn check_pages(errors: &mut ValidationErrors, pages: i32) {
    errors.check(pages >= 1, "pages", CANT_BE_LESS_THAN_ONE);
    errors.check(pages <= MAX_PAGES, "pages", CANT_BE_BIGGER_THAN_5K);
}

fn check_ids(errors: &mut ValidationErrors, field: &'static str, ids: &[i64]) {
    errors.check(!ids.is_empty(), field, CANT_BE_EMPTY);
    errors.check(ids.iter().all(|id| *id > 0), field, POSITIVE_IDS);
}

/// `today` is passed in so callers control the clock.
pub fn validate_new_book(book: &NewBook, today: Date) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    errors.check(!book.title.trim().is_empty(), "title", CANT_BE_EMPTY);
    errors.check(!book.isbn.trim().is_empty(), "isbn", CANT_BE_EMPTY);
    errors.check(book.publish_date <= today, "publish_date", ONLY_IN_THE_PAST);
    check_pages(&mut errors, book.pages);
    check_ids(&mut errors, "authors", &book.authors);
    check_ids(&mut errors, "genres", &book.genres);
    errors.into_result()
}

pub fn validate_book_patch(patch: &BookPatch, today: Date) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if let Some(title) = patch.title.as_deref() {
        errors.check(!title.trim().is_empty(), "title", CANT_BE_EMPTY);
    }
    if let Some(isbn) = patch.isbn.as_deref() {
        errors.check(!isbn.trim().is_empty(), "isbn", CANT_BE_EMPTY);
    }
    if let Some(publish_date) = patch.publish_date {
        errors.check(publish_date <= today, "publish_date", ONLY_IN_THE_PAST);
    }
    if let Some(pages) = patch.pages {
        check_pages(&mut errors, pages);
    }
    if let Some(authors) = patch.authors.as_deref() {
        check_ids(&mut errors, "authors", authors);
    }
    if let Some(genres) = patch.genres.as_deref() {
        check_ids(&mut errors, "genres", genres);
    }
    errors.into_result()
}
