use std::collections::HashMap;
use std::sync::Arc;

use time::{Date, OffsetDateTime};
use tracing::{info, warn};

use crate::application::error::ServiceError;
use crate::application::repos::{
    AuthorsRepo, BooksRepo, BooksWriteRepo, CreateBookParams, GenresRepo,
};
use crate::cache::{Cache, CacheKey, Lookup};
use crate::domain::entities::{Book, BookPatch, BookWithDetails, NewBook, dedup_ids};
use crate::domain::validation::{validate_book_patch, validate_new_book};

const ENTITY: &str = "book";

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Reorder `items` to follow `ids`, reporting IDs that had no matching item.
fn order_by_ids<T>(ids: &[i64], items: Vec<T>, id_of: impl Fn(&T) -> i64) -> (Vec<T>, Vec<i64>) {
    let mut by_id: HashMap<i64, T> = items.into_iter().map(|item| (id_of(&item), item)).collect();
    let mut ordered = Vec::with_capacity(ids.len());
    let mut missing = Vec::new();
    for id in ids {
        match by_id.remove(id) {
            Some(item) => ordered.push(item),
            None => missing.push(*id),
        }
    }
    (ordered, missing)
}

#[derive(Clone)]
pub struct BookService {
    reader: Arc<dyn BooksRepo>,
    writer: Arc<dyn BooksWriteRepo>,
    authors: Arc<dyn AuthorsRepo>,
    genres: Arc<dyn GenresRepo>,
    cache: Cache,
}

impl BookService {
    pub fn new(
        reader: Arc<dyn BooksRepo>,
        writer: Arc<dyn BooksWriteRepo>,
        authors: Arc<dyn AuthorsRepo>,
        genres: Arc<dyn GenresRepo>,
        cache: Cache,
    ) -> Self {
        Self {
            reader,
            writer,
            authors,
            genres,
            cache,
        }
    }

    /// Persist a book with its associations and return it hydrated.
    pub async fn create_book(&self, book: NewBook) -> Result<BookWithDetails, ServiceError> {
        validate_new_book(&book, today())?;

        let params = CreateBookParams {
            title: book.title,
            publish_date: book.publish_date,
            isbn: book.isbn,
            pages: book.pages,
            authors: dedup_ids(&book.authors),
            genres: dedup_ids(&book.genres),
        };
        let created = self
            .writer
            .create_book(params)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        self.invalidate(created.id);
        info!(
            book_id = created.id,
            authors = created.authors.len(),
            genres = created.genres.len(),
            "Book created"
        );
        self.hydrate(created).await
    }

    pub async fn get_book_by_id(&self, id: i64) -> Result<BookWithDetails, ServiceError> {
        let key = CacheKey::Book(id);
        let ticket = match self.cache.get_json::<BookWithDetails>(key).await {
            Lookup::Hit(book) => return Ok(book),
            Lookup::Miss(ticket) => ticket,
        };

        let book = self
            .reader
            .find_by_id(id)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?
            .ok_or(ServiceError::not_found(ENTITY))?;
        let details = self.hydrate(book).await?;

        self.cache.populate(ticket, &details);
        Ok(details)
    }

    pub async fn list_books(&self) -> Result<Vec<Book>, ServiceError> {
        let ticket = match self.cache.get_json::<Vec<Book>>(CacheKey::Books).await {
            Lookup::Hit(books) => return Ok(books),
            Lookup::Miss(ticket) => ticket,
        };

        let books = self
            .reader
            .list_all()
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        self.cache.populate(ticket, &books);
        Ok(books)
    }

    /// Merge `patch` into the stored book and persist it. Provided author or genre lists replace
    /// the current associations entirely.
    pub async fn update_book(&self, id: i64, patch: BookPatch) -> Result<Book, ServiceError> {
        validate_book_patch(&patch, today())?;

        let mut book = self
            .reader
            .find_by_id(id)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?
            .ok_or(ServiceError::not_found(ENTITY))?;
        patch.apply(&mut book);
        book.authors = dedup_ids(&book.authors);
        book.genres = dedup_ids(&book.genres);

        self.writer
            .update_book(&book)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        self.invalidate(id);
        info!(book_id = id, "Book updated");
        Ok(book)
    }

    pub async fn delete_book(&self, id: i64) -> Result<(), ServiceError> {
        self.writer
            .delete_book(id)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        self.invalidate(id);
        info!(book_id = id, "Book deleted");
        Ok(())
    }

    async fn hydrate(&self, book: Book) -> Result<BookWithDetails, ServiceError> {
        let authors = self
            .authors
            .find_by_ids(&book.authors)
            .await
            .map_err(|err| ServiceError::from_repo("author", err))?;
        let genres = self
            .genres
            .find_by_ids(&book.genres)
            .await
            .map_err(|err| ServiceError::from_repo("genre", err))?;

        let (authors, missing_authors) = order_by_ids(&book.authors, authors, |author| author.id);
        let (genres, missing_genres) = order_by_ids(&book.genres, genres, |genre| genre.id);
        if !missing_authors.is_empty() || !missing_genres.is_empty() {
            warn!(
                book_id = book.id,
                ?missing_authors,
                ?missing_genres,
                "Book references rows that no longer exist"
            );
        }

        Ok(BookWithDetails::assemble(book, authors, genres))
    }

    // Author and genre entries hold only their own fields, so book writes leave them alone.
    fn invalidate(&self, id: i64) {
        let key = CacheKey::Book(id);
        self.cache.invalidate(key.collection());
        self.cache.invalidate(key);
    }
}
