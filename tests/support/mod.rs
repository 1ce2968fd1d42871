//! In-memory catalogue and service wiring shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use time::macros::date;
use tokio::sync::Mutex;

use bookshelf::application::authors::AuthorService;
use bookshelf::application::books::BookService;
use bookshelf::application::genres::GenreService;
use bookshelf::application::repos::{
    AuthorsRepo, AuthorsWriteRepo, BooksRepo, BooksWriteRepo, CreateAuthorParams,
    CreateBookParams, GenresRepo, GenresWriteRepo, RepoError,
};
use bookshelf::cache::{Cache, CacheConfig, CacheError, CacheStore, MemoryStore};
use bookshelf::domain::entities::{Author, Book, Genre, NewBook};

#[derive(Default)]
struct CatalogState {
    authors: BTreeMap<i64, Author>,
    genres: BTreeMap<i64, Genre>,
    books: BTreeMap<i64, Book>,
    next_author: i64,
    next_genre: i64,
    next_book: i64,
}

/// Repository fake that mirrors the constraints enforced by the Postgres schema.
#[derive(Default)]
pub struct InMemoryCatalog {
    state: Mutex<CatalogState>,
    reads: AtomicUsize,
    fail_reads: AtomicBool,
}

impl InMemoryCatalog {
    /// Number of repository read calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub async fn book_count(&self) -> usize {
        self.state.lock().await.books.len()
    }

    pub async fn stored_book(&self, id: i64) -> Option<Book> {
        self.state.lock().await.books.get(&id).cloned()
    }

    /// Change a stored row behind the services' back, leaving any cached copy untouched.
    pub async fn rename_book_directly(&self, id: i64, title: &str) {
        if let Some(book) = self.state.lock().await.books.get_mut(&id) {
            book.title = title.to_string();
        }
    }

    fn record_read(&self) -> Result<(), RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepoError::Persistence("injected read failure".into()));
        }
        Ok(())
    }
}

fn check_references(state: &CatalogState, authors: &[i64], genres: &[i64]) -> Result<(), RepoError> {
    if let Some(id) = authors.iter().find(|id| !state.authors.contains_key(id)) {
        return Err(RepoError::integrity(format!("author {id} does not exist")));
    }
    if let Some(id) = genres.iter().find(|id| !state.genres.contains_key(id)) {
        return Err(RepoError::integrity(format!("genre {id} does not exist")));
    }
    Ok(())
}

#[async_trait]
impl AuthorsRepo for InMemoryCatalog {
    async fn find_by_id(&self, id: i64) -> Result<Option<Author>, RepoError> {
        self.record_read()?;
        Ok(self.state.lock().await.authors.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Author>, RepoError> {
        self.record_read()?;
        let state = self.state.lock().await;
        // Reverse order so callers cannot rely on the backend preserving the request order.
        Ok(state
            .authors
            .values()
            .rev()
            .filter(|author| ids.contains(&author.id))
            .cloned()
            .collect())
    }

    async fn find_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Author>, RepoError> {
        self.record_read()?;
        let state = self.state.lock().await;
        Ok(state
            .authors
            .values()
            .find(|author| author.first_name == first_name && author.last_name == last_name)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<Author>, RepoError> {
        self.record_read()?;
        Ok(self.state.lock().await.authors.values().cloned().collect())
    }
}

#[async_trait]
impl AuthorsWriteRepo for InMemoryCatalog {
    async fn create_author(&self, params: CreateAuthorParams) -> Result<Author, RepoError> {
        let mut state = self.state.lock().await;
        let exists = state.authors.values().any(|author| {
            author.first_name == params.first_name && author.last_name == params.last_name
        });
        if exists {
            return Err(RepoError::Duplicate {
                constraint: "authors_first_name_last_name_key".into(),
            });
        }
        state.next_author += 1;
        let author = Author {
            id: state.next_author,
            first_name: params.first_name,
            middle_name: params.middle_name,
            last_name: params.last_name,
        };
        state.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn update_author(&self, author: &Author) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        match state.authors.get_mut(&author.id) {
            Some(stored) => {
                *stored = author.clone();
                Ok(())
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete_author(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        for book in state.books.values_mut() {
            book.authors.retain(|author| *author != id);
        }
        state.authors.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl GenresRepo for InMemoryCatalog {
    async fn find_by_id(&self, id: i64) -> Result<Option<Genre>, RepoError> {
        self.record_read()?;
        Ok(self.state.lock().await.genres.get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Genre>, RepoError> {
        self.record_read()?;
        let state = self.state.lock().await;
        Ok(state
            .genres
            .values()
            .rev()
            .filter(|genre| ids.contains(&genre.id))
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Genre>, RepoError> {
        self.record_read()?;
        Ok(self.state.lock().await.genres.values().cloned().collect())
    }
}

#[async_trait]
impl GenresWriteRepo for InMemoryCatalog {
    async fn create_genre(&self, name: &str) -> Result<Genre, RepoError> {
        let mut state = self.state.lock().await;
        if state.genres.values().any(|genre| genre.name.eq_ignore_ascii_case(name)) {
            return Err(RepoError::Duplicate {
                constraint: "genres_name_lower_key".into(),
            });
        }
        state.next_genre += 1;
        let genre = Genre {
            id: state.next_genre,
            name: name.to_string(),
        };
        state.genres.insert(genre.id, genre.clone());
        Ok(genre)
    }

    async fn update_genre(&self, genre: &Genre) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        match state.genres.get_mut(&genre.id) {
            Some(stored) => {
                *stored = genre.clone();
                Ok(())
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete_genre(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        for book in state.books.values_mut() {
            book.genres.retain(|genre| *genre != id);
        }
        state.genres.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl BooksRepo for InMemoryCatalog {
    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, RepoError> {
        self.record_read()?;
        Ok(self.state.lock().await.books.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Book>, RepoError> {
        self.record_read()?;
        Ok(self.state.lock().await.books.values().cloned().collect())
    }
}

#[async_trait]
impl BooksWriteRepo for InMemoryCatalog {
    async fn create_book(&self, params: CreateBookParams) -> Result<Book, RepoError> {
        let mut state = self.state.lock().await;
        check_references(&state, &params.authors, &params.genres)?;
        state.next_book += 1;
        let book = Book {
            id: state.next_book,
            title: params.title,
            publish_date: params.publish_date,
            created_at: OffsetDateTime::now_utc(),
            isbn: params.isbn,
            pages: params.pages,
            authors: params.authors,
            genres: params.genres,
        };
        state.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update_book(&self, book: &Book) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        if !state.books.contains_key(&book.id) {
            return Err(RepoError::NotFound);
        }
        check_references(&state, &book.authors, &book.genres)?;
        state.books.insert(book.id, book.clone());
        Ok(())
    }

    async fn delete_book(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        state.books.remove(&id).map(|_| ()).ok_or(RepoError::NotFound)
    }
}

/// Cache store whose every call fails, for checking that cache trouble never fails a request.
pub struct FailingStore;

#[async_trait]
impl CacheStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("injected cache failure".into()))
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("injected cache failure".into()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("injected cache failure".into()))
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// Services wired to one in-memory catalogue and one cache store with a running worker.
pub struct Harness {
    pub catalog: Arc<InMemoryCatalog>,
    pub store: Arc<dyn CacheStore>,
    pub cache: Cache,
    pub authors: AuthorService,
    pub genres: GenreService,
    pub books: BookService,
}

impl Harness {
    pub fn new() -> Self {
        let config = CacheConfig::default();
        Self::with_store(Arc::new(MemoryStore::new(&config)))
    }

    pub fn with_store(store: Arc<dyn CacheStore>) -> Self {
        let config = CacheConfig::default();
        let catalog = Arc::new(InMemoryCatalog::default());
        let (cache, _worker) = Cache::spawn(store.clone(), &config);

        let authors_repo: Arc<dyn AuthorsRepo> = catalog.clone();
        let genres_repo: Arc<dyn GenresRepo> = catalog.clone();

        Self {
            authors: AuthorService::new(authors_repo.clone(), catalog.clone(), cache.clone()),
            genres: GenreService::new(genres_repo.clone(), catalog.clone(), cache.clone()),
            books: BookService::new(
                catalog.clone(),
                catalog.clone(),
                authors_repo,
                genres_repo,
                cache.clone(),
            ),
            catalog,
            store,
            cache,
        }
    }

    /// Wait for every queued populate/invalidate to reach the store.
    pub async fn settle(&self) {
        self.cache.flush().await;
    }

    pub async fn cached(&self, key: &str) -> Option<String> {
        self.store.get(key).await.ok().flatten()
    }
}

pub fn new_book(title: &str, authors: Vec<i64>, genres: Vec<i64>) -> NewBook {
    NewBook {
        title: title.to_string(),
        publish_date: date!(2001 - 05 - 17),
        isbn: "978-0-00-000000-2".to_string(),
        pages: 300,
        authors,
        genres,
    }
}
