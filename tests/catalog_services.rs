//! Service-level behaviour over the in-memory catalogue: cache-aside reads, invalidation on
//! writes, hydration and the error vocabulary.

mod support;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::oneshot;

use bookshelf::application::authors::AuthorService;
use bookshelf::application::error::ServiceError;
use bookshelf::application::repos::{AuthorsRepo, RepoError};
use bookshelf::cache::CacheKey;
use bookshelf::domain::entities::{
    Author, AuthorPatch, BookPatch, GenrePatch, NewAuthor, NewGenre,
};
use bookshelf::domain::validation::CANT_BE_EMPTY;

use support::{FailingStore, Harness, InMemoryCatalog, new_book};

fn jane_doe() -> NewAuthor {
    NewAuthor {
        first_name: "Jane".to_string(),
        middle_name: None,
        last_name: "Doe".to_string(),
    }
}

fn genre(name: &str) -> NewGenre {
    NewGenre {
        name: name.to_string(),
    }
}

#[tokio::test]
async fn catalogue_walkthrough() {
    let h = Harness::new();

    let author = h.authors.create_author(jane_doe()).await.expect("author");
    assert_eq!(author.id, 1);

    let err = h
        .books
        .create_book(new_book("X", vec![1], vec![]))
        .await
        .expect_err("book without genres");
    match err {
        ServiceError::Validation(errors) => assert_eq!(errors.get("genres"), Some(CANT_BE_EMPTY)),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(h.catalog.book_count().await, 0);

    let sci_fi = h.genres.create_genre(genre("Sci-Fi")).await.expect("genre");
    assert_eq!(sci_fi.id, 1);
    assert_eq!(sci_fi.name, "sci-fi");

    let book = h
        .books
        .create_book(new_book("X", vec![1], vec![1]))
        .await
        .expect("book");
    assert_eq!(book.title, "X");
    assert_eq!(book.pages, 300);
    assert_eq!(book.authors, vec![author]);
    assert_eq!(book.genres, vec![sci_fi]);
}

#[tokio::test]
async fn get_book_hydrates_authors_and_genres_in_stored_order() {
    let h = Harness::new();
    for (first, last) in [("Ann", "Lee"), ("Bob", "Ray"), ("Cy", "Fox")] {
        h.authors
            .create_author(NewAuthor {
                first_name: first.into(),
                middle_name: None,
                last_name: last.into(),
            })
            .await
            .expect("author");
    }
    h.genres.create_genre(genre("drama")).await.expect("genre");
    h.genres.create_genre(genre("poetry")).await.expect("genre");

    let created = h
        .books
        .create_book(new_book("Verses", vec![3, 1, 3], vec![2, 1]))
        .await
        .expect("book");

    let fetched = h.books.get_book_by_id(created.id).await.expect("book");
    let author_ids: Vec<i64> = fetched.authors.iter().map(|author| author.id).collect();
    let genre_ids: Vec<i64> = fetched.genres.iter().map(|genre| genre.id).collect();
    assert_eq!(author_ids, vec![3, 1]);
    assert_eq!(genre_ids, vec![2, 1]);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn cached_reads_skip_the_repository() {
    let h = Harness::new();
    let author = h.authors.create_author(jane_doe()).await.expect("author");
    h.settle().await;

    h.authors.get_author_by_id(author.id).await.expect("miss");
    h.settle().await;
    let reads = h.catalog.reads();

    let again = h.authors.get_author_by_id(author.id).await.expect("hit");
    assert_eq!(again, author);
    assert_eq!(h.catalog.reads(), reads);

    h.catalog.fail_reads(true);
    let served = h.authors.get_author_by_id(author.id).await.expect("hit");
    assert_eq!(served, author);
}

#[tokio::test]
async fn delete_then_get_is_not_found_even_after_caching() {
    let h = Harness::new();
    let author = h.authors.create_author(jane_doe()).await.expect("author");
    let fiction = h.genres.create_genre(genre("fiction")).await.expect("genre");
    let book = h
        .books
        .create_book(new_book("X", vec![author.id], vec![fiction.id]))
        .await
        .expect("book");

    h.authors.get_author_by_id(author.id).await.expect("author");
    h.genres.get_genre_by_id(fiction.id).await.expect("genre");
    h.books.get_book_by_id(book.id).await.expect("book");
    h.settle().await;

    h.books.delete_book(book.id).await.expect("delete book");
    h.authors.delete_author(author.id).await.expect("delete author");
    h.genres.delete_genre(fiction.id).await.expect("delete genre");
    h.settle().await;

    assert!(matches!(
        h.books.get_book_by_id(book.id).await,
        Err(ServiceError::NotFound { entity: "book" })
    ));
    assert!(matches!(
        h.authors.get_author_by_id(author.id).await,
        Err(ServiceError::NotFound { entity: "author" })
    ));
    assert!(matches!(
        h.genres.get_genre_by_id(fiction.id).await,
        Err(ServiceError::NotFound { entity: "genre" })
    ));
    assert!(matches!(
        h.books.delete_book(book.id).await,
        Err(ServiceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn invalidating_a_missing_key_is_harmless() {
    let h = Harness::new();
    h.cache.invalidate(CacheKey::Book(404));
    h.cache.invalidate(CacheKey::Genres);
    h.settle().await;

    let author = h.authors.create_author(jane_doe()).await.expect("author");
    assert_eq!(h.authors.get_author_by_id(author.id).await.ok(), Some(author));
}

#[tokio::test]
async fn stale_book_blob_is_served_until_invalidated() {
    let h = Harness::new();
    h.authors.create_author(jane_doe()).await.expect("author");
    h.genres.create_genre(genre("fiction")).await.expect("genre");
    let book = h
        .books
        .create_book(new_book("Old title", vec![1], vec![1]))
        .await
        .expect("book");

    h.books.get_book_by_id(book.id).await.expect("populate");
    h.settle().await;

    h.catalog.rename_book_directly(book.id, "New title").await;
    let stale = h.books.get_book_by_id(book.id).await.expect("cached");
    assert_eq!(stale.title, "Old title");

    h.cache.invalidate(CacheKey::Book(book.id));
    h.settle().await;

    let fresh = h.books.get_book_by_id(book.id).await.expect("reloaded");
    assert_eq!(fresh.title, "New title");
}

#[tokio::test]
async fn update_book_replaces_associations_wholesale() {
    let h = Harness::new();
    for (first, last) in [("Ann", "Lee"), ("Bob", "Ray"), ("Cy", "Fox")] {
        h.authors
            .create_author(NewAuthor {
                first_name: first.into(),
                middle_name: None,
                last_name: last.into(),
            })
            .await
            .expect("author");
    }
    h.genres.create_genre(genre("fiction")).await.expect("genre");
    let book = h
        .books
        .create_book(new_book("X", vec![1, 2], vec![1]))
        .await
        .expect("book");
    h.books.get_book_by_id(book.id).await.expect("populate");
    h.settle().await;

    let updated = h
        .books
        .update_book(
            book.id,
            BookPatch {
                authors: Some(vec![3, 3, 2]),
                ..BookPatch::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.authors, vec![3, 2]);
    assert_eq!(updated.genres, vec![1]);
    assert_eq!(updated.title, "X");

    let stored = h.catalog.stored_book(book.id).await.expect("stored");
    assert_eq!(stored.authors, vec![3, 2]);

    h.settle().await;
    let fetched = h.books.get_book_by_id(book.id).await.expect("book");
    let ids: Vec<i64> = fetched.authors.iter().map(|author| author.id).collect();
    assert_eq!(ids, vec![3, 2]);
}

#[tokio::test]
async fn book_writes_leave_author_and_genre_entries_alone() {
    let h = Harness::new();
    let author = h.authors.create_author(jane_doe()).await.expect("author");
    let fiction = h.genres.create_genre(genre("fiction")).await.expect("genre");
    h.authors.get_author_by_id(author.id).await.expect("author");
    h.genres.get_genre_by_id(fiction.id).await.expect("genre");
    h.settle().await;

    let book = h
        .books
        .create_book(new_book("X", vec![author.id], vec![fiction.id]))
        .await
        .expect("book");
    h.books.delete_book(book.id).await.expect("delete");
    h.settle().await;

    assert!(h.cached("author:1").await.is_some());
    assert!(h.cached("genre:1").await.is_some());
    assert!(h.cached("book:1").await.is_none());
}

#[tokio::test]
async fn genre_names_are_unique_ignoring_case() {
    let h = Harness::new();
    let original = h.genres.create_genre(genre("Fiction")).await.expect("genre");

    let err = h
        .genres
        .create_genre(genre("fiction"))
        .await
        .expect_err("duplicate");
    match err {
        ServiceError::GenreExists(existing) => assert_eq!(existing, original),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(h.genres.list_genres().await.expect("list").len(), 1);
}

#[tokio::test]
async fn duplicate_author_is_reported_as_existing() {
    let h = Harness::new();
    h.authors.create_author(jane_doe()).await.expect("author");

    let err = h
        .authors
        .create_author(jane_doe())
        .await
        .expect_err("duplicate");
    assert!(matches!(err, ServiceError::EntityExists { entity: "author" }));
}

#[tokio::test]
async fn unknown_reference_persists_nothing() {
    let h = Harness::new();
    h.authors.create_author(jane_doe()).await.expect("author");
    h.genres.create_genre(genre("fiction")).await.expect("genre");

    let err = h
        .books
        .create_book(new_book("X", vec![1, 9], vec![1]))
        .await
        .expect_err("missing author");
    assert!(matches!(err, ServiceError::Integrity { .. }));
    assert_eq!(h.catalog.book_count().await, 0);
}

#[tokio::test]
async fn list_is_refreshed_after_a_write() {
    let h = Harness::new();
    h.authors.create_author(jane_doe()).await.expect("author");
    assert_eq!(h.authors.list_authors().await.expect("list").len(), 1);
    h.settle().await;
    assert!(h.cached("authors").await.is_some());

    h.authors
        .create_author(NewAuthor {
            first_name: "John".into(),
            middle_name: Some("Q".into()),
            last_name: "Public".into(),
        })
        .await
        .expect("author");
    h.settle().await;

    assert!(h.cached("authors").await.is_none());
    assert_eq!(h.authors.list_authors().await.expect("list").len(), 2);
}

#[tokio::test]
async fn author_patch_updates_only_given_fields() {
    let h = Harness::new();
    let author = h
        .authors
        .create_author(NewAuthor {
            first_name: "John".into(),
            middle_name: Some("Quincy".into()),
            last_name: "Public".into(),
        })
        .await
        .expect("author");

    let updated = h
        .authors
        .update_author(
            author.id,
            AuthorPatch {
                middle_name: Some(String::new()),
                last_name: Some("Adams".into()),
                ..AuthorPatch::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.first_name, "John");
    assert_eq!(updated.middle_name, None);
    assert_eq!(updated.last_name, "Adams");

    let found = h
        .authors
        .get_author_by_name("John", "Adams")
        .await
        .expect("by name");
    assert_eq!(found, updated);

    let err = h
        .authors
        .update_author(
            author.id,
            AuthorPatch {
                first_name: Some("J0hn".into()),
                ..AuthorPatch::default()
            },
        )
        .await
        .expect_err("invalid");
    assert!(matches!(err, ServiceError::Validation(_)));
}

#[tokio::test]
async fn genre_rename_is_normalized_and_refreshes_cache() {
    let h = Harness::new();
    let fiction = h.genres.create_genre(genre("fiction")).await.expect("genre");
    h.genres.get_genre_by_id(fiction.id).await.expect("populate");
    h.settle().await;

    let renamed = h
        .genres
        .update_genre(
            fiction.id,
            GenrePatch {
                name: " Hard SF ".into(),
            },
        )
        .await
        .expect("rename");
    assert_eq!(renamed.name, "hard sf");
    h.settle().await;

    assert_eq!(
        h.genres.get_genre_by_id(fiction.id).await.expect("genre").name,
        "hard sf"
    );
    assert!(matches!(
        h.genres
            .update_genre(77, GenrePatch { name: "noir".into() })
            .await,
        Err(ServiceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn cache_failures_fall_back_to_the_repository() {
    let h = Harness::with_store(Arc::new(FailingStore));
    let author = h.authors.create_author(jane_doe()).await.expect("author");
    h.settle().await;

    assert_eq!(
        h.authors.get_author_by_id(author.id).await.expect("author"),
        author
    );
    assert_eq!(h.authors.list_authors().await.expect("list"), vec![author]);
}

#[tokio::test]
async fn repository_failures_surface_as_repo_errors() {
    let h = Harness::new();
    h.catalog.fail_reads(true);

    let err = h.books.list_books().await.expect_err("failing repo");
    assert!(matches!(err, ServiceError::Repo(_)));
}

/// Author reader whose first `find_by_id` holds on to its result until released.
struct PausingAuthors {
    inner: Arc<InMemoryCatalog>,
    gate: Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>,
}

#[async_trait]
impl AuthorsRepo for PausingAuthors {
    async fn find_by_id(&self, id: i64) -> Result<Option<Author>, RepoError> {
        let snapshot = AuthorsRepo::find_by_id(self.inner.as_ref(), id).await?;
        let gate = self.gate.lock().expect("gate lock").take();
        if let Some((loaded, release)) = gate {
            let _ = loaded.send(());
            let _ = release.await;
        }
        Ok(snapshot)
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Author>, RepoError> {
        AuthorsRepo::find_by_ids(self.inner.as_ref(), ids).await
    }

    async fn find_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Author>, RepoError> {
        self.inner.find_by_name(first_name, last_name).await
    }

    async fn list_all(&self) -> Result<Vec<Author>, RepoError> {
        AuthorsRepo::list_all(self.inner.as_ref()).await
    }
}

#[tokio::test]
async fn read_overtaken_by_a_write_does_not_restore_the_old_row() {
    let h = Harness::new();
    let author = h.authors.create_author(jane_doe()).await.expect("author");
    h.settle().await;

    let (loaded_tx, loaded_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel();
    let slow_reader = AuthorService::new(
        Arc::new(PausingAuthors {
            inner: h.catalog.clone(),
            gate: Mutex::new(Some((loaded_tx, release_rx))),
        }),
        h.catalog.clone(),
        h.cache.clone(),
    );
    let pending = tokio::spawn(async move { slow_reader.get_author_by_id(1).await });
    loaded_rx.await.expect("reader loaded the old row");

    h.authors
        .update_author(
            author.id,
            AuthorPatch {
                last_name: Some("Smith".into()),
                ..AuthorPatch::default()
            },
        )
        .await
        .expect("update");
    h.settle().await;

    release_tx.send(()).expect("reader is waiting");
    let served = pending.await.expect("reader task").expect("read");
    assert_eq!(served.last_name, "Doe");
    h.settle().await;

    assert!(h.cached("author:1").await.is_none());
    let after = h.authors.get_author_by_id(author.id).await.expect("author");
    assert_eq!(after.last_name, "Smith");
    h.settle().await;
    assert!(
        h.cached("author:1")
            .await
            .is_some_and(|raw| raw.contains("Smith"))
    );
}

#[tokio::test]
async fn batch_lookups_skip_unknown_ids() {
    let h = Harness::new();
    for (first, last) in [("Ann", "Lee"), ("Bob", "Ray"), ("Cid", "Moe")] {
        h.authors
            .create_author(NewAuthor {
                first_name: first.into(),
                middle_name: None,
                last_name: last.into(),
            })
            .await
            .expect("author");
    }
    h.genres.create_genre(genre("drama")).await.expect("genre");
    h.genres.create_genre(genre("poetry")).await.expect("genre");

    let mut authors: Vec<i64> = h
        .authors
        .get_authors_by_ids(&[3, 1, 42])
        .await
        .expect("authors")
        .into_iter()
        .map(|author| author.id)
        .collect();
    authors.sort_unstable();
    assert_eq!(authors, vec![1, 3]);

    let mut genres: Vec<String> = h
        .genres
        .get_genres_by_ids(&[2, 1, 7])
        .await
        .expect("genres")
        .into_iter()
        .map(|genre| genre.name)
        .collect();
    genres.sort();
    assert_eq!(genres, vec!["drama".to_string(), "poetry".to_string()]);
}

#[tokio::test]
async fn batch_lookups_with_no_ids_are_empty() {
    let h = Harness::new();
    h.authors.create_author(jane_doe()).await.expect("author");
    h.genres.create_genre(genre("drama")).await.expect("genre");

    assert!(h.authors.get_authors_by_ids(&[]).await.expect("authors").is_empty());
    assert!(h.genres.get_genres_by_ids(&[]).await.expect("genres").is_empty());
    assert!(
        h.authors
            .get_authors_by_ids(&[99])
            .await
            .expect("authors")
            .is_empty()
    );
}
