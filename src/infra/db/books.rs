use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use time::{Date, OffsetDateTime};

use crate::{
    application::repos::{BooksRepo, BooksWriteRepo, CreateBookParams, RepoError},
    domain::entities::Book,
};

use super::{PostgresRepositories, delete_with_associations, map_sqlx_error};

const BOOK_SELECT: &str = "SELECT b.id, b.title, b.publish_date, b.created_at, b.isbn, b.pages, \
        ARRAY(SELECT ba.author_id FROM book_author ba \
              WHERE ba.book_id = b.id ORDER BY ba.position, ba.author_id) AS authors, \
        ARRAY(SELECT bg.genre_id FROM book_genre bg \
              WHERE bg.book_id = b.id ORDER BY bg.position, bg.genre_id) AS genres \
    FROM books b";

#[derive(sqlx::FromRow)]
struct BookRow {
    id: i64,
    title: String,
    publish_date: Date,
    created_at: OffsetDateTime,
    isbn: String,
    pages: i32,
    authors: Vec<i64>,
    genres: Vec<i64>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            publish_date: row.publish_date,
            created_at: row.created_at,
            isbn: row.isbn,
            pages: row.pages,
            authors: row.authors,
            genres: row.genres,
        }
    }
}

#[derive(sqlx::FromRow)]
struct InsertedBookRow {
    id: i64,
    created_at: OffsetDateTime,
}

/// Insert one association row per ID, keeping list order in `position`.
///
/// The `INSERT .. SELECT` only produces a row when the referenced entity exists, so a zero row
/// count identifies the missing ID.
async fn insert_associations(
    tx: &mut Transaction<'_, Postgres>,
    book_id: i64,
    authors: &[i64],
    genres: &[i64],
) -> Result<(), RepoError> {
    for (position, author_id) in authors.iter().enumerate() {
        let inserted = sqlx::query(
            "INSERT INTO book_author (book_id, author_id, position) \
             SELECT $1, a.id, $3 FROM authors a WHERE a.id = $2",
        )
        .bind(book_id)
        .bind(author_id)
        .bind(position as i32)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();
        if inserted == 0 {
            return Err(RepoError::integrity(format!(
                "author {author_id} does not exist"
            )));
        }
    }

    for (position, genre_id) in genres.iter().enumerate() {
        let inserted = sqlx::query(
            "INSERT INTO book_genre (book_id, genre_id, position) \
             SELECT $1, g.id, $3 FROM genres g WHERE g.id = $2",
        )
        .bind(book_id)
        .bind(genre_id)
        .bind(position as i32)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();
        if inserted == 0 {
            return Err(RepoError::integrity(format!(
                "genre {genre_id} does not exist"
            )));
        }
    }

    Ok(())
}

#[async_trait]
impl BooksRepo for PostgresRepositories {
    async fn find_by_id(&self, id: i64) -> Result<Option<Book>, RepoError> {
        let sql = format!("{BOOK_SELECT} WHERE b.id = $1");
        let row = sqlx::query_as::<_, BookRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Book::from))
    }

    async fn list_all(&self) -> Result<Vec<Book>, RepoError> {
        let sql = format!("{BOOK_SELECT} ORDER BY b.id");
        let rows = sqlx::query_as::<_, BookRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Book::from).collect())
    }
}

#[async_trait]
impl BooksWriteRepo for PostgresRepositories {
    async fn create_book(&self, params: CreateBookParams) -> Result<Book, RepoError> {
        let mut tx = self.begin().await?;

        let inserted = sqlx::query_as::<_, InsertedBookRow>(
            "INSERT INTO books (title, publish_date, isbn, pages) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, created_at",
        )
        .bind(&params.title)
        .bind(params.publish_date)
        .bind(&params.isbn)
        .bind(params.pages)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        insert_associations(&mut tx, inserted.id, &params.authors, &params.genres).await?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Book {
            id: inserted.id,
            title: params.title,
            publish_date: params.publish_date,
            created_at: inserted.created_at,
            isbn: params.isbn,
            pages: params.pages,
            authors: params.authors,
            genres: params.genres,
        })
    }

    async fn update_book(&self, book: &Book) -> Result<(), RepoError> {
        let mut tx = self.begin().await?;

        let updated = sqlx::query(
            "UPDATE books SET title = $1, publish_date = $2, isbn = $3, pages = $4 WHERE id = $5",
        )
        .bind(&book.title)
        .bind(book.publish_date)
        .bind(&book.isbn)
        .bind(book.pages)
        .bind(book.id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();
        if updated == 0 {
            return Err(RepoError::NotFound);
        }

        sqlx::query("DELETE FROM book_author WHERE book_id = $1")
            .bind(book.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        sqlx::query("DELETE FROM book_genre WHERE book_id = $1")
            .bind(book.id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        insert_associations(&mut tx, book.id, &book.authors, &book.genres).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_book(&self, id: i64) -> Result<(), RepoError> {
        delete_with_associations(
            self,
            "book",
            &[
                "DELETE FROM book_author WHERE book_id = $1",
                "DELETE FROM book_genre WHERE book_id = $1",
            ],
            "DELETE FROM books WHERE id = $1",
            id,
        )
        .await
    }
}
