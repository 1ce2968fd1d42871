use async_trait::async_trait;

use crate::{
    application::repos::{AuthorsRepo, AuthorsWriteRepo, CreateAuthorParams, RepoError},
    domain::entities::Author,
};

use super::{PostgresRepositories, delete_with_associations, map_sqlx_error};

const AUTHOR_COLUMNS: &str = "id, first_name, middle_name, last_name";

#[derive(sqlx::FromRow)]
struct AuthorRow {
    id: i64,
    first_name: String,
    middle_name: String,
    last_name: String,
}

impl From<AuthorRow> for Author {
    fn from(row: AuthorRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            middle_name: (!row.middle_name.is_empty()).then_some(row.middle_name),
            last_name: row.last_name,
        }
    }
}

#[async_trait]
impl AuthorsRepo for PostgresRepositories {
    async fn find_by_id(&self, id: i64) -> Result<Option<Author>, RepoError> {
        let sql = format!("SELECT {AUTHOR_COLUMNS} FROM authors WHERE id = $1");
        let row = sqlx::query_as::<_, AuthorRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Author::from))
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Author>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!("SELECT {AUTHOR_COLUMNS} FROM authors WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, AuthorRow>(&sql)
            .bind(ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Author::from).collect())
    }

    async fn find_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Option<Author>, RepoError> {
        let sql = format!(
            "SELECT {AUTHOR_COLUMNS} FROM authors WHERE first_name = $1 AND last_name = $2"
        );
        let row = sqlx::query_as::<_, AuthorRow>(&sql)
            .bind(first_name)
            .bind(last_name)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Author::from))
    }

    async fn list_all(&self) -> Result<Vec<Author>, RepoError> {
        let sql = format!("SELECT {AUTHOR_COLUMNS} FROM authors ORDER BY id");
        let rows = sqlx::query_as::<_, AuthorRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Author::from).collect())
    }
}

#[async_trait]
impl AuthorsWriteRepo for PostgresRepositories {
    async fn create_author(&self, params: CreateAuthorParams) -> Result<Author, RepoError> {
        if AuthorsRepo::find_by_name(self, &params.first_name, &params.last_name)
            .await?
            .is_some()
        {
            return Err(RepoError::Duplicate {
                constraint: "authors_first_name_last_name_key".to_string(),
            });
        }

        let sql = format!(
            "INSERT INTO authors (first_name, middle_name, last_name) \
             VALUES ($1, $2, $3) \
             RETURNING {AUTHOR_COLUMNS}"
        );
        let row = sqlx::query_as::<_, AuthorRow>(&sql)
            .bind(&params.first_name)
            .bind(params.middle_name.as_deref().unwrap_or_default())
            .bind(&params.last_name)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_author(&self, author: &Author) -> Result<(), RepoError> {
        let updated = sqlx::query(
            "UPDATE authors SET first_name = $1, middle_name = $2, last_name = $3 WHERE id = $4",
        )
        .bind(&author.first_name)
        .bind(author.middle_name.as_deref().unwrap_or_default())
        .bind(&author.last_name)
        .bind(author.id)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();

        if updated == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn delete_author(&self, id: i64) -> Result<(), RepoError> {
        delete_with_associations(
            self,
            "author",
            &["DELETE FROM book_author WHERE author_id = $1"],
            "DELETE FROM authors WHERE id = $1",
            id,
        )
        .await
    }
}
