use async_trait::async_trait;

use crate::{
    application::repos::{GenresRepo, GenresWriteRepo, RepoError},
    domain::entities::Genre,
};

use super::{PostgresRepositories, delete_with_associations, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct GenreRow {
    id: i64,
    name: String,
}

impl From<GenreRow> for Genre {
    fn from(row: GenreRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
        }
    }
}

#[async_trait]
impl GenresRepo for PostgresRepositories {
    async fn find_by_id(&self, id: i64) -> Result<Option<Genre>, RepoError> {
        let row = sqlx::query_as::<_, GenreRow>("SELECT id, name FROM genres WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(Genre::from))
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Genre>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows =
            sqlx::query_as::<_, GenreRow>("SELECT id, name FROM genres WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Genre::from).collect())
    }

    async fn list_all(&self) -> Result<Vec<Genre>, RepoError> {
        let rows = sqlx::query_as::<_, GenreRow>("SELECT id, name FROM genres ORDER BY id")
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(Genre::from).collect())
    }
}

#[async_trait]
impl GenresWriteRepo for PostgresRepositories {
    async fn create_genre(&self, name: &str) -> Result<Genre, RepoError> {
        let row = sqlx::query_as::<_, GenreRow>(
            "INSERT INTO genres (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_genre(&self, genre: &Genre) -> Result<(), RepoError> {
        let updated = sqlx::query("UPDATE genres SET name = $1 WHERE id = $2")
            .bind(&genre.name)
            .bind(genre.id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();

        if updated == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn delete_genre(&self, id: i64) -> Result<(), RepoError> {
        delete_with_associations(
            self,
            "genre",
            &["DELETE FROM book_genre WHERE genre_id = $1"],
            "DELETE FROM genres WHERE id = $1",
            id,
        )
        .await
    }
}
