//! Postgres-backed repository implementations.

mod authors;
mod books;
mod genres;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    Postgres, Transaction,
    postgres::{PgPool, PgPoolOptions},
    query,
};
use tracing::debug;

use crate::application::repos::RepoError;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>, RepoError> {
        self.pool.begin().await.map_err(map_sqlx_error)
    }
}

/// Delete the association rows that reference an entity, then the entity row itself, in one
/// transaction. Zero detached associations is normal; a missing entity rolls back with
/// [`RepoError::NotFound`].
async fn delete_with_associations(
    repos: &PostgresRepositories,
    entity: &'static str,
    detach_sql: &[&'static str],
    delete_sql: &'static str,
    id: i64,
) -> Result<(), RepoError> {
    let mut tx = repos.begin().await?;

    for sql in detach_sql {
        let detached = query(sql)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?
            .rows_affected();
        if detached == 0 {
            debug!(entity, id, statement = *sql, "No association rows to detach");
        }
    }

    let deleted = query(delete_sql)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();
    if deleted == 0 {
        return Err(RepoError::NotFound);
    }

    tx.commit().await.map_err(map_sqlx_error)?;
    Ok(())
}
