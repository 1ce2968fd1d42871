use std::sync::Arc;

use async_trait::async_trait;

use crate::application::authors::AuthorService;
use crate::application::books::BookService;
use crate::application::genres::GenreService;
use crate::infra::db::PostgresRepositories;

/// Liveness probe for the backing database.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl HealthProbe for PostgresRepositories {
    async fn check(&self) -> Result<(), sqlx::Error> {
        self.health_check().await
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub authors: Arc<AuthorService>,
    pub genres: Arc<GenreService>,
    pub books: Arc<BookService>,
    pub health: Arc<dyn HealthProbe>,
}
