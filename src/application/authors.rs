use std::sync::Arc;

use tracing::info;

use crate::application::error::ServiceError;
use crate::application::repos::{AuthorsRepo, AuthorsWriteRepo, CreateAuthorParams};
use crate::cache::{Cache, CacheKey, Lookup};
use crate::domain::entities::{Author, AuthorPatch, NewAuthor};
use crate::domain::validation::{validate_author_patch, validate_new_author};

const ENTITY: &str = "author";

#[derive(Clone)]
pub struct AuthorService {
    reader: Arc<dyn AuthorsRepo>,
    writer: Arc<dyn AuthorsWriteRepo>,
    cache: Cache,
}

impl AuthorService {
    pub fn new(reader: Arc<dyn AuthorsRepo>, writer: Arc<dyn AuthorsWriteRepo>, cache: Cache) -> Self {
        Self {
            reader,
            writer,
            cache,
        }
    }

    pub async fn create_author(&self, author: NewAuthor) -> Result<Author, ServiceError> {
        validate_new_author(&author)?;

        let params = CreateAuthorParams {
            first_name: author.first_name,
            middle_name: author.middle_name.filter(|name| !name.is_empty()),
            last_name: author.last_name,
        };
        let created = self
            .writer
            .create_author(params)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        self.invalidate(created.id);
        info!(author_id = created.id, "Author created");
        Ok(created)
    }

    pub async fn get_author_by_id(&self, id: i64) -> Result<Author, ServiceError> {
        let key = CacheKey::Author(id);
        let ticket = match self.cache.get_json::<Author>(key).await {
            Lookup::Hit(author) => return Ok(author),
            Lookup::Miss(ticket) => ticket,
        };

        let author = self
            .reader
            .find_by_id(id)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?
            .ok_or(ServiceError::not_found(ENTITY))?;

        self.cache.populate(ticket, &author);
        Ok(author)
    }

    pub async fn list_authors(&self) -> Result<Vec<Author>, ServiceError> {
        let ticket = match self.cache.get_json::<Vec<Author>>(CacheKey::Authors).await {
            Lookup::Hit(authors) => return Ok(authors),
            Lookup::Miss(ticket) => ticket,
        };

        let authors = self
            .reader
            .list_all()
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        self.cache.populate(ticket, &authors);
        Ok(authors)
    }

    /// Uncached batch lookup. Unknown IDs are skipped and order is not guaranteed.
    pub async fn get_authors_by_ids(&self, ids: &[i64]) -> Result<Vec<Author>, ServiceError> {
        self.reader
            .find_by_ids(ids)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))
    }

    pub async fn get_author_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Author, ServiceError> {
        self.reader
            .find_by_name(first_name, last_name)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?
            .ok_or(ServiceError::not_found(ENTITY))
    }

    pub async fn update_author(&self, id: i64, patch: AuthorPatch) -> Result<Author, ServiceError> {
        validate_author_patch(&patch)?;

        let mut author = self
            .reader
            .find_by_id(id)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?
            .ok_or(ServiceError::not_found(ENTITY))?;
        patch.apply(&mut author);

        self.writer
            .update_author(&author)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        self.invalidate(id);
        info!(author_id = id, "Author updated");
        Ok(author)
    }

    pub async fn delete_author(&self, id: i64) -> Result<(), ServiceError> {
        self.writer
            .delete_author(id)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        self.invalidate(id);
        info!(author_id = id, "Author deleted");
        Ok(())
    }

    fn invalidate(&self, id: i64) {
        let key = CacheKey::Author(id);
        self.cache.invalidate(key.collection());
        self.cache.invalidate(key);
    }
}
