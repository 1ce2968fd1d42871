use std::sync::Arc;

use tracing::info;

use crate::application::error::ServiceError;
use crate::application::repos::{GenresRepo, GenresWriteRepo};
use crate::cache::{Cache, CacheKey, Lookup};
use crate::domain::entities::{Genre, GenrePatch, NewGenre};
use crate::domain::validation::validate_genre_name;

const ENTITY: &str = "genre";

/// Genre names are compared and stored trimmed and lowercased.
fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Clone)]
pub struct GenreService {
    reader: Arc<dyn GenresRepo>,
    writer: Arc<dyn GenresWriteRepo>,
    cache: Cache,
}

impl GenreService {
    pub fn new(reader: Arc<dyn GenresRepo>, writer: Arc<dyn GenresWriteRepo>, cache: Cache) -> Self {
        Self {
            reader,
            writer,
            cache,
        }
    }

    /// Create a genre unless one with the same normalized name exists, in which case the
    /// existing genre is returned inside [`ServiceError::GenreExists`].
    pub async fn create_genre(&self, genre: NewGenre) -> Result<Genre, ServiceError> {
        validate_genre_name(&genre.name)?;
        let name = normalize_name(&genre.name);

        let existing = self
            .reader
            .list_all()
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;
        if let Some(existing) = existing.into_iter().find(|candidate| candidate.name == name) {
            return Err(ServiceError::GenreExists(existing));
        }

        let created = self
            .writer
            .create_genre(&name)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        self.invalidate(created.id);
        info!(genre_id = created.id, name = %created.name, "Genre created");
        Ok(created)
    }

    pub async fn get_genre_by_id(&self, id: i64) -> Result<Genre, ServiceError> {
        let key = CacheKey::Genre(id);
        let ticket = match self.cache.get_json::<Genre>(key).await {
            Lookup::Hit(genre) => return Ok(genre),
            Lookup::Miss(ticket) => ticket,
        };

        let genre = self
            .reader
            .find_by_id(id)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?
            .ok_or(ServiceError::not_found(ENTITY))?;

        self.cache.populate(ticket, &genre);
        Ok(genre)
    }

    pub async fn list_genres(&self) -> Result<Vec<Genre>, ServiceError> {
        let ticket = match self.cache.get_json::<Vec<Genre>>(CacheKey::Genres).await {
            Lookup::Hit(genres) => return Ok(genres),
            Lookup::Miss(ticket) => ticket,
        };

        let genres = self
            .reader
            .list_all()
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        self.cache.populate(ticket, &genres);
        Ok(genres)
    }

    /// Uncached batch lookup. Unknown IDs are skipped and order is not guaranteed.
    pub async fn get_genres_by_ids(&self, ids: &[i64]) -> Result<Vec<Genre>, ServiceError> {
        self.reader
            .find_by_ids(ids)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))
    }

    pub async fn update_genre(&self, id: i64, patch: GenrePatch) -> Result<Genre, ServiceError> {
        validate_genre_name(&patch.name)?;

        let genre = Genre {
            id,
            name: normalize_name(&patch.name),
        };
        self.writer
            .update_genre(&genre)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        self.invalidate(id);
        info!(genre_id = id, name = %genre.name, "Genre updated");
        Ok(genre)
    }

    pub async fn delete_genre(&self, id: i64) -> Result<(), ServiceError> {
        self.writer
            .delete_genre(id)
            .await
            .map_err(|err| ServiceError::from_repo(ENTITY, err))?;

        self.invalidate(id);
        info!(genre_id = id, "Genre deleted");
        Ok(())
    }

    fn invalidate(&self, id: i64) {
        let key = CacheKey::Genre(id);
        self.cache.invalidate(key.collection());
        self.cache.invalidate(key);
    }
}
