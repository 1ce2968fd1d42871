//! Cache key definitions.
//!
//! Items are stored under `<entity>:<id>`, collections under the plural entity name.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Author(i64),
    Authors,
    Genre(i64),
    Genres,
    Book(i64),
    Books,
}

impl CacheKey {
    /// Collection key that lists the entity this key belongs to.
    pub fn collection(self) -> Self {
        match self {
            CacheKey::Author(_) | CacheKey::Authors => CacheKey::Authors,
            CacheKey::Genre(_) | CacheKey::Genres => CacheKey::Genres,
            CacheKey::Book(_) | CacheKey::Books => CacheKey::Books,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Author(id) => write!(f, "author:{id}"),
            CacheKey::Authors => f.write_str("authors"),
            CacheKey::Genre(id) => write!(f, "genre:{id}"),
            CacheKey::Genres => f.write_str("genres"),
            CacheKey::Book(id) => write!(f, "book:{id}"),
            CacheKey::Books => f.write_str("books"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_render_exact_strings() {
        assert_eq!(CacheKey::Author(1).to_string(), "author:1");
        assert_eq!(CacheKey::Authors.to_string(), "authors");
        assert_eq!(CacheKey::Genre(12).to_string(), "genre:12");
        assert_eq!(CacheKey::Genres.to_string(), "genres");
        assert_eq!(CacheKey::Book(42).to_string(), "book:42");
        assert_eq!(CacheKey::Books.to_string(), "books");
    }

    #[test]
    fn item_keys_map_to_their_collection() {
        assert_eq!(CacheKey::Author(3).collection(), CacheKey::Authors);
        assert_eq!(CacheKey::Genre(3).collection(), CacheKey::Genres);
        assert_eq!(CacheKey::Book(3).collection(), CacheKey::Books);
        assert_eq!(CacheKey::Books.collection(), CacheKey::Books);
    }
}
