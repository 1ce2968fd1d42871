//! Application services: cache-aside orchestration over the repositories.

pub mod authors;
pub mod books;
pub mod error;
pub mod genres;
pub mod repos;
