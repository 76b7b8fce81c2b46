//! Persistence seam for books, keyed by ISBN.

use std::sync::Arc;

use async_trait::async_trait;

use super::models::Book;

mod memory;
mod postgres;

pub use memory::InMemoryBookRepository;
pub use postgres::PostgresBookRepository;

#[derive(thiserror::Error, Debug)]
pub enum BookRepositoryError {
    #[error("book {0} not found")]
    NotFound(String),

    #[error("book {0} already exists")]
    Duplicate(String),

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage for book records. Each call is a single atomic statement against
/// the store; implementations hold no per-request state.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// All books, ordered by title
    async fn find_all(&self) -> Result<Vec<Book>, BookRepositoryError>;

    async fn find_one(&self, isbn: &str) -> Result<Book, BookRepositoryError>;

    /// Insert a new book; an existing isbn yields `Duplicate`
    async fn create(&self, book: Book) -> Result<Book, BookRepositoryError>;

    /// Replace every field of the book stored under `isbn`. The stored isbn
    /// is kept even if `book.isbn` differs.
    async fn update(&self, isbn: &str, book: Book) -> Result<Book, BookRepositoryError>;

    async fn remove(&self, isbn: &str) -> Result<(), BookRepositoryError>;
}

pub type SharedBookRepository = Arc<dyn BookRepository>;
