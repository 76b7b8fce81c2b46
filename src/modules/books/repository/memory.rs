use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{BookRepository, BookRepositoryError};
use crate::modules::books::models::Book;

/// Process-local repository used for the `memory` backend and in tests.
#[derive(Default)]
pub struct InMemoryBookRepository {
    books: RwLock<HashMap<String, Book>>,
}

impl InMemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepository for InMemoryBookRepository {
    async fn find_all(&self) -> Result<Vec<Book>, BookRepositoryError> {
        let mut books: Vec<Book> = self.books.read().await.values().cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.isbn.cmp(&b.isbn)));
        Ok(books)
    }

    async fn find_one(&self, isbn: &str) -> Result<Book, BookRepositoryError> {
        self.books
            .read()
            .await
            .get(isbn)
            .cloned()
            .ok_or_else(|| BookRepositoryError::NotFound(isbn.to_string()))
    }

    async fn create(&self, book: Book) -> Result<Book, BookRepositoryError> {
        let mut books = self.books.write().await;
        if books.contains_key(&book.isbn) {
            return Err(BookRepositoryError::Duplicate(book.isbn));
        }
        books.insert(book.isbn.clone(), book.clone());
        Ok(book)
    }

    async fn update(&self, isbn: &str, book: Book) -> Result<Book, BookRepositoryError> {
        let mut books = self.books.write().await;
        let stored = books
            .get_mut(isbn)
            .ok_or_else(|| BookRepositoryError::NotFound(isbn.to_string()))?;
        *stored = Book {
            isbn: isbn.to_string(),
            ..book
        };
        Ok(stored.clone())
    }

    async fn remove(&self, isbn: &str) -> Result<(), BookRepositoryError> {
        self.books
            .write()
            .await
            .remove(isbn)
            .map(|_| ())
            .ok_or_else(|| BookRepositoryError::NotFound(isbn.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(isbn: &str, title: &str) -> Book {
        Book {
            isbn: isbn.to_string(),
            amazon_url: format!("http://a.co/{}", isbn),
            author: "test".to_string(),
            language: "english".to_string(),
            pages: 100,
            publisher: "test".to_string(),
            title: title.to_string(),
            year: 2000,
        }
    }

    #[tokio::test]
    async fn find_all_orders_by_title() {
        let repo = InMemoryBookRepository::new();
        repo.create(book("2", "Zebra")).await.unwrap();
        repo.create(book("1", "Aardvark")).await.unwrap();

        let titles: Vec<String> = repo
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, vec!["Aardvark", "Zebra"]);
    }

    #[tokio::test]
    async fn duplicate_isbn_is_rejected() {
        let repo = InMemoryBookRepository::new();
        repo.create(book("dup", "First")).await.unwrap();

        let err = repo.create(book("dup", "Second")).await.unwrap_err();
        assert!(matches!(err, BookRepositoryError::Duplicate(isbn) if isbn == "dup"));
        assert_eq!(repo.find_one("dup").await.unwrap().title, "First");
    }

    #[tokio::test]
    async fn update_keeps_the_stored_isbn() {
        let repo = InMemoryBookRepository::new();
        repo.create(book("keep", "Before")).await.unwrap();

        let updated = repo.update("keep", book("other", "After")).await.unwrap();
        assert_eq!(updated.isbn, "keep");
        assert_eq!(updated.title, "After");
        assert!(matches!(
            repo.find_one("other").await,
            Err(BookRepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn missing_isbn_is_not_found_everywhere() {
        let repo = InMemoryBookRepository::new();

        assert!(matches!(
            repo.find_one("nope").await,
            Err(BookRepositoryError::NotFound(_))
        ));
        assert!(matches!(
            repo.update("nope", book("nope", "x")).await,
            Err(BookRepositoryError::NotFound(_))
        ));
        assert!(matches!(
            repo.remove("nope").await,
            Err(BookRepositoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn removed_isbn_can_be_created_again() {
        let repo = InMemoryBookRepository::new();
        repo.create(book("cycle", "One")).await.unwrap();
        repo.remove("cycle").await.unwrap();
        assert!(repo.find_all().await.unwrap().is_empty());

        repo.create(book("cycle", "Two")).await.unwrap();
        assert_eq!(repo.find_one("cycle").await.unwrap().title, "Two");
    }
}
