use async_trait::async_trait;
use sqlx::PgPool;

use super::{BookRepository, BookRepositoryError};
use crate::modules::books::models::Book;

pub struct PostgresBookRepository {
    pool: PgPool,
}

impl PostgresBookRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookRow {
    isbn: String,
    amazon_url: String,
    author: String,
    language: String,
    pages: i32,
    publisher: String,
    title: String,
    year: i32,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Book {
            isbn: row.isbn,
            amazon_url: row.amazon_url,
            author: row.author,
            language: row.language,
            pages: row.pages,
            publisher: row.publisher,
            title: row.title,
            year: row.year,
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

#[async_trait]
impl BookRepository for PostgresBookRepository {
    async fn find_all(&self) -> Result<Vec<Book>, BookRepositoryError> {
        let rows = sqlx::query_as::<_, BookRow>(
            // language=postgresql
            r#"
            SELECT isbn, amazon_url, author, language, pages, publisher, title, year
            FROM books
            ORDER BY title, isbn
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Book::from).collect())
    }

    async fn find_one(&self, isbn: &str) -> Result<Book, BookRepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(
            // language=postgresql
            r#"
            SELECT isbn, amazon_url, author, language, pages, publisher, title, year
            FROM books
            WHERE isbn = $1
            "#,
        )
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Book::from)
            .ok_or_else(|| BookRepositoryError::NotFound(isbn.to_string()))
    }

    async fn create(&self, book: Book) -> Result<Book, BookRepositoryError> {
        let result = sqlx::query_as::<_, BookRow>(
            // language=postgresql
            r#"
            INSERT INTO books (isbn, amazon_url, author, language, pages, publisher, title, year)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING isbn, amazon_url, author, language, pages, publisher, title, year
            "#,
        )
        .bind(&book.isbn)
        .bind(&book.amazon_url)
        .bind(&book.author)
        .bind(&book.language)
        .bind(book.pages)
        .bind(&book.publisher)
        .bind(&book.title)
        .bind(book.year)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.into()),
            Err(err) if is_unique_violation(&err) => Err(BookRepositoryError::Duplicate(book.isbn)),
            Err(err) => Err(err.into()),
        }
    }

    async fn update(&self, isbn: &str, book: Book) -> Result<Book, BookRepositoryError> {
        let row = sqlx::query_as::<_, BookRow>(
            // language=postgresql
            r#"
            UPDATE books
            SET amazon_url = $2, author = $3, language = $4, pages = $5,
                publisher = $6, title = $7, year = $8
            WHERE isbn = $1
            RETURNING isbn, amazon_url, author, language, pages, publisher, title, year
            "#,
        )
        .bind(isbn)
        .bind(&book.amazon_url)
        .bind(&book.author)
        .bind(&book.language)
        .bind(book.pages)
        .bind(&book.publisher)
        .bind(&book.title)
        .bind(book.year)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Book::from)
            .ok_or_else(|| BookRepositoryError::NotFound(isbn.to_string()))
    }

    async fn remove(&self, isbn: &str) -> Result<(), BookRepositoryError> {
        let result = sqlx::query(
            // language=postgresql
            r#"
            DELETE FROM books
            WHERE isbn = $1
            "#,
        )
        .bind(isbn)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BookRepositoryError::NotFound(isbn.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bookshelf_kernel::{settings::DatabaseSettings, Module};
    use tokio::sync::Mutex;

    use super::*;
    use crate::modules::books::{repository::InMemoryBookRepository, BooksModule};

    // Concurrent first runs would race on CREATE TABLE.
    static SCHEMA: Mutex<()> = Mutex::const_new(());

    async fn repository(prefix: &str) -> anyhow::Result<PostgresBookRepository> {
        let mut settings = DatabaseSettings::default();
        if let Ok(url) = std::env::var("DATABASE_URL") {
            settings.url = url;
        }
        let pool = bookshelf_db::connect(&settings).await?;

        let module = BooksModule::new(Arc::new(InMemoryBookRepository::new()));
        let migrations: Vec<_> = module
            .migrations()
            .into_iter()
            .map(|m| (module.name().to_string(), m))
            .collect();
        {
            let _guard = SCHEMA.lock().await;
            bookshelf_db::apply_migrations(&pool, &migrations).await?;
        }

        sqlx::query("DELETE FROM books WHERE isbn LIKE $1")
            .bind(format!("{}%", prefix))
            .execute(&pool)
            .await?;
        Ok(PostgresBookRepository::new(pool))
    }

    fn book(isbn: &str, title: &str) -> Book {
        Book {
            isbn: isbn.to_string(),
            amazon_url: format!("http://a.co/{}", isbn),
            author: "test".to_string(),
            language: "test".to_string(),
            pages: 100,
            publisher: "test".to_string(),
            title: title.to_string(),
            year: 2000,
        }
    }

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn duplicate_create_is_rejected() -> anyhow::Result<()> {
        let repo = repository("pg-dup-").await?;
        let original = book("pg-dup-1", "first");

        assert_eq!(repo.create(original.clone()).await?, original);

        let err = repo.create(book("pg-dup-1", "second")).await.unwrap_err();
        assert!(matches!(err, BookRepositoryError::Duplicate(isbn) if isbn == "pg-dup-1"));
        assert_eq!(repo.find_one("pg-dup-1").await?, original);
        Ok(())
    }

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn update_keeps_stored_isbn() -> anyhow::Result<()> {
        let repo = repository("pg-upd-").await?;
        repo.create(book("pg-upd-1", "before")).await?;

        let updated = repo.update("pg-upd-1", book("pg-upd-other", "after")).await?;

        assert_eq!(updated.isbn, "pg-upd-1");
        assert_eq!(updated.title, "after");
        assert_eq!(repo.find_one("pg-upd-1").await?, updated);
        assert!(matches!(
            repo.find_one("pg-upd-other").await,
            Err(BookRepositoryError::NotFound(_))
        ));
        Ok(())
    }

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn update_of_missing_book_is_not_found() -> anyhow::Result<()> {
        let repo = repository("pg-miss-").await?;

        let err = repo.update("pg-miss-1", book("pg-miss-1", "x")).await.unwrap_err();
        assert!(matches!(err, BookRepositoryError::NotFound(isbn) if isbn == "pg-miss-1"));
        Ok(())
    }

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn second_remove_is_not_found() -> anyhow::Result<()> {
        let repo = repository("pg-del-").await?;
        repo.create(book("pg-del-1", "gone")).await?;

        repo.remove("pg-del-1").await?;

        assert!(matches!(
            repo.remove("pg-del-1").await,
            Err(BookRepositoryError::NotFound(_))
        ));
        assert!(matches!(
            repo.find_one("pg-del-1").await,
            Err(BookRepositoryError::NotFound(_))
        ));
        Ok(())
    }

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn find_all_orders_by_title_then_isbn() -> anyhow::Result<()> {
        let repo = repository("pg-ord-").await?;
        repo.create(book("pg-ord-3", "pg-ord beta")).await?;
        repo.create(book("pg-ord-2", "pg-ord alpha")).await?;
        repo.create(book("pg-ord-1", "pg-ord beta")).await?;

        let isbns: Vec<String> = repo
            .find_all()
            .await?
            .into_iter()
            .filter(|b| b.isbn.starts_with("pg-ord-"))
            .map(|b| b.isbn)
            .collect();

        assert_eq!(isbns, vec!["pg-ord-2", "pg-ord-1", "pg-ord-3"]);
        Ok(())
    }
}
