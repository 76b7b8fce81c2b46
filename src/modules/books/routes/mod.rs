//! HTTP handlers for the books resource.
//!
//! Write paths validate the raw JSON body before touching the repository, so
//! a malformed payload is rejected with 400 even when the isbn does not exist.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use bookshelf_http::error::AppError;
use serde_json::{json, Value};

use super::models::{Book, BookEnvelope, BookList, MessageBody};
use super::repository::{BookRepositoryError, SharedBookRepository};
use super::validation::{self, Violation, BOOK_SCHEMA};

const MODULE: &str = "books";

impl From<BookRepositoryError> for AppError {
    fn from(err: BookRepositoryError) -> Self {
        match err {
            BookRepositoryError::NotFound(isbn) => {
                AppError::not_found(format!("no book with isbn '{}'", isbn))
            }
            BookRepositoryError::Duplicate(isbn) => AppError::conflict(
                vec![json!({"field": "isbn", "error": "already exists"})],
                format!("a book with isbn '{}' already exists", isbn),
            ),
            BookRepositoryError::Database(e) => {
                AppError::Internal(anyhow::Error::new(e).context("book repository failure"))
            }
        }
    }
}

/// Turn a raw request body into a [`Book`], rejecting anything off-schema.
fn parse_book(payload: Result<Json<Value>, JsonRejection>) -> Result<Book, AppError> {
    let Json(value) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let violations = validation::validate(&value, BOOK_SCHEMA);
    if !violations.is_empty() {
        tracing::debug!(
            module = MODULE,
            violations = violations.len(),
            "book payload rejected"
        );
        return Err(AppError::validation(
            violations.iter().map(Violation::to_detail).collect(),
            "book payload failed validation",
        ));
    }

    serde_json::from_value(value).map_err(|e| AppError::bad_request(e.to_string()))
}

/// List every book
#[utoipa::path(
    get,
    path = "/",
    tag = "Books",
    responses(
        (status = 200, description = "All books ordered by title", body = BookList),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_books(
    State(books): State<SharedBookRepository>,
) -> Result<Json<BookList>, AppError> {
    let books = books.find_all().await?;
    Ok(Json(BookList { books }))
}

/// Create a book from a complete payload
#[utoipa::path(
    post,
    path = "/",
    tag = "Books",
    request_body = Book,
    responses(
        (status = 201, description = "Book created", body = BookEnvelope),
        (status = 400, description = "Payload failed validation"),
        (status = 409, description = "A book with this isbn already exists")
    )
)]
pub async fn create_book(
    State(books): State<SharedBookRepository>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<BookEnvelope>), AppError> {
    let book = parse_book(payload)?;
    let book = books.create(book).await?;

    tracing::info!(module = MODULE, isbn = %book.isbn, "book created");
    Ok((StatusCode::CREATED, Json(BookEnvelope { book })))
}

/// Fetch one book by isbn
#[utoipa::path(
    get,
    path = "/{isbn}",
    tag = "Books",
    params(("isbn" = String, Path, description = "ISBN of the book")),
    responses(
        (status = 200, description = "The book", body = BookEnvelope),
        (status = 404, description = "No book with this isbn")
    )
)]
pub async fn get_book(
    State(books): State<SharedBookRepository>,
    Path(isbn): Path<String>,
) -> Result<Json<BookEnvelope>, AppError> {
    let book = books.find_one(&isbn).await?;
    Ok(Json(BookEnvelope { book }))
}

/// Replace every field of a book; the isbn in the path wins
#[utoipa::path(
    put,
    path = "/{isbn}",
    tag = "Books",
    params(("isbn" = String, Path, description = "ISBN of the book")),
    request_body = Book,
    responses(
        (status = 200, description = "Book updated", body = BookEnvelope),
        (status = 400, description = "Payload failed validation"),
        (status = 404, description = "No book with this isbn")
    )
)]
pub async fn update_book(
    State(books): State<SharedBookRepository>,
    Path(isbn): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<BookEnvelope>, AppError> {
    let book = parse_book(payload)?;
    if book.isbn != isbn {
        tracing::debug!(module = MODULE, %isbn, body_isbn = %book.isbn, "ignoring isbn in update body");
    }

    let book = books.update(&isbn, book).await?;

    tracing::info!(module = MODULE, isbn = %book.isbn, "book updated");
    Ok(Json(BookEnvelope { book }))
}

/// Delete a book by isbn
#[utoipa::path(
    delete,
    path = "/{isbn}",
    tag = "Books",
    params(("isbn" = String, Path, description = "ISBN of the book")),
    responses(
        (status = 200, description = "Book deleted", body = MessageBody),
        (status = 404, description = "No book with this isbn")
    )
)]
pub async fn delete_book(
    State(books): State<SharedBookRepository>,
    Path(isbn): Path<String>,
) -> Result<Json<MessageBody>, AppError> {
    books.remove(&isbn).await?;

    tracing::info!(module = MODULE, %isbn, "book deleted");
    Ok(Json(MessageBody::new("Book deleted")))
}
