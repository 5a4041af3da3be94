//! Book model and its persisted row

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Book as exchanged with API clients and held in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// ISBN, unique identifier of the book
    #[validate(length(min = 1, message = "ISBN must not be empty"))]
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publication_year: i32,
    /// Number of copies currently on the shelf
    pub available_copies: i32,
}

impl Book {
    pub fn new(
        isbn: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        publication_year: i32,
        available_copies: i32,
    ) -> Self {
        Self {
            isbn: isbn.into(),
            title: title.into(),
            author: author.into(),
            publication_year,
            available_copies,
        }
    }
}

/// Book row from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct BookEntity {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publication_year: i32,
    pub available_copies: i32,
}

impl From<Book> for BookEntity {
    fn from(book: Book) -> Self {
        Self {
            isbn: book.isbn,
            title: book.title,
            author: book.author,
            publication_year: book.publication_year,
            available_copies: book.available_copies,
        }
    }
}

impl From<BookEntity> for Book {
    fn from(entity: BookEntity) -> Self {
        Self {
            isbn: entity.isbn,
            title: entity.title,
            author: entity.author,
            publication_year: entity.publication_year,
            available_copies: entity.available_copies,
        }
    }
}

/// Convert a batch of rows into wire books, keeping their order
pub fn to_books(entities: Vec<BookEntity>) -> Vec<Book> {
    entities.into_iter().map(Book::from).collect()
}
