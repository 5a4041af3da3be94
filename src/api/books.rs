//! Book catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{error::AppResult, models::Book, AppState};

/// Author filter for the book listing
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorQuery {
    /// Exact author name; omit to list every book
    pub author: Option<String>,
}

/// Get a book by ISBN
#[utoipa::path(
    get,
    path = "/api/books/{isbn}",
    tag = "books",
    params(
        ("isbn" = String, Path, description = "Book ISBN")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(isbn): Path<String>,
) -> AppResult<Json<Book>> {
    let book = state.services.library.find_book_by_isbn(&isbn).await?;
    Ok(Json(book))
}

/// List books by author
#[utoipa::path(
    get,
    path = "/api/books",
    tag = "books",
    params(AuthorQuery),
    responses(
        (status = 200, description = "Books by the given author", body = Vec<Book>)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<AuthorQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state
        .services
        .library
        .find_books_by_author(query.author.as_deref())
        .await?;
    Ok(Json(books))
}

/// Add a new book
#[utoipa::path(
    post,
    path = "/api/books",
    tag = "books",
    request_body = Book,
    responses(
        (status = 200, description = "Book added", body = Book),
        (status = 400, description = "A book with this ISBN already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_book(
    State(state): State<AppState>,
    Json(book): Json<Book>,
) -> AppResult<Json<Book>> {
    let added = state.services.library.add_book(book).await?;
    Ok(Json(added))
}

/// Remove a book by ISBN
#[utoipa::path(
    delete,
    path = "/api/books/{isbn}",
    tag = "books",
    params(
        ("isbn" = String, Path, description = "Book ISBN")
    ),
    responses(
        (status = 200, description = "Book removed"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn remove_book(
    State(state): State<AppState>,
    Path(isbn): Path<String>,
) -> AppResult<StatusCode> {
    state.services.library.remove_book(&isbn).await?;
    Ok(StatusCode::OK)
}

/// Borrow one copy of a book
#[utoipa::path(
    put,
    path = "/api/books/borrow/{isbn}",
    tag = "books",
    params(
        ("isbn" = String, Path, description = "Book ISBN")
    ),
    responses(
        (status = 200, description = "Book borrowed, one copy fewer available", body = Book),
        (status = 400, description = "No copies available", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    Path(isbn): Path<String>,
) -> AppResult<Json<Book>> {
    let book = state.services.library.borrow_book(&isbn).await?;
    Ok(Json(book))
}

/// Return one copy of a book
#[utoipa::path(
    put,
    path = "/api/books/return/{isbn}",
    tag = "books",
    params(
        ("isbn" = String, Path, description = "Book ISBN")
    ),
    responses(
        (status = 200, description = "Book returned, one copy more available", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    Path(isbn): Path<String>,
) -> AppResult<Json<Book>> {
    let book = state.services.library.return_book(&isbn).await?;
    Ok(Json(book))
}
