//! Book catalog endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookPayload},
    AppState,
};

use super::{pagination, parse_id};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListQuery {
    /// Page number (default: 1)
    pub page: Option<i64>,
    /// Books per page (default: 10, max: 100)
    pub page_size: Option<i64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Substring to match against title, author and ISBN
    pub q: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// Paginated list response
#[derive(Serialize, ToSchema)]
pub struct BookListResponse {
    pub books: Vec<Book>,
    pub total_books: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// Paginated search response; echoes the query string
#[derive(Serialize, ToSchema)]
pub struct BookSearchResponse {
    pub books: Vec<Book>,
    pub total_books: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub query: String,
}

fn total_pages(total: i64, page_size: i64) -> i64 {
    (total + page_size - 1) / page_size
}

/// List books with pagination
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of books", body = BookListResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    query: Option<Query<ListQuery>>,
) -> AppResult<Json<BookListResponse>> {
    // Malformed pagination parameters fall back to the defaults rather
    // than failing the request.
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let (page, page_size) = pagination(query.page, query.page_size);

    let (books, total) = state.repository.books.list(page, page_size).await?;

    Ok(Json(BookListResponse {
        books,
        total_books: total,
        page,
        page_size,
        total_pages: total_pages(total, page_size),
    }))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 400, description = "Invalid book ID", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Book>> {
    let id = parse_id(&id)?;

    let book = state
        .repository
        .books
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

    Ok(Json(book))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = BookPayload,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid book data", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let Json(mut payload) =
        payload.map_err(|e| AppError::BadRequest(format!("Invalid book data: {}", e)))?;

    payload.format_isbn();
    let published = payload.validate()?;

    let book = state
        .repository
        .books
        .create(payload.title, payload.author, payload.isbn, published)
        .await?;

    Ok((StatusCode::CREATED, Json(book)))
}

/// Update an existing book (full replace of the mutable fields)
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    request_body = BookPayload,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid book data", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> AppResult<Json<Book>> {
    let id = parse_id(&id)?;

    let existing = state
        .repository
        .books
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

    let Json(mut payload) =
        payload.map_err(|e| AppError::BadRequest(format!("Invalid book data: {}", e)))?;

    // An empty submitted ISBN keeps the stored one.
    if payload.isbn.is_empty() {
        payload.isbn = existing.isbn.clone();
    }
    payload.format_isbn();
    let published = payload.validate()?;

    state
        .repository
        .books
        .update(id, &payload.title, &payload.author, &payload.isbn, published)
        .await?;

    // Return the post-update record as stored.
    let updated = state
        .repository
        .books
        .get(id)
        .await?
        .ok_or_else(|| AppError::Internal("updated book no longer exists".to_string()))?;

    Ok(Json(updated))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 400, description = "Invalid book ID", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id)?;
    state.repository.books.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Search books by title, author or ISBN substring
#[utoipa::path(
    get,
    path = "/api/books/search",
    tag = "books",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching books", body = BookSearchResponse),
        (status = 400, description = "Missing search query", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_books(
    State(state): State<AppState>,
    query: Option<Query<SearchQuery>>,
) -> AppResult<Json<BookSearchResponse>> {
    let query = query.map(|Query(q)| q).unwrap_or_default();

    let q = query
        .q
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::BadRequest("Search query is required".to_string()))?;

    let (page, page_size) = pagination(query.page, query.page_size);
    let (books, total) = state.repository.books.search(&q, page, page_size).await?;

    Ok(Json(BookSearchResponse {
        books,
        total_books: total,
        page,
        page_size,
        total_pages: total_pages(total, page_size),
        query: q,
    }))
}
