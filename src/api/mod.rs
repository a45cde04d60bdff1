//! API handlers and router for the Bookshelf REST endpoints

pub mod books;
pub mod health;
pub mod openapi;

use axum::{
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    error::{AppError, AppResult},
    AppState,
};

/// Build the application router with all routes and middleware.
///
/// Book routes are exposed both at `/books` and `/api/books`; the id is
/// always the trailing path segment. Axum handles unmatched paths (404) and
/// unmatched methods (405 with an `Allow` header); the CORS layer answers
/// `OPTIONS` preflight requests before any handler runs.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route("/api/books", get(books::list_books).post(books::create_book))
        .route("/api/books/search", get(books::search_books))
        .route(
            "/api/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Parse a book id from its trailing path segment.
fn parse_id(raw: &str) -> AppResult<i64> {
    raw.parse()
        .map_err(|_| AppError::BadRequest("Invalid book ID".to_string()))
}

/// Resolve pagination controls: `page < 1` falls back to 1, `page_size`
/// outside `[1, 100]` falls back to 10.
fn pagination(page: Option<i64>, page_size: Option<i64>) -> (i64, i64) {
    let page = match page {
        Some(p) if p >= 1 => p,
        _ => 1,
    };
    let page_size = match page_size {
        Some(s) if (1..=100).contains(&s) => s,
        _ => 10,
    };
    (page, page_size)
}
