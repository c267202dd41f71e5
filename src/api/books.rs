//! Catalog endpoints

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{BookQuery, CreateBookRequest, UpdateBookRequest},
        Book,
    },
    AppState,
};

use super::{ApiJson, ApiResponse, BookId};

/// List books with optional genre filter, sorting and limit
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookQuery),
    responses(
        (status = 200, description = "Books retrieved successfully", body = Vec<Book>),
        (status = 400, description = "Malformed query string", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    query: Result<Query<BookQuery>, QueryRejection>,
) -> AppResult<Json<ApiResponse<Vec<Book>>>> {
    let Query(query) = query.map_err(|rejection| {
        AppError::BadRequest(format!("Invalid query string: {}", rejection.body_text()))
    })?;
    let books = state.services.catalog.list_books(&query).await?;
    Ok(ApiResponse::ok("Books retrieved successfully", books))
}

/// Get a book by id
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book retrieved successfully", body = Book),
        (status = 400, description = "Invalid book ID", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    BookId(id): BookId,
) -> AppResult<Json<ApiResponse<Book>>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(ApiResponse::ok("Book retrieved successfully", book))
}

/// Create a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created successfully", body = Book),
        (status = 400, description = "Validation failed or ISBN already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateBookRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Book>>)> {
    let book = state.services.catalog.create_book(request).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Book created successfully", book),
    ))
}

/// Update a book (partial)
#[utoipa::path(
    put,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated successfully", body = Book),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    BookId(id): BookId,
    ApiJson(request): ApiJson<UpdateBookRequest>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let book = state.services.catalog.update_book(id, request).await?;
    Ok(ApiResponse::ok("Book updated successfully", book))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}",
    tag = "books",
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book deleted successfully"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    BookId(id): BookId,
) -> AppResult<Json<ApiResponse<()>>> {
    state.services.catalog.delete_book(id).await?;
    Ok(ApiResponse::ok("Book deleted successfully", ()))
}
