//! Borrow endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::{borrow::CreateBorrowRequest, BorrowRecord, BorrowSummary},
    AppState,
};

use super::{ApiJson, ApiResponse};

/// Borrow copies of a book
#[utoipa::path(
    post,
    path = "/borrow",
    tag = "borrow",
    request_body = CreateBorrowRequest,
    responses(
        (status = 201, description = "Book borrowed successfully", body = BorrowRecord),
        (status = 400, description = "Validation failed or insufficient copies", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateBorrowRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<BorrowRecord>>)> {
    let record = state.services.borrows.borrow_book(request).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Book borrowed successfully", record),
    ))
}

/// Total borrowed quantity per book
#[utoipa::path(
    get,
    path = "/borrow",
    tag = "borrow",
    responses(
        (status = 200, description = "Borrowed books summary retrieved successfully", body = Vec<BorrowSummary>)
    )
)]
pub async fn borrowed_books_summary(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<BorrowSummary>>>> {
    let summary = state.services.borrows.summarize().await?;
    Ok(ApiResponse::ok(
        "Borrowed books summary retrieved successfully",
        summary,
    ))
}
