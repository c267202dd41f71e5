//! API handlers for the library REST endpoints

pub mod books;
pub mod borrow;
pub mod health;
pub mod openapi;

use std::{any::Any, time::Duration};

use axum::{
    async_trait,
    error_handling::HandleErrorLayer,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, OriginalUri, Path, Request},
    http::{request::Parts, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    BoxError, Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tower::{timeout::error::Elapsed, timeout::TimeoutLayer, ServiceBuilder};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{
    error::{AppError, ErrorResponse, FieldViolation},
    AppState,
};

/// Success envelope wrapping every payload
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: &str, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.to_string(),
            data,
        })
    }
}

/// JSON body extractor reporting malformed payloads as validation failures
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(body_rejected(rejection)),
        }
    }
}

fn body_rejected(rejection: JsonRejection) -> AppError {
    tracing::debug!("Rejected request body: {}", rejection.body_text());
    AppError::Validation(vec![FieldViolation::new("body", rejection.body_text())])
}

/// Book id taken from the `:id` path segment
pub struct BookId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for BookId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let invalid = || AppError::BadRequest("Invalid book ID".to_string());

        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| invalid())?;

        Uuid::parse_str(raw.trim())
            .map(BookId)
            .map_err(|_| invalid())
    }
}

/// Build the application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Ledger
        .route(
            "/borrow",
            get(borrow::borrowed_books_summary).post(borrow::borrow_book),
        )
        // Known path, unsupported method: same answer as an unknown route
        .method_not_allowed_fallback(route_not_found)
        .with_state(state);

    Router::new()
        .route("/", get(banner))
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .method_not_allowed_fallback(route_not_found)
        .fallback(route_not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .layer(TimeoutLayer::new(timeout)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Service banner listing the public endpoints
async fn banner() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "message": "Library Management System API is live!",
        "endpoints": {
            "books": {
                "POST /api/books": "Create a new book",
                "GET /api/books": "Get all books with filtering and sorting",
                "GET /api/books/:bookId": "Get book by ID",
                "PUT /api/books/:bookId": "Update book by ID",
                "DELETE /api/books/:bookId": "Delete book by ID",
            },
            "borrow": {
                "POST /api/borrow": "Borrow a book",
                "GET /api/borrow": "Get borrowed books summary",
            },
        },
    }))
}

async fn route_not_found(
    method: Method,
    OriginalUri(uri): OriginalUri,
) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            success: false,
            message: "Route not found".to_string(),
            error: Some(json!(format!("Cannot {} {}", method, uri))),
        }),
    )
}

async fn handle_timeout(err: BoxError) -> AppError {
    if err.is::<Elapsed>() {
        tracing::warn!("Request timed out");
        AppError::Timeout
    } else {
        AppError::Internal(format!("unhandled middleware error: {}", err))
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    AppError::Internal(format!("handler panicked: {}", detail)).into_response()
}
