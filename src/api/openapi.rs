//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, borrow, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library Management API",
        version = "1.0.0",
        description = "Books catalog and borrow ledger REST API. Successful responses wrap the \
                       documented payload in `{success, message, data}`."
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Borrow
        borrow::borrow_book,
        borrow::borrowed_books_summary,
    ),
    components(
        schemas(
            // Books
            crate::models::Book,
            crate::models::Genre,
            crate::models::book::CreateBookRequest,
            crate::models::book::UpdateBookRequest,
            // Borrow
            crate::models::BorrowRecord,
            crate::models::BorrowSummary,
            crate::models::borrow::BorrowedBook,
            crate::models::borrow::CreateBorrowRequest,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
            crate::error::FieldViolation,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog management"),
        (name = "borrow", description = "Borrowing and borrowed books summary")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in ["/books", "/books/{id}", "/borrow", "/health", "/ready"] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {expected} in {paths:?}"
            );
        }
    }
}
