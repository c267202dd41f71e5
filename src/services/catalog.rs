//! Catalog management service

use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book::{BookQuery, CreateBookRequest, UpdateBookRequest},
        Book,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Validate and insert a new book
    pub async fn create_book(&self, request: CreateBookRequest) -> AppResult<Book> {
        let book = request.into_new_book()?;
        self.repository.books.create(&book).await
    }

    /// List books with genre filter, sorting and limit
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        match query.to_filter() {
            Some(filter) => self.repository.books.find(&filter).await,
            None => {
                tracing::debug!(filter = ?query.filter, "unknown genre filter, nothing to match");
                Ok(Vec::new())
            }
        }
    }

    pub async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Apply a partial update
    pub async fn update_book(&self, id: Uuid, request: UpdateBookRequest) -> AppResult<Book> {
        let changes = request.into_changes()?;
        if changes.is_empty() {
            return self.repository.books.get_by_id(id).await;
        }
        self.repository.books.update(id, &changes).await
    }

    /// Delete a book. Its borrow records are kept (see summary report).
    pub async fn delete_book(&self, id: Uuid) -> AppResult<()> {
        let book = self.repository.books.delete_by_id(id).await?;
        tracing::info!(book_id = %book.id, isbn = %book.isbn, "book deleted");
        Ok(())
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.repository.books.ping().await
    }
}
