//! Repository layer for catalog and ledger storage
//!
//! Services only see the [`BooksRepository`] and [`BorrowsRepository`]
//! traits. Two backends implement them: PostgreSQL for deployments and an
//! in-memory store for local runs and tests.

pub mod books;
pub mod borrows;
pub mod memory;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{BookAggregate, BookChanges, BookFilter, Book, BorrowRecord, NewBook, NewBorrow},
};

/// Catalog storage
#[async_trait]
pub trait BooksRepository: Send + Sync {
    /// Insert a book; `available` is derived from `copies`.
    /// Fails with `DuplicateKey` when the isbn is taken.
    async fn create(&self, book: &NewBook) -> AppResult<Book>;

    /// List books matching the filter, sorted and limited
    async fn find(&self, filter: &BookFilter) -> AppResult<Vec<Book>>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<Book>;

    /// Fetch the subset of `ids` that still exist, in no particular order
    async fn get_many(&self, ids: &[Uuid]) -> AppResult<Vec<Book>>;

    /// Apply a partial update and re-derive `available`
    async fn update(&self, id: Uuid, changes: &BookChanges) -> AppResult<Book>;

    /// Remove a book and return it. Borrow records are left in place.
    async fn delete_by_id(&self, id: Uuid) -> AppResult<Book>;

    /// Cheap round trip used by the readiness probe
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Ledger storage
#[async_trait]
pub trait BorrowsRepository: Send + Sync {
    /// Write a ledger entry without any stock or reference check.
    ///
    /// Not used by the borrow workflow, which goes through
    /// [`BorrowsRepository::borrow_with_stock`]; kept for importing or
    /// replaying ledger entries as-is.
    async fn append(&self, borrow: &NewBorrow) -> AppResult<BorrowRecord>;

    /// Decrement stock and append the ledger entry as one atomic unit.
    ///
    /// The decrement only happens when `copies >= quantity` at commit time;
    /// otherwise nothing is written and `InsufficientStock` (or `NotFound`
    /// when the book is gone) is returned.
    async fn borrow_with_stock(&self, borrow: &NewBorrow) -> AppResult<BorrowRecord>;

    /// Total borrowed quantity per book id over the whole ledger
    async fn aggregate_by_book(&self) -> AppResult<Vec<BookAggregate>>;
}

/// Main repository struct holding the storage backends
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BooksRepository>,
    pub borrows: Arc<dyn BorrowsRepository>,
}

impl Repository {
    /// Create a repository backed by the given PostgreSQL pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::PgBooksRepository::new(pool.clone())),
            borrows: Arc::new(borrows::PgBorrowsRepository::new(pool)),
        }
    }

    /// Create a repository whose catalog and ledger share one in-memory store
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::new();
        Self {
            books: Arc::new(store.clone()),
            borrows: Arc::new(store),
        }
    }
}
