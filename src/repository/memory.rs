//! In-memory catalog and ledger
//!
//! Both traits are served from one mutex-guarded state, so a borrow's stock
//! check, decrement and ledger append happen under a single guard.

use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::{BooksRepository, BorrowsRepository};
use crate::{
    error::{AppError, AppResult},
    models::{
        derive_availability,
        enums::{BookSortField, SortDirection},
        Book, BookAggregate, BookChanges, BookFilter, BorrowRecord, NewBook, NewBorrow,
    },
};

#[derive(Debug, Default)]
struct MemoryState {
    books: HashMap<Uuid, Book>,
    isbn_index: HashMap<String, Uuid>,
    borrows: Vec<BorrowRecord>,
}

impl MemoryState {
    fn append(&mut self, borrow: &NewBorrow) -> BorrowRecord {
        tracing::info!(
            "Creating borrow record for {} copies of book {}",
            borrow.quantity,
            borrow.book_id
        );
        let now = Utc::now();
        let record = BorrowRecord {
            id: Uuid::new_v4(),
            book: borrow.book_id,
            quantity: borrow.quantity,
            due_date: borrow.due_date,
            created_at: now,
            updated_at: now,
        };
        self.borrows.push(record.clone());
        record
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }

    /// Number of ledger entries, orphaned ones included
    pub fn borrow_count(&self) -> AppResult<usize> {
        Ok(self.lock()?.borrows.len())
    }
}

fn compare_books(a: &Book, b: &Book, field: BookSortField) -> Ordering {
    match field {
        BookSortField::Title => a.title.cmp(&b.title),
        BookSortField::Author => a.author.cmp(&b.author),
        BookSortField::Genre => a.genre.as_code().cmp(b.genre.as_code()),
        BookSortField::Isbn => a.isbn.cmp(&b.isbn),
        BookSortField::Copies => a.copies.cmp(&b.copies),
        BookSortField::Available => a.available.cmp(&b.available),
        BookSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        BookSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
    .then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl BooksRepository for MemoryStore {
    async fn create(&self, book: &NewBook) -> AppResult<Book> {
        let mut state = self.lock()?;
        if state.isbn_index.contains_key(&book.isbn) {
            return Err(AppError::DuplicateKey {
                field: "isbn".to_string(),
                value: book.isbn.clone(),
            });
        }

        let now = Utc::now();
        let created = Book {
            id: Uuid::new_v4(),
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre,
            isbn: book.isbn.clone(),
            description: book.description.clone(),
            copies: book.copies,
            available: derive_availability(book.copies),
            created_at: now,
            updated_at: now,
        };
        state.isbn_index.insert(created.isbn.clone(), created.id);
        state.books.insert(created.id, created.clone());

        tracing::info!(
            "Book \"{}\" has been saved with {} copies",
            created.title,
            created.copies
        );
        Ok(created)
    }

    async fn find(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        let state = self.lock()?;
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|b| filter.genre.map_or(true, |g| b.genre == g))
            .cloned()
            .collect();

        books.sort_by(|a, b| {
            let ord = compare_books(a, b, filter.sort_by);
            match filter.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
        books.truncate(usize::try_from(filter.limit).unwrap_or(usize::MAX));
        Ok(books)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Book> {
        self.lock()?
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::book_not_found(id))
    }

    async fn get_many(&self, ids: &[Uuid]) -> AppResult<Vec<Book>> {
        let state = self.lock()?;
        Ok(ids.iter().filter_map(|id| state.books.get(id).cloned()).collect())
    }

    async fn update(&self, id: Uuid, changes: &BookChanges) -> AppResult<Book> {
        let mut state = self.lock()?;
        let mut book = state
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::book_not_found(id))?;

        if let Some(ref isbn) = changes.isbn {
            if state.isbn_index.get(isbn).is_some_and(|owner| *owner != id) {
                return Err(AppError::DuplicateKey {
                    field: "isbn".to_string(),
                    value: isbn.clone(),
                });
            }
        }

        let previous_isbn = book.isbn.clone();
        changes.apply_to(&mut book, Utc::now());
        if previous_isbn != book.isbn {
            state.isbn_index.remove(&previous_isbn);
            state.isbn_index.insert(book.isbn.clone(), id);
        }
        state.books.insert(id, book.clone());

        tracing::info!(
            "Book \"{}\" has been saved with {} copies",
            book.title,
            book.copies
        );
        Ok(book)
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<Book> {
        let mut state = self.lock()?;
        let book = state
            .books
            .remove(&id)
            .ok_or_else(|| AppError::book_not_found(id))?;
        state.isbn_index.remove(&book.isbn);
        Ok(book)
    }
}

#[async_trait]
impl BorrowsRepository for MemoryStore {
    async fn append(&self, borrow: &NewBorrow) -> AppResult<BorrowRecord> {
        Ok(self.lock()?.append(borrow))
    }

    async fn borrow_with_stock(&self, borrow: &NewBorrow) -> AppResult<BorrowRecord> {
        let mut state = self.lock()?;

        let book = state
            .books
            .get_mut(&borrow.book_id)
            .ok_or_else(|| AppError::book_not_found(borrow.book_id))?;
        if book.copies < borrow.quantity {
            return Err(AppError::InsufficientStock {
                available: book.copies,
                requested: borrow.quantity,
            });
        }

        book.copies -= borrow.quantity;
        book.available = derive_availability(book.copies);
        book.updated_at = Utc::now();
        tracing::info!(
            book_id = %book.id,
            remaining = book.copies,
            "Book \"{}\" has been saved with {} copies",
            book.title,
            book.copies
        );

        Ok(state.append(borrow))
    }

    async fn aggregate_by_book(&self) -> AppResult<Vec<BookAggregate>> {
        let state = self.lock()?;
        let mut totals: HashMap<Uuid, i64> = HashMap::new();
        for record in &state.borrows {
            *totals.entry(record.book).or_default() += i64::from(record.quantity);
        }
        Ok(totals
            .into_iter()
            .map(|(book_id, total_quantity)| BookAggregate {
                book_id,
                total_quantity,
            })
            .collect())
    }
}
