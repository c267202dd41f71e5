//! Borrow workflow and borrowed-books summary

use std::collections::HashMap;

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::{BorrowedBook, CreateBorrowRequest},
        BorrowRecord, BorrowSummary,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowsService {
    repository: Repository,
}

impl BorrowsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Borrow copies of a book.
    ///
    /// Validation and the stock pre-check fail fast without touching storage.
    /// The authoritative check is repeated by the repository inside the same
    /// atomic unit that decrements stock and writes the ledger entry.
    pub async fn borrow_book(&self, request: CreateBorrowRequest) -> AppResult<BorrowRecord> {
        let borrow = request.into_new_borrow()?;

        let book = self.repository.books.get_by_id(borrow.book_id).await?;
        if borrow.quantity > book.copies {
            return Err(AppError::InsufficientStock {
                available: book.copies,
                requested: borrow.quantity,
            });
        }

        let record = self.repository.borrows.borrow_with_stock(&borrow).await?;
        tracing::info!(
            borrow_id = %record.id,
            book_id = %record.book,
            quantity = record.quantity,
            due_date = %record.due_date,
            "book borrowed"
        );
        Ok(record)
    }

    /// Total borrowed quantity per book, most borrowed first.
    ///
    /// Ledger entries whose book was deleted are left out of the report.
    pub async fn summarize(&self) -> AppResult<Vec<BorrowSummary>> {
        let totals = self.repository.borrows.aggregate_by_book().await?;
        let ids: Vec<_> = totals.iter().map(|t| t.book_id).collect();
        let books: HashMap<_, _> = self
            .repository
            .books
            .get_many(&ids)
            .await?
            .into_iter()
            .map(|b| (b.id, b))
            .collect();

        let orphaned = totals.len() - books.len();
        if orphaned > 0 {
            tracing::debug!(orphaned, "skipping ledger entries of deleted books");
        }

        let mut summary: Vec<BorrowSummary> = totals
            .into_iter()
            .filter_map(|total| {
                books.get(&total.book_id).map(|book| BorrowSummary {
                    book: BorrowedBook {
                        title: book.title.clone(),
                        isbn: book.isbn.clone(),
                    },
                    total_quantity: total.total_quantity,
                })
            })
            .collect();

        summary.sort_by(|a, b| {
            b.total_quantity
                .cmp(&a.total_quantity)
                .then_with(|| a.book.title.cmp(&b.book.title))
        });
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{book::CreateBookRequest, Book, NewBorrow},
        services::catalog::CatalogService,
    };
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    struct Fixture {
        repository: Repository,
        catalog: CatalogService,
        borrows: BorrowsService,
    }

    fn fixture() -> Fixture {
        let repository = Repository::in_memory();
        Fixture {
            catalog: CatalogService::new(repository.clone()),
            borrows: BorrowsService::new(repository.clone()),
            repository,
        }
    }

    impl Fixture {
        async fn book(&self, isbn: &str, copies: i64) -> Book {
            self.catalog
                .create_book(CreateBookRequest {
                    title: Some(format!("Title {isbn}")),
                    author: Some("Author".into()),
                    genre: Some("SCIENCE".into()),
                    isbn: Some(isbn.into()),
                    description: None,
                    copies: Some(copies),
                    available: None,
                })
                .await
                .unwrap()
        }

        async fn ledger_size(&self) -> i64 {
            self.repository
                .borrows
                .aggregate_by_book()
                .await
                .unwrap()
                .iter()
                .map(|t| t.total_quantity)
                .sum()
        }
    }

    fn request(book: Uuid, quantity: i64) -> CreateBorrowRequest {
        CreateBorrowRequest {
            book: Some(book.to_string()),
            quantity: Some(quantity),
            due_date: Some((Utc::now() + Duration::days(14)).to_rfc3339()),
        }
    }

    #[tokio::test]
    async fn borrowing_decrements_stock_and_records_once() {
        let f = fixture();
        let book = f.book("1", 5).await;

        let record = f.borrows.borrow_book(request(book.id, 3)).await.unwrap();
        assert_eq!(record.book, book.id);
        assert_eq!(record.quantity, 3);

        let after = f.catalog.get_book(book.id).await.unwrap();
        assert_eq!(after.copies, 2);
        assert!(after.available);
        assert_eq!(f.ledger_size().await, 3);
    }

    #[tokio::test]
    async fn borrowing_last_copies_marks_unavailable() {
        let f = fixture();
        let book = f.book("1", 2).await;

        f.borrows.borrow_book(request(book.id, 2)).await.unwrap();

        let after = f.catalog.get_book(book.id).await.unwrap();
        assert_eq!(after.copies, 0);
        assert!(!after.available);
    }

    #[tokio::test]
    async fn over_borrowing_changes_nothing() {
        let f = fixture();
        let book = f.book("1", 2).await;

        let err = f.borrows.borrow_book(request(book.id, 3)).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock {
                available: 2,
                requested: 3
            }
        ));
        assert_eq!(f.catalog.get_book(book.id).await.unwrap(), book);
        assert_eq!(f.ledger_size().await, 0);
    }

    #[tokio::test]
    async fn past_due_date_is_rejected_without_side_effects() {
        let f = fixture();
        let book = f.book("1", 2).await;

        let mut req = request(book.id, 1);
        req.due_date = Some((Utc::now() - Duration::minutes(1)).to_rfc3339());

        let err = f.borrows.borrow_book(req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(f.catalog.get_book(book.id).await.unwrap().copies, 2);
        assert_eq!(f.ledger_size().await, 0);
    }

    #[tokio::test]
    async fn unknown_book_is_not_found() {
        let f = fixture();
        let err = f
            .borrows
            .borrow_book(request(Uuid::new_v4(), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        assert_eq!(f.ledger_size().await, 0);
    }

    #[tokio::test]
    async fn summary_totals_repeated_borrows() {
        let f = fixture();
        let popular = f.book("1", 10).await;
        let niche = f.book("2", 10).await;

        f.borrows.borrow_book(request(popular.id, 3)).await.unwrap();
        f.borrows.borrow_book(request(niche.id, 1)).await.unwrap();
        f.borrows.borrow_book(request(popular.id, 2)).await.unwrap();

        let summary = f.borrows.summarize().await.unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].book.isbn, "1");
        assert_eq!(summary[0].book.title, "Title 1");
        assert_eq!(summary[0].total_quantity, 5);
        assert_eq!(summary[1].total_quantity, 1);
    }

    #[tokio::test]
    async fn deleted_books_drop_out_of_summary_but_keep_records() {
        let f = fixture();
        let kept = f.book("1", 5).await;
        let gone = f.book("2", 5).await;

        f.borrows.borrow_book(request(kept.id, 1)).await.unwrap();
        f.borrows.borrow_book(request(gone.id, 4)).await.unwrap();
        f.catalog.delete_book(gone.id).await.unwrap();

        // The ledger still holds both entries
        assert_eq!(f.ledger_size().await, 5);

        let summary = f.borrows.summarize().await.unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].book.isbn, "1");
    }

    #[tokio::test]
    async fn summary_is_empty_without_borrows() {
        let f = fixture();
        f.book("1", 5).await;
        assert!(f.borrows.summarize().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_full_borrows_succeed_at_most_once() {
        let f = fixture();
        let copies = 4;
        let book = f.book("1", i64::from(copies)).await;

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let borrows = f.borrows.clone();
                let req = request(book.id, i64::from(copies));
                tokio::spawn(async move { borrows.borrow_book(req).await })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(AppError::InsufficientStock { requested, .. }) => {
                    assert_eq!(requested, copies)
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(succeeded, 1);
        let after = f.catalog.get_book(book.id).await.unwrap();
        assert_eq!(after.copies, 0);
        assert!(!after.available);
        assert_eq!(f.ledger_size().await, i64::from(copies));
    }

    #[tokio::test]
    async fn atomic_borrow_rechecks_stale_stock() {
        let f = fixture();
        let book = f.book("1", 3).await;

        // Another request drains stock between the pre-check and the commit
        f.repository
            .books
            .update(
                book.id,
                &crate::models::BookChanges {
                    copies: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stale = NewBorrow {
            book_id: book.id,
            quantity: 3,
            due_date: Utc::now() + Duration::days(1),
        };
        let err = f
            .repository
            .borrows
            .borrow_with_stock(&stale)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock {
                available: 1,
                requested: 3
            }
        ));
        assert_eq!(f.ledger_size().await, 0);
    }
}
