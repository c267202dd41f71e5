//! Borrows (ledger) repository for PostgreSQL

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::BorrowsRepository;
use crate::{
    error::{AppError, AppResult},
    models::{derive_availability, BookAggregate, BorrowRecord, NewBorrow},
};

const BORROW_COLUMNS: &str = "id, book_id, quantity, due_date, created_at, updated_at";

#[derive(Clone)]
pub struct PgBorrowsRepository {
    pool: Pool<Postgres>,
}

impl PgBorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn insert<'e, E>(executor: E, borrow: &NewBorrow) -> AppResult<BorrowRecord>
    where
        E: sqlx::PgExecutor<'e>,
    {
        tracing::info!(
            "Creating borrow record for {} copies of book {}",
            borrow.quantity,
            borrow.book_id
        );

        let now = Utc::now();
        let record = sqlx::query_as::<_, BorrowRecord>(&format!(
            r#"
            INSERT INTO borrows (id, book_id, quantity, due_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {BORROW_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(borrow.book_id)
        .bind(borrow.quantity)
        .bind(borrow.due_date)
        .bind(now)
        .fetch_one(executor)
        .await?;

        Ok(record)
    }
}

#[async_trait]
impl BorrowsRepository for PgBorrowsRepository {
    async fn append(&self, borrow: &NewBorrow) -> AppResult<BorrowRecord> {
        Self::insert(&self.pool, borrow).await
    }

    async fn borrow_with_stock(&self, borrow: &NewBorrow) -> AppResult<BorrowRecord> {
        let mut tx = self.pool.begin().await?;

        // Conditional decrement: the row lock taken here is held until commit,
        // so concurrent borrows of the same book serialize on it.
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE books
            SET copies = copies - $2, updated_at = $3
            WHERE id = $1 AND copies >= $2
            RETURNING copies
            "#,
        )
        .bind(borrow.book_id)
        .bind(borrow.quantity)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(remaining) = remaining else {
            let current: Option<i32> =
                sqlx::query_scalar("SELECT copies FROM books WHERE id = $1")
                    .bind(borrow.book_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            tx.rollback().await?;

            return Err(match current {
                None => AppError::book_not_found(borrow.book_id),
                Some(available) => AppError::InsufficientStock {
                    available,
                    requested: borrow.quantity,
                },
            });
        };

        sqlx::query("UPDATE books SET available = $2 WHERE id = $1")
            .bind(borrow.book_id)
            .bind(derive_availability(remaining))
            .execute(&mut *tx)
            .await?;

        let record = Self::insert(&mut *tx, borrow).await?;

        tx.commit().await?;

        tracing::info!(
            book_id = %borrow.book_id,
            remaining,
            "Book has been saved with {} copies",
            remaining
        );
        Ok(record)
    }

    async fn aggregate_by_book(&self) -> AppResult<Vec<BookAggregate>> {
        let rows = sqlx::query_as::<_, BookAggregate>(
            r#"
            SELECT book_id, SUM(quantity)::BIGINT AS total_quantity
            FROM borrows
            GROUP BY book_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
