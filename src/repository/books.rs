//! Books repository for PostgreSQL

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::BooksRepository;
use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookRow, derive_availability, Book, BookChanges, BookFilter, NewBook,
    },
};

const BOOK_COLUMNS: &str = "id, title, author, genre, isbn, description, copies, available, \
                            created_at, updated_at";

/// Translate the isbn unique index violation into a domain error
fn isbn_conflict(e: sqlx::Error, isbn: &str) -> AppError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return AppError::DuplicateKey {
                field: "isbn".to_string(),
                value: isbn.to_string(),
            };
        }
    }
    AppError::Database(e)
}

#[derive(Clone)]
pub struct PgBooksRepository {
    pool: Pool<Postgres>,
}

impl PgBooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BooksRepository for PgBooksRepository {
    async fn create(&self, book: &NewBook) -> AppResult<Book> {
        let now = Utc::now();

        let row = sqlx::query_as::<_, BookRow>(&format!(
            r#"
            INSERT INTO books (id, title, author, genre, isbn, description, copies, available,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.genre.as_code())
        .bind(&book.isbn)
        .bind(&book.description)
        .bind(book.copies)
        .bind(derive_availability(book.copies))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| isbn_conflict(e, &book.isbn))?;

        tracing::info!(
            "Book \"{}\" has been saved with {} copies",
            row.title,
            row.copies
        );
        row.try_into()
    }

    async fn find(&self, filter: &BookFilter) -> AppResult<Vec<Book>> {
        // Column and direction come from closed enums, never from raw input
        let sql = format!(
            r#"
            SELECT {BOOK_COLUMNS}
            FROM books
            WHERE ($1::TEXT IS NULL OR genre = $1)
            ORDER BY {column} {dir}, id {dir}
            LIMIT $2
            "#,
            column = filter.sort_by.as_column(),
            dir = filter.direction.as_sql(),
        );

        let rows = sqlx::query_as::<_, BookRow>(&sql)
            .bind(filter.genre.map(|g| g.as_code()))
            .bind(filter.limit)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Book::try_from).collect()
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Book> {
        sqlx::query_as::<_, BookRow>(&format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::book_not_found(id))?
            .try_into()
    }

    async fn get_many(&self, ids: &[Uuid]) -> AppResult<Vec<Book>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Book::try_from).collect()
    }

    async fn update(&self, id: Uuid, changes: &BookChanges) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::book_not_found(id))?;

        let mut book = Book::try_from(current)?;
        changes.apply_to(&mut book, Utc::now());

        let row = sqlx::query_as::<_, BookRow>(&format!(
            r#"
            UPDATE books
            SET title = $2, author = $3, genre = $4, isbn = $5, description = $6,
                copies = $7, available = $8, updated_at = $9
            WHERE id = $1
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.genre.as_code())
        .bind(&book.isbn)
        .bind(&book.description)
        .bind(book.copies)
        .bind(book.available)
        .bind(book.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| isbn_conflict(e, &book.isbn))?;

        tx.commit().await?;

        tracing::info!(
            "Book \"{}\" has been saved with {} copies",
            row.title,
            row.copies
        );
        row.try_into()
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<Book> {
        sqlx::query_as::<_, BookRow>(&format!(
            "DELETE FROM books WHERE id = $1 RETURNING {BOOK_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::book_not_found(id))?
        .try_into()
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
