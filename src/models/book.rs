//! Book (catalog entry) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::enums::{BookSortField, Genre, SortDirection};
use crate::error::{AppError, AppResult, FieldViolation};

/// Number of books returned by a listing when no usable `limit` is given
pub const DEFAULT_LIST_LIMIT: i64 = 10;

/// A book is available iff at least one copy is on the shelf.
///
/// Every path that writes `copies` must store the result of this function
/// alongside it; `available` is never accepted from callers.
pub fn derive_availability(copies: i32) -> bool {
    copies > 0
}

/// Book as exposed by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: String,
    pub description: String,
    pub copies: i32,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `books` row; genre is stored as its text code.
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub isbn: String,
    pub description: String,
    pub copies: i32,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookRow> for Book {
    type Error = AppError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let genre = row
            .genre
            .parse::<Genre>()
            .map_err(|e| AppError::Internal(format!("book {}: {}", row.id, e)))?;
        Ok(Book {
            id: row.id,
            title: row.title,
            author: row.author,
            genre,
            isbn: row.isbn,
            description: row.description,
            copies: row.copies,
            available: row.available,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Validated input for inserting a book
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: Genre,
    pub isbn: String,
    pub description: String,
    pub copies: i32,
}

/// Validated partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<Genre>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub copies: Option<i32>,
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        *self == BookChanges::default()
    }

    /// Apply the changes to an in-memory copy, keeping `available` derived.
    pub fn apply_to(&self, book: &mut Book, now: DateTime<Utc>) {
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref author) = self.author {
            book.author = author.clone();
        }
        if let Some(genre) = self.genre {
            book.genre = genre;
        }
        if let Some(ref isbn) = self.isbn {
            book.isbn = isbn.clone();
        }
        if let Some(ref description) = self.description {
            book.description = description.clone();
        }
        if let Some(copies) = self.copies {
            book.copies = copies;
        }
        book.available = derive_availability(book.copies);
        book.updated_at = now;
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn known_genre(value: &str) -> Result<(), ValidationError> {
    value.parse::<Genre>().map(|_| ()).map_err(|_| {
        let mut err = ValidationError::new("genre");
        err.message = Some(
            "Genre must be one of: FICTION, NON_FICTION, SCIENCE, HISTORY, BIOGRAPHY, FANTASY"
                .into(),
        );
        err
    })
}

/// Fields missing after a successful `validate()` indicate a validator/struct mismatch.
fn present<T>(value: Option<T>, field: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::Validation(vec![FieldViolation::new(field, "Field is required")]))
}

/// Create book request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CreateBookRequest {
    #[validate(
        required(message = "Title is required"),
        custom(function = "not_blank", message = "Title is required")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "Author is required"),
        custom(function = "not_blank", message = "Author is required")
    )]
    pub author: Option<String>,
    #[validate(required(message = "Genre is required"), custom(function = "known_genre"))]
    #[schema(value_type = Genre)]
    pub genre: Option<String>,
    #[validate(
        required(message = "ISBN is required"),
        custom(function = "not_blank", message = "ISBN is required")
    )]
    pub isbn: Option<String>,
    pub description: Option<String>,
    #[validate(
        required(message = "Copies is required"),
        range(min = 0, max = 2147483647, message = "Copies must be a positive number")
    )]
    pub copies: Option<i64>,
    /// Ignored: availability is derived from `copies`
    pub available: Option<bool>,
}

impl CreateBookRequest {
    pub fn into_new_book(self) -> AppResult<NewBook> {
        self.validate()?;
        let genre = present(self.genre, "genre")?
            .parse::<Genre>()
            .map_err(|e| AppError::Validation(vec![FieldViolation::new("genre", e)]))?;
        Ok(NewBook {
            title: present(self.title, "title")?.trim().to_string(),
            author: present(self.author, "author")?.trim().to_string(),
            genre,
            isbn: present(self.isbn, "isbn")?.trim().to_string(),
            description: self.description.unwrap_or_default().trim().to_string(),
            copies: present(self.copies, "copies")? as i32,
        })
    }
}

/// Update book request (all fields optional)
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBookRequest {
    #[validate(custom(function = "not_blank", message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(custom(function = "not_blank", message = "Author cannot be empty"))]
    pub author: Option<String>,
    #[validate(custom(function = "known_genre"))]
    #[schema(value_type = Option<Genre>)]
    pub genre: Option<String>,
    #[validate(custom(function = "not_blank", message = "ISBN cannot be empty"))]
    pub isbn: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 2147483647, message = "Copies must be a positive number"))]
    pub copies: Option<i64>,
    /// Ignored: availability is derived from `copies`
    pub available: Option<bool>,
}

impl UpdateBookRequest {
    pub fn into_changes(self) -> AppResult<BookChanges> {
        self.validate()?;
        let genre = self
            .genre
            .map(|g| g.parse::<Genre>())
            .transpose()
            .map_err(|e| AppError::Validation(vec![FieldViolation::new("genre", e)]))?;
        Ok(BookChanges {
            title: self.title.map(|s| s.trim().to_string()),
            author: self.author.map(|s| s.trim().to_string()),
            genre,
            isbn: self.isbn.map(|s| s.trim().to_string()),
            description: self.description.map(|s| s.trim().to_string()),
            copies: self.copies.map(|c| c as i32),
        })
    }
}

/// Book listing query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Exact genre match
    pub filter: Option<String>,
    /// Field to sort by (default: createdAt)
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default: desc)
    pub sort: Option<String>,
    /// Maximum number of books (default: 10)
    pub limit: Option<String>,
}

/// Normalized listing parameters handed to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFilter {
    pub genre: Option<Genre>,
    pub sort_by: BookSortField,
    pub direction: SortDirection,
    pub limit: i64,
}

impl Default for BookFilter {
    fn default() -> Self {
        Self {
            genre: None,
            sort_by: BookSortField::default(),
            direction: SortDirection::default(),
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

impl BookQuery {
    /// Resolve raw query values. Returns `None` when `filter` names a genre
    /// that does not exist, since such a filter can never match.
    pub fn to_filter(&self) -> Option<BookFilter> {
        let genre = match self.filter.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(code) => Some(code.parse::<Genre>().ok()?),
        };
        Some(BookFilter {
            genre,
            sort_by: BookSortField::parse_lenient(self.sort_by.as_deref()),
            direction: SortDirection::parse_lenient(self.sort.as_deref()),
            limit: parse_limit(self.limit.as_deref()),
        })
    }
}

/// Coerce a caller-supplied limit to a positive integer.
///
/// Leading digits are honored (`"5abc"` is 5); anything else, zero or
/// negative falls back to [`DEFAULT_LIST_LIMIT`].
pub fn parse_limit(raw: Option<&str>) -> i64 {
    let Some(raw) = raw else {
        return DEFAULT_LIST_LIMIT;
    };
    let digits: String = raw.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    match digits.parse::<i64>() {
        Ok(n) if n > 0 => n,
        _ => DEFAULT_LIST_LIMIT,
    }
}
