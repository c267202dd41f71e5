//! Borrow (ledger) model and related types

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult, FieldViolation};

/// Ledger entry, immutable once written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRecord {
    pub id: Uuid,
    /// Borrowed book id
    #[sqlx(rename = "book_id")]
    pub book: Uuid,
    pub quantity: i32,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated borrow input
#[derive(Debug, Clone, PartialEq)]
pub struct NewBorrow {
    pub book_id: Uuid,
    pub quantity: i32,
    pub due_date: DateTime<Utc>,
}

/// Total quantity borrowed for one book id
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct BookAggregate {
    pub book_id: Uuid,
    pub total_quantity: i64,
}

/// Book identification carried by a summary row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BorrowedBook {
    pub title: String,
    pub isbn: String,
}

/// One row of the borrowed books report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowSummary {
    pub book: BorrowedBook,
    pub total_quantity: i64,
}

/// Parse a due date given either as RFC 3339 or as a plain calendar date.
///
/// Timestamps without an offset and plain dates are read as UTC.
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn valid_book_id(value: &str) -> Result<(), ValidationError> {
    Uuid::parse_str(value.trim())
        .map(|_| ())
        .map_err(|_| ValidationError::new("book_id"))
}

fn future_date(value: &str) -> Result<(), ValidationError> {
    match parse_due_date(value) {
        Some(due) if due > Utc::now() => Ok(()),
        _ => Err(ValidationError::new("due_date")),
    }
}

/// Borrow request body
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBorrowRequest {
    /// Id of the book to borrow
    #[validate(
        required(message = "Book is required"),
        custom(function = "valid_book_id", message = "Invalid book ID")
    )]
    #[schema(value_type = Uuid)]
    pub book: Option<String>,
    #[validate(
        required(message = "Quantity is required"),
        range(min = 1, max = 2147483647, message = "Quantity must be at least 1")
    )]
    pub quantity: Option<i64>,
    /// RFC 3339 timestamp or YYYY-MM-DD, strictly in the future
    #[validate(
        required(message = "Due date is required"),
        custom(function = "future_date", message = "Due date must be a valid future date")
    )]
    #[schema(value_type = String, format = DateTime)]
    pub due_date: Option<String>,
}

impl CreateBorrowRequest {
    pub fn into_new_borrow(self) -> AppResult<NewBorrow> {
        self.validate()?;

        let invalid = |field: &str, message: &str| {
            AppError::Validation(vec![FieldViolation::new(field, message)])
        };

        let book_id = self
            .book
            .as_deref()
            .and_then(|b| Uuid::parse_str(b.trim()).ok())
            .ok_or_else(|| invalid("book", "Invalid book ID"))?;
        let quantity = self
            .quantity
            .and_then(|q| i32::try_from(q).ok())
            .ok_or_else(|| invalid("quantity", "Quantity must be at least 1"))?;
        let due_date = self
            .due_date
            .as_deref()
            .and_then(parse_due_date)
            .ok_or_else(|| invalid("dueDate", "Due date must be a valid future date"))?;

        Ok(NewBorrow {
            book_id,
            quantity,
            due_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn due_date_accepts_timestamps_and_dates() {
        let expected = Utc.with_ymd_and_hms(2031, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_due_date("2031-05-01"), Some(expected));
        assert_eq!(parse_due_date("2031-05-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_due_date("2031-05-01T02:00:00+02:00"), Some(expected));
        assert_eq!(parse_due_date("2031-05-01T00:00:00.000"), Some(expected));
        assert_eq!(parse_due_date("next tuesday"), None);
    }

    #[test]
    fn valid_request_converts() {
        let id = Uuid::new_v4();
        let due = Utc::now() + Duration::days(14);
        let borrow = CreateBorrowRequest {
            book: Some(id.to_string()),
            quantity: Some(2),
            due_date: Some(due.to_rfc3339()),
        }
        .into_new_borrow()
        .unwrap();

        assert_eq!(borrow.book_id, id);
        assert_eq!(borrow.quantity, 2);
    }

    #[test]
    fn past_due_date_and_zero_quantity_are_both_reported() {
        let request = CreateBorrowRequest {
            book: Some("not-an-id".into()),
            quantity: Some(0),
            due_date: Some("2001-01-01".into()),
        };

        let Err(AppError::Validation(violations)) = request.into_new_borrow() else {
            panic!("expected validation error");
        };
        assert_eq!(violations.len(), 3);
        assert!(violations
            .iter()
            .any(|v| v.message == "Due date must be a valid future date"));
        assert!(violations.iter().any(|v| v.field == "book" && v.message == "Invalid book ID"));
    }

    #[test]
    fn missing_fields_are_required() {
        let Err(AppError::Validation(violations)) =
            CreateBorrowRequest::default().into_new_borrow()
        else {
            panic!("expected validation error");
        };
        assert_eq!(violations.len(), 3);
    }

    #[test]
    fn record_serializes_camel_case() {
        let now = Utc::now();
        let record = BorrowRecord {
            id: Uuid::new_v4(),
            book: Uuid::new_v4(),
            quantity: 1,
            due_date: now,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("dueDate").is_some());
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["book"], record.book.to_string());
    }
}
