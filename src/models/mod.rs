//! Data models for the library server

pub mod book;
pub mod borrow;
pub mod enums;

// Re-export commonly used types
pub use book::{derive_availability, Book, BookChanges, BookFilter, NewBook};
pub use borrow::{BookAggregate, BorrowRecord, BorrowSummary, NewBorrow};
pub use enums::Genre;
