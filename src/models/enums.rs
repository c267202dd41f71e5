//! Shared domain enums

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Genre
// ---------------------------------------------------------------------------

/// Book genre classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Genre {
    Fiction,
    NonFiction,
    Science,
    History,
    Biography,
    Fantasy,
}

impl Genre {
    pub const ALL: [Genre; 6] = [
        Genre::Fiction,
        Genre::NonFiction,
        Genre::Science,
        Genre::History,
        Genre::Biography,
        Genre::Fantasy,
    ];

    /// Return the wire/storage code for this genre
    pub fn as_code(&self) -> &'static str {
        match self {
            Genre::Fiction => "FICTION",
            Genre::NonFiction => "NON_FICTION",
            Genre::Science => "SCIENCE",
            Genre::History => "HISTORY",
            Genre::Biography => "BIOGRAPHY",
            Genre::Fantasy => "FANTASY",
        }
    }
}

impl std::str::FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genre::ALL
            .into_iter()
            .find(|g| g.as_code() == s)
            .ok_or_else(|| format!("unknown genre '{}'", s))
    }
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Book attributes accepted by `sortBy`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookSortField {
    Title,
    Author,
    Genre,
    Isbn,
    Copies,
    Available,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl BookSortField {
    /// Parse a wire field name; unknown names fall back to `createdAt`.
    pub fn parse_lenient(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some("title") => BookSortField::Title,
            Some("author") => BookSortField::Author,
            Some("genre") => BookSortField::Genre,
            Some("isbn") => BookSortField::Isbn,
            Some("copies") => BookSortField::Copies,
            Some("available") => BookSortField::Available,
            Some("updatedAt") => BookSortField::UpdatedAt,
            _ => BookSortField::CreatedAt,
        }
    }

    /// Column name in the `books` table
    pub fn as_column(&self) -> &'static str {
        match self {
            BookSortField::Title => "title",
            BookSortField::Author => "author",
            BookSortField::Genre => "genre",
            BookSortField::Isbn => "isbn",
            BookSortField::Copies => "copies",
            BookSortField::Available => "available",
            BookSortField::CreatedAt => "created_at",
            BookSortField::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Only an explicit `asc` sorts ascending.
    pub fn parse_lenient(s: Option<&str>) -> Self {
        match s {
            Some(v) if v.trim().eq_ignore_ascii_case("asc") => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}
