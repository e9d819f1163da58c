//! Pagination primitives shared by list endpoints.
//!
//! Sort keys and sort directions are closed enumerations. A value that does
//! not parse into one of them is rejected here, so nothing outside these
//! variants can ever reach a query builder.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Largest page size a caller may request.
pub const MAX_LIMIT: u32 = 100;
/// Page size used when the caller does not supply one.
pub const DEFAULT_LIMIT: u32 = 10;
/// First page number; pages are 1-based.
pub const FIRST_PAGE: u32 = 1;

/// Errors raised while building pagination parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    /// The sort key is not one of the supported columns.
    #[error("unsupported sort_by value: {value}")]
    UnknownSortBy {
        /// Raw value supplied by the caller.
        value: String,
    },
    /// The sort direction is neither `asc` nor `desc`.
    #[error("unsupported order_by value: {value}")]
    UnknownOrderBy {
        /// Raw value supplied by the caller.
        value: String,
    },
    /// Page numbers start at 1.
    #[error("page must be at least {FIRST_PAGE}, got {page}")]
    PageOutOfRange {
        /// Rejected page number.
        page: u32,
    },
    /// Limits must fall within `1..=MAX_LIMIT`.
    #[error("limit must be between 1 and {MAX_LIMIT}, got {limit}")]
    LimitOutOfRange {
        /// Rejected limit.
        limit: u32,
    },
}

/// Column a list is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Server-assigned identifier.
    #[default]
    Id,
    /// Display name.
    Name,
    /// Email address.
    Email,
    /// Creation instant.
    CreatedAt,
}

impl SortBy {
    /// Every accepted sort key, in declaration order.
    pub const ALL: [Self; 4] = [Self::Id, Self::Name, Self::Email, Self::CreatedAt];

    /// Wire and column name of the sort key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Email => "email",
            Self::CreatedAt => "created_at",
        }
    }

    /// Parse an optional raw value; an empty string selects the default.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::UnknownSortBy`] for any other value.
    pub fn parse_or_default(raw: &str) -> Result<Self, PaginationError> {
        if raw.is_empty() {
            return Ok(Self::default());
        }
        raw.parse()
    }
}

impl FromStr for SortBy {
    type Err = PaginationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == s)
            .ok_or_else(|| PaginationError::UnknownSortBy {
                value: s.to_owned(),
            })
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction a list is ordered in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl OrderBy {
    /// Wire name of the direction.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Parse an optional raw value; an empty string selects the default.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::UnknownOrderBy`] for any other value.
    pub fn parse_or_default(raw: &str) -> Result<Self, PaginationError> {
        if raw.is_empty() {
            return Ok(Self::default());
        }
        raw.parse()
    }
}

impl FromStr for OrderBy {
    type Err = PaginationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(PaginationError::UnknownOrderBy {
                value: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated window over an ordered list.
///
/// # Examples
///
/// ```
/// use pagination::{OrderBy, Pagination, SortBy};
///
/// let window = Pagination::new(3, 20, SortBy::Name, OrderBy::Desc).expect("valid window");
/// assert_eq!(window.offset(), 40);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    limit: u32,
    sort_by: SortBy,
    order_by: OrderBy,
}

impl Pagination {
    /// Build a window, rejecting out-of-range page numbers and limits.
    ///
    /// # Errors
    ///
    /// Returns [`PaginationError::PageOutOfRange`] when `page` is zero and
    /// [`PaginationError::LimitOutOfRange`] when `limit` is outside
    /// `1..=MAX_LIMIT`.
    pub const fn new(
        page: u32,
        limit: u32,
        sort_by: SortBy,
        order_by: OrderBy,
    ) -> Result<Self, PaginationError> {
        if page < FIRST_PAGE {
            return Err(PaginationError::PageOutOfRange { page });
        }
        if limit == 0 || limit > MAX_LIMIT {
            return Err(PaginationError::LimitOutOfRange { limit });
        }
        Ok(Self {
            page,
            limit,
            sort_by,
            order_by,
        })
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Maximum number of rows in the window.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Sort key.
    #[must_use]
    pub const fn sort_by(&self) -> SortBy {
        self.sort_by
    }

    /// Sort direction.
    #[must_use]
    pub const fn order_by(&self) -> OrderBy {
        self.order_by
    }

    /// Rows skipped before the window, `(page - 1) * limit`.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: FIRST_PAGE,
            limit: DEFAULT_LIMIT,
            sort_by: SortBy::default(),
            order_by: OrderBy::default(),
        }
    }
}

/// Window description returned alongside a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Total number of rows across all pages.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub limit: u32,
    /// Rows skipped before this page.
    pub offset: u64,
}

impl PageMeta {
    /// Describe `pagination` with the counted `total`.
    #[must_use]
    pub const fn new(pagination: &Pagination, total: u64) -> Self {
        Self {
            total,
            page: pagination.page,
            limit: pagination.limit,
            offset: pagination.offset(),
        }
    }
}
