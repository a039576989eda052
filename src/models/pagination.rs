//! Pagination parameters and the page envelope returned by list operations

use serde::{Deserialize, Serialize};

/// Page size used when the caller supplies none (or an unusable one)
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page a caller may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination parameters for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: i64,
    /// Number of items per page
    pub page_size: i64,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListParams {
    /// Create pagination parameters, replacing values below 1 with the defaults
    pub fn new(page: i64, page_size: i64) -> Self {
        let page = if page < 1 { 1 } else { page };
        let page_size = if page_size < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size.min(MAX_PAGE_SIZE)
        };
        Self { page, page_size }
    }

    /// Calculate the offset for database queries
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    /// Get the limit for database queries
    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

/// Paginated result container
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total_count: i64,
    /// Current page number (1-indexed)
    pub current_page: i64,
    /// Number of pages needed to show every item
    pub total_pages: i64,
    /// Number of items per page
    pub page_size: i64,
}

impl<T> PagedResult<T> {
    /// Create a new paginated result
    pub fn new(items: Vec<T>, total_count: i64, params: &ListParams) -> Self {
        Self {
            items,
            total_count,
            current_page: params.page,
            total_pages: total_pages(total_count, params.page_size),
            page_size: params.page_size,
        }
    }
}

/// `ceil(total_count / page_size)`
fn total_pages(total_count: i64, page_size: i64) -> i64 {
    if page_size <= 0 || total_count <= 0 {
        return 0;
    }
    (total_count + page_size - 1) / page_size
}
