//! Common API utilities and shared types

use serde::Deserialize;

use crate::models::{ListParams, DEFAULT_PAGE_SIZE};

/// Pagination query parameters
///
/// Both values are read as raw strings so a malformed number falls back to
/// the default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub page_size: Option<String>,
}

impl PaginationQuery {
    pub fn params(&self) -> ListParams {
        ListParams::new(
            parse_or(self.page.as_deref(), 1),
            parse_or(self.page_size.as_deref(), DEFAULT_PAGE_SIZE),
        )
    }
}

fn parse_or(value: Option<&str>, default: i64) -> i64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(default)
}
