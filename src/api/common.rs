//! Common API utilities and shared types

use serde::{Deserialize, Serialize};

use crate::models::{ListParams, PagedResult};

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Pagination query parameters
///
/// `per_page` falls back to a per-endpoint default, so public post lists
/// follow the configured page size.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default)]
    pub per_page: Option<u32>,
}

impl PaginationQuery {
    pub fn params(&self, default_per_page: u32) -> ListParams {
        ListParams::new(self.page, self.per_page.unwrap_or(default_per_page))
    }
}

/// Paged list response
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> From<PagedResult<T>> for ListResponse<T> {
    fn from(result: PagedResult<T>) -> Self {
        let total_pages = result.total_pages();
        Self {
            items: result.items,
            total: result.total,
            page: result.page,
            per_page: result.per_page,
            total_pages,
        }
    }
}

/// Batch of ids in a request body
#[derive(Debug, Deserialize)]
pub struct IdsRequest {
    pub ids: Vec<i64>,
}

/// Number of affected rows
#[derive(Debug, Serialize)]
pub struct AffectedResponse {
    pub affected: u64,
}
