//! Common API utilities
//!
//! Shared query-parameter types used across endpoints.

use serde::Deserialize;

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size
pub fn default_page_size() -> u32 {
    10
}

/// Basic pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Admin pagination query parameters
#[derive(Debug, Deserialize)]
pub struct AdminPaginationQuery {
    #[serde(default = "default_page_i64")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_page_i64() -> i64 {
    1
}

fn default_per_page() -> i64 {
    20
}
