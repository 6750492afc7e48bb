//! Shared types used across the codebase

use serde::Serialize;

/// Pagination metadata returned alongside every paged listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl PageMeta {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

/// Clamp a requested page number to 1-based.
pub fn normalize_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

/// Clamp a requested page size to [1, max], defaulting from config.
pub fn normalize_limit(limit: Option<i64>) -> i64 {
    let api = &crate::config::config().api;
    limit
        .unwrap_or(api.default_page_limit)
        .clamp(1, api.max_page_limit)
}

pub fn page_offset(page: i64, limit: i64) -> i64 {
    (page - 1) * limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_is_ceil_of_total_over_limit() {
        assert_eq!(PageMeta::new(1, 10, 0).pages, 0);
        assert_eq!(PageMeta::new(1, 10, 1).pages, 1);
        assert_eq!(PageMeta::new(1, 10, 10).pages, 1);
        assert_eq!(PageMeta::new(1, 10, 11).pages, 2);
        assert_eq!(PageMeta::new(1, 10, 95).pages, 10);
    }

    #[test]
    fn offset_never_overlaps_next_page() {
        // Row indices [offset, offset+limit) for page n end exactly where
        // page n+1 begins.
        for page in 1..5 {
            let limit = 10;
            assert_eq!(page_offset(page + 1, limit) - page_offset(page, limit), limit);
        }
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 25), 50);
    }

    #[test]
    fn page_defaults_to_first() {
        assert_eq!(normalize_page(None), 1);
        assert_eq!(normalize_page(Some(0)), 1);
        assert_eq!(normalize_page(Some(-3)), 1);
        assert_eq!(normalize_page(Some(7)), 7);
    }
}
