//! Pagination-related DTOs for API requests and responses.

use serde::Serialize;
use utoipa::ToSchema;

/// Generic paged response wrapper.
#[derive(Debug, Serialize, ToSchema)]
pub struct PagedResponse<T> {
    /// The data items for this page
    pub data: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

/// Pagination metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationMeta {
    /// Current page number (1-based)
    #[schema(example = 1)]
    pub page: u32,

    /// Number of items per page
    #[schema(example = 20)]
    pub page_size: u32,

    /// Total number of items across all pages
    #[schema(example = 100)]
    pub total_items: u64,

    /// Total number of pages
    #[schema(example = 5)]
    pub total_pages: u32,

    /// Whether there is a next page
    #[schema(example = true)]
    pub has_next: bool,

    /// Whether there is a previous page
    #[schema(example = false)]
    pub has_prev: bool,
}

impl<T> PagedResponse<T> {
    /// Creates a new paged response.
    pub fn new(data: Vec<T>, page: u32, page_size: u32, total_items: u64) -> Self {
        let total_pages = ((total_items as f64) / (page_size as f64)).ceil() as u32;
        let has_next = page < total_pages;
        let has_prev = page > 1;

        Self {
            data,
            pagination: PaginationMeta {
                page,
                page_size,
                total_items,
                total_pages,
                has_next,
                has_prev,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paged_response_metadata() {
        let response = PagedResponse::new(vec![1, 2, 3], 2, 3, 8);
        assert_eq!(response.pagination.total_pages, 3);
        assert!(response.pagination.has_next);
        assert!(response.pagination.has_prev);
    }

    #[test]
    fn test_paged_response_single_page() {
        let response = PagedResponse::new(vec![1], 1, 20, 1);
        assert_eq!(response.pagination.total_pages, 1);
        assert!(!response.pagination.has_next);
        assert!(!response.pagination.has_prev);
    }
}
