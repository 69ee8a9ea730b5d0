use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
// Storefront listings page by dozens.
pub const STOREFRONT_PAGE_SIZE: i64 = 12;

// Common offset-pagination query parameters. Offset pagination over a
// mutable table can skip or duplicate rows under concurrent writes; that
// is a known limitation of this API, not something handlers work around.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit_or(&self, default: i64) -> i64 {
        self.limit.unwrap_or(default).max(1)
    }

    pub fn offset(&self, limit: i64) -> i64 {
        (self.page() - 1) * limit
    }

    // Non-empty trimmed search term, if one was supplied.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let limit = limit.max(1);
        Self {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_is_ceiling() {
        assert_eq!(Pagination::new(1, 10, 0).pages, 0);
        assert_eq!(Pagination::new(1, 10, 1).pages, 1);
        assert_eq!(Pagination::new(1, 10, 10).pages, 1);
        assert_eq!(Pagination::new(1, 10, 11).pages, 2);
        assert_eq!(Pagination::new(1, 12, 25).pages, 3);
    }

    #[test]
    fn defaults_and_clamping() {
        let query = PageQuery::default();
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit_or(DEFAULT_PAGE_SIZE), 10);
        assert_eq!(query.offset(10), 0);

        let query = PageQuery {
            page: Some(0),
            limit: Some(-5),
            search: None,
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit_or(DEFAULT_PAGE_SIZE), 1);
    }

    #[test]
    fn offset_advances_with_page() {
        let query = PageQuery {
            page: Some(3),
            limit: Some(12),
            search: None,
        };
        let limit = query.limit_or(STOREFRONT_PAGE_SIZE);
        assert_eq!(query.offset(limit), 24);
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = PageQuery {
            page: None,
            limit: None,
            search: Some("   ".to_string()),
        };
        assert_eq!(query.search_term(), None);

        let query = PageQuery {
            page: None,
            limit: None,
            search: Some(" pizza ".to_string()),
        };
        assert_eq!(query.search_term(), Some("pizza"));
    }
}
