//! This modules defines the common functionality for paging data.

/// The config for pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of items per page when not specified in a request.
    pub default_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 50,
        }
    }
}

/// A resolved, one-based page number and page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// The one-based page number, at least 1.
    pub page: u64,
    /// The maximum number of items on a page, at least 1.
    pub limit: u64,
}

impl Pagination {
    /// Resolve the requested `page` and `limit`, filling in defaults from
    /// `config` and raising anything below 1 to 1.
    pub fn new(page: Option<i64>, limit: Option<i64>, config: &PaginationConfig) -> Self {
        let resolve = |requested: Option<i64>, default: u64| {
            requested
                .map(|value| value.max(1) as u64)
                .unwrap_or(default)
                .max(1)
        };

        Self {
            page: resolve(page, config.default_page),
            limit: resolve(limit, config.default_page_size),
        }
    }

    /// The zero-based index of the first item on the page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Select the items on this page.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);

        items.into_iter().skip(offset).take(limit).collect()
    }
}
