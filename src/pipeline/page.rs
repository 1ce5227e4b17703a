use serde::{Deserialize, Serialize};

use crate::config::QueryConfig;
use crate::error::{AppError, AppResult};
use crate::infrastructure::store::Document;

/// Page request as received from the caller. Missing values fall back to
/// page 1 and the configured default limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }
}

/// Validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub limit: u64,
}

impl PageWindow {
    /// Zero or negative values are rejected; values above the configured
    /// maxima are clamped.
    pub fn resolve(request: &PageRequest, config: &QueryConfig) -> AppResult<Self> {
        let page = match request.page {
            None => 1,
            Some(p) if p < 1 => {
                return Err(AppError::invalid(format!("page must be at least 1, got {}", p)))
            }
            Some(p) => (p as u64).min(config.max_page),
        };
        let limit = match request.limit {
            None => config.default_page_limit,
            Some(l) if l < 1 => {
                return Err(AppError::invalid(format!("limit must be at least 1, got {}", l)))
            }
            Some(l) => (l as u64).min(config.max_page_limit),
        };
        Ok(Self { page, limit })
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    pub items: Vec<Document>,
    pub page: u64,
    pub limit: u64,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PageResult {
    pub fn new(items: Vec<Document>, window: PageWindow, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(window.limit);
        Self {
            items,
            page: window.page,
            limit: window.limit,
            total_items,
            total_pages,
            has_next_page: window.page < total_pages,
            has_prev_page: window.page > 1,
        }
    }

    /// Single-document result for resources that are not lists.
    pub fn single(item: Document) -> Self {
        Self::new(vec![item], PageWindow { page: 1, limit: 1 }, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let config = QueryConfig::default();
        let window = PageWindow::resolve(&PageRequest::default(), &config).unwrap();
        assert_eq!(window, PageWindow { page: 1, limit: 10 });

        let window = PageWindow::resolve(&PageRequest::new(50_000, 5_000), &config).unwrap();
        assert_eq!(window.page, config.max_page);
        assert_eq!(window.limit, config.max_page_limit);
    }

    #[test]
    fn test_zero_or_negative_is_rejected() {
        let config = QueryConfig::default();
        assert!(PageWindow::resolve(&PageRequest::new(0, 10), &config).is_err());
        assert!(PageWindow::resolve(&PageRequest::new(1, 0), &config).is_err());
        assert!(PageWindow::resolve(&PageRequest::new(-3, 10), &config).is_err());
    }

    #[test]
    fn test_page_metadata() {
        let window = PageWindow { page: 2, limit: 2 };
        assert_eq!(window.skip(), 2);
        let result = PageResult::new(Vec::new(), window, 5);
        assert_eq!(result.total_pages, 3);
        assert!(result.has_next_page);
        assert!(result.has_prev_page);

        let empty = PageResult::new(Vec::new(), PageWindow { page: 1, limit: 10 }, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
        assert!(!empty.has_prev_page);
    }
}
