/// Offset pagination
///
/// Serializes as `{total, perPage, page, lastPage, data}`.

use serde::{Deserialize, Serialize};

/// Default page size for list endpoints
pub const DEFAULT_PER_PAGE: i64 = 20;

/// Requested page (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Builds a request, clamping the page number to `1..=i64::MAX / per_page`
    /// so the offset always fits in an `i64`
    pub fn new(page: Option<i64>, per_page: i64) -> Self {
        let per_page = per_page.max(1);

        Self {
            page: page.unwrap_or(1).clamp(1, i64::MAX / per_page),
            per_page,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, DEFAULT_PER_PAGE)
    }
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub total: i64,
    pub per_page: i64,
    pub page: i64,
    pub last_page: i64,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(request: PageRequest, total: i64, data: Vec<T>) -> Self {
        let last_page = if total <= 0 {
            0
        } else {
            (total - 1) / request.per_page + 1
        };
        Self {
            total,
            per_page: request.per_page,
            page: request.page,
            last_page,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(None, 20).offset(), 0);
        assert_eq!(PageRequest::new(Some(3), 20).offset(), 40);
        assert_eq!(PageRequest::new(Some(0), 20).page, 1);
        assert_eq!(PageRequest::new(Some(-4), 20).page, 1);
    }

    #[test]
    fn test_huge_page_is_capped() {
        let req = PageRequest::new(Some(i64::MAX), 20);
        assert_eq!(req.page, i64::MAX / 20);
        assert!(req.offset() >= 0);

        let req = PageRequest::new(Some(i64::MAX), i64::MAX);
        assert_eq!(req.page, 1);
        assert_eq!(req.offset(), 0);
        assert_eq!(Page::<()>::new(req, 3, vec![]).last_page, 1);
    }

    #[test]
    fn test_last_page() {
        let req = PageRequest::default();
        assert_eq!(Page::<()>::new(req, 0, vec![]).last_page, 0);
        assert_eq!(Page::<()>::new(req, 20, vec![]).last_page, 1);
        assert_eq!(Page::<()>::new(req, 21, vec![]).last_page, 2);
    }

    #[test]
    fn test_wire_format() {
        let page = Page::new(PageRequest::default(), 1, vec![1]);
        let json = serde_json::to_value(page).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"total": 1, "perPage": 20, "page": 1, "lastPage": 1, "data": [1]})
        );
    }
}
