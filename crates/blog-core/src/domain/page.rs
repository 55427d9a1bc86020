use serde::Serialize;

/// Fixed size of a listing page.
pub const POSTS_PER_PAGE: u64 = 10;

/// A 1-based page number with the listing page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    /// Page zero and missing pages fall back to the first page.
    pub fn new(page: Option<u64>) -> Self {
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            per_page: POSTS_PER_PAGE,
        }
    }

    /// Zero-based index as understood by paginators.
    pub fn index(&self) -> u64 {
        self.page - 1
    }

    /// Rows to skip. Saturates for absurd page numbers.
    pub fn offset(&self) -> u64 {
        self.index().saturating_mul(self.per_page)
    }

    /// True when no row can land on this page.
    pub fn is_past_end(&self, total_items: u64) -> bool {
        self.index() >= total_items.div_ceil(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None)
    }
}

/// One page of results plus the totals needed for navigation.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Self {
            items,
            page: request.page,
            per_page: request.per_page,
            total_items,
            total_pages: total_items.div_ceil(request.per_page),
        }
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults_to_first_page() {
        assert_eq!(PageRequest::new(None).page, 1);
        assert_eq!(PageRequest::new(Some(0)).page, 1);
        assert_eq!(PageRequest::new(Some(3)).offset(), 20);
    }

    #[test]
    fn test_page_totals() {
        let page: Page<u8> = Page::new(vec![], PageRequest::new(Some(4)), 25);

        assert_eq!(page.total_pages, 3);
        assert!(page.has_previous());
        assert!(!page.has_next());
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_huge_page_number_does_not_overflow() {
        let request = PageRequest::new(Some(1_844_674_407_370_955_163));

        assert_eq!(request.offset(), u64::MAX);
        assert!(request.is_past_end(12));
        assert!(PageRequest::new(Some(u64::MAX)).is_past_end(u64::MAX));
    }

    #[test]
    fn test_past_end_boundaries() {
        assert!(PageRequest::new(Some(1)).is_past_end(0));
        assert!(!PageRequest::new(Some(2)).is_past_end(12));
        assert!(PageRequest::new(Some(3)).is_past_end(12));
        assert!(!PageRequest::new(Some(1)).is_past_end(10));
        assert!(PageRequest::new(Some(2)).is_past_end(10));
    }
}
