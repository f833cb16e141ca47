//! Pagination wrapper shared by the listing endpoints.

use serde::{Deserialize, Serialize};

fn default_size() -> u32 {
    10
}

/// Zero-based page parameters taken from the query string.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}

impl PageParams {
    /// Page size clamped to a sane range; callers never see size 0 or a
    /// request for thousands of rows.
    pub fn capped_size(&self) -> u32 {
        self.size.clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.capped_size())
    }
}

/// A page of results plus the derived metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: i64,
    pub total_pages: u32,
    pub first: bool,
    pub last: bool,
}

impl<T> PageResponse<T> {
    pub fn new(content: Vec<T>, page: u32, size: u32, total_elements: i64) -> Self {
        let total_pages = if size == 0 {
            0
        } else {
            ((total_elements.max(0) as u64 + u64::from(size) - 1) / u64::from(size)) as u32
        };
        let first = page == 0;
        let last = total_pages == 0 || page + 1 >= total_pages;
        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
            first,
            last,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            first: self.first,
            last: self.last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_for_a_middle_page() {
        let page = PageResponse::new(vec![1, 2], 1, 2, 5);
        assert_eq!(page.total_pages, 3);
        assert!(!page.first);
        assert!(!page.last);
    }

    #[test]
    fn metadata_for_the_last_page() {
        let page = PageResponse::new(vec![5], 2, 2, 5);
        assert_eq!(page.total_pages, 3);
        assert!(page.last);
    }

    #[test]
    fn empty_result_is_a_valid_page() {
        let page = PageResponse::new(Vec::<i32>::new(), 0, 10, 0);
        assert_eq!(page.total_elements, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.first);
        assert!(page.last);
    }

    #[test]
    fn size_is_capped() {
        let params = PageParams { page: 3, size: 1000 };
        assert_eq!(params.capped_size(), 100);
        assert_eq!(params.offset(), 300);
    }
}
