use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Raw `page` / `pageSize` query parameters. Out of range values are
/// clamped rather than rejected.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub size: i64,
}

impl PageParams {
    pub fn clamp(self) -> Page {
        Page {
            number: self.page.unwrap_or(1).max(1),
            size: self
                .page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }
}

impl Page {
    pub fn limit(&self) -> i64 {
        self.size
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1).saturating_mul(self.size)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
    pub total_pages: i64,
}

impl<T> Paged<T> {
    pub fn new(items: Vec<T>, page: Page, total_count: i64) -> Self {
        let total_pages = if total_count == 0 {
            0
        } else {
            (total_count + page.size - 1) / page.size
        };

        Self {
            items,
            page: page.number,
            page_size: page.size,
            total_count,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<i64>, page_size: Option<i64>) -> PageParams {
        PageParams { page, page_size }
    }

    #[test]
    fn test_defaults() {
        let page = params(None, None).clamp();
        assert_eq!(page, Page { number: 1, size: DEFAULT_PAGE_SIZE });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_is_clamped_to_one() {
        assert_eq!(params(Some(0), None).clamp().number, 1);
        assert_eq!(params(Some(-5), None).clamp().number, 1);
    }

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(params(None, Some(0)).clamp().size, 1);
        assert_eq!(params(None, Some(-1)).clamp().size, 1);
        assert_eq!(params(None, Some(1000)).clamp().size, MAX_PAGE_SIZE);
        assert_eq!(params(None, Some(25)).clamp().size, 25);
    }

    #[test]
    fn test_offset() {
        let page = params(Some(3), Some(20)).clamp();
        assert_eq!(page.offset(), 40);
        assert_eq!(page.limit(), 20);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let page = params(Some(i64::MAX), Some(100)).clamp();
        assert_eq!(page.offset(), i64::MAX);
    }

    #[test]
    fn test_total_pages() {
        let page = params(Some(1), Some(10)).clamp();
        assert_eq!(Paged::<u8>::new(vec![], page, 0).total_pages, 0);
        assert_eq!(Paged::<u8>::new(vec![], page, 10).total_pages, 1);
        assert_eq!(Paged::<u8>::new(vec![], page, 11).total_pages, 2);
    }

    #[test]
    fn test_serializes_camel_case() {
        let page = params(None, None).clamp();
        let json = serde_json::to_value(Paged::new(vec![1, 2], page, 2)).unwrap();
        assert_eq!(json["pageSize"], 10);
        assert_eq!(json["totalCount"], 2);
        assert_eq!(json["totalPages"], 1);
    }
}
