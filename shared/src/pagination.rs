use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// A normalized page request. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub size: i64,
}

impl Page {
    /// Missing or zero values fall back to the defaults, then the page is
    /// clamped to `>= 1` and the size to `1..=MAX_PAGE_SIZE`.
    pub fn new(page: Option<i64>, size: Option<i64>, default_size: i64) -> Self {
        let page = page.filter(|p| *p != 0).unwrap_or(1).max(1);
        let size = size
            .filter(|s| *s != 0)
            .unwrap_or(default_size)
            .clamp(1, MAX_PAGE_SIZE);
        Page { page, size }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.size
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        (total + self.size - 1) / self.size
    }

    /// Cuts one page out of an already-filtered list.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let len = usize::try_from(self.size).unwrap_or(0);
        items.into_iter().skip(start).take(len).collect()
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(None, None, DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, page: Page) -> Self {
        Paginated {
            data,
            total,
            page: page.page,
            page_size: page.size,
            total_pages: page.total_pages(total),
        }
    }

    /// Paginates a complete result set in memory.
    pub fn from_all(items: Vec<T>, page: Page) -> Self {
        let total = items.len() as i64;
        Paginated::new(page.slice(items), total, page)
    }
}
