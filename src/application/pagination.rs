//! Page-number pagination shared by the listing endpoints.
//!
//! The page parameter arrives as a free-form query-string value. Anything
//! that is not a positive integer resolves to the first page, and a page
//! past the end clamps to the last page; neither case is an error.

use serde::Serialize;

/// Posts shown per listing page.
pub const POSTS_PAGE_SIZE: u32 = 10;

/// Resolve the raw `page` query value to a page number, defaulting to 1.
pub fn parse_page_param(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|&number| number >= 1)
        .unwrap_or(1)
}

/// Resolved position of one page within an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub number: u32,
    pub size: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl PageMeta {
    /// Clamp `requested` into the valid page range for `total_items`.
    ///
    /// An empty result set still has one (empty) page, so callers never
    /// need a separate no-results path.
    pub fn clamp(requested: u32, total_items: u64, size: u32) -> Self {
        let size = size.max(1);
        let total_pages = u32::try_from(total_items.div_ceil(u64::from(size)))
            .unwrap_or(u32::MAX)
            .max(1);
        let number = requested.clamp(1, total_pages);

        Self {
            number,
            size,
            total_items,
            total_pages,
        }
    }

    /// Offset of the first item on this page within the ordered set.
    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    pub fn previous(&self) -> u32 {
        self.number.saturating_sub(1).max(1)
    }

    pub fn next(&self) -> u32 {
        (self.number + 1).min(self.total_pages)
    }
}

/// One page of an ordered result set together with its position.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, meta: PageMeta) -> Self {
        Self { items, meta }
    }
}
