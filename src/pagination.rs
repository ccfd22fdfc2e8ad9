//! # Pagination
//!
//! Offset pagination over counted collections. Pages are 1-indexed and
//! [`LAST_PAGE`] asks for the final page. A page past either end yields an empty
//! window rather than an error unless the strict variant is used.

use serde::Serialize;
use url::Url;

use crate::errors::{Error, Result};

/// Sentinel page number resolving to the last page.
pub const LAST_PAGE: i64 = -1;

/// Offset/limit window for one requested page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    /// Page number after resolving [`LAST_PAGE`].
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub offset: i64,
    /// Rows to fetch; zero for pages outside the collection.
    pub limit: i64,
    /// Rows actually present on this page.
    pub item_count: i64,
    pub has_prev: bool,
    pub has_next: bool,
}

impl PageWindow {
    /// Last valid page; 1 for an empty collection.
    pub fn last_page(&self) -> i64 {
        last_page(self.total, self.page_size)
    }

    pub fn in_range(&self) -> bool {
        self.page >= 1 && self.page <= self.last_page()
    }

    pub fn prev_page(&self) -> Option<i64> {
        self.has_prev.then_some(self.page - 1)
    }

    pub fn next_page(&self) -> Option<i64> {
        self.has_next.then_some(self.page + 1)
    }
}

fn last_page(total: i64, page_size: i64) -> i64 {
    let total = total.max(0);
    ((total + page_size - 1) / page_size).max(1)
}

/// Compute the window for `page` of a collection holding `total` rows.
pub fn paginate(total: i64, page: i64, page_size: u32) -> PageWindow {
    let page_size = i64::from(page_size.max(1));
    let total = total.max(0);
    let last = last_page(total, page_size);
    let page = if page == LAST_PAGE { last } else { page };

    let offset = (page.max(1) - 1).saturating_mul(page_size);
    let in_range = page >= 1 && page <= last;

    let (limit, item_count) = if in_range {
        (page_size, page_size.min(total - offset))
    } else {
        (0, 0)
    };

    PageWindow {
        page,
        page_size,
        total,
        offset,
        limit,
        item_count,
        has_prev: page > 1,
        has_next: in_range && offset + item_count < total,
    }
}

/// Like [`paginate`], but a page outside the collection is `NotFound`.
pub fn paginate_strict(total: i64, page: i64, page_size: u32) -> Result<PageWindow> {
    let window = paginate(total, page, page_size);
    if window.in_range() {
        Ok(window)
    } else {
        Err(Error::not_found("page", page.to_string()))
    }
}

/// One page of items with its window.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self { items, window }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page { items: self.items.into_iter().map(f).collect(), window: self.window }
    }
}

/// Absolute links to the neighbouring pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    pub prev: Option<String>,
    pub next: Option<String>,
}

impl PageLinks {
    /// Derive links from `base` by replacing its `page` query parameter.
    pub fn build(base: &Url, window: &PageWindow) -> Self {
        Self {
            prev: window.prev_page().map(|page| with_page(base, page)),
            next: window.next_page().map(|page| with_page(base, page)),
        }
    }
}

fn with_page(base: &Url, page: i64) -> String {
    let retained: Vec<(String, String)> =
        base.query_pairs().into_owned().filter(|(key, _)| key != "page").collect();

    let mut url = base.clone();
    url.query_pairs_mut().clear().extend_pairs(retained).append_pair("page", &page.to_string());
    url.to_string()
}
