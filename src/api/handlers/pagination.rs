//! Shared pagination types for list endpoints.
//!
//! Listings take a 1-indexed `?page=` parameter (`-1` selects the last page) and
//! answer with `{<items>, prev, next, count}`.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::api::dto::ApiLinks;
use crate::pagination::{Page, PageLinks};

/// `?page=` query parameter. Absent means the first page.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }
}

/// A page of resources serialized under a resource-specific key.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    pub key: &'static str,
    pub items: Vec<T>,
    pub links: PageLinks,
    pub count: i64,
}

impl<T> Collection<T> {
    /// Build a collection for the listing served at `path`.
    pub fn from_page<U>(
        key: &'static str,
        links: &ApiLinks,
        path: &str,
        page: &Page<U>,
        items: Vec<T>,
    ) -> Self {
        Self { key, items, links: links.page_links(path, page), count: page.window.total }
    }
}

impl<T: Serialize> Serialize for Collection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry(self.key, &self.items)?;
        map.serialize_entry("prev", &self.links.prev)?;
        map.serialize_entry("next", &self.links.next)?;
        map.serialize_entry("count", &self.count)?;
        map.end()
    }
}
