//! Business logic services
//!
//! Follow graph, posts and comments, separated from HTTP concerns. Each
//! mutating operation checks the caller's permissions before touching storage.

pub mod comment_service;
pub mod follow_service;
pub mod post_service;

pub use comment_service::CommentService;
pub use follow_service::FollowService;
pub use post_service::PostService;

use crate::errors::Result;
use crate::pagination::{paginate, Page};
use std::future::Future;

/// Count, compute the window, then fetch only when the window holds rows.
pub(crate) async fn fetch_page<T, F, Fut>(
    total: i64,
    page: i64,
    page_size: u32,
    fetch: F,
) -> Result<Page<T>>
where
    F: FnOnce(i64, i64) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let window = paginate(total, page, page_size);
    let items =
        if window.limit > 0 { fetch(window.offset, window.limit).await? } else { Vec::new() };
    Ok(Page::new(items, window))
}
