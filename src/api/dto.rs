//! JSON resource shapes, link construction and request bodies for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

use crate::auth::Account;
use crate::domain::{AccountId, Comment, CommentId, FollowEntry, Post, PostId};
use crate::errors::{Error, Result};
use crate::pagination::{Page, PageLinks};

pub const API_PREFIX: &str = "/api/v1";

/// Builds absolute URLs for API resources.
#[derive(Debug, Clone)]
pub struct ApiLinks {
    base: Url,
}

impl ApiLinks {
    pub fn new(public_base_url: &str) -> Result<Self> {
        let base = Url::parse(public_base_url)
            .map_err(|e| Error::config(format!("Invalid public base URL: {}", e)))?;
        Ok(Self { base })
    }

    /// Absolute URL of an API path such as `/posts/`.
    pub fn url(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let prefix = self.base.path().trim_end_matches('/');
        url.set_path(&format!("{}{}{}", prefix, API_PREFIX, path));
        url
    }

    pub fn user(&self, id: AccountId) -> String {
        self.url(&format!("/users/{}", id)).to_string()
    }

    pub fn user_posts(&self, id: AccountId) -> String {
        self.url(&format!("/users/{}/posts/", id)).to_string()
    }

    pub fn user_timeline(&self, id: AccountId) -> String {
        self.url(&format!("/users/{}/timeline", id)).to_string()
    }

    pub fn post(&self, id: PostId) -> String {
        self.url(&format!("/posts/{}", id)).to_string()
    }

    pub fn post_comments(&self, id: PostId) -> String {
        self.url(&format!("/posts/{}/comments", id)).to_string()
    }

    pub fn comment(&self, id: CommentId) -> String {
        self.url(&format!("/comments/{}", id)).to_string()
    }

    /// Prev/next links of a listing at `path`.
    pub fn page_links<T>(&self, path: &str, page: &Page<T>) -> PageLinks {
        PageLinks::build(&self.url(path), &page.window)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResource {
    pub url: String,
    pub username: String,
    pub member_since: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub posts: String,
    pub followed_posts: String,
    pub post_count: i64,
}

impl UserResource {
    pub fn new(links: &ApiLinks, account: &Account, post_count: i64) -> Self {
        Self {
            url: links.user(account.id),
            username: account.username.clone(),
            member_since: account.member_since,
            last_seen: account.last_seen,
            posts: links.user_posts(account.id),
            followed_posts: links.user_timeline(account.id),
            post_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostResource {
    pub url: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub comments: String,
    pub comment_count: i64,
}

impl PostResource {
    pub fn new(links: &ApiLinks, post: &Post, comment_count: i64) -> Self {
        Self {
            url: links.post(post.id),
            body: post.body.clone(),
            timestamp: post.created_at,
            author: links.user(post.author_id),
            comments: links.post_comments(post.id),
            comment_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentResource {
    pub url: String,
    pub post: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub author: String,
}

impl CommentResource {
    pub fn new(links: &ApiLinks, comment: &Comment) -> Self {
        Self {
            url: links.comment(comment.id),
            post: links.post(comment.post_id),
            body: comment.visible_body().to_string(),
            timestamp: comment.created_at,
            author: links.user(comment.author_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowResource {
    pub url: String,
    pub username: String,
    pub timestamp: DateTime<Utc>,
}

impl FollowResource {
    pub fn new(links: &ApiLinks, entry: &FollowEntry) -> Self {
        Self {
            url: links.user(entry.account_id),
            username: entry.username.clone(),
            timestamp: entry.since,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub expiration: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PostBody {
    #[validate(length(min = 1, message = "Post body cannot be empty"))]
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CommentBody {
    #[validate(length(min = 1, message = "Comment body cannot be empty"))]
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationRequest {
    pub disabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RoleAssignmentRequest {
    #[validate(length(min = 1, max = 64))]
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_include_prefix_and_base_path() {
        let links = ApiLinks::new("http://localhost:8080").unwrap();
        assert_eq!(links.user(AccountId::new(3)), "http://localhost:8080/api/v1/users/3");
        assert_eq!(
            links.user_posts(AccountId::new(3)),
            "http://localhost:8080/api/v1/users/3/posts/"
        );

        let mounted = ApiLinks::new("https://example.com/blog/").unwrap();
        assert_eq!(mounted.post(PostId::new(9)), "https://example.com/blog/api/v1/posts/9");
    }

    #[test]
    fn disabled_comment_resource_hides_body() {
        let links = ApiLinks::new("http://localhost:8080").unwrap();
        let comment = Comment {
            id: CommentId::new(1),
            body: "rude".into(),
            created_at: Utc::now(),
            disabled: true,
            author_id: AccountId::new(2),
            post_id: PostId::new(3),
        };
        let resource = CommentResource::new(&links, &comment);
        assert_eq!(resource.body, Comment::DISABLED_BODY);
        assert_eq!(resource.post, "http://localhost:8080/api/v1/posts/3");
    }
}
