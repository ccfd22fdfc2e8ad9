//! Posts, comments and follow edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{AccountId, CommentId, PostId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub author_id: AccountId,
}

/// A comment on a post. Disabled comments stay listed but their body is withheld.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub disabled: bool,
    pub author_id: AccountId,
    pub post_id: PostId,
}

impl Comment {
    pub const DISABLED_BODY: &'static str = "This comment has been disabled by a moderator.";

    /// Body as shown to readers.
    pub fn visible_body(&self) -> &str {
        if self.disabled {
            Self::DISABLED_BODY
        } else {
            &self.body
        }
    }
}

/// One side of a follow edge, seen from the other account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEntry {
    pub account_id: AccountId,
    pub username: String,
    pub since: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_comment_hides_body() {
        let mut comment = Comment {
            id: CommentId::new(1),
            body: "rude words".into(),
            created_at: Utc::now(),
            disabled: false,
            author_id: AccountId::new(2),
            post_id: PostId::new(3),
        };
        assert_eq!(comment.visible_body(), "rude words");

        comment.disabled = true;
        assert_eq!(comment.visible_body(), Comment::DISABLED_BODY);
    }
}
