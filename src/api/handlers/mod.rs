//! HTTP request handlers organized by resource type

pub mod auth;
pub mod comments;
pub mod health;
pub mod pagination;
pub mod posts;
pub mod users;

pub use auth::{
    apply_email_change_handler, change_password_handler, confirm_handler, get_token_handler,
    register_handler, request_email_change_handler, request_password_reset_handler,
    resend_confirmation_handler, reset_password_handler, update_profile_handler,
};
pub use comments::{get_comment_handler, list_comments_handler, moderate_comment_handler};
pub use health::health_handler;
pub use posts::{
    create_comment_handler, create_post_handler, get_post_handler, list_post_comments_handler,
    list_posts_handler, update_post_handler,
};
pub use users::{
    admin_update_account_handler, follow_handler, get_user_handler, list_followers_handler,
    list_following_handler, list_user_posts_handler, timeline_handler, unfollow_handler,
    update_role_handler,
};
