use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::middleware::{authenticate, ensure_confirmed};
use crate::auth::AccountService;
use crate::config::{AppConfig, PaginationConfig};
use crate::errors::Result;
use crate::mail::Mailer;
use crate::services::{CommentService, FollowService, PostService};
use crate::storage::DbPool;

use super::dto::ApiLinks;
use super::handlers::{
    admin_update_account_handler, apply_email_change_handler, change_password_handler,
    confirm_handler, create_comment_handler, create_post_handler, follow_handler,
    get_comment_handler, get_post_handler, get_token_handler, get_user_handler, health_handler,
    list_comments_handler, list_followers_handler, list_following_handler,
    list_post_comments_handler, list_posts_handler, list_user_posts_handler,
    moderate_comment_handler, register_handler, request_email_change_handler,
    request_password_reset_handler, resend_confirmation_handler, reset_password_handler,
    timeline_handler, unfollow_handler, update_post_handler, update_profile_handler,
    update_role_handler,
};

#[derive(Clone)]
pub struct ApiState {
    pub accounts: AccountService,
    pub posts: PostService,
    pub comments: CommentService,
    pub follows: FollowService,
    pub pagination: PaginationConfig,
    pub links: Arc<ApiLinks>,
}

impl ApiState {
    /// Wire every service to the same pool.
    pub fn with_sqlx(pool: DbPool, config: &AppConfig, mailer: Arc<dyn Mailer>) -> Result<Self> {
        Ok(Self {
            accounts: AccountService::with_sqlx(pool.clone(), &config.auth, mailer),
            posts: PostService::with_sqlx(pool.clone()),
            comments: CommentService::with_sqlx(pool.clone()),
            follows: FollowService::with_sqlx(pool),
            pagination: config.pagination.clone(),
            links: Arc::new(ApiLinks::new(&config.server.public_base_url)?),
        })
    }
}

pub fn build_router(state: ApiState) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.accounts.clone(), authenticate);

    let resources = Router::new()
        .route("/api/v1/token", get(get_token_handler))
        .route("/api/v1/users/{id}", get(get_user_handler).put(admin_update_account_handler))
        .route("/api/v1/users/{id}/posts/", get(list_user_posts_handler))
        .route("/api/v1/users/{id}/timeline", get(timeline_handler))
        .route("/api/v1/users/{id}/followers", get(list_followers_handler))
        .route("/api/v1/users/{id}/following", get(list_following_handler))
        .route("/api/v1/users/{id}/follow", post(follow_handler).delete(unfollow_handler))
        .route("/api/v1/users/{id}/role", put(update_role_handler))
        .route("/api/v1/posts/", get(list_posts_handler).post(create_post_handler))
        .route("/api/v1/posts/{id}", get(get_post_handler).put(update_post_handler))
        .route(
            "/api/v1/posts/{id}/comments",
            get(list_post_comments_handler).post(create_comment_handler),
        )
        .route("/api/v1/comments/", get(list_comments_handler))
        .route("/api/v1/comments/{id}", get(get_comment_handler))
        .route("/api/v1/comments/{id}/moderation", put(moderate_comment_handler))
        .route_layer(middleware::from_fn(ensure_confirmed));

    let lifecycle = Router::new()
        .route("/api/v1/auth/register", post(register_handler))
        .route("/api/v1/auth/confirm", post(confirm_handler))
        .route("/api/v1/auth/confirm/resend", post(resend_confirmation_handler))
        .route("/api/v1/auth/password/reset", post(request_password_reset_handler))
        .route("/api/v1/auth/password/reset/confirm", post(reset_password_handler))
        .route("/api/v1/auth/password/change", post(change_password_handler))
        .route("/api/v1/auth/email/change", post(request_email_change_handler))
        .route("/api/v1/auth/email/change/confirm", post(apply_email_change_handler))
        .route("/api/v1/auth/profile", put(update_profile_handler));

    Router::new()
        .merge(resources)
        .merge(lifecycle)
        .layer(auth_layer)
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
