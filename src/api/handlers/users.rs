//! User resource handlers: profiles, authored posts, timeline and the follow graph.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::api::dto::{FollowResource, PostResource, RoleAssignmentRequest, UserResource};
use crate::api::error::ApiError;
use crate::api::handlers::pagination::{Collection, PageQuery};
use crate::api::routes::ApiState;
use crate::auth::validation::AdminAccountRequest;
use crate::auth::{Account, Principal};
use crate::domain::{AccountId, Post};
use crate::pagination::Page;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowStatus {
    pub following: bool,
}

pub(crate) async fn user_resource(
    state: &ApiState,
    account: &Account,
) -> Result<UserResource, ApiError> {
    let post_count = state.posts.post_count(account.id).await?;
    Ok(UserResource::new(&state.links, account, post_count))
}

pub(crate) async fn post_collection(
    state: &ApiState,
    path: &str,
    page: Page<Post>,
) -> Result<Collection<PostResource>, ApiError> {
    let mut items = Vec::with_capacity(page.items.len());
    for post in &page.items {
        let comment_count = state.comments.comment_count(post.id).await?;
        items.push(PostResource::new(&state.links, post, comment_count));
    }
    Ok(Collection::from_page("posts", &state.links, path, &page, items))
}

#[instrument(skip(state), fields(user_id = %id))]
pub async fn get_user_handler(
    State(state): State<ApiState>,
    Path(id): Path<AccountId>,
) -> Result<Json<UserResource>, ApiError> {
    let account = state.accounts.get_account(id).await?;
    Ok(Json(user_resource(&state, &account).await?))
}

#[instrument(skip(state, query), fields(user_id = %id))]
pub async fn list_user_posts_handler(
    State(state): State<ApiState>,
    Path(id): Path<AccountId>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Collection<PostResource>>, ApiError> {
    let page =
        state.posts.list_by_author(id, query.page(), state.pagination.posts_per_page).await?;
    let path = format!("/users/{}/posts/", id);
    Ok(Json(post_collection(&state, &path, page).await?))
}

#[instrument(skip(state, query), fields(user_id = %id))]
pub async fn timeline_handler(
    State(state): State<ApiState>,
    Path(id): Path<AccountId>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Collection<PostResource>>, ApiError> {
    let page = state.posts.timeline(id, query.page(), state.pagination.posts_per_page).await?;
    let path = format!("/users/{}/timeline", id);
    Ok(Json(post_collection(&state, &path, page).await?))
}

#[instrument(skip(state, query), fields(user_id = %id))]
pub async fn list_followers_handler(
    State(state): State<ApiState>,
    Path(id): Path<AccountId>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Collection<FollowResource>>, ApiError> {
    let page =
        state.follows.followers(id, query.page(), state.pagination.followers_per_page).await?;
    let items = page.items.iter().map(|entry| FollowResource::new(&state.links, entry)).collect();
    let path = format!("/users/{}/followers", id);
    Ok(Json(Collection::from_page("followers", &state.links, &path, &page, items)))
}

#[instrument(skip(state, query), fields(user_id = %id))]
pub async fn list_following_handler(
    State(state): State<ApiState>,
    Path(id): Path<AccountId>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Collection<FollowResource>>, ApiError> {
    let page =
        state.follows.following(id, query.page(), state.pagination.followers_per_page).await?;
    let items = page.items.iter().map(|entry| FollowResource::new(&state.links, entry)).collect();
    let path = format!("/users/{}/following", id);
    Ok(Json(Collection::from_page("following", &state.links, &path, &page, items)))
}

#[instrument(skip(state, principal), fields(target = %id))]
pub async fn follow_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<AccountId>,
) -> Result<Json<FollowStatus>, ApiError> {
    state.follows.follow(&principal, id).await?;
    Ok(Json(FollowStatus { following: true }))
}

#[instrument(skip(state, principal), fields(target = %id))]
pub async fn unfollow_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<AccountId>,
) -> Result<Json<FollowStatus>, ApiError> {
    state.follows.unfollow(&principal, id).await?;
    Ok(Json(FollowStatus { following: false }))
}

#[instrument(skip(state, principal, payload), fields(target = %id, role = %payload.role))]
pub async fn update_role_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<AccountId>,
    Json(payload): Json<RoleAssignmentRequest>,
) -> Result<Json<UserResource>, ApiError> {
    payload.validate()?;
    let account = state.accounts.assign_role(&principal, id, &payload.role).await?;
    Ok(Json(user_resource(&state, &account).await?))
}

#[instrument(skip(state, principal, payload), fields(target = %id))]
pub async fn admin_update_account_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<AccountId>,
    Json(payload): Json<AdminAccountRequest>,
) -> Result<Json<UserResource>, ApiError> {
    let account = state.accounts.admin_update_account(&principal, id, payload).await?;
    Ok(Json(user_resource(&state, &account).await?))
}
