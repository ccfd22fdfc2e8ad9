//! Post and per-post comment handlers.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Extension, Json,
};
use tracing::instrument;
use validator::Validate;

use crate::api::dto::{CommentBody, CommentResource, PostBody, PostResource};
use crate::api::error::ApiError;
use crate::api::handlers::pagination::{Collection, PageQuery};
use crate::api::handlers::users::post_collection;
use crate::api::routes::ApiState;
use crate::auth::Principal;
use crate::domain::{Post, PostId};

async fn post_resource(state: &ApiState, post: &Post) -> Result<PostResource, ApiError> {
    let comment_count = state.comments.comment_count(post.id).await?;
    Ok(PostResource::new(&state.links, post, comment_count))
}

pub(crate) fn location(url: &str) -> Result<HeaderMap, ApiError> {
    let value = HeaderValue::from_str(url)
        .map_err(|e| ApiError::Internal(format!("Invalid Location header: {}", e)))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::LOCATION, value);
    Ok(headers)
}

#[instrument(skip(state, query))]
pub async fn list_posts_handler(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Collection<PostResource>>, ApiError> {
    let page = state.posts.list_posts(query.page(), state.pagination.posts_per_page).await?;
    Ok(Json(post_collection(&state, "/posts/", page).await?))
}

#[instrument(skip(state, principal, payload), fields(author = ?principal.account_id()))]
pub async fn create_post_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<PostBody>,
) -> Result<(StatusCode, HeaderMap, Json<PostResource>), ApiError> {
    payload.validate()?;
    let post = state.posts.create_post(&principal, &payload.body).await?;
    let resource = post_resource(&state, &post).await?;
    Ok((StatusCode::CREATED, location(&resource.url)?, Json(resource)))
}

#[instrument(skip(state), fields(post_id = %id))]
pub async fn get_post_handler(
    State(state): State<ApiState>,
    Path(id): Path<PostId>,
) -> Result<Json<PostResource>, ApiError> {
    let post = state.posts.get_post(id).await?;
    Ok(Json(post_resource(&state, &post).await?))
}

#[instrument(skip(state, principal, payload), fields(post_id = %id))]
pub async fn update_post_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<PostId>,
    Json(payload): Json<PostBody>,
) -> Result<Json<PostResource>, ApiError> {
    payload.validate()?;
    let post = state.posts.edit_post(&principal, id, &payload.body).await?;
    Ok(Json(post_resource(&state, &post).await?))
}

#[instrument(skip(state, query), fields(post_id = %id))]
pub async fn list_post_comments_handler(
    State(state): State<ApiState>,
    Path(id): Path<PostId>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Collection<CommentResource>>, ApiError> {
    let page =
        state.comments.list_for_post(id, query.page(), state.pagination.comments_per_page).await?;
    let items =
        page.items.iter().map(|comment| CommentResource::new(&state.links, comment)).collect();
    let path = format!("/posts/{}/comments", id);
    Ok(Json(Collection::from_page("comments", &state.links, &path, &page, items)))
}

#[instrument(skip(state, principal, payload), fields(post_id = %id))]
pub async fn create_comment_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<PostId>,
    Json(payload): Json<CommentBody>,
) -> Result<(StatusCode, HeaderMap, Json<CommentResource>), ApiError> {
    payload.validate()?;
    let comment = state.comments.add_comment(&principal, id, &payload.body).await?;
    let resource = CommentResource::new(&state.links, &comment);
    Ok((StatusCode::CREATED, location(&resource.url)?, Json(resource)))
}
