//! Comment listing and moderation handlers.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use tracing::instrument;

use crate::api::dto::{CommentResource, ModerationRequest};
use crate::api::error::ApiError;
use crate::api::handlers::pagination::{Collection, PageQuery};
use crate::api::routes::ApiState;
use crate::auth::Principal;
use crate::domain::CommentId;

#[instrument(skip(state, query))]
pub async fn list_comments_handler(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Collection<CommentResource>>, ApiError> {
    let page =
        state.comments.list_comments(query.page(), state.pagination.comments_per_page).await?;
    let items =
        page.items.iter().map(|comment| CommentResource::new(&state.links, comment)).collect();
    Ok(Json(Collection::from_page("comments", &state.links, "/comments/", &page, items)))
}

#[instrument(skip(state), fields(comment_id = %id))]
pub async fn get_comment_handler(
    State(state): State<ApiState>,
    Path(id): Path<CommentId>,
) -> Result<Json<CommentResource>, ApiError> {
    let comment = state.comments.get_comment(id).await?;
    Ok(Json(CommentResource::new(&state.links, &comment)))
}

#[instrument(
    skip(state, principal, payload),
    fields(comment_id = %id, disabled = payload.disabled)
)]
pub async fn moderate_comment_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<CommentId>,
    Json(payload): Json<ModerationRequest>,
) -> Result<Json<CommentResource>, ApiError> {
    let comment = state.comments.moderate(&principal, id, payload.disabled).await?;
    Ok(Json(CommentResource::new(&state.links, &comment)))
}
