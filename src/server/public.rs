use axum::extract::{Path, State};
use axum::Json;

use super::{AppState, PostView};
use crate::error::{AppError, AppResult};

/// Published posts, pinned first then newest.
pub async fn list_flyers(State(state): State<AppState>) -> AppResult<Json<Vec<PostView>>> {
    let posts = state.posts.list_posts().await?;
    Ok(Json(posts.into_iter().filter(|p| p.published).map(PostView::from).collect()))
}

pub async fn show_flyer(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<PostView>> {
    match state.posts.get_post(&id).await? {
        Some(post) if post.published => Ok(Json(post.into())),
        _ => Err(AppError::not_found("not_found", "Not found")),
    }
}
