//! Subscriptions: the followed-authors feed and follow/unfollow actions.

use yatube_core::domain::{Follow, User};
use yatube_core::error::{DomainError, RepoError};
use yatube_core::ports::PostFilter;
use yatube_shared::PageBody;
use yatube_shared::dto::FollowPage;

use super::{FOLLOW_INDEX_URL, ViewOutcome, paginate_posts};
use crate::context::RequestContext;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Posts by every author the viewer follows, newest first.
pub async fn follow_index(state: &AppState, ctx: &RequestContext) -> AppResult<ViewOutcome> {
    let viewer = ctx.require_viewer()?;
    let page_obj = paginate_posts(state, ctx, PostFilter::FollowedBy(viewer.user_id)).await?;
    Ok(ViewOutcome::Render(PageBody::Follow(FollowPage { page_obj })))
}

async fn find_author(state: &AppState, username: &str) -> AppResult<User> {
    Ok(state
        .users
        .find_by_username(username)
        .await?
        .ok_or_else(|| DomainError::not_found("user", username))?)
}

/// Follow `username`. Repeats and self-follows change nothing.
pub async fn profile_follow(
    state: &AppState,
    ctx: &RequestContext,
    username: &str,
) -> AppResult<ViewOutcome> {
    let viewer = ctx.require_viewer()?;
    let author = find_author(state, username).await?;

    match Follow::between(viewer.user_id, author.id) {
        Some(relation) => {
            let (_, created) = state.follows.get_or_create(relation).await?;
            if created {
                tracing::info!(user = %viewer.username, author = %author.username, "Followed author");
            }
        }
        None => tracing::debug!(user = %viewer.username, "Ignoring self-follow"),
    }

    Ok(ViewOutcome::redirect(FOLLOW_INDEX_URL))
}

/// Unfollow `username`. A relation that does not exist is a server error.
pub async fn profile_unfollow(
    state: &AppState,
    ctx: &RequestContext,
    username: &str,
) -> AppResult<ViewOutcome> {
    let viewer = ctx.require_viewer()?;
    let author = find_author(state, username).await?;

    match state.follows.delete_pair(viewer.user_id, author.id).await {
        Ok(()) => {
            tracing::info!(user = %viewer.username, author = %author.username, "Unfollowed author");
            Ok(ViewOutcome::redirect(FOLLOW_INDEX_URL))
        }
        Err(RepoError::NotFound) => Err(AppError::Internal(format!(
            "{} does not follow {}",
            viewer.username, author.username
        ))),
        Err(e) => Err(e.into()),
    }
}
