//! Follow feed and subscription toggles.

use actix_web::{HttpResponse, web};

use crate::context::RequestContext;
use crate::middleware::error::AppResult;
use crate::state::AppState;
use crate::views::follow;

/// GET /follow/
pub async fn follow_index(
    state: web::Data<AppState>,
    ctx: RequestContext,
) -> AppResult<HttpResponse> {
    follow::follow_index(&state, &ctx).await?.into_response()
}

/// GET /profile/{username}/follow/
pub async fn profile_follow(
    state: web::Data<AppState>,
    ctx: RequestContext,
    username: web::Path<String>,
) -> AppResult<HttpResponse> {
    follow::profile_follow(&state, &ctx, &username)
        .await?
        .into_response()
}

/// GET /profile/{username}/unfollow/
pub async fn profile_unfollow(
    state: web::Data<AppState>,
    ctx: RequestContext,
    username: web::Path<String>,
) -> AppResult<HttpResponse> {
    follow::profile_unfollow(&state, &ctx, &username)
        .await?
        .into_response()
}
