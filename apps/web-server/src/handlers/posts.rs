//! Post pages and post mutations.

use actix_web::{HttpResponse, web};

use yatube_core::forms::FormData;

use super::submitted;
use crate::context::RequestContext;
use crate::middleware::error::AppResult;
use crate::state::AppState;
use crate::views::{self, posts};

/// GET / - served through the index response cache.
pub async fn index(state: web::Data<AppState>, ctx: RequestContext) -> AppResult<HttpResponse> {
    let body = posts::cached_index(&state, &ctx).await?;
    Ok(views::page_response(body))
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    ctx: RequestContext,
    slug: web::Path<String>,
) -> AppResult<HttpResponse> {
    posts::group_posts(&state, &ctx, &slug).await?.into_response()
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    ctx: RequestContext,
    username: web::Path<String>,
) -> AppResult<HttpResponse> {
    posts::profile(&state, &ctx, &username).await?.into_response()
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    ctx: RequestContext,
    post_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    posts::post_detail(&state, &ctx, &post_id).await?.into_response()
}

/// GET /create/
pub async fn post_create_form(
    state: web::Data<AppState>,
    ctx: RequestContext,
) -> AppResult<HttpResponse> {
    posts::post_create(&state, &ctx).await?.into_response()
}

/// POST /create/
pub async fn post_create(
    state: web::Data<AppState>,
    ctx: RequestContext,
    form: Result<web::Form<FormData>, actix_web::Error>,
) -> AppResult<HttpResponse> {
    let ctx = ctx.with_form(submitted(form));
    posts::post_create(&state, &ctx).await?.into_response()
}

/// GET /posts/{post_id}/edit/
pub async fn post_edit_form(
    state: web::Data<AppState>,
    ctx: RequestContext,
    post_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    posts::post_edit(&state, &ctx, &post_id).await?.into_response()
}

/// POST /posts/{post_id}/edit/
pub async fn post_edit(
    state: web::Data<AppState>,
    ctx: RequestContext,
    post_id: web::Path<String>,
    form: Result<web::Form<FormData>, actix_web::Error>,
) -> AppResult<HttpResponse> {
    let ctx = ctx.with_form(submitted(form));
    posts::post_edit(&state, &ctx, &post_id).await?.into_response()
}

/// POST /posts/{post_id}/comment/
pub async fn add_comment(
    state: web::Data<AppState>,
    ctx: RequestContext,
    post_id: web::Path<String>,
    form: Result<web::Form<FormData>, actix_web::Error>,
) -> AppResult<HttpResponse> {
    let ctx = ctx.with_form(submitted(form));
    posts::add_comment(&state, &ctx, &post_id).await?.into_response()
}
