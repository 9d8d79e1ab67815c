//! Account handlers.

use actix_web::{HttpResponse, web};

use yatube_core::forms::FormData;

use super::submitted;
use crate::context::RequestContext;
use crate::middleware::error::AppResult;
use crate::state::AppState;
use crate::views::accounts;

/// GET /auth/signup/
pub async fn signup_page() -> AppResult<HttpResponse> {
    accounts::signup_page().into_response()
}

/// POST /auth/signup/
pub async fn signup(
    state: web::Data<AppState>,
    ctx: RequestContext,
    form: Result<web::Form<FormData>, actix_web::Error>,
) -> AppResult<HttpResponse> {
    let ctx = ctx.with_form(submitted(form));
    accounts::signup(&state, &ctx).await?.into_response()
}

/// GET /auth/login/
pub async fn login_page(ctx: RequestContext) -> AppResult<HttpResponse> {
    accounts::login_page(&ctx).into_response()
}

/// POST /auth/login/
pub async fn login(
    state: web::Data<AppState>,
    ctx: RequestContext,
    form: Result<web::Form<FormData>, actix_web::Error>,
) -> AppResult<HttpResponse> {
    let ctx = ctx.with_form(submitted(form));
    accounts::login(&state, &ctx).await?.into_response()
}

/// GET|POST /auth/logout/
pub async fn logout() -> AppResult<HttpResponse> {
    accounts::logout().into_response()
}

/// POST /auth/token/
pub async fn token(
    state: web::Data<AppState>,
    form: Result<web::Form<FormData>, actix_web::Error>,
) -> AppResult<HttpResponse> {
    let response = accounts::issue_token(&state, &submitted(form)).await?;
    Ok(HttpResponse::Ok().json(response))
}
