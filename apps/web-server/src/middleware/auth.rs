//! Identity extraction from bearer tokens and the session cookie.

use actix_web::{HttpRequest, http::header, web};
use uuid::Uuid;

use yatube_core::ports::TokenClaims;

use crate::state::AppState;

/// Cookie holding the access token issued at login.
pub const AUTH_COOKIE: &str = "auth_token";

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
        }
    }
}

/// Raw token from `Authorization: Bearer` or, failing that, the auth cookie.
fn request_token(req: &HttpRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);

    bearer.or_else(|| req.cookie(AUTH_COOKIE).map(|c| c.value().to_string()))
}

/// Resolve the identity of the caller, if any. Bad tokens count as anonymous.
pub fn identify(req: &HttpRequest) -> Option<Identity> {
    let token = request_token(req)?;

    let Some(state) = req.app_data::<web::Data<AppState>>() else {
        tracing::error!("AppState not found in app data");
        return None;
    };

    match state.tokens.validate_token(&token) {
        Ok(claims) => Some(Identity::from(claims)),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid access token");
            None
        }
    }
}
