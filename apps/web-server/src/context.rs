//! Per-request context handed to every view.

use std::collections::HashMap;
use std::future::{Ready, ready};

use actix_web::{FromRequest, HttpRequest, dev::Payload, web};

use yatube_core::forms::FormData;

use crate::middleware::auth::{Identity, identify};
use crate::middleware::error::{AppError, AppResult};

/// Who is asking, for which path, with which query and form payload.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub viewer: Option<Identity>,
    pub path: String,
    pub query_string: String,
    pub query: HashMap<String, String>,
    /// Present on form submissions only.
    pub form: Option<FormData>,
}

impl RequestContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_viewer(mut self, viewer: Identity) -> Self {
        self.viewer = Some(viewer);
        self
    }

    pub fn with_query(mut self, query_string: &str) -> Self {
        self.query = web::Query::<HashMap<String, String>>::from_query(query_string)
            .map(web::Query::into_inner)
            .unwrap_or_default();
        self.query_string = query_string.to_string();
        self
    }

    pub fn with_form(mut self, form: FormData) -> Self {
        self.form = Some(form);
        self
    }

    /// Path plus query string, as the client requested it.
    pub fn full_path(&self) -> String {
        if self.query_string.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string)
        }
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn page_param(&self) -> Option<&str> {
        self.query_param("page")
    }

    /// The signed-in viewer, or a login redirect back to this page.
    pub fn require_viewer(&self) -> AppResult<&Identity> {
        self.viewer.as_ref().ok_or_else(|| AppError::LoginRequired {
            next: self.full_path(),
        })
    }
}

impl FromRequest for RequestContext {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let ctx = RequestContext::new(req.path()).with_query(req.query_string());
        let ctx = match identify(req) {
            Some(viewer) => ctx.with_viewer(viewer),
            None => ctx,
        };
        ready(Ok(ctx))
    }
}
