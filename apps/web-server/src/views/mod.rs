//! Views: turn a request context into a rendered page or a redirect.
//!
//! Views know nothing about actix; handlers adapt them to HTTP.

pub mod accounts;
pub mod follow;
pub mod posts;

use std::collections::{BTreeMap, HashMap, HashSet};

use actix_web::cookie::{Cookie, SameSite, time};
use actix_web::http::header::{self, ContentType};
use actix_web::HttpResponse;
use uuid::Uuid;

use yatube_core::domain::{Comment, Group, Post, User};
use yatube_core::forms::{FormData, FormErrors};
use yatube_core::ports::PostFilter;
use yatube_core::Page;
use yatube_shared::PageBody;
use yatube_shared::dto::{AuthorView, CommentView, FormView, GroupView, PageView, PostView};

use crate::context::RequestContext;
use crate::middleware::auth::AUTH_COOKIE;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// What a view decided to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOutcome {
    Render(PageBody),
    Redirect(String),
    /// Redirect and set the session cookie.
    SignIn {
        token: String,
        max_age_secs: i64,
        location: String,
    },
    /// Redirect and clear the session cookie.
    SignOut { location: String },
}

impl ViewOutcome {
    pub fn redirect(location: impl Into<String>) -> Self {
        ViewOutcome::Redirect(location.into())
    }

    pub fn into_response(self) -> AppResult<HttpResponse> {
        let response = match self {
            ViewOutcome::Render(page) => page_response(render_body(&page)?),
            ViewOutcome::Redirect(location) => found(location).finish(),
            ViewOutcome::SignIn {
                token,
                max_age_secs,
                location,
            } => {
                let cookie = Cookie::build(AUTH_COOKIE, token)
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .max_age(time::Duration::seconds(max_age_secs))
                    .finish();
                found(location).cookie(cookie).finish()
            }
            ViewOutcome::SignOut { location } => {
                let mut cookie = Cookie::build(AUTH_COOKIE, "").path("/").finish();
                cookie.make_removal();
                found(location).cookie(cookie).finish()
            }
        };
        Ok(response)
    }
}

fn found(location: String) -> actix_web::HttpResponseBuilder {
    let mut builder = HttpResponse::Found();
    builder.insert_header((header::LOCATION, location));
    builder
}

/// Serialize a page to the body sent to the client.
pub fn render_body(page: &PageBody) -> AppResult<String> {
    Ok(serde_json::to_string(page)?)
}

/// 200 response carrying an already-rendered page body.
pub fn page_response(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(body)
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", username)
}

pub fn post_detail_url(post_id: Uuid) -> String {
    format!("/posts/{}/", post_id)
}

pub const FOLLOW_INDEX_URL: &str = "/follow/";

/// Parse a post id from the URL; anything malformed is simply not found.
pub fn parse_post_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("post '{}' not found", raw)))
}

pub fn author_view(user: &User) -> AuthorView {
    AuthorView {
        id: user.id.to_string(),
        username: user.username.clone(),
    }
}

pub fn group_view(group: &Group) -> GroupView {
    GroupView {
        id: group.id.to_string(),
        title: group.title.clone(),
        slug: group.slug.clone(),
        description: group.description.clone(),
    }
}

pub fn post_view(post: &Post, author: &User, group: Option<&Group>) -> PostView {
    PostView {
        id: post.id.to_string(),
        text: post.text.clone(),
        summary: post.summary().to_string(),
        pub_date: post.pub_date.to_rfc3339(),
        author: author_view(author),
        group: group.map(group_view),
        image: post.image.clone(),
    }
}

pub fn comment_view(comment: &Comment, author: &User) -> CommentView {
    CommentView {
        id: comment.id.to_string(),
        text: comment.text.clone(),
        created: comment.created.to_rfc3339(),
        author: author_view(author),
    }
}

pub fn page_view<T>(page: Page<T>) -> PageView<T> {
    PageView {
        has_previous: page.has_previous(),
        has_next: page.has_next(),
        previous_page_number: page.previous_page_number(),
        next_page_number: page.next_page_number(),
        number: page.number,
        num_pages: page.num_pages,
        count: page.count,
        items: page.items,
    }
}

/// Form view from the submitted payload and its errors.
pub fn form_view(data: &FormData, errors: FormErrors) -> FormView {
    FormView {
        values: data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect::<BTreeMap<_, _>>(),
        errors: errors.into_map(),
    }
}

fn unique_ids(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

async fn users_by_id(state: &AppState, ids: Vec<Uuid>) -> AppResult<HashMap<Uuid, User>> {
    Ok(state
        .users
        .find_by_ids(&ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect())
}

fn missing_author(author_id: Uuid) -> AppError {
    AppError::Internal(format!("author {} missing from store", author_id))
}

/// Resolve authors and groups for a batch of posts.
pub async fn post_views(state: &AppState, posts: Vec<Post>) -> AppResult<Vec<PostView>> {
    let authors = users_by_id(state, unique_ids(posts.iter().map(|p| p.author_id))).await?;
    let group_ids = unique_ids(posts.iter().filter_map(|p| p.group_id));
    let groups: HashMap<Uuid, Group> = if group_ids.is_empty() {
        HashMap::new()
    } else {
        state
            .groups
            .find_by_ids(&group_ids)
            .await?
            .into_iter()
            .map(|group| (group.id, group))
            .collect()
    };

    posts
        .iter()
        .map(|post| {
            let author = authors
                .get(&post.author_id)
                .ok_or_else(|| missing_author(post.author_id))?;
            let group = post.group_id.and_then(|id| groups.get(&id));
            Ok(post_view(post, author, group))
        })
        .collect()
}

/// Resolve authors for a batch of comments.
pub async fn comment_views(state: &AppState, comments: Vec<Comment>) -> AppResult<Vec<CommentView>> {
    let authors = users_by_id(state, unique_ids(comments.iter().map(|c| c.author_id))).await?;

    comments
        .iter()
        .map(|comment| {
            let author = authors
                .get(&comment.author_id)
                .ok_or_else(|| missing_author(comment.author_id))?;
            Ok(comment_view(comment, author))
        })
        .collect()
}

/// One page of posts matching `filter`, page number taken from `?page=`.
pub async fn paginate_posts(
    state: &AppState,
    ctx: &RequestContext,
    filter: PostFilter,
) -> AppResult<PageView<PostView>> {
    let count = state.posts.count(&filter).await?;
    let window = state.paginator.resolve(count, ctx.page_param());
    let posts = state.posts.list(&filter, window.offset, window.limit).await?;
    let items = post_views(state, posts).await?;
    Ok(page_view(window.into_page(items)))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Seeded in-memory state for view and handler tests.

    use std::sync::Arc;
    use std::time::Duration;

    use yatube_core::domain::{Group, Post, User};
    use yatube_infra::{
        Argon2PasswordService, InMemoryCache, InMemoryStore, JwtConfig, JwtTokenService,
        ResponseCache,
    };

    use crate::context::RequestContext;
    use crate::middleware::auth::Identity;
    use crate::state::{AppState, Repositories};

    pub fn state() -> AppState {
        state_with_ttl(Duration::from_secs(20))
    }

    pub fn state_with_ttl(ttl: Duration) -> AppState {
        AppState::from_parts(
            Repositories::in_memory(&InMemoryStore::new()),
            ResponseCache::new(Arc::new(InMemoryCache::new()), "index_page", ttl),
            Arc::new(JwtTokenService::new(JwtConfig::default())),
            Arc::new(Argon2PasswordService::new()),
        )
    }

    pub async fn user(state: &AppState, username: &str) -> User {
        let hash = state.passwords.hash("correct-horse").unwrap();
        state
            .users
            .insert(User::new(username.to_string(), hash))
            .await
            .unwrap()
    }

    pub async fn group(state: &AppState, slug: &str) -> Group {
        state
            .groups
            .insert(Group::new(
                format!("Group {}", slug),
                slug.to_string(),
                "About".to_string(),
            ))
            .await
            .unwrap()
    }

    pub async fn post(state: &AppState, author: &User, text: &str, group: Option<&Group>) -> Post {
        state
            .posts
            .insert(Post::new(author.id, text.to_string(), group.map(|g| g.id)))
            .await
            .unwrap()
    }

    pub fn as_user(ctx: RequestContext, user: &User) -> RequestContext {
        ctx.with_viewer(Identity {
            user_id: user.id,
            username: user.username.clone(),
        })
    }

    pub fn form(pairs: &[(&str, &str)]) -> yatube_core::forms::FormData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}
