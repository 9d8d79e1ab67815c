//! Post feeds, post detail, authoring and comments.

use std::collections::BTreeMap;

use uuid::Uuid;

use yatube_core::domain::{Comment, Post};
use yatube_core::error::DomainError;
use yatube_core::forms::{
    CommentForm, FormData, FormErrors, INVALID_CHOICE_MESSAGE, InputSchema, PostForm,
};
use yatube_core::ports::PostFilter;
use yatube_shared::PageBody;
use yatube_shared::dto::{
    FormView, GroupPage, IndexPage, PostDetailPage, PostFormPage, ProfilePage,
};

use super::{
    ViewOutcome, comment_views, form_view, group_view, missing_author, paginate_posts,
    parse_post_id, post_detail_url, post_view, profile_url, render_body,
};
use crate::context::RequestContext;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// Newest posts across the whole site.
pub async fn index_page(state: &AppState, ctx: &RequestContext) -> AppResult<PageBody> {
    let page_obj = paginate_posts(state, ctx, PostFilter::All).await?;
    Ok(PageBody::Index(IndexPage { page_obj }))
}

/// Index body served through the response cache, keyed by path and query.
///
/// A cached body is returned unchanged until its TTL runs out, even if
/// posts were created or deleted in the meantime.
pub async fn cached_index(state: &AppState, ctx: &RequestContext) -> AppResult<String> {
    state
        .index_cache
        .get_or_render(&ctx.full_path(), || async {
            render_body(&index_page(state, ctx).await?)
        })
        .await
}

pub async fn group_posts(
    state: &AppState,
    ctx: &RequestContext,
    slug: &str,
) -> AppResult<ViewOutcome> {
    let group = state
        .groups
        .find_by_slug(slug)
        .await?
        .ok_or_else(|| DomainError::not_found("group", slug))?;

    let page_obj = paginate_posts(state, ctx, PostFilter::Group(group.id)).await?;
    Ok(ViewOutcome::Render(PageBody::GroupList(GroupPage {
        group: group_view(&group),
        page_obj,
    })))
}

pub async fn profile(
    state: &AppState,
    ctx: &RequestContext,
    username: &str,
) -> AppResult<ViewOutcome> {
    let author = state
        .users
        .find_by_username(username)
        .await?
        .ok_or_else(|| DomainError::not_found("user", username))?;

    let post_count = state.posts.count_by_author(author.id).await?;
    let following = match &ctx.viewer {
        Some(viewer) => state.follows.exists(viewer.user_id, author.id).await?,
        None => false,
    };
    let page_obj = paginate_posts(state, ctx, PostFilter::Author(author.id)).await?;

    Ok(ViewOutcome::Render(PageBody::Profile(ProfilePage {
        author: super::author_view(&author),
        post_count,
        following,
        page_obj,
    })))
}

async fn find_post(state: &AppState, post_id: Uuid) -> AppResult<Post> {
    Ok(state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| DomainError::not_found("post", post_id))?)
}

pub async fn post_detail(
    state: &AppState,
    _ctx: &RequestContext,
    raw_post_id: &str,
) -> AppResult<ViewOutcome> {
    let post = find_post(state, parse_post_id(raw_post_id)?).await?;
    let author = state
        .users
        .find_by_id(post.author_id)
        .await?
        .ok_or_else(|| missing_author(post.author_id))?;
    let group = match post.group_id {
        Some(group_id) => state.groups.find_by_id(group_id).await?,
        None => None,
    };

    let author_posts = state.posts.count_by_author(author.id).await?;
    let comments = comment_views(state, state.comments.find_by_post(post.id).await?).await?;

    Ok(ViewOutcome::Render(PageBody::PostDetail(PostDetailPage {
        post: post_view(&post, &author, group.as_ref()),
        author_posts,
        comments,
        form: FormView::default(),
    })))
}

/// Parse a post form and check the chosen group exists.
async fn checked_post_form(
    state: &AppState,
    data: &FormData,
) -> AppResult<Result<PostForm, FormErrors>> {
    let form = match PostForm::parse(data) {
        Ok(form) => form,
        Err(errors) => return Ok(Err(errors)),
    };

    if let Some(group_id) = form.group {
        if state.groups.find_by_id(group_id).await?.is_none() {
            let mut errors = FormErrors::new();
            errors.add("group", INVALID_CHOICE_MESSAGE);
            return Ok(Err(errors));
        }
    }
    Ok(Ok(form))
}

async fn form_page(
    state: &AppState,
    form: FormView,
    editing: Option<Uuid>,
) -> AppResult<ViewOutcome> {
    let groups = state.groups.list().await?.iter().map(group_view).collect();
    Ok(ViewOutcome::Render(PageBody::PostForm(PostFormPage {
        form,
        groups,
        is_edit: editing.is_some(),
        post_id: editing.map(|id| id.to_string()),
    })))
}

pub async fn post_create(state: &AppState, ctx: &RequestContext) -> AppResult<ViewOutcome> {
    let viewer = ctx.require_viewer()?;

    let Some(data) = &ctx.form else {
        return form_page(state, FormView::default(), None).await;
    };

    match checked_post_form(state, data).await? {
        Ok(form) => {
            let mut post = Post::new(viewer.user_id, form.text, form.group);
            if let Some(image) = form.image {
                post = post.with_image(image);
            }
            let post = state.posts.insert(post).await?;
            tracing::info!(post_id = %post.id, author = %viewer.username, "Post created");
            Ok(ViewOutcome::redirect(profile_url(&viewer.username)))
        }
        Err(errors) => form_page(state, form_view(data, errors), None).await,
    }
}

fn initial_values(post: &Post) -> FormView {
    let mut values = BTreeMap::new();
    values.insert("text".to_string(), post.text.clone());
    values.insert(
        "group".to_string(),
        post.group_id.map(|id| id.to_string()).unwrap_or_default(),
    );
    if let Some(image) = &post.image {
        values.insert("image".to_string(), image.clone());
    }
    FormView {
        values,
        errors: BTreeMap::new(),
    }
}

pub async fn post_edit(
    state: &AppState,
    ctx: &RequestContext,
    raw_post_id: &str,
) -> AppResult<ViewOutcome> {
    let viewer = ctx.require_viewer()?;
    let mut post = find_post(state, parse_post_id(raw_post_id)?).await?;

    if !post.is_authored_by(viewer.user_id) {
        tracing::debug!(post_id = %post.id, user = %viewer.username, "Edit by non-author refused");
        return Ok(ViewOutcome::redirect(post_detail_url(post.id)));
    }

    let Some(data) = &ctx.form else {
        return form_page(state, initial_values(&post), Some(post.id)).await;
    };

    match checked_post_form(state, data).await? {
        Ok(form) => {
            post.edit(form.text, form.group, form.image);
            let post = state.posts.update(post).await?;
            tracing::info!(post_id = %post.id, "Post edited");
            Ok(ViewOutcome::redirect(post_detail_url(post.id)))
        }
        Err(errors) => form_page(state, form_view(data, errors), Some(post.id)).await,
    }
}

/// Attach a comment. Invalid submissions are dropped; both paths redirect
/// back to the post.
pub async fn add_comment(
    state: &AppState,
    ctx: &RequestContext,
    raw_post_id: &str,
) -> AppResult<ViewOutcome> {
    let viewer = ctx.require_viewer()?;
    let post = find_post(state, parse_post_id(raw_post_id)?).await?;

    let data = ctx.form.clone().unwrap_or_default();
    match CommentForm::parse(&data) {
        Ok(form) => {
            let comment = state
                .comments
                .insert(Comment::new(post.id, viewer.user_id, form.text))
                .await?;
            tracing::info!(comment_id = %comment.id, post_id = %post.id, "Comment added");
        }
        Err(errors) => {
            tracing::debug!(post_id = %post.id, ?errors, "Dropping invalid comment");
        }
    }

    Ok(ViewOutcome::redirect(post_detail_url(post.id)))
}
