//! Page payloads - the data each rendered page needs.
//!
//! A rendered page is serialized as `{"template": ..., "context": ...}`, where
//! `template` names the page and `context` holds the variables it displays.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorView {
    pub id: String,
    pub username: String,
}

/// Public view of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupView {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// A post with its author and group resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: String,
    pub text: String,
    /// First 15 characters, for list headings.
    pub summary: String,
    pub pub_date: String,
    pub author: AuthorView,
    pub group: Option<GroupView>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: String,
    pub text: String,
    pub created: String,
    pub author: AuthorView,
}

/// One page of items with navigation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageView<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_page_number: Option<u64>,
    pub next_page_number: Option<u64>,
}

/// Submitted (or initial) form values plus field-level errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormView {
    pub values: BTreeMap<String, String>,
    pub errors: BTreeMap<String, Vec<String>>,
}

impl FormView {
    pub fn is_bound(&self) -> bool {
        !self.values.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPage {
    pub page_obj: PageView<PostView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPage {
    pub group: GroupView,
    pub page_obj: PageView<PostView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePage {
    pub author: AuthorView,
    pub post_count: u64,
    /// Whether the current viewer follows this author.
    pub following: bool,
    pub page_obj: PageView<PostView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetailPage {
    pub post: PostView,
    pub author_posts: u64,
    pub comments: Vec<CommentView>,
    pub form: FormView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostFormPage {
    pub form: FormView,
    pub groups: Vec<GroupView>,
    pub is_edit: bool,
    pub post_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowPage {
    pub page_obj: PageView<PostView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginPage {
    pub next: Option<String>,
    pub form: FormView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupPage {
    pub form: FormView,
}

/// Every page the server renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", content = "context")]
pub enum PageBody {
    #[serde(rename = "posts/index.html")]
    Index(IndexPage),
    #[serde(rename = "posts/group_list.html")]
    GroupList(GroupPage),
    #[serde(rename = "posts/profile.html")]
    Profile(ProfilePage),
    #[serde(rename = "posts/post_detail.html")]
    PostDetail(PostDetailPage),
    #[serde(rename = "posts/create_post.html")]
    PostForm(PostFormPage),
    #[serde(rename = "posts/follow.html")]
    Follow(FollowPage),
    #[serde(rename = "users/login.html")]
    Login(LoginPage),
    #[serde(rename = "users/signup.html")]
    Signup(SignupPage),
}

impl PageBody {
    /// Template name this page renders with.
    pub fn template(&self) -> &'static str {
        match self {
            PageBody::Index(_) => "posts/index.html",
            PageBody::GroupList(_) => "posts/group_list.html",
            PageBody::Profile(_) => "posts/profile.html",
            PageBody::PostDetail(_) => "posts/post_detail.html",
            PageBody::PostForm(_) => "posts/create_post.html",
            PageBody::Follow(_) => "posts/follow.html",
            PageBody::Login(_) => "users/login.html",
            PageBody::Signup(_) => "users/signup.html",
        }
    }
}

/// Response containing an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}
