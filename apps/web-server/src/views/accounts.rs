//! Account views: signup, login, logout and API token issue.

use yatube_core::domain::User;
use yatube_core::error::RepoError;
use yatube_core::forms::{FormData, FormErrors, InputSchema, LoginForm, SignupForm, safe_next};
use yatube_shared::PageBody;
use yatube_shared::dto::{AuthResponse, FormView, LoginPage, SignupPage};

use super::{ViewOutcome, form_view};
use crate::context::RequestContext;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

pub const DUPLICATE_USERNAME_MESSAGE: &str = "A user with that username already exists.";
pub const INVALID_LOGIN_MESSAGE: &str = "Please enter a correct username and password.";

/// Form errors not tied to a single field.
const NON_FIELD_ERRORS: &str = "__all__";

/// Echo submitted values back without the password.
fn redisplayed(data: &FormData, errors: FormErrors) -> FormView {
    let mut view = form_view(data, errors);
    view.values.remove("password");
    view
}

fn signup_form(form: FormView) -> ViewOutcome {
    ViewOutcome::Render(PageBody::Signup(SignupPage { form }))
}

fn login_form(next: Option<String>, form: FormView) -> ViewOutcome {
    ViewOutcome::Render(PageBody::Login(LoginPage { next, form }))
}

pub fn signup_page() -> ViewOutcome {
    signup_form(FormView::default())
}

/// Register an account, then send the visitor to the index.
pub async fn signup(state: &AppState, ctx: &RequestContext) -> AppResult<ViewOutcome> {
    let Some(data) = &ctx.form else {
        return Ok(signup_page());
    };

    let form = match SignupForm::parse(data) {
        Ok(form) => form,
        Err(errors) => return Ok(signup_form(redisplayed(data, errors))),
    };

    if state.users.find_by_username(&form.username).await?.is_some() {
        return Ok(duplicate_username(data));
    }

    let password_hash = state.passwords.hash(&form.password)?;
    let user = match state.users.insert(User::new(form.username, password_hash)).await {
        Ok(user) => user,
        // Lost a race with a concurrent signup for the same name.
        Err(RepoError::Constraint(msg)) => {
            tracing::debug!(reason = %msg, "Signup rejected by unique username");
            return Ok(duplicate_username(data));
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(user_id = %user.id, username = %user.username, "Account created");

    Ok(ViewOutcome::redirect("/"))
}

fn duplicate_username(data: &FormData) -> ViewOutcome {
    let mut errors = FormErrors::new();
    errors.add("username", DUPLICATE_USERNAME_MESSAGE);
    signup_form(redisplayed(data, errors))
}

pub fn login_page(ctx: &RequestContext) -> ViewOutcome {
    let next = safe_next(ctx.query_param("next")).map(str::to_string);
    login_form(next, FormView::default())
}

/// Check credentials. `None` covers both unknown users and wrong passwords.
pub async fn authenticate(
    state: &AppState,
    username: &str,
    password: &str,
) -> AppResult<Option<User>> {
    let Some(user) = state.users.find_by_username(username).await? else {
        return Ok(None);
    };
    if state.passwords.verify(password, &user.password_hash)? {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

/// Sign in and return to `next`, or redisplay the form.
pub async fn login(state: &AppState, ctx: &RequestContext) -> AppResult<ViewOutcome> {
    let Some(data) = &ctx.form else {
        return Ok(login_page(ctx));
    };

    let next = safe_next(data.get("next").map(String::as_str).or(ctx.query_param("next")))
        .map(str::to_string);

    let form = match LoginForm::parse(data) {
        Ok(form) => form,
        Err(errors) => return Ok(login_form(next, redisplayed(data, errors))),
    };

    let Some(user) = authenticate(state, &form.username, &form.password).await? else {
        tracing::debug!(username = %form.username, "Login refused");
        let mut errors = FormErrors::new();
        errors.add(NON_FIELD_ERRORS, INVALID_LOGIN_MESSAGE);
        return Ok(login_form(next, redisplayed(data, errors)));
    };

    let token = state.tokens.generate_token(user.id, &user.username)?;
    tracing::info!(user_id = %user.id, "User signed in");

    Ok(ViewOutcome::SignIn {
        token,
        max_age_secs: state.tokens.expiration_seconds(),
        location: form.redirect_target().to_string(),
    })
}

pub fn logout() -> ViewOutcome {
    ViewOutcome::SignOut {
        location: "/".to_string(),
    }
}

/// Exchange credentials for a bearer token.
pub async fn issue_token(state: &AppState, data: &FormData) -> AppResult<AuthResponse> {
    let form = LoginForm::parse(data).map_err(|errors| {
        let fields: Vec<&str> = errors.fields().collect();
        AppError::BadRequest(format!("Invalid fields: {}", fields.join(", ")))
    })?;

    let user = authenticate(state, &form.username, &form.password)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let token = state.tokens.generate_token(user.id, &user.username)?;
    Ok(AuthResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.expiration_seconds().max(0) as u64,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;
    use yatube_core::ports::{BaseRepository, UserRepository};

    use super::*;
    use crate::views::testing::{self, form};

    #[tokio::test]
    async fn test_signup_creates_account_with_hashed_password() {
        let state = testing::state();
        let ctx = RequestContext::new("/auth/signup/")
            .with_form(form(&[("username", "newbie"), ("password", "s3cret-pass")]));

        let outcome = signup(&state, &ctx).await.unwrap();

        assert_eq!(outcome, ViewOutcome::redirect("/"));
        let user = state.users.find_by_username("newbie").await.unwrap().unwrap();
        assert_ne!(user.password_hash, "s3cret-pass");
        assert!(state.passwords.verify("s3cret-pass", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_signup_rejects_taken_username() {
        let state = testing::state();
        testing::user(&state, "leo").await;
        let ctx = RequestContext::new("/auth/signup/")
            .with_form(form(&[("username", "leo"), ("password", "another-pass")]));

        let ViewOutcome::Render(PageBody::Signup(page)) = signup(&state, &ctx).await.unwrap()
        else {
            panic!("expected signup form")
        };

        assert_eq!(
            page.form.errors["username"],
            vec![DUPLICATE_USERNAME_MESSAGE.to_string()]
        );
        assert!(!page.form.values.contains_key("password"));
    }

    /// Username lookups always miss, as when a concurrent signup commits
    /// between the check and the insert.
    struct StaleLookup(Arc<dyn UserRepository>);

    #[async_trait::async_trait]
    impl BaseRepository<User, Uuid> for StaleLookup {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
            self.0.find_by_id(id).await
        }

        async fn insert(&self, user: User) -> Result<User, RepoError> {
            self.0.insert(user).await
        }

        async fn update(&self, user: User) -> Result<User, RepoError> {
            self.0.update(user).await
        }

        async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
            self.0.delete(id).await
        }
    }

    #[async_trait::async_trait]
    impl UserRepository for StaleLookup {
        async fn find_by_username(&self, _username: &str) -> Result<Option<User>, RepoError> {
            Ok(None)
        }

        async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
            self.0.find_by_ids(ids).await
        }
    }

    #[tokio::test]
    async fn test_signup_race_on_username_redisplays_form() {
        let mut state = testing::state();
        testing::user(&state, "leo").await;
        state.users = Arc::new(StaleLookup(state.users.clone()));
        let ctx = RequestContext::new("/auth/signup/")
            .with_form(form(&[("username", "leo"), ("password", "another-pass")]));

        let ViewOutcome::Render(PageBody::Signup(page)) = signup(&state, &ctx).await.unwrap()
        else {
            panic!("expected signup form")
        };

        assert_eq!(
            page.form.errors["username"],
            vec![DUPLICATE_USERNAME_MESSAGE.to_string()]
        );
    }

    #[tokio::test]
    async fn test_signup_rejects_short_password() {
        let state = testing::state();
        let ctx = RequestContext::new("/auth/signup/")
            .with_form(form(&[("username", "newbie"), ("password", "short")]));

        let ViewOutcome::Render(PageBody::Signup(page)) = signup(&state, &ctx).await.unwrap()
        else {
            panic!("expected signup form")
        };

        assert!(page.form.errors.contains_key("password"));
        assert!(state.users.find_by_username("newbie").await.unwrap().is_none());
    }

    #[test]
    fn test_login_page_keeps_local_next_only() {
        let local = login_page(&RequestContext::new("/auth/login/").with_query("next=/create/"));
        let offsite =
            login_page(&RequestContext::new("/auth/login/").with_query("next=//evil.example/"));

        let ViewOutcome::Render(PageBody::Login(local)) = local else {
            panic!("expected login page")
        };
        let ViewOutcome::Render(PageBody::Login(offsite)) = offsite else {
            panic!("expected login page")
        };
        assert_eq!(local.next.as_deref(), Some("/create/"));
        assert_eq!(offsite.next, None);
    }

    #[tokio::test]
    async fn test_login_sets_session_and_follows_next() {
        let state = testing::state();
        let user = testing::user(&state, "leo").await;
        let ctx = RequestContext::new("/auth/login/").with_form(form(&[
            ("username", "leo"),
            ("password", "correct-horse"),
            ("next", "/create/"),
        ]));

        let outcome = login(&state, &ctx).await.unwrap();

        let ViewOutcome::SignIn {
            token, location, ..
        } = outcome
        else {
            panic!("expected sign-in")
        };
        assert_eq!(location, "/create/");
        let claims = state.tokens.validate_token(&token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.username, "leo");
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_redisplays_form() {
        let state = testing::state();
        testing::user(&state, "leo").await;
        let ctx = RequestContext::new("/auth/login/")
            .with_form(form(&[("username", "leo"), ("password", "wrong-horse")]));

        let ViewOutcome::Render(PageBody::Login(page)) = login(&state, &ctx).await.unwrap() else {
            panic!("expected login form")
        };

        assert_eq!(
            page.form.errors[NON_FIELD_ERRORS],
            vec![INVALID_LOGIN_MESSAGE.to_string()]
        );
    }

    #[tokio::test]
    async fn test_issue_token_rejects_bad_credentials() {
        let state = testing::state();
        testing::user(&state, "leo").await;

        let ok = issue_token(&state, &form(&[("username", "leo"), ("password", "correct-horse")]))
            .await
            .unwrap();
        let refused =
            issue_token(&state, &form(&[("username", "leo"), ("password", "nope-nope")])).await;
        let incomplete = issue_token(&state, &form(&[("username", "leo")])).await;

        assert_eq!(ok.token_type, "Bearer");
        assert_eq!(ok.expires_in, 24 * 3600);
        assert!(matches!(refused, Err(AppError::Unauthorized)));
        assert!(matches!(incomplete, Err(AppError::BadRequest(_))));
    }
}
