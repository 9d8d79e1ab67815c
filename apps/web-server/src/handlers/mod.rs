//! HTTP handlers and route configuration.

mod accounts;
mod follow;
mod health;
mod posts;

use actix_web::web;

use yatube_core::forms::FormData;

/// Largest urlencoded body accepted by the form routes (2.5 MiB).
pub const MAX_FORM_BYTES: usize = 2_621_440;

/// Submitted fields. A missing or unreadable body is an empty form, so the
/// view still decides between login redirect, re-render and redirect.
fn submitted(form: Result<web::Form<FormData>, actix_web::Error>) -> FormData {
    match form {
        Ok(form) => form.into_inner(),
        Err(e) => {
            tracing::debug!(error = %e, "Form body not readable; treating as empty");
            FormData::new()
        }
    }
}

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().limit(MAX_FORM_BYTES))
        .route("/", web::get().to(posts::index))
        .route("/health", web::get().to(health::health_check))
        .route("/group/{slug}/", web::get().to(posts::group_posts))
        .route("/profile/{username}/", web::get().to(posts::profile))
        .route(
            "/profile/{username}/follow/",
            web::get().to(follow::profile_follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            web::get().to(follow::profile_unfollow),
        )
        .route("/posts/{post_id}/", web::get().to(posts::post_detail))
        .service(
            web::resource("/posts/{post_id}/edit/")
                .route(web::get().to(posts::post_edit_form))
                .route(web::post().to(posts::post_edit)),
        )
        .route(
            "/posts/{post_id}/comment/",
            web::post().to(posts::add_comment),
        )
        .service(
            web::resource("/create/")
                .route(web::get().to(posts::post_create_form))
                .route(web::post().to(posts::post_create)),
        )
        .route("/follow/", web::get().to(follow::follow_index))
        .service(
            web::scope("/auth")
                .service(
                    web::resource("/signup/")
                        .route(web::get().to(accounts::signup_page))
                        .route(web::post().to(accounts::signup)),
                )
                .service(
                    web::resource("/login/")
                        .route(web::get().to(accounts::login_page))
                        .route(web::post().to(accounts::login)),
                )
                .service(
                    web::resource("/logout/")
                        .route(web::get().to(accounts::logout))
                        .route(web::post().to(accounts::logout)),
                )
                .route("/token/", web::post().to(accounts::token)),
        );
}

#[cfg(test)]
mod tests {
    use actix_web::http::{StatusCode, header};
    use actix_web::{App, test, web};
    use serde_json::Value;

    use yatube_core::ports::PostFilter;

    use super::configure_routes;
    use crate::middleware::auth::AUTH_COOKIE;
    use crate::state::AppState;
    use crate::views::testing;

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state.clone()))
                    .configure(configure_routes),
            )
            .await
        };
    }

    fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
        resp.headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    fn bearer(state: &AppState, user: &yatube_core::domain::User) -> (header::HeaderName, String) {
        let token = state.tokens.generate_token(user.id, &user.username).unwrap();
        (header::AUTHORIZATION, format!("Bearer {}", token))
    }

    #[actix_web::test]
    async fn test_anonymous_create_redirects_to_login() {
        let state = testing::state();
        let app = app!(state);

        let req = test::TestRequest::get().uri("/create/").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/auth/login/?next=/create/");
    }

    #[actix_web::test]
    async fn test_anonymous_comment_redirects_to_login() {
        let state = testing::state();
        let author = testing::user(&state, "leo").await;
        let post = testing::post(&state, &author, "post", None).await;
        let app = app!(state);

        let path = format!("/posts/{}/comment/", post.id);
        let req = test::TestRequest::post()
            .uri(&path)
            .set_form([("text", "hi")])
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/auth/login/?next={}", path));
    }

    #[actix_web::test]
    async fn test_anonymous_follow_pages_redirect_to_login() {
        let state = testing::state();
        testing::user(&state, "leo").await;
        let app = app!(state);

        for uri in ["/follow/", "/profile/leo/follow/", "/profile/leo/unfollow/"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::FOUND, "{uri}");
            assert_eq!(location(&resp), format!("/auth/login/?next={uri}"));
        }
    }

    #[actix_web::test]
    async fn test_unknown_pages_are_not_found() {
        let state = testing::state();
        let app = app!(state);

        for uri in [
            "/posts/not-a-uuid/",
            "/posts/00000000-0000-0000-0000-000000000000/",
            "/group/missing/",
            "/profile/ghost/",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[actix_web::test]
    async fn test_index_is_cached_between_writes() {
        let state = testing::state();
        let author = testing::user(&state, "leo").await;
        testing::post(&state, &author, "first", None).await;
        let app = app!(state);

        let first = test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request())
            .await;
        testing::post(&state, &author, "second", None).await;
        let second =
            test::call_and_read_body(&app, test::TestRequest::get().uri("/").to_request()).await;
        let other_page = test::call_and_read_body(
            &app,
            test::TestRequest::get().uri("/?page=1").to_request(),
        )
        .await;

        assert_eq!(first, second);
        let fresh: Value = serde_json::from_slice(&other_page).unwrap();
        assert_eq!(fresh["context"]["page_obj"]["count"], 2);
    }

    #[actix_web::test]
    async fn test_index_page_payload() {
        let state = testing::state();
        let author = testing::user(&state, "leo").await;
        testing::post(&state, &author, "hello world", None).await;
        let app = app!(state);

        let req = test::TestRequest::get().uri("/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["template"], "posts/index.html");
        assert_eq!(body["context"]["page_obj"]["number"], 1);
        assert_eq!(
            body["context"]["page_obj"]["items"][0]["author"]["username"],
            "leo"
        );
    }

    #[actix_web::test]
    async fn test_signup_login_and_post_flow() {
        let state = testing::state();
        let app = app!(state);

        let signup = test::TestRequest::post()
            .uri("/auth/signup/")
            .set_form([("username", "newbie"), ("password", "s3cret-pass")])
            .to_request();
        let resp = test::call_service(&app, signup).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/");

        let login = test::TestRequest::post()
            .uri("/auth/login/")
            .set_form([
                ("username", "newbie"),
                ("password", "s3cret-pass"),
                ("next", "/create/"),
            ])
            .to_request();
        let resp = test::call_service(&app, login).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/create/");
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == AUTH_COOKIE)
            .expect("session cookie")
            .into_owned();

        let create = test::TestRequest::post()
            .uri("/create/")
            .cookie(cookie)
            .set_form([("text", "My first post")])
            .to_request();
        let resp = test::call_service(&app, create).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/profile/newbie/");

        let user = state.users.find_by_username("newbie").await.unwrap().unwrap();
        let posts = state
            .posts
            .list(&PostFilter::Author(user.id), 0, 10)
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].text, "My first post");
    }

    #[actix_web::test]
    async fn test_post_longer_than_default_form_limit_is_stored() {
        let state = testing::state();
        let author = testing::user(&state, "leo").await;
        let app = app!(state);
        let text = "a".repeat(20_000);

        let req = test::TestRequest::post()
            .uri("/create/")
            .insert_header(bearer(&state, &author))
            .set_form([("text", text.as_str())])
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/profile/leo/");
        let posts = state.posts.list(&PostFilter::All, 0, 10).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].text.len(), 20_000);
    }

    #[actix_web::test]
    async fn test_form_posts_without_body_reach_the_view() {
        let state = testing::state();
        let author = testing::user(&state, "leo").await;
        let post = testing::post(&state, &author, "post", None).await;
        let app = app!(state);
        let path = format!("/posts/{}/comment/", post.id);

        let anonymous = test::TestRequest::post().uri(&path).to_request();
        let resp = test::call_service(&app, anonymous).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/auth/login/?next={}", path));

        let anonymous_create = test::TestRequest::post().uri("/create/").to_request();
        let resp = test::call_service(&app, anonymous_create).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/auth/login/?next=/create/");

        let signed_in = test::TestRequest::post()
            .uri(&path)
            .insert_header(bearer(&state, &author))
            .to_request();
        let resp = test::call_service(&app, signed_in).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/posts/{}/", post.id));
        assert_eq!(state.comments.count_by_post(post.id).await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn test_bearer_token_identifies_viewer() {
        let state = testing::state();
        let reader = testing::user(&state, "ann").await;
        let author = testing::user(&state, "leo").await;
        testing::post(&state, &author, "from leo", None).await;
        let app = app!(state);

        let follow = test::TestRequest::get()
            .uri("/profile/leo/follow/")
            .insert_header(bearer(&state, &reader))
            .to_request();
        let resp = test::call_service(&app, follow).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), "/follow/");

        let feed = test::TestRequest::get()
            .uri("/follow/")
            .insert_header(bearer(&state, &reader))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, feed).await;
        assert_eq!(body["template"], "posts/follow.html");
        assert_eq!(body["context"]["page_obj"]["items"][0]["text"], "from leo");
    }

    #[actix_web::test]
    async fn test_invalid_token_is_anonymous() {
        let state = testing::state();
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/follow/")
            .insert_header((header::AUTHORIZATION, "Bearer garbage"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FOUND);
    }

    #[actix_web::test]
    async fn test_unfollow_without_relation_is_server_error() {
        let state = testing::state();
        let reader = testing::user(&state, "ann").await;
        testing::user(&state, "leo").await;
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/profile/leo/unfollow/")
            .insert_header(bearer(&state, &reader))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_token_endpoint() {
        let state = testing::state();
        testing::user(&state, "leo").await;
        let app = app!(state);

        let ok = test::TestRequest::post()
            .uri("/auth/token/")
            .set_form([("username", "leo"), ("password", "correct-horse")])
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, ok).await;
        assert_eq!(body["token_type"], "Bearer");

        let bad = test::TestRequest::post()
            .uri("/auth/token/")
            .set_form([("username", "leo"), ("password", "wrong-horse")])
            .to_request();
        let resp = test::call_service(&app, bad).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_logout_clears_cookie() {
        let state = testing::state();
        let app = app!(state);

        let req = test::TestRequest::get().uri("/auth/logout/").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FOUND);
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == AUTH_COOKIE)
            .expect("removal cookie");
        assert_eq!(cookie.value(), "");
    }

    #[actix_web::test]
    async fn test_health() {
        let state = testing::state();
        let app = app!(state);

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "ok");
        assert_eq!(body["entity_store"], "memory");
    }
}
