pub mod csrf_token;
pub mod logout;
pub mod session_status;
pub mod signin;
pub mod signup;

use axum::{
    routing::{get, post},
    Router,
};
pub use csrf_token::csrf_token;
pub use logout::logout;
pub use session_status::session_status;
pub use signin::signin;
pub use signup::signup;

use crate::{routes::method_not_allowed, setup::AppState};

pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(signin).fallback(method_not_allowed))
        .route("/signup", post(signup).fallback(method_not_allowed))
        .route("/logout", get(logout).post(logout))
        .route("/csrf", get(csrf_token))
        .route("/session", get(session_status))
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, sync::Arc};

    use axum::{
        body::{to_bytes, Body, Bytes},
        http::{header, HeaderMap, Method, Request, StatusCode},
    };
    use axum_extra::extract::cookie::Cookie;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{
        services::{
            csrf::CSRF_HEADER,
            database::{test_database, DatabaseLayer},
            remember_me::RememberMe,
            session::test_sessions,
        },
        setup::{app, AuthSettings},
        utils::{
            cookies::{REMEMBER_COOKIE, SESSION_COOKIE},
            crypto::{hash_token, test_hashing},
            validation::PASSWORD_POLICY_MESSAGE,
        },
    };

    use super::*;

    struct TestResponse {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    }

    impl TestResponse {
        fn json(&self) -> Value {
            serde_json::from_slice(&self.body).unwrap()
        }

        fn location(&self) -> Option<&str> {
            self.headers
                .get(header::LOCATION)
                .and_then(|value| value.to_str().ok())
        }

        fn sets_cookie(&self, name: &str) -> bool {
            self.headers
                .get_all(header::SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .any(|value| value.starts_with(&format!("{name}=")))
        }

        fn cookie(&self, name: &str) -> Option<Cookie<'static>> {
            self.headers
                .get_all(header::SET_COOKIE)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .filter_map(|value| Cookie::parse(value.to_string()).ok())
                .find(|cookie| cookie.name() == name)
        }
    }

    /// Drives the router like a browser: keeps cookies between requests and
    /// echoes the CSRF token once fetched.
    struct TestClient {
        app: Router,
        cookies: BTreeMap<String, String>,
        csrf_token: Option<String>,
    }

    impl TestClient {
        async fn new(csrf_enabled: bool) -> (Self, DatabaseLayer) {
            let database = test_database().await;

            let state = AppState {
                database: database.clone(),
                hashing: test_hashing(),
                sessions: test_sessions(database.clone()),
                remember_me: RememberMe::new(database.clone()),
                settings: Arc::new(AuthSettings {
                    csrf_enabled,
                    landing_page: String::from("/index.html"),
                    error_page: String::from("/error.html"),
                }),
            };

            let client = Self {
                app: app(state),
                cookies: BTreeMap::new(),
                csrf_token: None,
            };

            (client, database)
        }

        async fn request(
            &mut self,
            method: Method,
            uri: &str,
            form: Option<&[(&str, &str)]>,
        ) -> TestResponse {
            let mut builder = Request::builder().method(method).uri(uri);

            if !self.cookies.is_empty() {
                let cookie_header = self
                    .cookies
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect::<Vec<_>>()
                    .join("; ");

                builder = builder.header(header::COOKIE, cookie_header);
            }

            if let Some(token) = &self.csrf_token {
                builder = builder.header(CSRF_HEADER, token.as_str());
            }

            let body = match form {
                Some(pairs) => {
                    builder = builder.header(
                        header::CONTENT_TYPE,
                        "application/x-www-form-urlencoded",
                    );
                    Body::from(serde_urlencoded::to_string(pairs).unwrap())
                }
                None => Body::empty(),
            };

            let response = self
                .app
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();

            for value in response.headers().get_all(header::SET_COOKIE) {
                let cookie = Cookie::parse(value.to_str().unwrap().to_string()).unwrap();

                if cookie.value().is_empty() {
                    self.cookies.remove(cookie.name());
                } else {
                    self.cookies
                        .insert(cookie.name().to_string(), cookie.value().to_string());
                }
            }

            let status = response.status();
            let headers = response.headers().clone();
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

            TestResponse {
                status,
                headers,
                body,
            }
        }

        async fn fetch_csrf(&mut self) {
            let response = self.request(Method::GET, "/auth/csrf", None).await;
            assert_eq!(response.status, StatusCode::OK);

            let token = response.json()["csrf_token"].as_str().unwrap().to_string();
            self.csrf_token = Some(token);
        }

        async fn signup(&mut self, username: &str, email: &str, password: &str) -> TestResponse {
            let form = [
                ("username", username),
                ("email", email),
                ("password", password),
                ("confirmPassword", password),
            ];

            self.request(Method::POST, "/auth/signup", Some(&form[..])).await
        }

        async fn login(&mut self, username: &str, password: &str, remember: bool) -> TestResponse {
            let mut form = vec![("username", username), ("password", password)];

            if remember {
                form.push(("remember", "on"));
            }

            self.request(Method::POST, "/auth/login", Some(form.as_slice())).await
        }

        async fn session_status(&mut self) -> Value {
            self.request(Method::GET, "/auth/session", None).await.json()
        }
    }

    async fn client_with_alice() -> (TestClient, DatabaseLayer) {
        let (mut client, database) = TestClient::new(true).await;
        client.fetch_csrf().await;

        let response = client.signup("alice", "alice@a.com", "Str0ng!pw").await;
        assert_eq!(response.status, StatusCode::OK);

        (client, database)
    }

    #[tokio::test]
    async fn signup_succeeds_once() {
        let (mut client, _database) = TestClient::new(true).await;
        client.fetch_csrf().await;

        let response = client.signup("alice", "alice@a.com", "Str0ng!pw").await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.json(),
            json!({ "success": true, "message": "Registration successful" })
        );
        assert!(response.sets_cookie(SESSION_COOKIE));

        let repeat = client.signup("alice", "alice@a.com", "Str0ng!pw").await;
        assert_eq!(repeat.status, StatusCode::CONFLICT);
        assert_eq!(
            repeat.json(),
            json!({ "error": "Username or email already exists" })
        );

        let same_email = client.signup("alicia", "alice@a.com", "Str0ng!pw").await;
        assert_eq!(same_email.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn signup_reports_the_first_invalid_field() {
        let (mut client, database) = TestClient::new(true).await;
        client.fetch_csrf().await;

        let weak = client.signup("bob", "bob@b.com", "weak").await;
        assert_eq!(weak.status, StatusCode::BAD_REQUEST);
        assert_eq!(weak.json(), json!({ "error": PASSWORD_POLICY_MESSAGE }));

        let bad_email = client.signup("bob", "bob-at-b", "weak").await;
        assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad_email.json(), json!({ "error": "Invalid email format" }));

        let blank_name = client.signup("   ", "bob@b.com", "Str0ng!pw").await;
        assert_eq!(blank_name.json(), json!({ "error": "Username is required" }));

        let missing = client
            .request(
                Method::POST,
                "/auth/signup",
                Some(&[("username", "bob"), ("password", "Str0ng!pw")][..]),
            )
            .await;
        assert_eq!(missing.status, StatusCode::BAD_REQUEST);
        assert_eq!(missing.json(), json!({ "error": "Email is required" }));

        let stored = database
            .query()
            .user
            .find_by_username(String::from("bob"))
            .await
            .unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn signup_stores_a_hash_not_the_password() {
        let (_client, database) = client_with_alice().await;

        let user = database
            .query()
            .user
            .find_by_username(String::from("alice"))
            .await
            .unwrap()
            .unwrap();

        assert_ne!(user.password_hash, "Str0ng!pw");
        assert!(user.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_the_same() {
        let (mut client, _database) = client_with_alice().await;

        let wrong_password = client.login("alice", "Wrong1!", false).await;
        let unknown_user = client.login("nouser", "Whatever1!", false).await;

        assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password.json(), json!({ "error": "Invalid credentials" }));
        assert_eq!(wrong_password.body, unknown_user.body);

        assert!(wrong_password.sets_cookie(SESSION_COOKIE));
        assert_eq!(client.session_status().await["authenticated"], json!(false));
    }

    #[tokio::test]
    async fn login_binds_a_rotated_session() {
        let (mut client, database) = client_with_alice().await;
        let anonymous_token = client.cookies.get(SESSION_COOKIE).cloned();

        let response = client.login("alice", "Str0ng!pw", false).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.json(),
            json!({ "success": true, "message": "Login successful" })
        );

        assert_ne!(client.cookies.get(SESSION_COOKIE).cloned(), anonymous_token);
        assert!(!client.cookies.contains_key(REMEMBER_COOKIE));

        assert_eq!(
            client.session_status().await,
            json!({ "authenticated": true, "username": "alice" })
        );

        let user = database
            .query()
            .user
            .find_by_username(String::from("alice"))
            .await
            .unwrap()
            .unwrap();
        assert!(user.last_login_at.is_some());
        assert!(user.remember_token_hash.is_none());
    }

    #[tokio::test]
    async fn remember_me_stores_only_the_token_hash() {
        let (mut client, database) = client_with_alice().await;

        let response = client.login("alice", "Str0ng!pw", true).await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.sets_cookie(REMEMBER_COOKIE));

        let raw = client.cookies.get(REMEMBER_COOKIE).cloned().unwrap();
        let users = database.query().user;

        let by_hash = users.find_by_remember_token_hash(hash_token(&raw)).await.unwrap();
        assert_eq!(by_hash.map(|user| user.username), Some(String::from("alice")));

        let by_raw = users.find_by_remember_token_hash(raw.clone()).await.unwrap();
        assert!(by_raw.is_none());
    }

    #[tokio::test]
    async fn logout_clears_everything_and_is_repeatable() {
        let (mut client, database) = client_with_alice().await;
        client.login("alice", "Str0ng!pw", true).await;
        assert!(client.cookies.contains_key(REMEMBER_COOKIE));

        let response = client.request(Method::GET, "/auth/logout", None).await;
        assert_eq!(response.status, StatusCode::SEE_OTHER);
        assert_eq!(response.location(), Some("/index.html"));
        assert!(!client.cookies.contains_key(SESSION_COOKIE));
        assert!(!client.cookies.contains_key(REMEMBER_COOKIE));

        assert_eq!(
            client.session_status().await,
            json!({ "authenticated": false, "username": null })
        );

        let user = database
            .query()
            .user
            .find_by_username(String::from("alice"))
            .await
            .unwrap()
            .unwrap();
        assert!(user.remember_token_hash.is_none());

        let again = client.request(Method::POST, "/auth/logout", None).await;
        assert_eq!(again.status, StatusCode::SEE_OTHER);
        assert_eq!(again.location(), Some("/index.html"));
        assert!(again.sets_cookie(SESSION_COOKIE));
    }

    #[tokio::test]
    async fn non_post_methods_are_rejected() {
        let (mut client, _database) = TestClient::new(true).await;

        for uri in ["/auth/login", "/auth/signup"] {
            for method in [Method::GET, Method::PUT, Method::DELETE] {
                let response = client.request(method, uri, None).await;

                assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
                assert_eq!(response.json(), json!({ "error": "Method not allowed" }));
            }
        }
    }

    #[tokio::test]
    async fn state_changing_posts_require_the_csrf_token() {
        let (mut client, database) = TestClient::new(true).await;

        let response = client.signup("carol", "carol@c.com", "Str0ng!pw").await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(response.json(), json!({ "error": "Invalid CSRF token" }));

        client.csrf_token = Some(String::from("forged"));
        let response = client.login("carol", "Str0ng!pw", false).await;
        assert_eq!(response.status, StatusCode::FORBIDDEN);

        let stored = database
            .query()
            .user
            .find_by_username(String::from("carol"))
            .await
            .unwrap();
        assert!(stored.is_none());
    }

    #[tokio::test]
    async fn csrf_check_can_be_disabled() {
        let (mut client, _database) = TestClient::new(false).await;

        let response = client.signup("dave", "dave@d.com", "Str0ng!pw").await;
        assert_eq!(response.status, StatusCode::OK);

        let response = client.login("dave", "Str0ng!pw", false).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn session_status_never_creates_a_session() {
        let (mut client, _database) = TestClient::new(true).await;

        let response = client.request(Method::GET, "/auth/session", None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(!response.sets_cookie(SESSION_COOKIE));
        assert_eq!(
            response.json(),
            json!({ "authenticated": false, "username": null })
        );
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (mut client, _database) = TestClient::new(true).await;

        let response = client.request(Method::GET, "/health", None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.json(), json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn usernames_and_emails_ignore_letter_case() {
        let (mut client, database) = client_with_alice().await;

        let shouted = client.signup("ALICE", "ALICE@A.COM", "Str0ng!pw").await;
        assert_eq!(shouted.status, StatusCode::CONFLICT);
        assert_eq!(
            shouted.json(),
            json!({ "error": "Username or email already exists" })
        );

        let same_mailbox = client.signup("bob", "Alice@A.com", "Str0ng!pw").await;
        assert_eq!(same_mailbox.status, StatusCode::CONFLICT);

        let mixed = client.signup("Carol", "Carol@C.com", "Str0ng!pw").await;
        assert_eq!(mixed.status, StatusCode::OK);

        let carol = database
            .query()
            .user
            .find_by_username(String::from("carol"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(carol.username, "Carol");
        assert_eq!(carol.email, "carol@c.com");

        let response = client.login("ALICE", "Str0ng!pw", false).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            client.session_status().await,
            json!({ "authenticated": true, "username": "alice" })
        );
    }

    #[tokio::test]
    async fn remember_cookie_is_secure_even_over_plain_http() {
        // The test session manager runs with insecure session cookies.
        let (mut client, _database) = client_with_alice().await;

        let response = client.login("alice", "Str0ng!pw", true).await;
        assert_eq!(response.status, StatusCode::OK);

        let session = response.cookie(SESSION_COOKIE).unwrap();
        assert_ne!(session.secure(), Some(true));

        let remember = response.cookie(REMEMBER_COOKIE).unwrap();
        assert_eq!(remember.secure(), Some(true));
        assert_eq!(remember.http_only(), Some(true));

        let logout = client.request(Method::GET, "/auth/logout", None).await;
        let removal = logout.cookie(REMEMBER_COOKIE).unwrap();
        assert_eq!(removal.value(), "");
        assert_eq!(removal.secure(), Some(true));
    }

    #[tokio::test]
    async fn unreadable_stored_hash_fails_login_with_a_generic_error() {
        let (mut client, database) = TestClient::new(true).await;
        client.fetch_csrf().await;

        database
            .query()
            .user
            .insert(
                String::from("mallory"),
                String::from("mallory@m.com"),
                String::from("not-a-password-hash"),
            )
            .await
            .unwrap();

        let response = client.login("mallory", "Str0ng!pw", false).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.json(),
            json!({ "error": "An error occurred during authentication" })
        );
        assert_eq!(client.session_status().await["authenticated"], json!(false));
    }

    #[tokio::test]
    async fn failed_insert_fails_signup_with_a_generic_error() {
        let (mut client, database) = TestClient::new(true).await;
        client.fetch_csrf().await;

        // Every new user record now fails its field assertion.
        database
            .initialize_schemas(&[
                "DEFINE FIELD IF NOT EXISTS intake ON TABLE user VALUE 'closed' ASSERT $value = 'open';",
            ])
            .await
            .unwrap();

        let response = client.signup("erin", "erin@e.com", "Str0ng!pw").await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.json(),
            json!({ "error": "An error occurred during registration" })
        );

        let stored = database
            .query()
            .user
            .find_by_username(String::from("erin"))
            .await
            .unwrap();
        assert!(stored.is_none());
    }
}
