#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, SET_COOKIE};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use onboard_api::auth::jwt::{JwtConfig, JwtTokenIssuer};
use onboard_api::config::{AppEnv, LogFormat, ServerConfig, TokenSettings};
use onboard_api::router::build_app_router;
use onboard_api::services::team::bootstrap_admin;
use onboard_api::state::AppState;
use onboard_core::storage::{DiskObjectStore, UrlSigner};
use onboard_db::Repositories;
use onboard_events::{Notifier, RecordingMailer};

pub const BASE_URL: &str = "http://localhost:5173";
pub const ADMIN_EMAIL: &str = "admin@onboard.example";
pub const ADMIN_PASSWORD: &str = "Adm1n!Passw0rd";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(storage_dir: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![BASE_URL.to_string()],
        request_timeout_secs: 30,
        app_env: AppEnv::Development,
        app_name: "Client Onboarding".to_string(),
        app_base_url: BASE_URL.to_string(),
        tokens: TokenSettings::default(),
        storage_dir: storage_dir.to_string(),
        storage_signing_secret: "storage-test-secret".to_string(),
        invite_sweep_interval_secs: 3600,
        log_format: LogFormat::Pretty,
        bootstrap_admin: None,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 60,
            refresh_token_expiry_days: 7,
        },
    }
}

/// The full router over in-memory repositories, plus handles the tests
/// inspect directly.
pub struct TestApp {
    pub router: Router,
    pub repos: Repositories,
    pub mailer: Arc<RecordingMailer>,
    _storage: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_repos(Repositories::in_memory(), None)
    }

    /// Postgres-backed app for `#[sqlx::test]` cases.
    pub fn with_pool(pool: sqlx::PgPool) -> Self {
        Self::with_repos(Repositories::postgres(pool.clone()), Some(pool))
    }

    fn with_repos(repos: Repositories, pool: Option<sqlx::PgPool>) -> Self {
        let storage = tempfile::tempdir().expect("temp dir");
        let config = test_config(&storage.path().to_string_lossy());
        let mailer = Arc::new(RecordingMailer::new());
        let signer = UrlSigner::new(config.storage_signing_secret.clone(), "/api/storage");

        let state = AppState {
            notifier: Notifier::new(mailer.clone(), repos.clone(), config.app_name.clone(), BASE_URL),
            store: Arc::new(DiskObjectStore::new(storage.path(), signer.clone())),
            signer,
            tokens: Arc::new(JwtTokenIssuer::new(
                config.jwt.clone(),
                repos.sessions.clone(),
                repos.users.clone(),
            )),
            pool,
            config: Arc::new(config.clone()),
            repos: repos.clone(),
        };

        Self {
            router: build_app_router(state, &config),
            repos,
            mailer,
            _storage: storage,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.expect("request succeeds")
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.send(request(Method::GET, uri, token, Body::empty(), None)).await
    }

    pub async fn post_json(&self, uri: &str, token: Option<&str>, body: serde_json::Value) -> Response {
        self.send(json_request(Method::POST, uri, token, body)).await
    }

    pub async fn patch_json(&self, uri: &str, token: Option<&str>, body: serde_json::Value) -> Response {
        self.send(json_request(Method::PATCH, uri, token, body)).await
    }

    pub async fn put_json(&self, uri: &str, token: Option<&str>, body: serde_json::Value) -> Response {
        self.send(json_request(Method::PUT, uri, token, body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Response {
        self.send(request(Method::DELETE, uri, token, Body::empty(), None)).await
    }

    /// Create the bootstrap admin and sign in with a password.
    pub async fn staff_token(&self) -> String {
        bootstrap_admin(&self.repos, ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("bootstrap admin");
        let response = self
            .post_json(
                "/api/auth/login-password",
                None,
                serde_json::json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["data"]["access_token"]
            .as_str()
            .expect("access token")
            .to_string()
    }

    /// Request an emailed code for `email` and redeem it.
    pub async fn magic_link_token(&self, email: &str) -> String {
        let response = self
            .post_json("/api/auth/login", None, serde_json::json!({ "email": email }))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let code = login_code_for(&self.mailer, email);
        let response = self
            .post_json(
                "/api/auth/verify",
                None,
                serde_json::json!({ "email": email, "code": code }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["data"]["access_token"]
            .as_str()
            .expect("access token")
            .to_string()
    }

    /// Staff invite, then a wizard submission redeeming it. Returns the
    /// submission body's `data`.
    pub async fn onboard_via_invite(&self, staff: &str, company: &str, email: &str) -> serde_json::Value {
        let response = self
            .post_json("/api/invites", Some(staff), serde_json::json!({ "email": email, "company_name": company }))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let token = invite_token_for(&self.mailer, email);

        let mut payload = submission(company, email);
        payload["invite_token"] = serde_json::json!(token);
        let response = self.post_json("/api/onboarding/submit", None, payload).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["data"].clone()
    }
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Body, content_type: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    builder.body(body).expect("valid request")
}

pub fn json_request(method: Method, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    request(
        method,
        uri,
        token,
        Body::from(serde_json::to_vec(&body).expect("serializable")),
        Some("application/json"),
    )
}

/// A single-file multipart request using the field name `file`.
pub fn multipart_request(uri: &str, token: &str, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let boundary = "onboard-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    request(
        Method::POST,
        uri,
        Some(token),
        Body::from(body),
        Some(&format!("multipart/form-data; boundary={boundary}")),
    )
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("JSON body")
}

/// Value of the `name` cookie set on `response`, if any.
pub fn set_cookie(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| {
            let pair = v.split(';').next()?;
            let (key, value) = pair.split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
}

/// The six-digit code from the latest sign-in email to `email`.
pub fn login_code_for(mailer: &RecordingMailer, email: &str) -> String {
    latest_match(mailer, email, |text| {
        text.split("Your sign-in code is: ")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
    })
    .expect("sign-in code emailed")
}

/// The token from the latest invite email to `email`. Later mail to the same
/// address, such as the welcome message, is skipped.
pub fn invite_token_for(mailer: &RecordingMailer, email: &str) -> String {
    latest_match(mailer, email, |text| {
        ["/onboarding?invite=", "/accept-invite?token="]
            .iter()
            .find_map(|link| text.split(link).nth(1))
            .and_then(|rest| rest.split_whitespace().next())
    })
    .expect("invite link emailed")
}

/// Newest-first scan of the mail to `email` for the first body `extract` accepts.
fn latest_match(
    mailer: &RecordingMailer,
    email: &str,
    extract: impl Fn(&str) -> Option<&str>,
) -> Option<String> {
    mailer
        .sent()
        .iter()
        .rev()
        .filter(|mail| mail.to == email)
        .find_map(|mail| extract(&mail.text).map(str::to_string))
}

/// Minimal valid wizard payload selecting the core module.
pub fn submission(company: &str, email: &str) -> serde_json::Value {
    serde_json::json!({
        "company": {
            "legal_name": company,
            "size": "medium",
            "lines_of_business": ["auto"]
        },
        "contact": {
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": email
        },
        "modules": { "core": true },
        "requirements": { "core": { "monthly_claim_volume": 250 } }
    })
}
