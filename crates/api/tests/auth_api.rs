//! HTTP-level tests for sign-in, session rotation and password recovery.

mod common;

use axum::body::Body;
use axum::http::header::COOKIE;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, set_cookie, TestApp, ADMIN_EMAIL, ADMIN_PASSWORD};
use onboard_api::auth::cookies::{ACCESS_COOKIE, REFRESH_COOKIE};
use serde_json::json;

#[tokio::test]
async fn password_login_sets_both_cookies() {
    let app = TestApp::new();
    app.staff_token().await;

    let response = app
        .post_json(
            "/api/auth/login-password",
            None,
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, ACCESS_COOKIE).is_some_and(|v| !v.is_empty()));
    assert!(set_cookie(&response, REFRESH_COOKIE).is_some_and(|v| !v.is_empty()));

    let json = body_json(response).await;
    assert!(json["data"]["access_token"].is_string());
    assert!(json["data"]["expires_in"].is_number());
    assert_eq!(json["data"]["context"]["type"], "staff");
    assert!(json["data"].get("refresh_token").is_none());
}

#[tokio::test]
async fn wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::new();
    app.staff_token().await;

    let wrong = app
        .post_json(
            "/api/auth/login-password",
            None,
            json!({ "email": ADMIN_EMAIL, "password": "Not!TheRight1" }),
        )
        .await;
    let unknown = app
        .post_json(
            "/api/auth/login-password",
            None,
            json!({ "email": "ghost@nowhere.example", "password": "Not!TheRight1" }),
        )
        .await;

    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong).await, body_json(unknown).await);
}

#[tokio::test]
async fn me_requires_authentication() {
    let app = TestApp::new();
    let response = app.get("/api/auth/me", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.get("/api/auth/me", Some("not-a-jwt")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_accepts_the_access_cookie() {
    let app = TestApp::new();
    let token = app.staff_token().await;

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/auth/me")
        .header(COOKIE, format!("{ACCESS_COOKIE}={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["user"]["email"], ADMIN_EMAIL);
    assert_eq!(json["data"]["user"]["has_password"], true);
    assert_eq!(json["data"]["context"]["type"], "staff");
}

#[tokio::test]
async fn login_code_answers_the_same_for_unknown_emails() {
    let app = TestApp::new();
    let response = app
        .post_json("/api/auth/login", None, json!({ "email": "nobody@acme.example" }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn login_code_works_once() {
    let app = TestApp::new();
    let staff = app.staff_token().await;
    app.onboard_via_invite(&staff, "Acme Mutual", "ada@acme.example").await;

    app.post_json("/api/auth/login", None, json!({ "email": "ada@acme.example" }))
        .await;
    let code = common::login_code_for(&app.mailer, "ada@acme.example");

    let body = json!({ "email": "ada@acme.example", "code": code });
    let first = app.post_json("/api/auth/verify", None, body.clone()).await;
    assert_eq!(first.status(), StatusCode::OK);
    let json = body_json(first).await;
    assert_eq!(json["data"]["context"]["type"], "portal_user");

    let second = app.post_json("/api/auth/verify", None, body).await;
    assert_eq!(second.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotates_the_cookie_token() {
    let app = TestApp::new();
    app.staff_token().await;
    let login = app
        .post_json(
            "/api/auth/login-password",
            None,
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        )
        .await;
    let refresh = set_cookie(&login, REFRESH_COOKIE).unwrap();

    let with_cookie = |value: &str| {
        Request::builder()
            .method(Method::POST)
            .uri("/api/auth/refresh")
            .header(COOKIE, format!("{REFRESH_COOKIE}={value}"))
            .body(Body::empty())
            .unwrap()
    };

    let rotated = app.send(with_cookie(&refresh)).await;
    assert_eq!(rotated.status(), StatusCode::OK);
    let next = set_cookie(&rotated, REFRESH_COOKIE).unwrap();
    assert_ne!(next, refresh);

    // The old refresh token is spent.
    let replay = app.send(with_cookie(&refresh)).await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_without_a_token_is_unauthorized() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/refresh")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signout_revokes_the_session_and_clears_cookies() {
    let app = TestApp::new();
    app.staff_token().await;
    let login = app
        .post_json(
            "/api/auth/login-password",
            None,
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        )
        .await;
    let access = set_cookie(&login, ACCESS_COOKIE).unwrap();
    let refresh = set_cookie(&login, REFRESH_COOKIE).unwrap();
    let cookies = format!("{ACCESS_COOKIE}={access}; {REFRESH_COOKIE}={refresh}");

    let signout = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/signout")
        .header(COOKIE, cookies.clone())
        .body(Body::empty())
        .unwrap();
    let response = app.send(signout).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookie(&response, ACCESS_COOKIE).as_deref(), Some(""));
    assert_eq!(set_cookie(&response, REFRESH_COOKIE).as_deref(), Some(""));

    let refresh_again = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/refresh")
        .header(COOKIE, cookies)
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(refresh_again).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signout_without_a_session_still_succeeds() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/signout")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn password_reset_round_trip() {
    let app = TestApp::new();
    app.staff_token().await;

    let response = app
        .post_json("/api/auth/forgot-password", None, json!({ "email": ADMIN_EMAIL }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let mail = app.mailer.last_to(ADMIN_EMAIL).expect("reset email");
    let token = mail
        .text
        .split("token=")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .expect("token in reset link")
        .to_string();

    let check = app
        .get(&format!("/api/auth/validate-reset-token/{token}"), None)
        .await;
    assert_eq!(body_json(check).await["data"]["valid"], true);

    let reset = app
        .post_json(
            "/api/auth/reset-password",
            None,
            json!({ "token": token, "password": "N3w!Password99" }),
        )
        .await;
    assert_eq!(reset.status(), StatusCode::OK);

    let login = app
        .post_json(
            "/api/auth/login-password",
            None,
            json!({ "email": ADMIN_EMAIL, "password": "N3w!Password99" }),
        )
        .await;
    assert_eq!(login.status(), StatusCode::OK);

    let reused = app
        .post_json(
            "/api/auth/reset-password",
            None,
            json!({ "token": token, "password": "An0ther!Pass99" }),
        )
        .await;
    assert_ne!(reused.status(), StatusCode::OK);
}
