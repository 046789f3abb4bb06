//! End-to-end flows against Postgres through the full router.

mod common;

use axum::http::StatusCode;
use common::{body_json, TestApp};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn invite_submit_sign_in_and_advance(pool: PgPool) {
    let app = TestApp::with_pool(pool);

    let health = body_json(app.get("/health", None).await).await;
    assert_eq!(health["db_healthy"], true);

    let staff = app.staff_token().await;
    let submitted = app.onboard_via_invite(&staff, "Acme Mutual", "ada@acme.example").await;
    let project = submitted["project_id"].clone();

    let portal = app.magic_link_token("ada@acme.example").await;
    let listed = body_json(app.get("/api/portal/projects", Some(&portal)).await).await;
    assert_eq!(listed["data"]["total"], 1);

    let advanced = app
        .patch_json(
            &format!("/api/admin/projects/{project}"),
            Some(&staff),
            json!({ "status": "sow_pending" }),
        )
        .await;
    assert_eq!(advanced.status(), StatusCode::OK);

    let approve = app
        .post_json(&format!("/api/portal/projects/{project}/sow/approve"), Some(&portal), json!({}))
        .await;
    assert_eq!(approve.status(), StatusCode::OK);
}

async fn company_count(pool: &PgPool) -> i64 {
    let (companies,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM companies")
        .fetch_one(pool)
        .await
        .unwrap();
    companies
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_invite_token_writes_nothing(pool: PgPool) {
    let app = TestApp::with_pool(pool.clone());
    let mut payload = common::submission("Acme Mutual", "ada@acme.example");
    payload["invite_token"] = json!("does-not-exist");

    let response = app.post_json("/api/onboarding/submit", None, payload).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(company_count(&pool).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn failed_contact_insert_rolls_back_the_company(pool: PgPool) {
    sqlx::query(
        "CREATE FUNCTION reject_contact() RETURNS trigger AS $$
         BEGIN RAISE EXCEPTION 'contact insert rejected'; END;
         $$ LANGUAGE plpgsql",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TRIGGER reject_contact BEFORE INSERT ON contacts
         FOR EACH ROW EXECUTE FUNCTION reject_contact()",
    )
    .execute(&pool)
    .await
    .unwrap();

    let app = TestApp::with_pool(pool.clone());
    let payload = common::submission("Acme Mutual", "ada@acme.example");
    let response = app.post_json("/api/onboarding/submit", None, payload).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(company_count(&pool).await, 0);
}
