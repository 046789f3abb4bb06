//! Tenant-scoped portal routes and the staff console.

mod common;

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use common::{body_bytes, body_json, multipart_request, TestApp};
use serde_json::{json, Value};

/// Two onboarded companies, each with a signed-in primary contact.
struct TwoTenants {
    app: TestApp,
    staff: String,
    acme: String,
    acme_project: Value,
    beta: String,
    beta_project: Value,
}

async fn two_tenants() -> TwoTenants {
    let app = TestApp::new();
    let staff = app.staff_token().await;
    let acme_data = app.onboard_via_invite(&staff, "Acme Mutual", "ada@acme.example").await;
    let beta_data = app.onboard_via_invite(&staff, "Beta Casualty", "bob@beta.example").await;
    let acme = app.magic_link_token("ada@acme.example").await;
    let beta = app.magic_link_token("bob@beta.example").await;
    TwoTenants {
        app,
        staff,
        acme,
        acme_project: acme_data["project_id"].clone(),
        beta,
        beta_project: beta_data["project_id"].clone(),
    }
}

#[tokio::test]
async fn portal_users_only_see_their_company() {
    let t = two_tenants().await;

    let listed = body_json(t.app.get("/api/portal/projects", Some(&t.acme)).await).await;
    assert_eq!(listed["data"]["total"], 1);
    assert_eq!(listed["data"]["items"][0]["id"], t.acme_project);

    let own = t
        .app
        .get(&format!("/api/portal/projects/{}", t.acme_project), Some(&t.acme))
        .await;
    assert_eq!(own.status(), StatusCode::OK);

    for path in [
        format!("/api/portal/projects/{}", t.beta_project),
        format!("/api/portal/projects/{}/checklist", t.beta_project),
        format!("/api/portal/projects/{}/documents", t.beta_project),
        format!("/api/portal/projects/{}/sow.pdf", t.beta_project),
        format!("/api/portal/projects/{}/webhooks", t.beta_project),
    ] {
        let response = t.app.get(&path, Some(&t.acme)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{path}");
    }

    // Staff see everything.
    let all = body_json(t.app.get("/api/portal/projects", Some(&t.staff)).await).await;
    assert_eq!(all["data"]["total"], 2);
}

#[tokio::test]
async fn portal_users_cannot_reach_admin_routes() {
    let t = two_tenants().await;
    for path in ["/api/admin/projects", "/api/admin/companies", "/api/admin/email-logs"] {
        let response = t.app.get(path, Some(&t.beta)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{path}");
    }
}

#[tokio::test]
async fn status_changes_follow_the_transition_table() {
    let t = two_tenants().await;
    let path = format!("/api/admin/projects/{}", t.acme_project);

    let skip = t
        .app
        .patch_json(&path, Some(&t.staff), json!({ "status": "live" }))
        .await;
    assert_eq!(skip.status(), StatusCode::BAD_REQUEST);

    let before = t.app.mailer.sent().len();
    let next = t
        .app
        .patch_json(&path, Some(&t.staff), json!({ "status": "sow_pending" }))
        .await;
    assert_eq!(next.status(), StatusCode::OK);
    assert_eq!(body_json(next).await["data"]["status"], "sow_pending");
    assert!(t.app.mailer.sent().len() > before, "contacts are notified");

    let churn = t
        .app
        .patch_json(&path, Some(&t.staff), json!({ "status": "churned" }))
        .await;
    assert_eq!(churn.status(), StatusCode::OK);

    let revive = t
        .app
        .patch_json(&path, Some(&t.staff), json!({ "status": "onboarding" }))
        .await;
    assert_eq!(revive.status(), StatusCode::BAD_REQUEST);

    let activity = body_json(
        t.app
            .get(&format!("/api/portal/projects/{}/activity", t.acme_project), Some(&t.acme))
            .await,
    )
    .await;
    let actions: Vec<&str> = activity["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a["action"].as_str())
        .collect();
    assert!(actions.contains(&"status_changed"));
}

#[tokio::test]
async fn checklist_items_update_within_their_project() {
    let t = two_tenants().await;
    let items = body_json(
        t.app
            .get(&format!("/api/portal/projects/{}/checklist", t.acme_project), Some(&t.acme))
            .await,
    )
    .await;
    let item_id = items["data"][0]["id"].clone();

    let update = json!({ "status": "complete", "notes": "done" });
    let ok = t
        .app
        .patch_json(
            &format!("/api/portal/projects/{}/checklist/{item_id}", t.acme_project),
            Some(&t.acme),
            update.clone(),
        )
        .await;
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(body_json(ok).await["data"]["status"], "complete");

    // The same item addressed through another project the caller owns is not found.
    let wrong_project = t
        .app
        .patch_json(
            &format!("/api/portal/projects/{}/checklist/{item_id}", t.beta_project),
            Some(&t.beta),
            update,
        )
        .await;
    assert_eq!(wrong_project.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn documents_upload_download_and_delete() {
    let t = two_tenants().await;
    let upload = t
        .app
        .send(multipart_request(
            &format!("/api/portal/projects/{}/documents", t.acme_project),
            &t.acme,
            "loss runs.pdf",
            "application/pdf",
            b"%PDF-1.4 test",
        ))
        .await;
    assert_eq!(upload.status(), StatusCode::CREATED);
    let document = body_json(upload).await["data"].clone();
    assert_eq!(document["status"], "pending");
    assert!(document.get("storage_path").is_none());
    let id = document["id"].clone();

    // Other tenants cannot mint a link.
    let foreign = t
        .app
        .get(&format!("/api/portal/documents/{id}/download"), Some(&t.beta))
        .await;
    assert_eq!(foreign.status(), StatusCode::FORBIDDEN);

    let link = body_json(
        t.app
            .get(&format!("/api/portal/documents/{id}/download"), Some(&t.acme))
            .await,
    )
    .await;
    let url = link["data"]["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/api/storage/"));

    let fetched = t.app.get(&url, None).await;
    assert_eq!(fetched.status(), StatusCode::OK);
    assert_eq!(body_bytes(fetched).await, b"%PDF-1.4 test");

    let tampered = t.app.get(&format!("{url}0"), None).await;
    assert_eq!(tampered.status(), StatusCode::FORBIDDEN);

    let reviewed = t
        .app
        .patch_json(
            &format!("/api/admin/documents/{id}"),
            Some(&t.staff),
            json!({ "status": "approved" }),
        )
        .await;
    assert_eq!(body_json(reviewed).await["data"]["status"], "approved");

    let deleted = t
        .app
        .delete(&format!("/api/portal/documents/{id}"), Some(&t.acme))
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    assert_eq!(t.app.get(&url, None).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn disallowed_uploads_are_rejected() {
    let t = two_tenants().await;
    let response = t
        .app
        .send(multipart_request(
            &format!("/api/portal/projects/{}/documents", t.acme_project),
            &t.acme,
            "run.exe",
            "application/x-msdownload",
            b"MZ",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sow_renders_as_pdf_and_approves_once() {
    let t = two_tenants().await;
    let pdf = t
        .app
        .get(&format!("/api/portal/projects/{}/sow.pdf", t.acme_project), Some(&t.acme))
        .await;
    assert_eq!(pdf.status(), StatusCode::OK);
    assert_eq!(pdf.headers()[CONTENT_TYPE], "application/pdf");
    let disposition = pdf.headers()[CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("sow-acme_mutual-"), "{disposition}");
    assert!(body_bytes(pdf).await.starts_with(b"%PDF"));

    let path = format!("/api/portal/projects/{}/sow/approve", t.acme_project);
    let first = t.app.post_json(&path, Some(&t.acme), json!({})).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert!(body_json(first).await["data"]["sow_signed_at"].is_string());

    let second = t.app.post_json(&path, Some(&t.acme), json!({})).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn webhooks_integrations_and_credentials() {
    let t = two_tenants().await;
    let project = &t.acme_project;

    let hook = t
        .app
        .post_json(
            &format!("/api/portal/projects/{project}/webhooks"),
            Some(&t.acme),
            json!({ "url": "https://hooks.acme.example/onboard", "events": ["sow.approved"] }),
        )
        .await;
    assert_eq!(hook.status(), StatusCode::CREATED);
    let hook = body_json(hook).await["data"].clone();
    assert!(hook["secret"].as_str().unwrap().starts_with("whsec_"));

    let foreign_delete = t
        .app
        .delete(&format!("/api/portal/webhooks/{}", hook["id"]), Some(&t.beta))
        .await;
    assert_eq!(foreign_delete.status(), StatusCode::FORBIDDEN);

    let integration = t
        .app
        .put_json(
            &format!("/api/portal/projects/{project}/integrations"),
            Some(&t.acme),
            json!({ "system_type": "billing", "settings": { "vendor": "Acme Pay" } }),
        )
        .await;
    assert_eq!(integration.status(), StatusCode::OK);

    let none_yet = body_json(
        t.app
            .get(&format!("/api/portal/projects/{project}/api-credentials"), Some(&t.acme))
            .await,
    )
    .await;
    assert!(none_yet["data"].is_null());

    let created = body_json(
        t.app
            .post_json(
                &format!("/api/portal/projects/{project}/api-credentials/regenerate"),
                Some(&t.acme),
                json!({}),
            )
            .await,
    )
    .await;
    assert!(created["data"]["api_secret"].is_string());

    let stored = body_json(
        t.app
            .get(&format!("/api/portal/projects/{project}/api-credentials"), Some(&t.acme))
            .await,
    )
    .await;
    assert_eq!(stored["data"]["api_key"], created["data"]["api_key"]);
    assert!(stored["data"].get("secret_hash").is_none());
}

#[tokio::test]
async fn profile_and_company_views() {
    let t = two_tenants().await;

    let profile = body_json(t.app.get("/api/portal/profile", Some(&t.acme)).await).await;
    assert_eq!(profile["data"]["type"], "portal_user");
    assert_eq!(profile["data"]["contact"]["email"], "ada@acme.example");

    let updated = t
        .app
        .patch_json("/api/portal/profile", Some(&t.acme), json!({ "title": "CIO" }))
        .await;
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(body_json(updated).await["data"]["title"], "CIO");

    let companies = body_json(t.app.get("/api/admin/companies", Some(&t.staff)).await).await;
    assert_eq!(companies["data"]["total"], 2);

    let notify = t
        .app
        .post_json(
            &format!("/api/admin/projects/{}/notify", t.beta_project),
            Some(&t.staff),
            json!({}),
        )
        .await;
    assert_eq!(notify.status(), StatusCode::OK);
    assert_eq!(body_json(notify).await["data"]["sent"], 1);

    let logs = body_json(
        t.app
            .get(&format!("/api/admin/email-logs?project_id={}", t.beta_project), Some(&t.staff))
            .await,
    )
    .await;
    assert!(!logs["data"].as_array().unwrap().is_empty());
}
