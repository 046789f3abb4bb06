pub mod admin;
pub mod auth;
pub mod health;
pub mod invites;
pub mod onboarding;
pub mod portal;
pub mod storage;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                      request sign-in code (public)
/// /auth/verify                                     verify code, start session (public)
/// /auth/login-password                             password sign-in (public)
/// /auth/refresh                                    rotate refresh token (public)
/// /auth/signout                                    revoke session, clear cookies
/// /auth/me                                         current user + tenant context
/// /auth/set-password                               set own password (requires auth)
/// /auth/forgot-password                            email a reset link (public)
/// /auth/reset-password                             redeem reset token (public)
/// /auth/validate-reset-token/{token}               check reset token (public)
///
/// /onboarding/submit                               wizard submission (public)
/// /onboarding/status/{project_id}                  submission status (public)
///
/// /invites                                         list, create (staff)
/// /invites/{id}                                    get (staff)
/// /invites/{id}/revoke                             revoke (staff)
/// /invites/{id}/resend                             resend (staff)
/// /invites/validate/{token}                        validate (public)
/// /invites/accept                                  accept team invite (public)
///
/// /portal/projects                                 list (tenant-scoped)
/// /portal/projects/{id}                            detail
/// /portal/projects/{id}/checklist                  checklist items
/// /portal/projects/{id}/checklist/{item_id}        update item (PATCH)
/// /portal/projects/{id}/documents                  list, upload (multipart)
/// /portal/projects/{id}/sow/approve                approve SOW
/// /portal/projects/{id}/sow.pdf                    render SOW
/// /portal/projects/{id}/activity                   activity log
/// /portal/projects/{id}/webhooks                   list, create
/// /portal/projects/{id}/integrations               list, upsert (PUT)
/// /portal/projects/{id}/api-credentials            current key
/// /portal/projects/{id}/api-credentials/regenerate rotate key + secret
/// /portal/documents/{id}/download                  signed download URL
/// /portal/documents/{id}                           delete
/// /portal/webhooks/{id}                            delete
/// /portal/profile                                  get, update (PATCH)
/// /portal/team                                     company contacts
/// /portal/team/invite                              invite a team member
///
/// /admin/projects                                  list (staff)
/// /admin/projects/{id}                             detail, update (PATCH)
/// /admin/projects/{id}/notify                      email status to contacts
/// /admin/companies                                 list
/// /admin/companies/{id}                            detail
/// /admin/documents/{id}                            review (PATCH)
/// /admin/email-logs                                outbound email log
/// /admin/invites/expire                            run the invite sweep
///
/// /storage/{*key}                                  signed object download
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/onboarding", onboarding::router())
        .nest("/invites", invites::router())
        .nest("/portal", portal::router())
        .nest("/admin", admin::router())
        .nest("/storage", storage::router())
}
