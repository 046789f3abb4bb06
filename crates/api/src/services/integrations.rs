//! Per-project webhooks, external-system integration settings and the API
//! credential pair. Secrets are returned once, at creation.

use onboard_core::error::CoreError;
use onboard_core::tokens::{generate_api_credential, generate_webhook_secret};
use onboard_core::types::DbId;
use onboard_db::models::activity::{actions, CreateActivity};
use onboard_db::models::api_credential::{ApiCredential, ApiCredentialCreated};
use onboard_db::models::integration::{IntegrationConfig, UpsertIntegration};
use onboard_db::models::webhook::{CreateWebhook, CreateWebhookRequest, Webhook};
use serde::Serialize;
use validator::ValidateUrl;

use crate::error::{AppError, AppResult};
use crate::services::tenant::{require_project_access, TenantContext};
use crate::state::AppState;

/// Events a webhook may subscribe to.
pub const WEBHOOK_EVENTS: &[&str] = &[
    "project.status_changed",
    "checklist.updated",
    "document.uploaded",
    "sow.approved",
];

/// External systems an integration row may describe.
pub const INTEGRATION_SYSTEMS: &[&str] = &["policy_admin", "billing", "crm", "document_management", "other"];

/// A new webhook plus its signing secret, shown only here.
#[derive(Debug, Serialize)]
pub struct WebhookCreated {
    #[serde(flatten)]
    pub webhook: Webhook,
    pub secret: String,
}

async fn log_activity(
    state: &AppState,
    project_id: DbId,
    actor_id: DbId,
    action: &str,
    details: serde_json::Value,
) -> AppResult<()> {
    state
        .repos
        .activity
        .create(&CreateActivity::new(project_id, Some(actor_id), action, details))
        .await?;
    Ok(())
}

fn check_webhook(input: &CreateWebhookRequest) -> Result<Vec<String>, CoreError> {
    let url = input.url.trim();
    if !url.validate_url() || !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(CoreError::Validation("Webhook URL must be a valid http(s) URL".into()));
    }
    if input.events.is_empty() {
        return Ok(WEBHOOK_EVENTS.iter().map(|e| e.to_string()).collect());
    }
    if let Some(bad) = input.events.iter().find(|e| !WEBHOOK_EVENTS.contains(&e.as_str())) {
        return Err(CoreError::Validation(format!("Unknown webhook event '{bad}'")));
    }
    let mut events = input.events.clone();
    events.sort();
    events.dedup();
    Ok(events)
}

pub async fn list_webhooks(state: &AppState, context: &TenantContext, project_id: DbId) -> AppResult<Vec<Webhook>> {
    require_project_access(&state.repos, context, project_id).await?;
    Ok(state.repos.webhooks.list_for_project(project_id).await?)
}

/// Register a webhook. An empty event list subscribes to every event.
pub async fn create_webhook(
    state: &AppState,
    context: &TenantContext,
    project_id: DbId,
    input: CreateWebhookRequest,
) -> AppResult<WebhookCreated> {
    require_project_access(&state.repos, context, project_id).await?;
    let events = check_webhook(&input)?;
    let secret = generate_webhook_secret();

    let webhook = state
        .repos
        .webhooks
        .create(&CreateWebhook {
            project_id,
            url: input.url.trim().to_string(),
            events,
            secret: secret.clone(),
            created_by: Some(context.user_id()),
        })
        .await?;
    log_activity(
        state,
        project_id,
        context.user_id(),
        actions::WEBHOOK_CREATED,
        serde_json::json!({ "webhook_id": webhook.id, "url": webhook.url }),
    )
    .await?;
    Ok(WebhookCreated { webhook, secret })
}

pub async fn delete_webhook(state: &AppState, context: &TenantContext, webhook_id: DbId) -> AppResult<()> {
    let webhook = state
        .repos
        .webhooks
        .find_by_id(webhook_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Webhook",
            id: webhook_id,
        }))?;
    require_project_access(&state.repos, context, webhook.project_id).await?;

    state.repos.webhooks.delete(webhook_id).await?;
    log_activity(
        state,
        webhook.project_id,
        context.user_id(),
        actions::WEBHOOK_DELETED,
        serde_json::json!({ "webhook_id": webhook_id, "url": webhook.url }),
    )
    .await
}

pub async fn list_integrations(
    state: &AppState,
    context: &TenantContext,
    project_id: DbId,
) -> AppResult<Vec<IntegrationConfig>> {
    require_project_access(&state.repos, context, project_id).await?;
    Ok(state.repos.integrations.list_for_project(project_id).await?)
}

/// Create or replace the settings for one external system.
pub async fn upsert_integration(
    state: &AppState,
    context: &TenantContext,
    project_id: DbId,
    mut input: UpsertIntegration,
) -> AppResult<IntegrationConfig> {
    require_project_access(&state.repos, context, project_id).await?;
    input.system_type = input.system_type.trim().to_lowercase();
    if !INTEGRATION_SYSTEMS.contains(&input.system_type.as_str()) {
        return Err(CoreError::Validation(format!(
            "Unknown system type '{}'",
            input.system_type
        ))
        .into());
    }
    if input.settings.is_null() {
        input.settings = serde_json::json!({});
    }
    if !input.settings.is_object() {
        return Err(CoreError::Validation("Settings must be a JSON object".into()).into());
    }

    let config = state.repos.integrations.upsert(project_id, &input).await?;
    log_activity(
        state,
        project_id,
        context.user_id(),
        actions::INTEGRATION_UPDATED,
        serde_json::json!({ "system_type": config.system_type, "status": config.status }),
    )
    .await?;
    Ok(config)
}

/// The project's API key, without its secret.
pub async fn api_credentials(
    state: &AppState,
    context: &TenantContext,
    project_id: DbId,
) -> AppResult<Option<ApiCredential>> {
    require_project_access(&state.repos, context, project_id).await?;
    Ok(state.repos.api_credentials.find_for_project(project_id).await?)
}

/// Issue a fresh key and secret, replacing any previous pair.
pub async fn regenerate_api_credentials(
    state: &AppState,
    context: &TenantContext,
    project_id: DbId,
) -> AppResult<ApiCredentialCreated> {
    require_project_access(&state.repos, context, project_id).await?;
    let generated = generate_api_credential();
    let stored = state
        .repos
        .api_credentials
        .replace(
            project_id,
            &generated.api_key,
            &generated.secret_hash,
            Some(context.user_id()),
        )
        .await?;
    log_activity(
        state,
        project_id,
        context.user_id(),
        actions::API_CREDENTIALS_REGENERATED,
        serde_json::json!({ "api_key": stored.api_key }),
    )
    .await?;
    tracing::info!(project_id, "API credentials regenerated");

    Ok(ApiCredentialCreated {
        id: stored.id,
        project_id,
        api_key: stored.api_key,
        api_secret: generated.secret,
        rotated_at: stored.rotated_at,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use onboard_core::hashing::sha256_hex;

    use super::*;
    use crate::testing::{portal_context, seed_submission, TestHarness};

    fn hook(url: &str, events: &[&str]) -> CreateWebhookRequest {
        CreateWebhookRequest {
            url: url.into(),
            events: events.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn webhook_secret_is_returned_once() {
        let h = TestHarness::new();
        let seeded = seed_submission(&h.state.repos, "Acme", "ada@acme.example").await;
        let ctx = portal_context(&seeded);

        let created = create_webhook(&h.state, &ctx, seeded.project.id, hook("https://hooks.acme.example/in", &[]))
            .await
            .unwrap();
        assert!(created.secret.starts_with("whsec_"));
        assert_eq!(created.webhook.events.len(), WEBHOOK_EVENTS.len());

        let listed = serde_json::to_value(list_webhooks(&h.state, &ctx, seeded.project.id).await.unwrap()).unwrap();
        assert!(listed[0].get("secret").is_none());

        delete_webhook(&h.state, &ctx, created.webhook.id).await.unwrap();
        assert!(list_webhooks(&h.state, &ctx, seeded.project.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn webhook_input_is_validated() {
        let h = TestHarness::new();
        let seeded = seed_submission(&h.state.repos, "Acme", "ada@acme.example").await;
        let ctx = portal_context(&seeded);

        for input in [
            hook("ftp://acme.example", &[]),
            hook("not a url", &[]),
            hook("https://acme.example", &["project.deleted"]),
        ] {
            let err = create_webhook(&h.state, &ctx, seeded.project.id, input).await;
            assert_matches!(err, Err(AppError::Core(CoreError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn integration_upsert_replaces_by_system() {
        let h = TestHarness::new();
        let seeded = seed_submission(&h.state.repos, "Acme", "ada@acme.example").await;
        let ctx = portal_context(&seeded);

        for vendor in ["Guidewire", "Duck Creek"] {
            upsert_integration(
                &h.state,
                &ctx,
                seeded.project.id,
                UpsertIntegration {
                    system_type: "Policy_Admin".into(),
                    settings: serde_json::json!({ "vendor": vendor }),
                    status: None,
                },
            )
            .await
            .unwrap();
        }
        let configs = list_integrations(&h.state, &ctx, seeded.project.id).await.unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].settings["vendor"], "Duck Creek");

        let bad = upsert_integration(
            &h.state,
            &ctx,
            seeded.project.id,
            UpsertIntegration {
                system_type: "mainframe".into(),
                settings: serde_json::Value::Null,
                status: None,
            },
        )
        .await;
        assert_matches!(bad, Err(AppError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn regenerating_rotates_the_pair() {
        let h = TestHarness::new();
        let seeded = seed_submission(&h.state.repos, "Acme", "ada@acme.example").await;
        let ctx = portal_context(&seeded);
        assert!(api_credentials(&h.state, &ctx, seeded.project.id).await.unwrap().is_none());

        let first = regenerate_api_credentials(&h.state, &ctx, seeded.project.id).await.unwrap();
        let second = regenerate_api_credentials(&h.state, &ctx, seeded.project.id).await.unwrap();
        assert_ne!(first.api_key, second.api_key);

        let stored = api_credentials(&h.state, &ctx, seeded.project.id).await.unwrap().unwrap();
        assert_eq!(stored.api_key, second.api_key);
        assert_eq!(stored.secret_hash, sha256_hex(second.api_secret.as_bytes()));
    }
}
