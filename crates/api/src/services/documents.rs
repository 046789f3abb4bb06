//! Project documents: upload to the object store, list, signed download,
//! delete, and staff review.

use chrono::Duration;
use onboard_core::error::CoreError;
use onboard_core::status::DocumentStatus;
use onboard_core::storage::{SignedUrl, DEFAULT_SIGNED_URL_TTL_SECS};
use onboard_core::types::DbId;
use onboard_core::uploads::{document_storage_key, sanitize_file_name, validate_upload};
use onboard_db::models::activity::{actions, CreateActivity};
use onboard_db::models::document::{CreateDocument, Document};

use crate::error::{AppError, AppResult};
use crate::services::tenant::{require_project_access, TenantContext};
use crate::state::AppState;

/// A file received from a multipart form.
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

async fn find(state: &AppState, id: DbId) -> AppResult<Document> {
    state
        .repos
        .documents
        .find_by_id(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Document", id }))
}

/// Load a document the caller may access. Foreign documents read as 403,
/// like foreign projects.
async fn find_accessible(state: &AppState, context: &TenantContext, id: DbId) -> AppResult<Document> {
    let document = find(state, id).await?;
    require_project_access(&state.repos, context, document.project_id).await?;
    Ok(document)
}

pub async fn list(state: &AppState, context: &TenantContext, project_id: DbId) -> AppResult<Vec<Document>> {
    require_project_access(&state.repos, context, project_id).await?;
    Ok(state.repos.documents.list_for_project(project_id).await?)
}

/// Store the blob, then the row. A failed row insert removes the blob again.
pub async fn upload(
    state: &AppState,
    context: &TenantContext,
    project_id: DbId,
    upload: Upload,
) -> AppResult<Document> {
    require_project_access(&state.repos, context, project_id).await?;
    validate_upload(&upload.content_type, upload.data.len())?;

    let name = sanitize_file_name(&upload.file_name);
    let key = document_storage_key(project_id, &name);
    let size_bytes = upload.data.len() as i64;
    state.store.put(&key, upload.data, &upload.content_type).await?;

    let created = state
        .repos
        .documents
        .create(&CreateDocument {
            project_id,
            name,
            storage_path: key.clone(),
            mime_type: upload.content_type,
            size_bytes,
            uploaded_by: Some(context.user_id()),
        })
        .await;
    let document = match created {
        Ok(document) => document,
        Err(e) => {
            if let Err(cleanup) = state.store.delete(&key).await {
                tracing::warn!(key = %key, error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }
    };

    state
        .repos
        .activity
        .create(&CreateActivity::new(
            project_id,
            Some(context.user_id()),
            actions::DOCUMENT_UPLOADED,
            serde_json::json!({
                "document_id": document.id,
                "name": document.name,
                "size_bytes": document.size_bytes,
            }),
        ))
        .await?;
    tracing::info!(project_id, document_id = document.id, size_bytes, "Document uploaded");
    Ok(document)
}

/// Short-lived signed link to the blob.
pub async fn download_url(state: &AppState, context: &TenantContext, id: DbId) -> AppResult<SignedUrl> {
    let document = find_accessible(state, context, id).await?;
    Ok(state.store.signed_url(
        &document.storage_path,
        Duration::seconds(DEFAULT_SIGNED_URL_TTL_SECS),
    )?)
}

/// Delete the row. A blob that cannot be removed is logged and left behind.
pub async fn delete(state: &AppState, context: &TenantContext, id: DbId) -> AppResult<()> {
    let document = find_accessible(state, context, id).await?;

    if let Err(e) = state.store.delete(&document.storage_path).await {
        tracing::warn!(document_id = id, error = %e, "Failed to delete document blob");
    }
    if !state.repos.documents.delete(id).await? {
        return Err(CoreError::NotFound { entity: "Document", id }.into());
    }

    state
        .repos
        .activity
        .create(&CreateActivity::new(
            document.project_id,
            Some(context.user_id()),
            actions::DOCUMENT_DELETED,
            serde_json::json!({ "document_id": id, "name": document.name }),
        ))
        .await?;
    tracing::info!(document_id = id, project_id = document.project_id, "Document deleted");
    Ok(())
}

/// Staff approve or reject a document.
pub async fn review(
    state: &AppState,
    actor_id: DbId,
    id: DbId,
    status: DocumentStatus,
) -> AppResult<Document> {
    let document = state
        .repos
        .documents
        .update_status(id, status)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Document", id }))?;

    state
        .repos
        .activity
        .create(&CreateActivity::new(
            document.project_id,
            Some(actor_id),
            actions::DOCUMENT_REVIEWED,
            serde_json::json!({ "document_id": id, "status": status }),
        ))
        .await?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::testing::{portal_context, seed_submission, TestHarness};

    fn pdf(name: &str) -> Upload {
        Upload {
            file_name: name.into(),
            content_type: "application/pdf".into(),
            data: b"%PDF-1.4 test".to_vec(),
        }
    }

    #[tokio::test]
    async fn upload_list_download_delete() {
        let h = TestHarness::new();
        let seeded = seed_submission(&h.state.repos, "Acme", "ada@acme.example").await;
        let ctx = portal_context(&seeded);

        let doc = upload(&h.state, &ctx, seeded.project.id, pdf("../Loss Runs.pdf"))
            .await
            .unwrap();
        assert_eq!(doc.name, "Loss_Runs.pdf");
        assert_eq!(doc.status, DocumentStatus::Pending);
        assert!(h.state.store.get(&doc.storage_path).await.unwrap().is_some());

        let docs = list(&h.state, &ctx, seeded.project.id).await.unwrap();
        assert_eq!(docs.len(), 1);

        let url = download_url(&h.state, &ctx, doc.id).await.unwrap();
        assert!(url.url.starts_with("/api/storage/projects/"));

        delete(&h.state, &ctx, doc.id).await.unwrap();
        assert!(h.state.store.get(&doc.storage_path).await.unwrap().is_none());
        assert!(list(&h.state, &ctx, seeded.project.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn disallowed_type_is_rejected() {
        let h = TestHarness::new();
        let seeded = seed_submission(&h.state.repos, "Acme", "ada@acme.example").await;
        let err = upload(
            &h.state,
            &portal_context(&seeded),
            seeded.project.id,
            Upload {
                file_name: "run.exe".into(),
                content_type: "application/x-msdownload".into(),
                data: vec![1, 2, 3],
            },
        )
        .await;
        assert_matches!(err, Err(AppError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn foreign_documents_are_forbidden() {
        let h = TestHarness::new();
        let a = seed_submission(&h.state.repos, "A", "a@a.example").await;
        let b = seed_submission(&h.state.repos, "B", "b@b.example").await;
        let doc = upload(&h.state, &portal_context(&b), b.project.id, pdf("b.pdf"))
            .await
            .unwrap();

        let ctx = portal_context(&a);
        assert_matches!(
            download_url(&h.state, &ctx, doc.id).await,
            Err(AppError::Core(CoreError::Forbidden(_)))
        );
        assert_matches!(
            delete(&h.state, &ctx, doc.id).await,
            Err(AppError::Core(CoreError::Forbidden(_)))
        );
        assert_matches!(
            upload(&h.state, &ctx, b.project.id, pdf("x.pdf")).await,
            Err(AppError::Core(CoreError::Forbidden(_)))
        );
    }

    #[tokio::test]
    async fn review_sets_status() {
        let h = TestHarness::new();
        let seeded = seed_submission(&h.state.repos, "Acme", "ada@acme.example").await;
        let doc = upload(&h.state, &portal_context(&seeded), seeded.project.id, pdf("a.pdf"))
            .await
            .unwrap();
        let reviewed = review(&h.state, 1, doc.id, DocumentStatus::Approved).await.unwrap();
        assert_eq!(reviewed.status, DocumentStatus::Approved);
    }
}
