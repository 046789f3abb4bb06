//! Project reads, staff edits, status transitions, the checklist, SOW
//! approval and the activity feed.

use chrono::{NaiveDate, Utc};
use onboard_core::error::CoreError;
use onboard_core::status::{ChecklistStatus, ProjectStatus, SUBSTAGE_SOW_APPROVED};
use onboard_core::types::DbId;
use onboard_db::models::activity::{actions, ActivityLog, CreateActivity};
use onboard_db::models::checklist::{ChecklistItem, UpdateChecklistItem};
use onboard_db::models::company::Company;
use onboard_db::models::contact::Contact;
use onboard_db::models::module::ProjectModules;
use onboard_db::models::project::{Project, ProjectFilter, ProjectSummary, UpdateProject};
use onboard_events::BroadcastSummary;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::query::PaginationParams;
use crate::response::Page;
use crate::services::tenant::{require_project_access, TenantContext};
use crate::state::AppState;

/// `?status=&company_id=&limit=&offset=` on project listings.
#[derive(Debug, Default, Deserialize)]
pub struct ProjectListParams {
    pub status: Option<ProjectStatus>,
    /// Staff only; portal users are always scoped to their company.
    pub company_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Checklist completion counts.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChecklistProgress {
    pub total: usize,
    pub complete: usize,
    pub blocked: usize,
}

impl ChecklistProgress {
    pub fn of(items: &[ChecklistItem]) -> Self {
        Self {
            total: items.len(),
            complete: items
                .iter()
                .filter(|i| i.status == ChecklistStatus::Complete)
                .count(),
            blocked: items
                .iter()
                .filter(|i| i.status == ChecklistStatus::Blocked)
                .count(),
        }
    }
}

/// Everything the project page shows.
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    pub project: Project,
    pub status_label: &'static str,
    pub company: Company,
    pub primary_contact: Option<Contact>,
    pub modules: ProjectModules,
    pub checklist: ChecklistProgress,
}

/// Staff edit of a project. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct AdminProjectUpdate {
    pub status: Option<ProjectStatus>,
    pub target_go_live_date: Option<NaiveDate>,
    pub actual_go_live_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl AdminProjectUpdate {
    fn field_update(&self) -> Option<UpdateProject> {
        let update = UpdateProject {
            target_go_live_date: self.target_go_live_date,
            actual_go_live_date: self.actual_go_live_date,
            notes: self.notes.clone(),
        };
        (update.target_go_live_date.is_some()
            || update.actual_go_live_date.is_some()
            || update.notes.is_some())
        .then_some(update)
    }
}

async fn log_activity(
    state: &AppState,
    project_id: DbId,
    actor_id: Option<DbId>,
    action: &str,
    details: serde_json::Value,
) -> AppResult<ActivityLog> {
    Ok(state
        .repos
        .activity
        .create(&CreateActivity::new(project_id, actor_id, action, details))
        .await?)
}

pub async fn list(
    state: &AppState,
    context: &TenantContext,
    params: ProjectListParams,
) -> AppResult<Page<ProjectSummary>> {
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();
    let company_id = match context.company_id() {
        Some(own) => Some(own),
        None => params.company_id,
    };
    let filter = ProjectFilter {
        company_id,
        status: params.status,
        limit,
        offset,
    };
    let items = state.repos.projects.list(&filter).await?;
    let total = state.repos.projects.count(&filter).await?;
    Ok(Page { items, total })
}

pub async fn detail(state: &AppState, context: &TenantContext, project_id: DbId) -> AppResult<ProjectDetail> {
    let project = require_project_access(&state.repos, context, project_id).await?;
    let company = state
        .repos
        .companies
        .find_by_id(project.company_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Company",
            id: project.company_id,
        }))?;
    let primary_contact = state.repos.contacts.find_primary(company.id).await?;
    let modules = state.repos.modules.get_for_project(project.id).await?;
    let items = state.repos.checklists.list_for_project(project.id).await?;

    Ok(ProjectDetail {
        status_label: project.status.label(),
        project,
        company,
        primary_contact,
        modules,
        checklist: ChecklistProgress::of(&items),
    })
}

/// Move a project along the lifecycle and notify the primary contact.
///
/// The write is conditional on the status read here; a concurrent change
/// surfaces as a conflict. Notification failures are logged only.
pub async fn change_status(
    state: &AppState,
    actor_id: DbId,
    project_id: DbId,
    to: ProjectStatus,
) -> AppResult<Project> {
    let project = state
        .repos
        .projects
        .find_by_id(project_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))?;
    let from = project.status;
    from.validate_transition(to)?;

    let updated = state
        .repos
        .projects
        .update_status(project_id, from, to)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Project status was changed by someone else; reload and try again".into(),
            ))
        })?;

    log_activity(
        state,
        project_id,
        Some(actor_id),
        actions::STATUS_CHANGED,
        serde_json::json!({ "from": from, "to": to }),
    )
    .await?;
    tracing::info!(project_id, %from, %to, actor_id, "Project status changed");

    match state.notifier.notify_status_change(project_id, from, to).await {
        Ok(Some(outcome)) if !outcome.success => {
            tracing::warn!(project_id, error = ?outcome.error, "Status notification failed");
        }
        Ok(_) => {}
        Err(e) => tracing::error!(project_id, error = %e, "Status notification errored"),
    }

    Ok(updated)
}

/// Staff edit: field changes first, then an optional status transition.
pub async fn admin_update(
    state: &AppState,
    actor_id: DbId,
    project_id: DbId,
    input: AdminProjectUpdate,
) -> AppResult<Project> {
    let mut project = state
        .repos
        .projects
        .find_by_id(project_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))?;
    if let Some(to) = input.status {
        project.status.validate_transition(to)?;
    }

    if let Some(update) = input.field_update() {
        project = state
            .repos
            .projects
            .update(project_id, &update)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Project",
                id: project_id,
            }))?;
        log_activity(
            state,
            project_id,
            Some(actor_id),
            actions::PROJECT_UPDATED,
            serde_json::json!({
                "target_go_live_date": update.target_go_live_date,
                "actual_go_live_date": update.actual_go_live_date,
                "notes_changed": update.notes.is_some(),
            }),
        )
        .await?;
    }

    match input.status {
        Some(to) => change_status(state, actor_id, project_id, to).await,
        None => Ok(project),
    }
}

pub async fn checklist(
    state: &AppState,
    context: &TenantContext,
    project_id: DbId,
) -> AppResult<Vec<ChecklistItem>> {
    require_project_access(&state.repos, context, project_id).await?;
    Ok(state.repos.checklists.list_for_project(project_id).await?)
}

/// Update one checklist item. `completed_at` follows the status.
pub async fn update_checklist_item(
    state: &AppState,
    context: &TenantContext,
    project_id: DbId,
    item_id: DbId,
    input: UpdateChecklistItem,
) -> AppResult<ChecklistItem> {
    require_project_access(&state.repos, context, project_id).await?;
    let item = state
        .repos
        .checklists
        .find_item(item_id)
        .await?
        .filter(|i| i.project_id == project_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ChecklistItem",
            id: item_id,
        }))?;

    let notes = input.notes.as_deref().map(str::trim);
    let updated = state
        .repos
        .checklists
        .update_item(
            item_id,
            input.status,
            notes,
            input.status.completed_at(Utc::now()),
            Some(context.user_id()),
        )
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ChecklistItem",
            id: item_id,
        }))?;

    log_activity(
        state,
        project_id,
        Some(context.user_id()),
        actions::CHECKLIST_UPDATED,
        serde_json::json!({
            "item_id": item_id,
            "name": item.name,
            "from": item.status,
            "to": updated.status,
        }),
    )
    .await?;
    Ok(updated)
}

/// Record the client's SOW approval. A project is signed at most once.
pub async fn approve_sow(state: &AppState, context: &TenantContext, project_id: DbId) -> AppResult<Project> {
    let project = require_project_access(&state.repos, context, project_id).await?;
    let already_signed = || AppError::Core(CoreError::Conflict("SOW has already been signed".into()));
    if project.sow_signed_at.is_some() {
        return Err(already_signed());
    }

    let signed = state
        .repos
        .projects
        .sign_sow(project_id, context.user_id(), SUBSTAGE_SOW_APPROVED)
        .await?
        .ok_or_else(already_signed)?;

    log_activity(
        state,
        project_id,
        Some(context.user_id()),
        actions::SOW_APPROVED,
        serde_json::json!({ "signed_at": signed.sow_signed_at }),
    )
    .await?;
    tracing::info!(project_id, user_id = context.user_id(), "SOW approved");
    Ok(signed)
}

pub async fn activity(
    state: &AppState,
    context: &TenantContext,
    project_id: DbId,
    pagination: &PaginationParams,
) -> AppResult<Vec<ActivityLog>> {
    require_project_access(&state.repos, context, project_id).await?;
    let (limit, offset) = pagination.resolve();
    Ok(state
        .repos
        .activity
        .list_for_project(project_id, limit, offset)
        .await?)
}

/// Email the current status to every active contact of the project.
pub async fn broadcast_status(state: &AppState, project_id: DbId) -> AppResult<BroadcastSummary> {
    if state.repos.projects.find_by_id(project_id).await?.is_none() {
        return Err(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }
        .into());
    }
    let summary = state
        .notifier
        .notify_all_project_contacts(project_id, None)
        .await?;
    tracing::info!(project_id, sent = summary.sent, failed = summary.errors.len(), "Status broadcast");
    Ok(summary)
}
