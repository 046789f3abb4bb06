//! Intake wizard submission.
//!
//! One submission creates the company, its primary contact, the project,
//! module selections with their requirements, the checklist and a first
//! activity entry in a single transaction. An invite, when present, is
//! consumed inside that same transaction.

use onboard_core::error::CoreError;
use onboard_core::onboarding::OnboardingSubmission;
use onboard_core::status::{ModuleType, ProjectStatus};
use onboard_core::types::{DbId, Timestamp};
use onboard_db::models::company::CreateCompany;
use onboard_db::models::contact::Contact;
use onboard_db::models::onboarding::{NewPrimaryContact, NewSubmission};
use onboard_db::models::user::CreateUser;
use onboard_db::Repositories;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::services::invites;
use crate::state::AppState;

/// Returned to the wizard after a successful submission.
#[derive(Debug, Serialize)]
pub struct SubmissionResult {
    pub project_id: DbId,
    pub company_id: DbId,
    pub contact_id: DbId,
    pub status: ProjectStatus,
    pub modules: Vec<ModuleType>,
    /// Whether the primary contact can now sign in to the portal.
    pub portal_access: bool,
}

/// Public progress view of a project.
#[derive(Debug, Serialize)]
pub struct OnboardingStatus {
    pub project_id: DbId,
    pub status: ProjectStatus,
    pub status_label: &'static str,
    pub substage: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

fn to_new_submission(submission: &OnboardingSubmission, invite_id: Option<DbId>) -> NewSubmission {
    let company = &submission.company;
    let contact = &submission.contact;
    let flags = submission.modules;
    let requirements = &submission.requirements;
    let selected = flags.selected();

    NewSubmission {
        company: CreateCompany {
            legal_name: company.legal_name.clone(),
            trade_name: company.trade_name.clone(),
            address_line1: company.address_line1.clone(),
            address_line2: company.address_line2.clone(),
            city: company.city.clone(),
            state: company.state.clone(),
            postal_code: company.postal_code.clone(),
            country: company.country.clone(),
            size: company.size,
            lines_of_business: company.lines_of_business.clone(),
            website: company.website.clone(),
        },
        contact: NewPrimaryContact {
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            title: contact.title.clone(),
        },
        modules: ModuleType::ALL
            .iter()
            .map(|m| (*m, flags.is_selected(*m)))
            .collect(),
        core: flags
            .core
            .then(|| requirements.core.clone().unwrap_or_default()),
        comms: flags
            .comms
            .then(|| requirements.comms.clone().unwrap_or_default()),
        fnol: flags
            .fnol
            .then(|| requirements.fnol.clone().unwrap_or_default()),
        activity_details: serde_json::json!({
            "company_name": company.legal_name,
            "contact_email": contact.email,
            "modules": selected,
            "via_invite": invite_id.is_some(),
        }),
        invite_id,
    }
}

/// Give the primary contact a passwordless portal account so they can sign
/// in with an emailed code.
async fn provision_portal_user(repos: &Repositories, contact: &Contact) -> AppResult<()> {
    let user = match repos.users.find_by_email(&contact.email).await? {
        Some(user) => user,
        None => {
            repos
                .users
                .create(&CreateUser {
                    email: contact.email.clone(),
                    password_hash: None,
                })
                .await?
        }
    };
    if repos.principals.find_portal_user(user.id).await?.is_some()
        || repos.principals.find_staff(user.id).await?.is_some()
    {
        tracing::info!(user_id = user.id, "Primary contact already has an account");
        return Ok(());
    }
    repos
        .principals
        .create_portal_user(user.id, contact.company_id, contact.id)
        .await?;
    Ok(())
}

/// Validate and persist a wizard submission.
pub async fn submit(state: &AppState, submission: OnboardingSubmission) -> AppResult<SubmissionResult> {
    let submission = submission.normalized();
    submission.check()?;

    let invite = match submission.invite_token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => Some(invites::validate(&state.repos, token).await?.into_valid()?),
        None => None,
    };

    let record = state
        .repos
        .onboarding
        .create_submission(&to_new_submission(&submission, invite.as_ref().map(|i| i.id)))
        .await?;

    tracing::info!(
        project_id = record.project.id,
        company_id = record.company.id,
        invite_id = invite.as_ref().map(|i| i.id),
        "Onboarding submission recorded"
    );

    let portal_access = if invite.is_some() {
        match provision_portal_user(&state.repos, &record.contact).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, project_id = record.project.id, "Failed to provision portal user");
                false
            }
        }
    } else {
        false
    };

    let outcome = state
        .notifier
        .send_welcome(&record.contact, &record.company.legal_name, record.project.id)
        .await;
    if !outcome.success {
        tracing::warn!(project_id = record.project.id, "Welcome email failed");
    }

    Ok(SubmissionResult {
        project_id: record.project.id,
        company_id: record.company.id,
        contact_id: record.contact.id,
        status: record.project.status,
        modules: submission.modules.selected(),
        portal_access,
    })
}

pub async fn status(repos: &Repositories, project_id: DbId) -> AppResult<OnboardingStatus> {
    let project = repos
        .projects
        .find_by_id(project_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))?;
    Ok(OnboardingStatus {
        project_id: project.id,
        status: project.status,
        status_label: project.status.label(),
        substage: project.substage,
        created_at: project.created_at,
        updated_at: project.updated_at,
    })
}
