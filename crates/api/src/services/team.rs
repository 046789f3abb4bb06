//! Portal profile and team management, staff company views, and the
//! first-admin bootstrap.

use onboard_core::error::CoreError;
use onboard_core::roles::ROLE_ADMIN;
use onboard_core::status::ContactRole;
use onboard_core::types::DbId;
use onboard_db::models::company::Company;
use onboard_db::models::contact::{Contact, CreateContact, UpdateContact};
use onboard_db::models::project::{ProjectFilter, ProjectSummary};
use onboard_db::models::user::CreateUser;
use onboard_db::Repositories;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::password::{hash_password, validate_strength};
use crate::error::{AppError, AppResult};
use crate::query::PaginationParams;
use crate::response::Page;
use crate::services::invites::{self, InviteCreated, Inviter, NewInvite};
use crate::services::tenant::TenantContext;
use crate::state::AppState;

/// Signed-in user's own profile.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Profile {
    Staff { name: String, role: String },
    PortalUser { contact: Contact, company: Company },
}

/// `PATCH /portal/profile` body.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub title: Option<String>,
}

/// `POST /portal/team/invite` body.
#[derive(Debug, Deserialize, Validate)]
pub struct InviteTeamMember {
    #[validate(length(min = 1, max = 100, message = "first name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "last name is required"))]
    pub last_name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    pub role: ContactRole,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub title: Option<String>,
}

/// New teammate and the invite sent to them.
#[derive(Debug, Serialize)]
pub struct TeamInvite {
    pub contact: Contact,
    #[serde(flatten)]
    pub invite: InviteCreated,
}

/// Staff view of one company.
#[derive(Debug, Serialize)]
pub struct CompanyDetail {
    pub company: Company,
    pub contacts: Vec<Contact>,
    pub projects: Vec<ProjectSummary>,
}

fn portal_ids(context: &TenantContext) -> Result<(DbId, DbId), CoreError> {
    match context {
        TenantContext::PortalUser {
            company_id,
            contact_id,
            ..
        } => Ok((*company_id, *contact_id)),
        TenantContext::Staff { .. } => Err(CoreError::Validation(
            "Staff accounts have no portal profile".into(),
        )),
    }
}

fn invalid(errors: validator::ValidationErrors) -> CoreError {
    CoreError::Validation(onboard_core::onboarding::describe_errors(&errors))
}

async fn company(repos: &Repositories, id: DbId) -> AppResult<Company> {
    repos
        .companies
        .find_by_id(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Company", id }))
}

async fn contact(repos: &Repositories, id: DbId) -> AppResult<Contact> {
    repos
        .contacts
        .find_by_id(id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Contact", id }))
}

pub async fn profile(state: &AppState, context: &TenantContext) -> AppResult<Profile> {
    match context {
        TenantContext::Staff { name, role, .. } => Ok(Profile::Staff {
            name: name.clone(),
            role: role.clone(),
        }),
        TenantContext::PortalUser {
            company_id,
            contact_id,
            ..
        } => Ok(Profile::PortalUser {
            contact: contact(&state.repos, *contact_id).await?,
            company: company(&state.repos, *company_id).await?,
        }),
    }
}

pub async fn update_profile(
    state: &AppState,
    context: &TenantContext,
    input: ProfileUpdate,
) -> AppResult<Contact> {
    let (_, contact_id) = portal_ids(context)?;
    input.validate().map_err(invalid)?;
    let trimmed = |v: Option<String>| v.map(|s| s.trim().to_string());
    state
        .repos
        .contacts
        .update(
            contact_id,
            &UpdateContact {
                first_name: trimmed(input.first_name),
                last_name: trimmed(input.last_name),
                phone: trimmed(input.phone),
                title: trimmed(input.title),
            },
        )
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Contact",
            id: contact_id,
        }))
}

/// Active and inactive contacts of the caller's company.
pub async fn team(state: &AppState, context: &TenantContext) -> AppResult<Vec<Contact>> {
    let (company_id, _) = portal_ids(context)?;
    Ok(state.repos.contacts.list_by_company(company_id).await?)
}

/// Add a contact to the caller's company and invite them to the portal.
pub async fn invite_member(
    state: &AppState,
    context: &TenantContext,
    input: InviteTeamMember,
) -> AppResult<TeamInvite> {
    let (company_id, inviter_contact_id) = portal_ids(context)?;
    input.validate().map_err(invalid)?;
    if input.role == ContactRole::Primary {
        return Err(CoreError::Validation("A company has exactly one primary contact".into()).into());
    }
    let email = input.email.trim().to_lowercase();
    if state
        .repos
        .contacts
        .find_by_company_email(company_id, &email)
        .await?
        .is_some()
    {
        return Err(CoreError::Conflict(format!("{email} is already on this team")).into());
    }

    let company = company(&state.repos, company_id).await?;
    let inviter = contact(&state.repos, inviter_contact_id).await?;
    let member = state
        .repos
        .contacts
        .create(&CreateContact {
            company_id,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            email: email.clone(),
            phone: input.phone,
            title: input.title,
            role: input.role,
        })
        .await?;

    let invite = invites::create(
        state,
        &Inviter {
            user_id: Some(context.user_id()),
            name: inviter.full_name(),
        },
        NewInvite {
            email,
            company_name: Some(company.legal_name.clone()),
            expiration_days: None,
            metadata: Some(serde_json::json!({
                "company_id": company_id,
                "contact_id": member.id,
                "kind": "team",
            })),
        },
    )
    .await?;

    tracing::info!(company_id, contact_id = member.id, "Team member invited");
    Ok(TeamInvite {
        contact: member,
        invite,
    })
}

pub async fn list_companies(repos: &Repositories, pagination: &PaginationParams) -> AppResult<Page<Company>> {
    let (limit, offset) = pagination.resolve();
    let items = repos.companies.list(limit, offset).await?;
    let total = repos.companies.count().await?;
    Ok(Page { items, total })
}

pub async fn company_detail(repos: &Repositories, id: DbId) -> AppResult<CompanyDetail> {
    let company = company(repos, id).await?;
    let contacts = repos.contacts.list_by_company(id).await?;
    let projects = repos
        .projects
        .list(&ProjectFilter {
            company_id: Some(id),
            status: None,
            limit: onboard_core::pagination::MAX_LIMIT,
            offset: 0,
        })
        .await?;
    Ok(CompanyDetail {
        company,
        contacts,
        projects,
    })
}

/// Create the first administrator from `BOOTSTRAP_ADMIN_EMAIL` /
/// `BOOTSTRAP_ADMIN_PASSWORD`. A user that already exists is left alone.
pub async fn bootstrap_admin(repos: &Repositories, email: &str, password: &str) -> AppResult<bool> {
    let email = email.trim().to_lowercase();
    if repos.users.find_by_email(&email).await?.is_some() {
        return Ok(false);
    }
    let strength = validate_strength(password);
    if !strength.valid {
        return Err(CoreError::Validation(format!(
            "BOOTSTRAP_ADMIN_PASSWORD is too weak: {}",
            strength.message()
        ))
        .into());
    }

    let password_hash = hash_password(password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    let user = repos
        .users
        .create(&CreateUser {
            email: email.clone(),
            password_hash: Some(password_hash),
        })
        .await?;
    let name = email.split('@').next().unwrap_or("admin").to_string();
    repos.principals.create_staff(user.id, &name, ROLE_ADMIN).await?;
    tracing::info!(user_id = user.id, email = %email, "Bootstrap admin created");
    Ok(true)
}
