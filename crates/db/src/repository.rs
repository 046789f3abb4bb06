//! Repository traits, one per aggregate.
//!
//! Services depend on these traits only. The Postgres implementations live in
//! [`crate::repositories`]; the in-memory store used by tests lives in
//! `crate::memory` behind the `test-support` feature.
//!
//! Every conditional write (`mark_used`, `revoke`, `sign_sow`, ...) is a single
//! atomic statement, so two racing callers see at most one success.

use async_trait::async_trait;
use onboard_core::status::{ChecklistStatus, DocumentStatus, ProjectStatus};
use onboard_core::types::{DbId, Timestamp};

use crate::error::DbResult;
use crate::models::activity::{ActivityLog, CreateActivity};
use crate::models::api_credential::ApiCredential;
use crate::models::checklist::{ChecklistItem, ChecklistTemplate};
use crate::models::company::Company;
use crate::models::contact::{Contact, CreateContact, UpdateContact};
use crate::models::document::{CreateDocument, Document};
use crate::models::email_log::{CreateEmailLog, EmailLog};
use crate::models::integration::{IntegrationConfig, UpsertIntegration};
use crate::models::invite::{CreateInvite, Invite, InviteFilter, RedeemTeamInvite};
use crate::models::login_code::LoginCode;
use crate::models::module::ProjectModules;
use crate::models::onboarding::{NewSubmission, SubmissionRecord};
use crate::models::password_reset::PasswordResetToken;
use crate::models::principal::{PortalUser, StaffMember};
use crate::models::project::{Project, ProjectFilter, ProjectSummary, UpdateProject};
use crate::models::session::{CreateSession, UserSession};
use crate::models::user::{CreateUser, User};
use crate::models::webhook::{CreateWebhook, Webhook};

// ---------------------------------------------------------------------------
// Tenant data
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Company>>;
    /// Newest first.
    async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<Company>>;
    async fn count(&self) -> DbResult<i64>;
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn create(&self, input: &CreateContact) -> DbResult<Contact>;
    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Contact>>;
    /// Case-insensitive email match within one company.
    async fn find_by_company_email(&self, company_id: DbId, email: &str)
        -> DbResult<Option<Contact>>;
    /// All contacts of a company, primary first.
    async fn list_by_company(&self, company_id: DbId) -> DbResult<Vec<Contact>>;
    /// Active contacts only, primary first.
    async fn list_active_by_company(&self, company_id: DbId) -> DbResult<Vec<Contact>>;
    /// The primary contact, or the earliest active contact when none is primary.
    async fn find_primary(&self, company_id: DbId) -> DbResult<Option<Contact>>;
    async fn update(&self, id: DbId, input: &UpdateContact) -> DbResult<Option<Contact>>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Project>>;
    /// Newest first, joined with the company name.
    async fn list(&self, filter: &ProjectFilter) -> DbResult<Vec<ProjectSummary>>;
    async fn count(&self, filter: &ProjectFilter) -> DbResult<i64>;
    async fn update(&self, id: DbId, input: &UpdateProject) -> DbResult<Option<Project>>;
    /// Move from `from` to `to`. `None` when the project is missing or no
    /// longer in `from`.
    async fn update_status(
        &self,
        id: DbId,
        from: ProjectStatus,
        to: ProjectStatus,
    ) -> DbResult<Option<Project>>;
    /// Stamp the SOW signature and substage. `None` when the project is
    /// missing or already signed.
    async fn sign_sow(
        &self,
        id: DbId,
        signed_by: DbId,
        substage: &str,
    ) -> DbResult<Option<Project>>;
}

#[async_trait]
pub trait ModuleRepository: Send + Sync {
    async fn get_for_project(&self, project_id: DbId) -> DbResult<ProjectModules>;
}

#[async_trait]
pub trait ChecklistRepository: Send + Sync {
    async fn list_templates(&self) -> DbResult<Vec<ChecklistTemplate>>;
    /// Items ordered by template sort order.
    async fn list_for_project(&self, project_id: DbId) -> DbResult<Vec<ChecklistItem>>;
    async fn find_item(&self, id: DbId) -> DbResult<Option<ChecklistItem>>;
    async fn update_item(
        &self,
        id: DbId,
        status: ChecklistStatus,
        notes: Option<&str>,
        completed_at: Option<Timestamp>,
        updated_by: Option<DbId>,
    ) -> DbResult<Option<ChecklistItem>>;
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn create(&self, input: &CreateDocument) -> DbResult<Document>;
    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Document>>;
    /// Newest first.
    async fn list_for_project(&self, project_id: DbId) -> DbResult<Vec<Document>>;
    async fn update_status(&self, id: DbId, status: DocumentStatus)
        -> DbResult<Option<Document>>;
    async fn delete(&self, id: DbId) -> DbResult<bool>;
}

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn create(&self, input: &CreateActivity) -> DbResult<ActivityLog>;
    /// Newest first.
    async fn list_for_project(
        &self,
        project_id: DbId,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<ActivityLog>>;
}

// ---------------------------------------------------------------------------
// Invites
// ---------------------------------------------------------------------------

#[async_trait]
pub trait InviteRepository: Send + Sync {
    async fn create(&self, input: &CreateInvite) -> DbResult<Invite>;
    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Invite>>;
    async fn find_by_token(&self, token: &str) -> DbResult<Option<Invite>>;
    /// Newest first.
    async fn list(&self, filter: &InviteFilter) -> DbResult<Vec<Invite>>;
    async fn count(&self, filter: &InviteFilter) -> DbResult<i64>;
    /// `pending -> used`. Returns `false` if the invite was not pending.
    async fn mark_used(&self, token: &str, project_id: Option<DbId>) -> DbResult<bool>;
    /// `pending -> revoked`.
    async fn revoke(&self, id: DbId) -> DbResult<bool>;
    /// `pending -> expired` for one invite.
    async fn expire(&self, id: DbId) -> DbResult<bool>;
    /// `pending -> expired` for every invite whose expiry is at or before `now`.
    async fn expire_stale(&self, now: Timestamp) -> DbResult<u64>;
    /// Mark a pending, unexpired team invite used and provision its portal
    /// user in one transaction: the user row is created (or its password set)
    /// and linked to the invite's company and contact. `None` when the invite
    /// is no longer redeemable. On error nothing is written.
    async fn redeem_team_invite(&self, input: &RedeemTeamInvite) -> DbResult<Option<User>>;
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, input: &CreateUser) -> DbResult<User>;
    async fn find_by_id(&self, id: DbId) -> DbResult<Option<User>>;
    /// Case-insensitive.
    async fn find_by_email(&self, email: &str) -> DbResult<Option<User>>;
    async fn set_password_hash(&self, id: DbId, password_hash: &str) -> DbResult<bool>;
    async fn record_login(&self, id: DbId) -> DbResult<()>;
}

#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    async fn find_staff(&self, user_id: DbId) -> DbResult<Option<StaffMember>>;
    async fn find_portal_user(&self, user_id: DbId) -> DbResult<Option<PortalUser>>;
    async fn create_staff(&self, user_id: DbId, name: &str, role: &str) -> DbResult<StaffMember>;
    async fn create_portal_user(
        &self,
        user_id: DbId,
        company_id: DbId,
        contact_id: DbId,
    ) -> DbResult<PortalUser>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, input: &CreateSession) -> DbResult<UserSession>;
    /// Only sessions that are neither revoked nor expired.
    async fn find_active_by_refresh_hash(&self, hash: &str) -> DbResult<Option<UserSession>>;
    async fn revoke(&self, id: DbId) -> DbResult<bool>;
    async fn revoke_all_for_user(&self, user_id: DbId) -> DbResult<u64>;
}

#[async_trait]
pub trait LoginCodeRepository: Send + Sync {
    /// Delete any earlier codes for the address and store a new one, so at
    /// most one code per address is live.
    async fn replace_for_email(
        &self,
        email: &str,
        code_hash: &str,
        expires_at: Timestamp,
    ) -> DbResult<LoginCode>;
    /// Consume the live code for `email` if `code_hash` matches it. A
    /// mismatch counts as a failed attempt, and the code is burned once
    /// `max_attempts` failures have accumulated. `None` on any miss.
    async fn consume(
        &self,
        email: &str,
        code_hash: &str,
        max_attempts: i32,
    ) -> DbResult<Option<LoginCode>>;
}

#[async_trait]
pub trait PasswordResetRepository: Send + Sync {
    /// Delete any prior tokens for the user and store a new one.
    async fn replace_for_user(
        &self,
        user_id: DbId,
        token_hash: &str,
        expires_at: Timestamp,
    ) -> DbResult<PasswordResetToken>;
    /// Unused and unexpired only.
    async fn find_valid(&self, token_hash: &str) -> DbResult<Option<PasswordResetToken>>;
    /// Stamp `used_at`. Returns `false` if it was already used.
    async fn mark_used(&self, id: DbId) -> DbResult<bool>;
}

// ---------------------------------------------------------------------------
// Project integrations
// ---------------------------------------------------------------------------

#[async_trait]
pub trait WebhookRepository: Send + Sync {
    async fn create(&self, input: &CreateWebhook) -> DbResult<Webhook>;
    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Webhook>>;
    async fn list_for_project(&self, project_id: DbId) -> DbResult<Vec<Webhook>>;
    async fn delete(&self, id: DbId) -> DbResult<bool>;
}

#[async_trait]
pub trait IntegrationRepository: Send + Sync {
    async fn list_for_project(&self, project_id: DbId) -> DbResult<Vec<IntegrationConfig>>;
    /// Create or replace the row for `(project_id, system_type)`.
    async fn upsert(
        &self,
        project_id: DbId,
        input: &UpsertIntegration,
    ) -> DbResult<IntegrationConfig>;
}

#[async_trait]
pub trait ApiCredentialRepository: Send + Sync {
    async fn find_for_project(&self, project_id: DbId) -> DbResult<Option<ApiCredential>>;
    /// Create or rotate the single credential of a project.
    async fn replace(
        &self,
        project_id: DbId,
        api_key: &str,
        secret_hash: &str,
        created_by: Option<DbId>,
    ) -> DbResult<ApiCredential>;
}

#[async_trait]
pub trait EmailLogRepository: Send + Sync {
    async fn create(&self, input: &CreateEmailLog) -> DbResult<EmailLog>;
    /// Newest first, optionally restricted to one project.
    async fn list(
        &self,
        project_id: Option<DbId>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<EmailLog>>;
}

// ---------------------------------------------------------------------------
// Onboarding
// ---------------------------------------------------------------------------

#[async_trait]
pub trait OnboardingRepository: Send + Sync {
    /// Write company, primary contact, project, module selections, module
    /// configs, checklist items and the submission activity all-or-nothing.
    ///
    /// When `input.invite_id` is set the invite is marked used inside the same
    /// transaction; a non-pending invite aborts with [`DbError::Conflict`].
    ///
    /// [`DbError::Conflict`]: crate::error::DbError::Conflict
    async fn create_submission(&self, input: &NewSubmission) -> DbResult<SubmissionRecord>;
}
