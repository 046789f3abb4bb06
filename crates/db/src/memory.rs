//! In-memory implementation of every repository trait.
//!
//! Used by service and HTTP tests so they run without PostgreSQL. All state
//! sits behind one mutex, so every conditional update is atomic exactly like
//! its single-statement SQL counterpart. `create_submission` snapshots the
//! state and restores it on failure to mirror a rolled-back transaction.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use onboard_core::status::{
    ChecklistStatus, ContactRole, DocumentStatus, IntegrationStatus, InviteStatus, ModuleType,
    ProjectStatus,
};
use onboard_core::types::{DbId, Timestamp};

use crate::error::{DbError, DbResult};
use crate::models::activity::{actions, ActivityLog, CreateActivity};
use crate::models::api_credential::ApiCredential;
use crate::models::checklist::{ChecklistItem, ChecklistTemplate};
use crate::models::company::Company;
use crate::models::contact::{Contact, CreateContact, UpdateContact};
use crate::models::document::{CreateDocument, Document};
use crate::models::email_log::{CreateEmailLog, EmailLog};
use crate::models::integration::{IntegrationConfig, UpsertIntegration};
use crate::models::invite::{CreateInvite, Invite, InviteFilter, RedeemTeamInvite};
use crate::models::login_code::LoginCode;
use crate::models::module::{CommsConfig, CoreConfig, FnolConfig, ModuleSelection, ProjectModules};
use crate::models::onboarding::{NewSubmission, SubmissionRecord};
use crate::models::password_reset::PasswordResetToken;
use crate::models::principal::{PortalUser, StaffMember};
use crate::models::project::{Project, ProjectFilter, ProjectSummary, UpdateProject};
use crate::models::session::{CreateSession, UserSession};
use crate::models::user::{CreateUser, User};
use crate::models::webhook::{CreateWebhook, Webhook};
use crate::repository::*;

/// Step of `create_submission` at which an injected failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Contact,
    Project,
    ModuleConfig,
    Activity,
}

/// Checklist templates seeded by the migrations, mirrored here.
const SEED_TEMPLATES: &[(&str, &str, i32)] = &[
    ("Kickoff call scheduled", "kickoff", 10),
    ("Discovery questionnaire reviewed", "kickoff", 20),
    ("Statement of work approved", "contract", 30),
    ("Master services agreement signed", "contract", 40),
    ("Technical contact assigned", "technical", 50),
    ("Integration credentials issued", "technical", 60),
    ("Historical data migrated", "technical", 70),
    ("User acceptance testing complete", "launch", 80),
    ("Staff training delivered", "launch", 90),
    ("Go-live sign-off", "launch", 100),
];

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: DbId,
    companies: Vec<Company>,
    contacts: Vec<Contact>,
    projects: Vec<Project>,
    selections: Vec<ModuleSelection>,
    core_configs: Vec<CoreConfig>,
    comms_configs: Vec<CommsConfig>,
    fnol_configs: Vec<FnolConfig>,
    templates: Vec<ChecklistTemplate>,
    checklist_items: Vec<ChecklistItem>,
    documents: Vec<Document>,
    activity: Vec<ActivityLog>,
    invites: Vec<Invite>,
    users: Vec<User>,
    staff: Vec<StaffMember>,
    portal_users: Vec<PortalUser>,
    sessions: Vec<UserSession>,
    login_codes: Vec<LoginCode>,
    reset_tokens: Vec<PasswordResetToken>,
    webhooks: Vec<Webhook>,
    integrations: Vec<IntegrationConfig>,
    api_credentials: Vec<ApiCredential>,
    email_logs: Vec<EmailLog>,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

/// Shared in-memory database.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_point: Mutex<Option<FailPoint>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// An empty store with the default checklist templates.
    pub fn new() -> Self {
        let mut state = MemoryState::default();
        for (name, category, sort_order) in SEED_TEMPLATES {
            let id = state.next_id();
            state.templates.push(ChecklistTemplate {
                id,
                name: name.to_string(),
                description: None,
                category: category.to_string(),
                sort_order: *sort_order,
                is_active: true,
            });
        }
        Self {
            state: Mutex::new(state),
            fail_point: Mutex::new(None),
        }
    }

    fn state(&self) -> DbResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| DbError::Internal("memory store lock poisoned".into()))
    }

    /// Make the next `create_submission` fail at `point`.
    pub fn fail_at(&self, point: FailPoint) {
        if let Ok(mut guard) = self.fail_point.lock() {
            *guard = Some(point);
        }
    }

    fn check_fail(&self, point: FailPoint) -> DbResult<()> {
        let mut guard = self
            .fail_point
            .lock()
            .map_err(|_| DbError::Internal("fail point lock poisoned".into()))?;
        if *guard == Some(point) {
            *guard = None;
            return Err(DbError::Internal(format!("injected failure at {point:?}")));
        }
        Ok(())
    }

    /// Overwrite an invite's expiry, e.g. to backdate it.
    pub fn set_invite_expires_at(&self, id: DbId, expires_at: Timestamp) -> DbResult<()> {
        let mut state = self.state()?;
        if let Some(invite) = state.invites.iter_mut().find(|i| i.id == id) {
            invite.expires_at = expires_at;
        }
        Ok(())
    }

    /// Overwrite a password reset token's expiry.
    pub fn set_reset_token_expires_at(&self, id: DbId, expires_at: Timestamp) -> DbResult<()> {
        let mut state = self.state()?;
        if let Some(token) = state.reset_tokens.iter_mut().find(|t| t.id == id) {
            token.expires_at = expires_at;
        }
        Ok(())
    }

    /// Force a project into `status` without going through the state machine.
    pub fn set_project_status(&self, id: DbId, status: ProjectStatus) -> DbResult<()> {
        let mut state = self.state()?;
        if let Some(project) = state.projects.iter_mut().find(|p| p.id == id) {
            project.status = status;
        }
        Ok(())
    }

    /// Count of all module config rows, across the three config tables.
    pub fn module_config_count(&self) -> DbResult<usize> {
        let state = self.state()?;
        Ok(state.core_configs.len() + state.comms_configs.len() + state.fnol_configs.len())
    }
}

fn page<T: Clone>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

fn primary_first(contacts: &mut [Contact]) {
    contacts.sort_by_key(|c| (c.role != ContactRole::Primary, c.created_at, c.id));
}

fn insert_contact(state: &mut MemoryState, input: &CreateContact) -> DbResult<Contact> {
    let duplicate = state.contacts.iter().any(|c| {
        c.company_id == input.company_id && c.email.eq_ignore_ascii_case(&input.email)
    });
    if duplicate {
        return Err(DbError::UniqueViolation("uq_contacts_company_email".into()));
    }
    let now = Utc::now();
    let contact = Contact {
        id: state.next_id(),
        company_id: input.company_id,
        first_name: input.first_name.clone(),
        last_name: input.last_name.clone(),
        email: input.email.clone(),
        phone: input.phone.clone(),
        title: input.title.clone(),
        role: input.role,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    state.contacts.push(contact.clone());
    Ok(contact)
}

fn insert_activity(state: &mut MemoryState, input: &CreateActivity) -> ActivityLog {
    let entry = ActivityLog {
        id: state.next_id(),
        project_id: input.project_id,
        actor_id: input.actor_id,
        action: input.action.clone(),
        details: input.details.clone(),
        created_at: Utc::now(),
    };
    state.activity.push(entry.clone());
    entry
}

fn insert_user(state: &mut MemoryState, input: &CreateUser) -> DbResult<User> {
    if state
        .users
        .iter()
        .any(|u| u.email.eq_ignore_ascii_case(&input.email))
    {
        return Err(DbError::UniqueViolation("uq_users_email".into()));
    }
    let now = Utc::now();
    let user = User {
        id: state.next_id(),
        email: input.email.clone(),
        password_hash: input.password_hash.clone(),
        is_active: true,
        last_login_at: None,
        created_at: now,
        updated_at: now,
    };
    state.users.push(user.clone());
    Ok(user)
}

fn insert_portal_user(
    state: &mut MemoryState,
    user_id: DbId,
    company_id: DbId,
    contact_id: DbId,
) -> DbResult<PortalUser> {
    if state.portal_users.iter().any(|p| p.user_id == user_id) {
        return Err(DbError::UniqueViolation("uq_portal_users_user".into()));
    }
    let portal_user = PortalUser {
        id: state.next_id(),
        user_id,
        company_id,
        contact_id,
        created_at: Utc::now(),
    };
    state.portal_users.push(portal_user.clone());
    Ok(portal_user)
}

fn redeem_team_invite(state: &mut MemoryState, input: &RedeemTeamInvite) -> DbResult<Option<User>> {
    let now = Utc::now();
    let Some(invite) = state.invites.iter_mut().find(|i| {
        i.token == input.token && i.status == InviteStatus::Pending && i.expires_at > now
    }) else {
        return Ok(None);
    };
    invite.status = InviteStatus::Used;
    invite.used_at = Some(now);
    invite.updated_at = now;

    let existing = state
        .users
        .iter_mut()
        .find(|u| u.email.eq_ignore_ascii_case(&input.email));
    let user = match existing {
        Some(user) => {
            user.password_hash = Some(input.password_hash.clone());
            user.updated_at = now;
            user.clone()
        }
        None => insert_user(
            state,
            &CreateUser {
                email: input.email.clone(),
                password_hash: Some(input.password_hash.clone()),
            },
        )?,
    };
    insert_portal_user(state, user.id, input.company_id, input.contact_id)?;
    Ok(Some(user))
}

fn matches_project_filter(project: &Project, filter: &ProjectFilter) -> bool {
    filter.company_id.is_none_or(|id| project.company_id == id)
        && filter.status.is_none_or(|s| project.status == s)
}

fn matches_invite_filter(invite: &Invite, filter: &InviteFilter) -> bool {
    filter.status.is_none_or(|s| invite.status == s)
        && filter.email.as_ref().is_none_or(|needle| {
            invite
                .email
                .to_lowercase()
                .contains(&needle.to_lowercase())
        })
}

// ---------------------------------------------------------------------------
// Tenant data
// ---------------------------------------------------------------------------

#[async_trait]
impl CompanyRepository for MemoryStore {
    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Company>> {
        Ok(self.state()?.companies.iter().find(|c| c.id == id).cloned())
    }

    async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<Company>> {
        let mut companies = self.state()?.companies.clone();
        companies.sort_by_key(|c| std::cmp::Reverse((c.created_at, c.id)));
        Ok(page(companies, limit, offset))
    }

    async fn count(&self) -> DbResult<i64> {
        Ok(self.state()?.companies.len() as i64)
    }
}

#[async_trait]
impl ContactRepository for MemoryStore {
    async fn create(&self, input: &CreateContact) -> DbResult<Contact> {
        insert_contact(&mut *self.state()?, input)
    }

    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Contact>> {
        Ok(self.state()?.contacts.iter().find(|c| c.id == id).cloned())
    }

    async fn find_by_company_email(
        &self,
        company_id: DbId,
        email: &str,
    ) -> DbResult<Option<Contact>> {
        Ok(self
            .state()?
            .contacts
            .iter()
            .find(|c| c.company_id == company_id && c.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_by_company(&self, company_id: DbId) -> DbResult<Vec<Contact>> {
        let mut contacts: Vec<Contact> = self
            .state()?
            .contacts
            .iter()
            .filter(|c| c.company_id == company_id)
            .cloned()
            .collect();
        primary_first(&mut contacts);
        Ok(contacts)
    }

    async fn list_active_by_company(&self, company_id: DbId) -> DbResult<Vec<Contact>> {
        let mut contacts: Vec<Contact> = self
            .state()?
            .contacts
            .iter()
            .filter(|c| c.company_id == company_id && c.is_active)
            .cloned()
            .collect();
        primary_first(&mut contacts);
        Ok(contacts)
    }

    async fn find_primary(&self, company_id: DbId) -> DbResult<Option<Contact>> {
        let contacts = ContactRepository::list_active_by_company(self, company_id).await?;
        Ok(contacts.into_iter().next())
    }

    async fn update(&self, id: DbId, input: &UpdateContact) -> DbResult<Option<Contact>> {
        let mut state = self.state()?;
        let Some(contact) = state.contacts.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        if let Some(first_name) = &input.first_name {
            contact.first_name = first_name.clone();
        }
        if let Some(last_name) = &input.last_name {
            contact.last_name = last_name.clone();
        }
        if input.phone.is_some() {
            contact.phone = input.phone.clone();
        }
        if input.title.is_some() {
            contact.title = input.title.clone();
        }
        contact.updated_at = Utc::now();
        Ok(Some(contact.clone()))
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Project>> {
        Ok(self.state()?.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn list(&self, filter: &ProjectFilter) -> DbResult<Vec<ProjectSummary>> {
        let state = self.state()?;
        let mut summaries: Vec<ProjectSummary> = state
            .projects
            .iter()
            .filter(|p| matches_project_filter(p, filter))
            .map(|p| ProjectSummary {
                id: p.id,
                company_id: p.company_id,
                company_name: state
                    .companies
                    .iter()
                    .find(|c| c.id == p.company_id)
                    .map(|c| c.legal_name.clone())
                    .unwrap_or_default(),
                status: p.status,
                target_go_live_date: p.target_go_live_date,
                sow_signed_at: p.sow_signed_at,
                created_at: p.created_at,
                updated_at: p.updated_at,
            })
            .collect();
        summaries.sort_by_key(|p| std::cmp::Reverse((p.created_at, p.id)));
        Ok(page(summaries, filter.limit, filter.offset))
    }

    async fn count(&self, filter: &ProjectFilter) -> DbResult<i64> {
        Ok(self
            .state()?
            .projects
            .iter()
            .filter(|p| matches_project_filter(p, filter))
            .count() as i64)
    }

    async fn update(&self, id: DbId, input: &UpdateProject) -> DbResult<Option<Project>> {
        let mut state = self.state()?;
        let Some(project) = state.projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if input.target_go_live_date.is_some() {
            project.target_go_live_date = input.target_go_live_date;
        }
        if input.actual_go_live_date.is_some() {
            project.actual_go_live_date = input.actual_go_live_date;
        }
        if input.notes.is_some() {
            project.notes = input.notes.clone();
        }
        project.updated_at = Utc::now();
        Ok(Some(project.clone()))
    }

    async fn update_status(
        &self,
        id: DbId,
        from: ProjectStatus,
        to: ProjectStatus,
    ) -> DbResult<Option<Project>> {
        let mut state = self.state()?;
        match state
            .projects
            .iter_mut()
            .find(|p| p.id == id && p.status == from)
        {
            Some(project) => {
                project.status = to;
                project.updated_at = Utc::now();
                Ok(Some(project.clone()))
            }
            None => Ok(None),
        }
    }

    async fn sign_sow(
        &self,
        id: DbId,
        signed_by: DbId,
        substage: &str,
    ) -> DbResult<Option<Project>> {
        let mut state = self.state()?;
        match state
            .projects
            .iter_mut()
            .find(|p| p.id == id && p.sow_signed_at.is_none())
        {
            Some(project) => {
                let now = Utc::now();
                project.sow_signed_at = Some(now);
                project.sow_signed_by = Some(signed_by);
                project.substage = Some(substage.to_string());
                project.updated_at = now;
                Ok(Some(project.clone()))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ModuleRepository for MemoryStore {
    async fn get_for_project(&self, project_id: DbId) -> DbResult<ProjectModules> {
        let state = self.state()?;
        let mut selections: Vec<ModuleSelection> = state
            .selections
            .iter()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        selections.sort_by_key(|s| {
            ModuleType::ALL
                .iter()
                .position(|m| *m == s.module_type)
                .unwrap_or(usize::MAX)
        });
        let selection_ids: Vec<DbId> = selections.iter().map(|s| s.id).collect();
        let owns = |id: &DbId| selection_ids.contains(id);
        Ok(ProjectModules {
            core: state
                .core_configs
                .iter()
                .find(|c| owns(&c.module_selection_id))
                .cloned(),
            comms: state
                .comms_configs
                .iter()
                .find(|c| owns(&c.module_selection_id))
                .cloned(),
            fnol: state
                .fnol_configs
                .iter()
                .find(|c| owns(&c.module_selection_id))
                .cloned(),
            selections,
        })
    }
}

#[async_trait]
impl ChecklistRepository for MemoryStore {
    async fn list_templates(&self) -> DbResult<Vec<ChecklistTemplate>> {
        let mut templates = self.state()?.templates.clone();
        templates.sort_by_key(|t| (t.sort_order, t.id));
        Ok(templates)
    }

    async fn list_for_project(&self, project_id: DbId) -> DbResult<Vec<ChecklistItem>> {
        let mut items: Vec<ChecklistItem> = self
            .state()?
            .checklist_items
            .iter()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| (i.sort_order, i.id));
        Ok(items)
    }

    async fn find_item(&self, id: DbId) -> DbResult<Option<ChecklistItem>> {
        Ok(self
            .state()?
            .checklist_items
            .iter()
            .find(|i| i.id == id)
            .cloned())
    }

    async fn update_item(
        &self,
        id: DbId,
        status: ChecklistStatus,
        notes: Option<&str>,
        completed_at: Option<Timestamp>,
        updated_by: Option<DbId>,
    ) -> DbResult<Option<ChecklistItem>> {
        let mut state = self.state()?;
        let Some(item) = state.checklist_items.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        item.status = status;
        if let Some(notes) = notes {
            item.notes = Some(notes.to_string());
        }
        item.completed_at = completed_at;
        item.updated_by = updated_by;
        item.updated_at = Utc::now();
        Ok(Some(item.clone()))
    }
}

#[async_trait]
impl DocumentRepository for MemoryStore {
    async fn create(&self, input: &CreateDocument) -> DbResult<Document> {
        let mut state = self.state()?;
        let now = Utc::now();
        let document = Document {
            id: state.next_id(),
            project_id: input.project_id,
            name: input.name.clone(),
            storage_path: input.storage_path.clone(),
            mime_type: input.mime_type.clone(),
            size_bytes: input.size_bytes,
            status: DocumentStatus::Pending,
            uploaded_by: input.uploaded_by,
            created_at: now,
            updated_at: now,
        };
        state.documents.push(document.clone());
        Ok(document)
    }

    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Document>> {
        Ok(self.state()?.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn list_for_project(&self, project_id: DbId) -> DbResult<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .state()?
            .documents
            .iter()
            .filter(|d| d.project_id == project_id)
            .cloned()
            .collect();
        documents.sort_by_key(|d| std::cmp::Reverse((d.created_at, d.id)));
        Ok(documents)
    }

    async fn update_status(
        &self,
        id: DbId,
        status: DocumentStatus,
    ) -> DbResult<Option<Document>> {
        let mut state = self.state()?;
        let Some(document) = state.documents.iter_mut().find(|d| d.id == id) else {
            return Ok(None);
        };
        document.status = status;
        document.updated_at = Utc::now();
        Ok(Some(document.clone()))
    }

    async fn delete(&self, id: DbId) -> DbResult<bool> {
        let mut state = self.state()?;
        let before = state.documents.len();
        state.documents.retain(|d| d.id != id);
        Ok(state.documents.len() < before)
    }
}

#[async_trait]
impl ActivityRepository for MemoryStore {
    async fn create(&self, input: &CreateActivity) -> DbResult<ActivityLog> {
        Ok(insert_activity(&mut *self.state()?, input))
    }

    async fn list_for_project(
        &self,
        project_id: DbId,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<ActivityLog>> {
        let mut entries: Vec<ActivityLog> = self
            .state()?
            .activity
            .iter()
            .filter(|a| a.project_id == project_id)
            .cloned()
            .collect();
        entries.sort_by_key(|a| std::cmp::Reverse((a.created_at, a.id)));
        Ok(page(entries, limit, offset))
    }
}

// ---------------------------------------------------------------------------
// Invites
// ---------------------------------------------------------------------------

#[async_trait]
impl InviteRepository for MemoryStore {
    async fn create(&self, input: &CreateInvite) -> DbResult<Invite> {
        let mut state = self.state()?;
        if state.invites.iter().any(|i| i.token == input.token) {
            return Err(DbError::UniqueViolation("uq_invites_token".into()));
        }
        let now = Utc::now();
        let invite = Invite {
            id: state.next_id(),
            token: input.token.clone(),
            email: input.email.clone(),
            company_name: input.company_name.clone(),
            invited_by: input.invited_by,
            status: InviteStatus::Pending,
            expires_at: input.expires_at,
            used_at: None,
            project_id: None,
            metadata: input.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        state.invites.push(invite.clone());
        Ok(invite)
    }

    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Invite>> {
        Ok(self.state()?.invites.iter().find(|i| i.id == id).cloned())
    }

    async fn find_by_token(&self, token: &str) -> DbResult<Option<Invite>> {
        Ok(self
            .state()?
            .invites
            .iter()
            .find(|i| i.token == token)
            .cloned())
    }

    async fn list(&self, filter: &InviteFilter) -> DbResult<Vec<Invite>> {
        let mut invites: Vec<Invite> = self
            .state()?
            .invites
            .iter()
            .filter(|i| matches_invite_filter(i, filter))
            .cloned()
            .collect();
        invites.sort_by_key(|i| std::cmp::Reverse((i.created_at, i.id)));
        Ok(page(invites, filter.limit, filter.offset))
    }

    async fn count(&self, filter: &InviteFilter) -> DbResult<i64> {
        Ok(self
            .state()?
            .invites
            .iter()
            .filter(|i| matches_invite_filter(i, filter))
            .count() as i64)
    }

    async fn mark_used(&self, token: &str, project_id: Option<DbId>) -> DbResult<bool> {
        let mut state = self.state()?;
        match state
            .invites
            .iter_mut()
            .find(|i| i.token == token && i.status == InviteStatus::Pending)
        {
            Some(invite) => {
                let now = Utc::now();
                invite.status = InviteStatus::Used;
                invite.used_at = Some(now);
                if project_id.is_some() {
                    invite.project_id = project_id;
                }
                invite.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke(&self, id: DbId) -> DbResult<bool> {
        let mut state = self.state()?;
        match state
            .invites
            .iter_mut()
            .find(|i| i.id == id && i.status == InviteStatus::Pending)
        {
            Some(invite) => {
                invite.status = InviteStatus::Revoked;
                invite.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn expire(&self, id: DbId) -> DbResult<bool> {
        let mut state = self.state()?;
        match state
            .invites
            .iter_mut()
            .find(|i| i.id == id && i.status == InviteStatus::Pending)
        {
            Some(invite) => {
                invite.status = InviteStatus::Expired;
                invite.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn expire_stale(&self, now: Timestamp) -> DbResult<u64> {
        let mut state = self.state()?;
        let mut count = 0;
        for invite in state
            .invites
            .iter_mut()
            .filter(|i| i.status == InviteStatus::Pending && i.expires_at <= now)
        {
            invite.status = InviteStatus::Expired;
            invite.updated_at = now;
            count += 1;
        }
        Ok(count)
    }

    async fn redeem_team_invite(&self, input: &RedeemTeamInvite) -> DbResult<Option<User>> {
        let mut state = self.state()?;
        let snapshot = state.clone();
        let redeemed = redeem_team_invite(&mut state, input);
        if redeemed.is_err() {
            *state = snapshot;
        }
        redeemed
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, input: &CreateUser) -> DbResult<User> {
        insert_user(&mut *self.state()?, input)
    }

    async fn find_by_id(&self, id: DbId) -> DbResult<Option<User>> {
        Ok(self.state()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        Ok(self
            .state()?
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn set_password_hash(&self, id: DbId, password_hash: &str) -> DbResult<bool> {
        let mut state = self.state()?;
        let Some(user) = state.users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        user.password_hash = Some(password_hash.to_string());
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn record_login(&self, id: DbId) -> DbResult<()> {
        let mut state = self.state()?;
        if let Some(user) = state.users.iter_mut().find(|u| u.id == id) {
            user.last_login_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl PrincipalRepository for MemoryStore {
    async fn find_staff(&self, user_id: DbId) -> DbResult<Option<StaffMember>> {
        Ok(self
            .state()?
            .staff
            .iter()
            .find(|s| s.user_id == user_id)
            .cloned())
    }

    async fn find_portal_user(&self, user_id: DbId) -> DbResult<Option<PortalUser>> {
        Ok(self
            .state()?
            .portal_users
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn create_staff(&self, user_id: DbId, name: &str, role: &str) -> DbResult<StaffMember> {
        let mut state = self.state()?;
        if state.staff.iter().any(|s| s.user_id == user_id) {
            return Err(DbError::UniqueViolation("uq_staff_members_user".into()));
        }
        let staff = StaffMember {
            id: state.next_id(),
            user_id,
            name: name.to_string(),
            role: role.to_string(),
            created_at: Utc::now(),
        };
        state.staff.push(staff.clone());
        Ok(staff)
    }

    async fn create_portal_user(
        &self,
        user_id: DbId,
        company_id: DbId,
        contact_id: DbId,
    ) -> DbResult<PortalUser> {
        insert_portal_user(&mut *self.state()?, user_id, company_id, contact_id)
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn create(&self, input: &CreateSession) -> DbResult<UserSession> {
        let mut state = self.state()?;
        let session = UserSession {
            id: state.next_id(),
            user_id: input.user_id,
            refresh_token_hash: input.refresh_token_hash.clone(),
            expires_at: input.expires_at,
            is_revoked: false,
            created_at: Utc::now(),
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn find_active_by_refresh_hash(&self, hash: &str) -> DbResult<Option<UserSession>> {
        let now = Utc::now();
        Ok(self
            .state()?
            .sessions
            .iter()
            .find(|s| s.refresh_token_hash == hash && !s.is_revoked && s.expires_at > now)
            .cloned())
    }

    async fn revoke(&self, id: DbId) -> DbResult<bool> {
        let mut state = self.state()?;
        match state
            .sessions
            .iter_mut()
            .find(|s| s.id == id && !s.is_revoked)
        {
            Some(session) => {
                session.is_revoked = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_all_for_user(&self, user_id: DbId) -> DbResult<u64> {
        let mut state = self.state()?;
        let mut count = 0;
        for session in state
            .sessions
            .iter_mut()
            .filter(|s| s.user_id == user_id && !s.is_revoked)
        {
            session.is_revoked = true;
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl LoginCodeRepository for MemoryStore {
    async fn replace_for_email(
        &self,
        email: &str,
        code_hash: &str,
        expires_at: Timestamp,
    ) -> DbResult<LoginCode> {
        let mut state = self.state()?;
        state
            .login_codes
            .retain(|c| !c.email.eq_ignore_ascii_case(email));
        let code = LoginCode {
            id: state.next_id(),
            email: email.to_string(),
            code_hash: code_hash.to_string(),
            expires_at,
            attempts: 0,
            consumed_at: None,
            created_at: Utc::now(),
        };
        state.login_codes.push(code.clone());
        Ok(code)
    }

    async fn consume(
        &self,
        email: &str,
        code_hash: &str,
        max_attempts: i32,
    ) -> DbResult<Option<LoginCode>> {
        let mut state = self.state()?;
        let now = Utc::now();
        let Some(code) = state.login_codes.iter_mut().rev().find(|c| {
            c.email.eq_ignore_ascii_case(email) && c.consumed_at.is_none() && c.expires_at > now
        }) else {
            return Ok(None);
        };

        if code.code_hash == code_hash {
            code.consumed_at = Some(now);
            return Ok(Some(code.clone()));
        }
        code.attempts += 1;
        if code.attempts >= max_attempts {
            code.consumed_at = Some(now);
        }
        Ok(None)
    }
}

#[async_trait]
impl PasswordResetRepository for MemoryStore {
    async fn replace_for_user(
        &self,
        user_id: DbId,
        token_hash: &str,
        expires_at: Timestamp,
    ) -> DbResult<PasswordResetToken> {
        let mut state = self.state()?;
        state.reset_tokens.retain(|t| t.user_id != user_id);
        let token = PasswordResetToken {
            id: state.next_id(),
            user_id,
            token_hash: token_hash.to_string(),
            expires_at,
            used_at: None,
            created_at: Utc::now(),
        };
        state.reset_tokens.push(token.clone());
        Ok(token)
    }

    async fn find_valid(&self, token_hash: &str) -> DbResult<Option<PasswordResetToken>> {
        let now = Utc::now();
        Ok(self
            .state()?
            .reset_tokens
            .iter()
            .find(|t| t.token_hash == token_hash && t.used_at.is_none() && t.expires_at > now)
            .cloned())
    }

    async fn mark_used(&self, id: DbId) -> DbResult<bool> {
        let mut state = self.state()?;
        match state
            .reset_tokens
            .iter_mut()
            .find(|t| t.id == id && t.used_at.is_none())
        {
            Some(token) => {
                token.used_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Project integrations
// ---------------------------------------------------------------------------

#[async_trait]
impl WebhookRepository for MemoryStore {
    async fn create(&self, input: &CreateWebhook) -> DbResult<Webhook> {
        let mut state = self.state()?;
        let webhook = Webhook {
            id: state.next_id(),
            project_id: input.project_id,
            url: input.url.clone(),
            events: input.events.clone(),
            secret: input.secret.clone(),
            is_active: true,
            created_by: input.created_by,
            created_at: Utc::now(),
        };
        state.webhooks.push(webhook.clone());
        Ok(webhook)
    }

    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Webhook>> {
        Ok(self.state()?.webhooks.iter().find(|w| w.id == id).cloned())
    }

    async fn list_for_project(&self, project_id: DbId) -> DbResult<Vec<Webhook>> {
        Ok(self
            .state()?
            .webhooks
            .iter()
            .filter(|w| w.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: DbId) -> DbResult<bool> {
        let mut state = self.state()?;
        let before = state.webhooks.len();
        state.webhooks.retain(|w| w.id != id);
        Ok(state.webhooks.len() < before)
    }
}

#[async_trait]
impl IntegrationRepository for MemoryStore {
    async fn list_for_project(&self, project_id: DbId) -> DbResult<Vec<IntegrationConfig>> {
        let mut configs: Vec<IntegrationConfig> = self
            .state()?
            .integrations
            .iter()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect();
        configs.sort_by(|a, b| a.system_type.cmp(&b.system_type));
        Ok(configs)
    }

    async fn upsert(
        &self,
        project_id: DbId,
        input: &UpsertIntegration,
    ) -> DbResult<IntegrationConfig> {
        let mut state = self.state()?;
        let now = Utc::now();
        let status = input.status.unwrap_or(IntegrationStatus::Pending);
        if let Some(existing) = state
            .integrations
            .iter_mut()
            .find(|c| c.project_id == project_id && c.system_type == input.system_type)
        {
            existing.settings = input.settings.clone();
            existing.status = status;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let config = IntegrationConfig {
            id: state.next_id(),
            project_id,
            system_type: input.system_type.clone(),
            settings: input.settings.clone(),
            status,
            created_at: now,
            updated_at: now,
        };
        state.integrations.push(config.clone());
        Ok(config)
    }
}

#[async_trait]
impl ApiCredentialRepository for MemoryStore {
    async fn find_for_project(&self, project_id: DbId) -> DbResult<Option<ApiCredential>> {
        Ok(self
            .state()?
            .api_credentials
            .iter()
            .find(|c| c.project_id == project_id)
            .cloned())
    }

    async fn replace(
        &self,
        project_id: DbId,
        api_key: &str,
        secret_hash: &str,
        created_by: Option<DbId>,
    ) -> DbResult<ApiCredential> {
        let mut state = self.state()?;
        let now = Utc::now();
        if let Some(existing) = state
            .api_credentials
            .iter_mut()
            .find(|c| c.project_id == project_id)
        {
            existing.api_key = api_key.to_string();
            existing.secret_hash = secret_hash.to_string();
            existing.created_by = created_by;
            existing.rotated_at = now;
            return Ok(existing.clone());
        }
        let credential = ApiCredential {
            id: state.next_id(),
            project_id,
            api_key: api_key.to_string(),
            secret_hash: secret_hash.to_string(),
            created_by,
            created_at: now,
            rotated_at: now,
        };
        state.api_credentials.push(credential.clone());
        Ok(credential)
    }
}

#[async_trait]
impl EmailLogRepository for MemoryStore {
    async fn create(&self, input: &CreateEmailLog) -> DbResult<EmailLog> {
        let mut state = self.state()?;
        let log = EmailLog {
            id: state.next_id(),
            email_type: input.email_type,
            recipient: input.recipient.clone(),
            subject: input.subject.clone(),
            success: input.success,
            message_id: input.message_id.clone(),
            error: input.error.clone(),
            project_id: input.project_id,
            invite_id: input.invite_id,
            created_at: Utc::now(),
        };
        state.email_logs.push(log.clone());
        Ok(log)
    }

    async fn list(
        &self,
        project_id: Option<DbId>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<EmailLog>> {
        let mut logs: Vec<EmailLog> = self
            .state()?
            .email_logs
            .iter()
            .filter(|l| project_id.is_none_or(|id| l.project_id == Some(id)))
            .cloned()
            .collect();
        logs.sort_by_key(|l| std::cmp::Reverse((l.created_at, l.id)));
        Ok(page(logs, limit, offset))
    }
}

// ---------------------------------------------------------------------------
// Onboarding
// ---------------------------------------------------------------------------

impl MemoryStore {
    fn apply_submission(
        &self,
        state: &mut MemoryState,
        input: &NewSubmission,
    ) -> DbResult<SubmissionRecord> {
        let now = Utc::now();
        let c = &input.company;
        let company = Company {
            id: state.next_id(),
            legal_name: c.legal_name.clone(),
            trade_name: c.trade_name.clone(),
            address_line1: c.address_line1.clone(),
            address_line2: c.address_line2.clone(),
            city: c.city.clone(),
            state: c.state.clone(),
            postal_code: c.postal_code.clone(),
            country: c.country.clone(),
            size: c.size,
            lines_of_business: c.lines_of_business.clone(),
            website: c.website.clone(),
            created_at: now,
            updated_at: now,
        };
        state.companies.push(company.clone());

        self.check_fail(FailPoint::Contact)?;
        let contact = insert_contact(
            state,
            &CreateContact {
                company_id: company.id,
                first_name: input.contact.first_name.clone(),
                last_name: input.contact.last_name.clone(),
                email: input.contact.email.clone(),
                phone: input.contact.phone.clone(),
                title: input.contact.title.clone(),
                role: ContactRole::Primary,
            },
        )?;

        self.check_fail(FailPoint::Project)?;
        let project = Project {
            id: state.next_id(),
            company_id: company.id,
            status: ProjectStatus::DiscoveryInProgress,
            substage: None,
            target_go_live_date: None,
            actual_go_live_date: None,
            sow_signed_at: None,
            sow_signed_by: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        state.projects.push(project.clone());

        let mut selections = Vec::with_capacity(input.modules.len());
        for &(module_type, is_selected) in &input.modules {
            let selection = ModuleSelection {
                id: state.next_id(),
                project_id: project.id,
                module_type,
                is_selected,
                created_at: now,
            };
            state.selections.push(selection.clone());
            if is_selected {
                self.check_fail(FailPoint::ModuleConfig)?;
                upsert_config(state, &selection, input);
            }
            selections.push(selection);
        }

        let mut templates: Vec<ChecklistTemplate> =
            state.templates.iter().filter(|t| t.is_active).cloned().collect();
        templates.sort_by_key(|t| (t.sort_order, t.id));
        for template in templates {
            let item = ChecklistItem {
                id: state.next_id(),
                project_id: project.id,
                template_id: template.id,
                name: template.name,
                category: template.category,
                sort_order: template.sort_order,
                status: ChecklistStatus::Pending,
                notes: None,
                completed_at: None,
                updated_by: None,
                created_at: now,
                updated_at: now,
            };
            state.checklist_items.push(item);
        }

        if let Some(invite_id) = input.invite_id {
            let invite = state.invites.iter_mut().find(|i| {
                i.id == invite_id && i.status == InviteStatus::Pending && i.expires_at > now
            });
            match invite {
                Some(invite) => {
                    invite.status = InviteStatus::Used;
                    invite.used_at = Some(now);
                    invite.project_id = Some(project.id);
                    invite.updated_at = now;
                }
                None => return Err(DbError::Conflict("Invite has already been used".into())),
            }
        }

        self.check_fail(FailPoint::Activity)?;
        let activity = insert_activity(
            state,
            &CreateActivity::new(
                project.id,
                None,
                actions::ONBOARDING_SUBMITTED,
                input.activity_details.clone(),
            ),
        );

        Ok(SubmissionRecord {
            company,
            contact,
            project,
            selections,
            activity,
        })
    }
}

fn upsert_config(state: &mut MemoryState, selection: &ModuleSelection, input: &NewSubmission) {
    let now = Utc::now();
    match selection.module_type {
        ModuleType::Core => {
            let req = input.core.clone().unwrap_or_default();
            state
                .core_configs
                .retain(|c| c.module_selection_id != selection.id);
            let id = state.next_id();
            state.core_configs.push(CoreConfig {
                id,
                module_selection_id: selection.id,
                monthly_claim_volume: req.monthly_claim_volume,
                claim_types: req.claim_types,
                current_system: req.current_system,
                user_count: req.user_count,
                requires_data_migration: req.requires_data_migration,
                updated_at: now,
            });
        }
        ModuleType::Comms => {
            let req = input.comms.clone().unwrap_or_default();
            state
                .comms_configs
                .retain(|c| c.module_selection_id != selection.id);
            let id = state.next_id();
            state.comms_configs.push(CommsConfig {
                id,
                module_selection_id: selection.id,
                channels: req.channels,
                monthly_message_volume: req.monthly_message_volume,
                requires_two_way_sms: req.requires_two_way_sms,
                languages: req.languages,
                updated_at: now,
            });
        }
        ModuleType::Fnol => {
            let req = input.fnol.clone().unwrap_or_default();
            state
                .fnol_configs
                .retain(|c| c.module_selection_id != selection.id);
            let id = state.next_id();
            state.fnol_configs.push(FnolConfig {
                id,
                module_selection_id: selection.id,
                intake_channels: req.intake_channels,
                monthly_fnol_volume: req.monthly_fnol_volume,
                requires_photo_upload: req.requires_photo_upload,
                after_hours_coverage: req.after_hours_coverage,
                updated_at: now,
            });
        }
    }
}

#[async_trait]
impl OnboardingRepository for MemoryStore {
    async fn create_submission(&self, input: &NewSubmission) -> DbResult<SubmissionRecord> {
        let mut state = self.state()?;
        let snapshot = state.clone();
        match self.apply_submission(&mut state, input) {
            Ok(record) => Ok(record),
            Err(err) => {
                *state = snapshot;
                Err(err)
            }
        }
    }
}
