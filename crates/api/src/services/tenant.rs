//! Tenant access resolution.
//!
//! A principal is either staff (every tenant) or a portal user bound to one
//! company. Project and company checks funnel through here so the rule lives
//! in one place.

use onboard_core::error::CoreError;
use onboard_core::types::DbId;
use onboard_db::models::project::Project;
use onboard_db::{DbResult, Repositories};
use serde::Serialize;

use crate::error::AppResult;

/// Who the caller is, resolved once per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TenantContext {
    Staff {
        user_id: DbId,
        staff_id: DbId,
        name: String,
        role: String,
    },
    PortalUser {
        user_id: DbId,
        portal_user_id: DbId,
        company_id: DbId,
        contact_id: DbId,
    },
}

impl TenantContext {
    pub fn user_id(&self) -> DbId {
        match self {
            TenantContext::Staff { user_id, .. } | TenantContext::PortalUser { user_id, .. } => {
                *user_id
            }
        }
    }

    /// `None` for staff.
    pub fn company_id(&self) -> Option<DbId> {
        match self {
            TenantContext::Staff { .. } => None,
            TenantContext::PortalUser { company_id, .. } => Some(*company_id),
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, TenantContext::Staff { .. })
    }

    pub fn require_staff(&self) -> Result<(), CoreError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(CoreError::Forbidden("Staff access required".into()))
        }
    }

    /// Staff may touch any company; a portal user only its own.
    pub fn can_access_company(&self, company_id: DbId) -> bool {
        match self {
            TenantContext::Staff { .. } => true,
            TenantContext::PortalUser {
                company_id: own, ..
            } => *own == company_id,
        }
    }

    pub fn require_company_access(&self, company_id: DbId) -> Result<(), CoreError> {
        if self.can_access_company(company_id) {
            Ok(())
        } else {
            Err(CoreError::access_denied())
        }
    }
}

/// Look the user up as staff, then as a portal user. `None` means
/// authenticated but not provisioned.
pub async fn resolve_context(
    repos: &Repositories,
    user_id: DbId,
) -> DbResult<Option<TenantContext>> {
    if let Some(staff) = repos.principals.find_staff(user_id).await? {
        return Ok(Some(TenantContext::Staff {
            user_id,
            staff_id: staff.id,
            name: staff.name,
            role: staff.role,
        }));
    }
    if let Some(portal) = repos.principals.find_portal_user(user_id).await? {
        return Ok(Some(TenantContext::PortalUser {
            user_id,
            portal_user_id: portal.id,
            company_id: portal.company_id,
            contact_id: portal.contact_id,
        }));
    }
    Ok(None)
}

/// Staff: the project exists. Portal user: the project belongs to its company.
pub async fn has_project_access(
    repos: &Repositories,
    context: &TenantContext,
    project_id: DbId,
) -> DbResult<bool> {
    Ok(repos
        .projects
        .find_by_id(project_id)
        .await?
        .is_some_and(|p| context.can_access_company(p.company_id)))
}

/// Load a project the caller may access. Missing and foreign projects both
/// yield the same access-denied error.
pub async fn require_project_access(
    repos: &Repositories,
    context: &TenantContext,
    project_id: DbId,
) -> AppResult<Project> {
    match repos.projects.find_by_id(project_id).await? {
        Some(project) if context.can_access_company(project.company_id) => Ok(project),
        _ => Err(CoreError::access_denied().into()),
    }
}
