//! Inputs and outputs of the atomic onboarding submission.

use onboard_core::onboarding::{CommsRequirements, CoreRequirements, FnolRequirements};
use onboard_core::status::ModuleType;
use onboard_core::types::DbId;

use crate::models::activity::ActivityLog;
use crate::models::company::{Company, CreateCompany};
use crate::models::contact::Contact;
use crate::models::module::ModuleSelection;
use crate::models::project::Project;

/// Primary contact fields; the company id is assigned inside the transaction.
#[derive(Debug, Clone)]
pub struct NewPrimaryContact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub title: Option<String>,
}

/// Everything written by one submission, applied all-or-nothing.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub company: CreateCompany,
    pub contact: NewPrimaryContact,
    /// One entry per module type with its selected flag.
    pub modules: Vec<(ModuleType, bool)>,
    pub core: Option<CoreRequirements>,
    pub comms: Option<CommsRequirements>,
    pub fnol: Option<FnolRequirements>,
    /// Details payload for the `onboarding_submitted` activity row.
    pub activity_details: serde_json::Value,
    /// Invite consumed by this submission, marked used in the same transaction.
    pub invite_id: Option<DbId>,
}

/// Rows created by a successful submission.
#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub company: Company,
    pub contact: Contact,
    pub project: Project,
    pub selections: Vec<ModuleSelection>,
    pub activity: ActivityLog,
}
