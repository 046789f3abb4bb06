//! Intake wizard payload schema and validation.
//!
//! The submission arrives as one JSON document with four sections: company,
//! primary contact, module flags, and per-module requirements. Validation is
//! declared with `validator` and flattened into one human-readable message
//! so the API can surface it as a 400.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::CoreError;
use crate::status::{CompanySize, ModuleType};

/// Loose international phone format: digits, spaces, dashes, dots, parens, leading `+`.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ().-]{7,20}$").expect("valid phone regex"));

/// Channels the communications module can drive.
pub const COMMS_CHANNELS: &[&str] = &["email", "sms", "voice", "portal", "mail"];

/// Channels a first-notice-of-loss can arrive through.
pub const FNOL_INTAKE_CHANNELS: &[&str] = &["phone", "web", "mobile", "email", "agent"];

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Full intake wizard submission.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_module_selection"))]
pub struct OnboardingSubmission {
    #[validate(nested)]
    pub company: CompanyDetails,
    #[validate(nested)]
    pub contact: PrimaryContact,
    #[serde(default)]
    pub modules: ModuleFlags,
    #[serde(default)]
    #[validate(nested)]
    pub requirements: ModuleRequirements,
    /// Invite that gated access to the wizard, if any.
    #[serde(default)]
    pub invite_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompanyDetails {
    #[validate(length(min = 1, max = 200, message = "legal name is required"))]
    pub legal_name: String,
    #[validate(length(max = 200))]
    pub trade_name: Option<String>,
    #[validate(length(max = 200))]
    pub address_line1: Option<String>,
    #[validate(length(max = 200))]
    pub address_line2: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    pub size: CompanySize,
    #[serde(default)]
    pub lines_of_business: Vec<String>,
    #[validate(url(message = "must be a valid URL"))]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PrimaryContact {
    #[validate(length(min = 1, max = 100, message = "first name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "last name is required"))]
    pub last_name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[validate(regex(path = *PHONE_RE, message = "must be a valid phone number"))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub title: Option<String>,
}

/// Which modules the client wants.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ModuleFlags {
    #[serde(default)]
    pub core: bool,
    #[serde(default)]
    pub comms: bool,
    #[serde(default)]
    pub fnol: bool,
}

impl ModuleFlags {
    /// Whether `module` was ticked.
    pub fn is_selected(&self, module: ModuleType) -> bool {
        match module {
            ModuleType::Core => self.core,
            ModuleType::Comms => self.comms,
            ModuleType::Fnol => self.fnol,
        }
    }

    /// Selected modules in canonical order.
    pub fn selected(&self) -> Vec<ModuleType> {
        ModuleType::ALL
            .iter()
            .copied()
            .filter(|m| self.is_selected(*m))
            .collect()
    }

    pub fn any(&self) -> bool {
        self.core || self.comms || self.fnol
    }
}

/// Module-specific requirements. Only sections for selected modules are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ModuleRequirements {
    #[validate(nested)]
    pub core: Option<CoreRequirements>,
    #[validate(nested)]
    pub comms: Option<CommsRequirements>,
    #[validate(nested)]
    pub fnol: Option<FnolRequirements>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CoreRequirements {
    #[validate(range(min = 0, message = "must not be negative"))]
    pub monthly_claim_volume: Option<i32>,
    #[serde(default)]
    pub claim_types: Vec<String>,
    #[validate(length(max = 200))]
    pub current_system: Option<String>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub user_count: Option<i32>,
    #[serde(default)]
    pub requires_data_migration: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CommsRequirements {
    #[serde(default)]
    #[validate(custom(function = "validate_comms_channels"))]
    pub channels: Vec<String>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub monthly_message_volume: Option<i32>,
    #[serde(default)]
    pub requires_two_way_sms: bool,
    #[serde(default)]
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct FnolRequirements {
    #[serde(default)]
    #[validate(custom(function = "validate_fnol_channels"))]
    pub intake_channels: Vec<String>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub monthly_fnol_volume: Option<i32>,
    #[serde(default)]
    pub requires_photo_upload: bool,
    #[serde(default)]
    pub after_hours_coverage: bool,
}

// ---------------------------------------------------------------------------
// Custom rules
// ---------------------------------------------------------------------------

fn validate_module_selection(submission: &OnboardingSubmission) -> Result<(), ValidationError> {
    if submission.modules.any() {
        Ok(())
    } else {
        Err(ValidationError::new("modules")
            .with_message(Cow::Borrowed("at least one module must be selected")))
    }
}

fn check_allowed(values: &[String], allowed: &[&str]) -> Result<(), ValidationError> {
    match values.iter().find(|v| !allowed.contains(&v.as_str())) {
        None => Ok(()),
        Some(bad) => Err(ValidationError::new("channel")
            .with_message(Cow::Owned(format!("unknown channel '{bad}'")))),
    }
}

#[allow(clippy::ptr_arg)]
fn validate_comms_channels(channels: &Vec<String>) -> Result<(), ValidationError> {
    check_allowed(channels, COMMS_CHANNELS)
}

#[allow(clippy::ptr_arg)]
fn validate_fnol_channels(channels: &Vec<String>) -> Result<(), ValidationError> {
    check_allowed(channels, FNOL_INTAKE_CHANNELS)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

impl OnboardingSubmission {
    /// Run schema validation and return a single readable error on failure.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|errors| CoreError::Validation(describe_errors(&errors)))
    }

    /// Trim free text and lowercase the contact email.
    pub fn normalized(mut self) -> Self {
        self.company.legal_name = self.company.legal_name.trim().to_string();
        self.contact.first_name = self.contact.first_name.trim().to_string();
        self.contact.last_name = self.contact.last_name.trim().to_string();
        self.contact.email = self.contact.email.trim().to_lowercase();
        self
    }

    /// Contact's display name.
    pub fn contact_name(&self) -> String {
        format!("{} {}", self.contact.first_name, self.contact.last_name)
    }
}

/// Flatten nested `ValidationErrors` into `path: message` pairs, sorted.
pub fn describe_errors(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();
    collect_errors("", errors, &mut messages);
    messages.sort();
    messages.join("; ")
}

fn collect_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = match (prefix.is_empty(), field.as_ref()) {
            (_, "__all__") => prefix.to_string(),
            (true, name) => name.to_string(),
            (false, name) => format!("{prefix}.{name}"),
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for err in field_errors {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    if path.is_empty() {
                        out.push(message);
                    } else {
                        out.push(format!("{path}: {message}"));
                    }
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_errors(&format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}
