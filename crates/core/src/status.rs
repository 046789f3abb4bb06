//! Text-backed enums for every status and category column.
//!
//! Each enum maps to a `TEXT` column guarded by a `CHECK` constraint. The
//! string value doubles as the JSON representation.

use crate::error::CoreError;
use crate::types::Timestamp;

macro_rules! define_text_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $val)] $variant ),+
        }

        impl $name {
            /// Every variant in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the database / wire representation.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $val ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, CoreError> {
                match s {
                    $( $val => Ok($name::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        "Invalid {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(value: String) -> Result<Self, CoreError> {
                value.parse()
            }
        }
    };
}

define_text_enum! {
    /// Company headcount bucket.
    CompanySize {
        Micro = "micro",
        Small = "small",
        Medium = "medium",
        Large = "large",
        Enterprise = "enterprise",
    }
}

define_text_enum! {
    /// Role a contact plays for its company.
    ContactRole {
        Primary = "primary",
        Technical = "technical",
        Executive = "executive",
        Billing = "billing",
        Other = "other",
    }
}

define_text_enum! {
    /// Top-level onboarding project lifecycle.
    ProjectStatus {
        DiscoveryInProgress = "discovery_in_progress",
        SowPending = "sow_pending",
        ContractSigned = "contract_signed",
        Onboarding = "onboarding",
        Live = "live",
        Churned = "churned",
    }
}

define_text_enum! {
    /// Independently selectable product module.
    ModuleType {
        Core = "core",
        Comms = "comms",
        Fnol = "fnol",
    }
}

define_text_enum! {
    /// Checklist item progress.
    ChecklistStatus {
        Pending = "pending",
        InProgress = "in_progress",
        Complete = "complete",
        Blocked = "blocked",
    }
}

define_text_enum! {
    /// Review state of an uploaded document.
    DocumentStatus {
        Pending = "pending",
        Approved = "approved",
        Rejected = "rejected",
    }
}

define_text_enum! {
    /// Invite lifecycle. `used`, `expired` and `revoked` are terminal.
    InviteStatus {
        Pending = "pending",
        Used = "used",
        Expired = "expired",
        Revoked = "revoked",
    }
}

define_text_enum! {
    /// Tag recorded on every email log row.
    EmailType {
        Invite = "invite",
        MagicLink = "magic_link",
        StatusUpdate = "status_update",
        PasswordReset = "password_reset",
        Welcome = "welcome",
    }
}

define_text_enum! {
    /// Connection state of an external-system integration.
    IntegrationStatus {
        Pending = "pending",
        Connected = "connected",
        Error = "error",
    }
}

/// Internal substage stamped when a portal user approves the SOW.
pub const SUBSTAGE_SOW_APPROVED: &str = "sow_approved";

impl ProjectStatus {
    /// The next stage on the happy path, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            ProjectStatus::DiscoveryInProgress => Some(ProjectStatus::SowPending),
            ProjectStatus::SowPending => Some(ProjectStatus::ContractSigned),
            ProjectStatus::ContractSigned => Some(ProjectStatus::Onboarding),
            ProjectStatus::Onboarding => Some(ProjectStatus::Live),
            ProjectStatus::Live | ProjectStatus::Churned => None,
        }
    }

    /// `churned` is the only state with no outgoing transition.
    pub fn is_terminal(self) -> bool {
        self == ProjectStatus::Churned
    }

    /// Single forward step, or `churned` from any non-terminal state.
    pub fn can_transition_to(self, to: ProjectStatus) -> bool {
        if self == to || self.is_terminal() {
            return false;
        }
        to == ProjectStatus::Churned || self.next() == Some(to)
    }

    /// Like [`can_transition_to`](Self::can_transition_to) but with a
    /// human-readable validation error.
    pub fn validate_transition(self, to: ProjectStatus) -> Result<(), CoreError> {
        if self.can_transition_to(to) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Cannot change project status from '{self}' to '{to}'"
            )))
        }
    }

    /// Title-cased label for emails and the SOW document.
    pub fn label(self) -> &'static str {
        match self {
            ProjectStatus::DiscoveryInProgress => "Discovery In Progress",
            ProjectStatus::SowPending => "SOW Pending",
            ProjectStatus::ContractSigned => "Contract Signed",
            ProjectStatus::Onboarding => "Onboarding",
            ProjectStatus::Live => "Live",
            ProjectStatus::Churned => "Churned",
        }
    }
}

impl ModuleType {
    /// Product name shown to clients.
    pub fn label(self) -> &'static str {
        match self {
            ModuleType::Core => "Core Claims Platform",
            ModuleType::Comms => "Communications",
            ModuleType::Fnol => "First Notice of Loss",
        }
    }
}

impl ChecklistStatus {
    /// `completed_at` is set iff the status is `complete`.
    pub fn completed_at(self, now: Timestamp) -> Option<Timestamp> {
        (self == ChecklistStatus::Complete).then_some(now)
    }
}

impl InviteStatus {
    pub fn is_terminal(self) -> bool {
        self != InviteStatus::Pending
    }
}
