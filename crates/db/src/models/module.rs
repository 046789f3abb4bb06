//! Module selections and their per-module configuration rows.

use onboard_core::status::ModuleType;
use onboard_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `module_selections`; one per module type per project.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ModuleSelection {
    pub id: DbId,
    pub project_id: DbId,
    #[sqlx(try_from = "String")]
    pub module_type: ModuleType,
    pub is_selected: bool,
    pub created_at: Timestamp,
}

/// Core claims platform requirements.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CoreConfig {
    pub id: DbId,
    pub module_selection_id: DbId,
    pub monthly_claim_volume: Option<i32>,
    pub claim_types: Vec<String>,
    pub current_system: Option<String>,
    pub user_count: Option<i32>,
    pub requires_data_migration: bool,
    pub updated_at: Timestamp,
}

/// Communications module requirements.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CommsConfig {
    pub id: DbId,
    pub module_selection_id: DbId,
    pub channels: Vec<String>,
    pub monthly_message_volume: Option<i32>,
    pub requires_two_way_sms: bool,
    pub languages: Vec<String>,
    pub updated_at: Timestamp,
}

/// First-notice-of-loss module requirements.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FnolConfig {
    pub id: DbId,
    pub module_selection_id: DbId,
    pub intake_channels: Vec<String>,
    pub monthly_fnol_volume: Option<i32>,
    pub requires_photo_upload: bool,
    pub after_hours_coverage: bool,
    pub updated_at: Timestamp,
}

/// All module rows for a project.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectModules {
    pub selections: Vec<ModuleSelection>,
    pub core: Option<CoreConfig>,
    pub comms: Option<CommsConfig>,
    pub fnol: Option<FnolConfig>,
}

impl ProjectModules {
    /// Selected module types in canonical order.
    pub fn selected(&self) -> Vec<ModuleType> {
        ModuleType::ALL
            .iter()
            .copied()
            .filter(|m| {
                self.selections
                    .iter()
                    .any(|s| s.module_type == *m && s.is_selected)
            })
            .collect()
    }
}
