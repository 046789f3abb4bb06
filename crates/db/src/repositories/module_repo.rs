//! Repository for module selections and their config tables.

use async_trait::async_trait;
use onboard_core::types::DbId;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::module::{CommsConfig, CoreConfig, FnolConfig, ModuleSelection, ProjectModules};
use crate::repository::ModuleRepository;

pub(crate) const SELECTION_COLUMNS: &str =
    "id, project_id, module_type, is_selected, created_at";
pub(crate) const CORE_COLUMNS: &str = "id, module_selection_id, monthly_claim_volume, \
                                       claim_types, current_system, user_count, \
                                       requires_data_migration, updated_at";
pub(crate) const COMMS_COLUMNS: &str = "id, module_selection_id, channels, \
                                        monthly_message_volume, requires_two_way_sms, \
                                        languages, updated_at";
pub(crate) const FNOL_COLUMNS: &str = "id, module_selection_id, intake_channels, \
                                       monthly_fnol_volume, requires_photo_upload, \
                                       after_hours_coverage, updated_at";

/// Postgres-backed [`ModuleRepository`].
pub struct ModuleRepo {
    pool: PgPool,
}

impl ModuleRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Select a config row joined through its module selection.
fn config_query(table: &str, columns: &str) -> String {
    let prefixed = columns
        .split(',')
        .map(|c| format!("cfg.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT {prefixed} FROM {table} cfg
         JOIN module_selections ms ON ms.id = cfg.module_selection_id
         WHERE ms.project_id = $1"
    )
}

#[async_trait]
impl ModuleRepository for ModuleRepo {
    async fn get_for_project(&self, project_id: DbId) -> DbResult<ProjectModules> {
        let query = format!(
            "SELECT {SELECTION_COLUMNS} FROM module_selections
             WHERE project_id = $1
             ORDER BY CASE module_type WHEN 'core' THEN 0 WHEN 'comms' THEN 1 ELSE 2 END"
        );
        let selections = sqlx::query_as::<_, ModuleSelection>(&query)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;

        let core = sqlx::query_as::<_, CoreConfig>(&config_query("core_configs", CORE_COLUMNS))
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;
        let comms = sqlx::query_as::<_, CommsConfig>(&config_query("comms_configs", COMMS_COLUMNS))
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;
        let fnol = sqlx::query_as::<_, FnolConfig>(&config_query("fnol_configs", FNOL_COLUMNS))
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ProjectModules {
            selections,
            core,
            comms,
            fnol,
        })
    }
}
