//! Repository for checklist templates and items.

use async_trait::async_trait;
use onboard_core::status::ChecklistStatus;
use onboard_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::checklist::{ChecklistItem, ChecklistTemplate};
use crate::repository::ChecklistRepository;

pub(crate) const TEMPLATE_COLUMNS: &str =
    "id, name, description, category, sort_order, is_active";

/// Item columns joined with the template's display fields.
const ITEM_SELECT: &str = "SELECT i.id, i.project_id, i.template_id, t.name, t.category, \
                           t.sort_order, i.status, i.notes, i.completed_at, i.updated_by, \
                           i.created_at, i.updated_at \
                           FROM checklist_items i \
                           JOIN checklist_templates t ON t.id = i.template_id";

/// Postgres-backed [`ChecklistRepository`].
pub struct ChecklistRepo {
    pool: PgPool,
}

impl ChecklistRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChecklistRepository for ChecklistRepo {
    async fn list_templates(&self) -> DbResult<Vec<ChecklistTemplate>> {
        let query = format!(
            "SELECT {TEMPLATE_COLUMNS} FROM checklist_templates ORDER BY sort_order, id"
        );
        let templates = sqlx::query_as::<_, ChecklistTemplate>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(templates)
    }

    async fn list_for_project(&self, project_id: DbId) -> DbResult<Vec<ChecklistItem>> {
        let query = format!("{ITEM_SELECT} WHERE i.project_id = $1 ORDER BY t.sort_order, i.id");
        let items = sqlx::query_as::<_, ChecklistItem>(&query)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn find_item(&self, id: DbId) -> DbResult<Option<ChecklistItem>> {
        let query = format!("{ITEM_SELECT} WHERE i.id = $1");
        let item = sqlx::query_as::<_, ChecklistItem>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn update_item(
        &self,
        id: DbId,
        status: ChecklistStatus,
        notes: Option<&str>,
        completed_at: Option<Timestamp>,
        updated_by: Option<DbId>,
    ) -> DbResult<Option<ChecklistItem>> {
        let updated = sqlx::query(
            "UPDATE checklist_items
             SET status = $2, notes = COALESCE($3, notes), completed_at = $4, updated_by = $5
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(notes)
        .bind(completed_at)
        .bind(updated_by)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_item(id).await
    }
}
