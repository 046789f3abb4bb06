//! Repository for the `onboarding_projects` table.

use async_trait::async_trait;
use onboard_core::status::ProjectStatus;
use onboard_core::types::DbId;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::project::{Project, ProjectFilter, ProjectSummary, UpdateProject};
use crate::repository::ProjectRepository;

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, company_id, status, substage, target_go_live_date, \
                                  actual_go_live_date, sow_signed_at, sow_signed_by, notes, \
                                  created_at, updated_at";

/// Optional filters expressed as nullable parameters `$1` (company) and `$2` (status).
const FILTER: &str = "($1::BIGINT IS NULL OR p.company_id = $1) \
                      AND ($2::TEXT IS NULL OR p.status = $2)";

/// Postgres-backed [`ProjectRepository`].
pub struct ProjectRepo {
    pool: PgPool,
}

impl ProjectRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRepository for ProjectRepo {
    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Project>> {
        let query = format!("SELECT {COLUMNS} FROM onboarding_projects WHERE id = $1");
        let project = sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    async fn list(&self, filter: &ProjectFilter) -> DbResult<Vec<ProjectSummary>> {
        let query = format!(
            "SELECT p.id, p.company_id, c.legal_name AS company_name, p.status,
                    p.target_go_live_date, p.sow_signed_at, p.created_at, p.updated_at
             FROM onboarding_projects p
             JOIN companies c ON c.id = p.company_id
             WHERE {FILTER}
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT $3 OFFSET $4"
        );
        let projects = sqlx::query_as::<_, ProjectSummary>(&query)
            .bind(filter.company_id)
            .bind(filter.status.map(ProjectStatus::as_str))
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(projects)
    }

    async fn count(&self, filter: &ProjectFilter) -> DbResult<i64> {
        let query = format!("SELECT COUNT(*) FROM onboarding_projects p WHERE {FILTER}");
        let count: i64 = sqlx::query_scalar(&query)
            .bind(filter.company_id)
            .bind(filter.status.map(ProjectStatus::as_str))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn update(&self, id: DbId, input: &UpdateProject) -> DbResult<Option<Project>> {
        let query = format!(
            "UPDATE onboarding_projects SET
                target_go_live_date = COALESCE($2, target_go_live_date),
                actual_go_live_date = COALESCE($3, actual_go_live_date),
                notes = COALESCE($4, notes)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let project = sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(input.target_go_live_date)
            .bind(input.actual_go_live_date)
            .bind(&input.notes)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    async fn update_status(
        &self,
        id: DbId,
        from: ProjectStatus,
        to: ProjectStatus,
    ) -> DbResult<Option<Project>> {
        let query = format!(
            "UPDATE onboarding_projects SET status = $3
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        let project = sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    async fn sign_sow(
        &self,
        id: DbId,
        signed_by: DbId,
        substage: &str,
    ) -> DbResult<Option<Project>> {
        let query = format!(
            "UPDATE onboarding_projects
             SET sow_signed_at = NOW(), sow_signed_by = $2, substage = $3
             WHERE id = $1 AND sow_signed_at IS NULL
             RETURNING {COLUMNS}"
        );
        let project = sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(signed_by)
            .bind(substage)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }
}
