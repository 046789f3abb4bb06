//! Transactional write path for an onboarding submission.

use async_trait::async_trait;
use onboard_core::status::{ContactRole, ModuleType, ProjectStatus};
use onboard_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::{DbError, DbResult};
use crate::models::activity::{actions, ActivityLog};
use crate::models::company::Company;
use crate::models::contact::Contact;
use crate::models::module::ModuleSelection;
use crate::models::onboarding::{NewSubmission, SubmissionRecord};
use crate::models::project::Project;
use crate::repositories::{activity_repo, company_repo, contact_repo, module_repo, project_repo};
use crate::repository::OnboardingRepository;

/// Postgres-backed [`OnboardingRepository`].
pub struct OnboardingRepo {
    pool: PgPool,
}

impl OnboardingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OnboardingRepository for OnboardingRepo {
    async fn create_submission(&self, input: &NewSubmission) -> DbResult<SubmissionRecord> {
        let mut tx = self.pool.begin().await?;

        let company = insert_company(&mut tx, input).await?;
        let contact = insert_primary_contact(&mut tx, company.id, input).await?;

        let query = format!(
            "INSERT INTO onboarding_projects (company_id, status) VALUES ($1, $2)
             RETURNING {}",
            project_repo::COLUMNS
        );
        let project = sqlx::query_as::<_, Project>(&query)
            .bind(company.id)
            .bind(ProjectStatus::DiscoveryInProgress.as_str())
            .fetch_one(&mut *tx)
            .await?;

        let mut selections = Vec::with_capacity(input.modules.len());
        for &(module_type, is_selected) in &input.modules {
            let query = format!(
                "INSERT INTO module_selections (project_id, module_type, is_selected)
                 VALUES ($1, $2, $3)
                 RETURNING {}",
                module_repo::SELECTION_COLUMNS
            );
            let selection = sqlx::query_as::<_, ModuleSelection>(&query)
                .bind(project.id)
                .bind(module_type.as_str())
                .bind(is_selected)
                .fetch_one(&mut *tx)
                .await?;
            if selection.is_selected {
                upsert_config(&mut tx, &selection, input).await?;
            }
            selections.push(selection);
        }

        sqlx::query(
            "INSERT INTO checklist_items (project_id, template_id)
             SELECT $1, id FROM checklist_templates WHERE is_active ORDER BY sort_order, id",
        )
        .bind(project.id)
        .execute(&mut *tx)
        .await?;

        if let Some(invite_id) = input.invite_id {
            let result = sqlx::query(
                "UPDATE invites SET status = 'used', used_at = NOW(), project_id = $2
                 WHERE id = $1 AND status = 'pending' AND expires_at > NOW()",
            )
            .bind(invite_id)
            .bind(project.id)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                return Err(DbError::Conflict("Invite has already been used".into()));
            }
        }

        let query = format!(
            "INSERT INTO activity_logs (project_id, actor_id, action, details)
             VALUES ($1, NULL, $2, $3)
             RETURNING {}",
            activity_repo::COLUMNS
        );
        let activity = sqlx::query_as::<_, ActivityLog>(&query)
            .bind(project.id)
            .bind(actions::ONBOARDING_SUBMITTED)
            .bind(&input.activity_details)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(SubmissionRecord {
            company,
            contact,
            project,
            selections,
            activity,
        })
    }
}

async fn insert_company(
    tx: &mut Transaction<'_, Postgres>,
    input: &NewSubmission,
) -> DbResult<Company> {
    let c = &input.company;
    let query = format!(
        "INSERT INTO companies
            (legal_name, trade_name, address_line1, address_line2, city, state,
             postal_code, country, size, lines_of_business, website)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING {}",
        company_repo::COLUMNS
    );
    let company = sqlx::query_as::<_, Company>(&query)
        .bind(&c.legal_name)
        .bind(&c.trade_name)
        .bind(&c.address_line1)
        .bind(&c.address_line2)
        .bind(&c.city)
        .bind(&c.state)
        .bind(&c.postal_code)
        .bind(&c.country)
        .bind(c.size.as_str())
        .bind(&c.lines_of_business)
        .bind(&c.website)
        .fetch_one(&mut **tx)
        .await?;
    Ok(company)
}

async fn insert_primary_contact(
    tx: &mut Transaction<'_, Postgres>,
    company_id: DbId,
    input: &NewSubmission,
) -> DbResult<Contact> {
    let c = &input.contact;
    let query = format!(
        "INSERT INTO contacts (company_id, first_name, last_name, email, phone, title, role)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {}",
        contact_repo::COLUMNS
    );
    let contact = sqlx::query_as::<_, Contact>(&query)
        .bind(company_id)
        .bind(&c.first_name)
        .bind(&c.last_name)
        .bind(&c.email)
        .bind(&c.phone)
        .bind(&c.title)
        .bind(ContactRole::Primary.as_str())
        .fetch_one(&mut **tx)
        .await?;
    Ok(contact)
}

/// Create-or-update the config row of a selected module. Missing requirements
/// produce a row with defaults so every selected module has exactly one config.
async fn upsert_config(
    tx: &mut Transaction<'_, Postgres>,
    selection: &ModuleSelection,
    input: &NewSubmission,
) -> DbResult<()> {
    match selection.module_type {
        ModuleType::Core => {
            let req = input.core.clone().unwrap_or_default();
            sqlx::query(
                "INSERT INTO core_configs
                    (module_selection_id, monthly_claim_volume, claim_types, current_system,
                     user_count, requires_data_migration)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (module_selection_id) DO UPDATE SET
                    monthly_claim_volume = EXCLUDED.monthly_claim_volume,
                    claim_types = EXCLUDED.claim_types,
                    current_system = EXCLUDED.current_system,
                    user_count = EXCLUDED.user_count,
                    requires_data_migration = EXCLUDED.requires_data_migration,
                    updated_at = NOW()",
            )
            .bind(selection.id)
            .bind(req.monthly_claim_volume)
            .bind(&req.claim_types)
            .bind(&req.current_system)
            .bind(req.user_count)
            .bind(req.requires_data_migration)
            .execute(&mut **tx)
            .await?;
        }
        ModuleType::Comms => {
            let req = input.comms.clone().unwrap_or_default();
            sqlx::query(
                "INSERT INTO comms_configs
                    (module_selection_id, channels, monthly_message_volume,
                     requires_two_way_sms, languages)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (module_selection_id) DO UPDATE SET
                    channels = EXCLUDED.channels,
                    monthly_message_volume = EXCLUDED.monthly_message_volume,
                    requires_two_way_sms = EXCLUDED.requires_two_way_sms,
                    languages = EXCLUDED.languages,
                    updated_at = NOW()",
            )
            .bind(selection.id)
            .bind(&req.channels)
            .bind(req.monthly_message_volume)
            .bind(req.requires_two_way_sms)
            .bind(&req.languages)
            .execute(&mut **tx)
            .await?;
        }
        ModuleType::Fnol => {
            let req = input.fnol.clone().unwrap_or_default();
            sqlx::query(
                "INSERT INTO fnol_configs
                    (module_selection_id, intake_channels, monthly_fnol_volume,
                     requires_photo_upload, after_hours_coverage)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (module_selection_id) DO UPDATE SET
                    intake_channels = EXCLUDED.intake_channels,
                    monthly_fnol_volume = EXCLUDED.monthly_fnol_volume,
                    requires_photo_upload = EXCLUDED.requires_photo_upload,
                    after_hours_coverage = EXCLUDED.after_hours_coverage,
                    updated_at = NOW()",
            )
            .bind(selection.id)
            .bind(&req.intake_channels)
            .bind(req.monthly_fnol_volume)
            .bind(req.requires_photo_upload)
            .bind(req.after_hours_coverage)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}
