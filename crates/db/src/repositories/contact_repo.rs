//! Repository for the `contacts` table.

use async_trait::async_trait;
use onboard_core::types::DbId;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::contact::{Contact, CreateContact, UpdateContact};
use crate::repository::ContactRepository;

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, company_id, first_name, last_name, email, phone, title, \
                                  role, is_active, created_at, updated_at";

/// Primary contact first, then by creation order.
const PRIMARY_FIRST: &str = "ORDER BY (role = 'primary') DESC, created_at ASC, id ASC";

/// Postgres-backed [`ContactRepository`].
pub struct ContactRepo {
    pool: PgPool,
}

impl ContactRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactRepository for ContactRepo {
    async fn create(&self, input: &CreateContact) -> DbResult<Contact> {
        let query = format!(
            "INSERT INTO contacts (company_id, first_name, last_name, email, phone, title, role)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        let contact = sqlx::query_as::<_, Contact>(&query)
            .bind(input.company_id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(&input.title)
            .bind(input.role.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(contact)
    }

    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Contact>> {
        let query = format!("SELECT {COLUMNS} FROM contacts WHERE id = $1");
        let contact = sqlx::query_as::<_, Contact>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(contact)
    }

    async fn find_by_company_email(
        &self,
        company_id: DbId,
        email: &str,
    ) -> DbResult<Option<Contact>> {
        let query = format!(
            "SELECT {COLUMNS} FROM contacts WHERE company_id = $1 AND LOWER(email) = LOWER($2)"
        );
        let contact = sqlx::query_as::<_, Contact>(&query)
            .bind(company_id)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(contact)
    }

    async fn list_by_company(&self, company_id: DbId) -> DbResult<Vec<Contact>> {
        let query = format!("SELECT {COLUMNS} FROM contacts WHERE company_id = $1 {PRIMARY_FIRST}");
        let contacts = sqlx::query_as::<_, Contact>(&query)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(contacts)
    }

    async fn list_active_by_company(&self, company_id: DbId) -> DbResult<Vec<Contact>> {
        let query = format!(
            "SELECT {COLUMNS} FROM contacts WHERE company_id = $1 AND is_active {PRIMARY_FIRST}"
        );
        let contacts = sqlx::query_as::<_, Contact>(&query)
            .bind(company_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(contacts)
    }

    async fn find_primary(&self, company_id: DbId) -> DbResult<Option<Contact>> {
        let query = format!(
            "SELECT {COLUMNS} FROM contacts WHERE company_id = $1 AND is_active \
             {PRIMARY_FIRST} LIMIT 1"
        );
        let contact = sqlx::query_as::<_, Contact>(&query)
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(contact)
    }

    async fn update(&self, id: DbId, input: &UpdateContact) -> DbResult<Option<Contact>> {
        let query = format!(
            "UPDATE contacts SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone),
                title = COALESCE($5, title)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let contact = sqlx::query_as::<_, Contact>(&query)
            .bind(id)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(&input.phone)
            .bind(&input.title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(contact)
    }
}
