//! Repository for the `companies` table.

use async_trait::async_trait;
use onboard_core::types::DbId;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::company::Company;
use crate::repository::CompanyRepository;

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, legal_name, trade_name, address_line1, address_line2, \
                                  city, state, postal_code, country, size, lines_of_business, \
                                  website, created_at, updated_at";

/// Postgres-backed [`CompanyRepository`].
pub struct CompanyRepo {
    pool: PgPool,
}

impl CompanyRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompanyRepository for CompanyRepo {
    async fn find_by_id(&self, id: DbId) -> DbResult<Option<Company>> {
        let query = format!("SELECT {COLUMNS} FROM companies WHERE id = $1");
        let company = sqlx::query_as::<_, Company>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(company)
    }

    async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<Company>> {
        let query = format!(
            "SELECT {COLUMNS} FROM companies ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        let companies = sqlx::query_as::<_, Company>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(companies)
    }

    async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM companies")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
