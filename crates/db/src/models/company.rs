//! Company (tenant root) model.

use onboard_core::status::CompanySize;
use onboard_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `companies` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Company {
    pub id: DbId,
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    #[sqlx(try_from = "String")]
    pub size: CompanySize,
    pub lines_of_business: Vec<String>,
    pub website: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a company.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCompany {
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub size: CompanySize,
    pub lines_of_business: Vec<String>,
    pub website: Option<String>,
}
