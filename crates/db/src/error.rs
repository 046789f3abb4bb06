//! Persistence error type shared by every repository.

/// Errors surfaced by repository implementations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A unique constraint was violated; carries the constraint name.
    #[error("Duplicate value violates unique constraint: {0}")]
    UniqueViolation(String),

    /// A conditional write found the row in an unexpected state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Any other driver-level failure.
    #[error("Database error: {0}")]
    Sqlx(sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Failure raised by a non-SQL backend (e.g. the in-memory store).
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// True when the driver reported that no row matched.
    pub fn is_row_not_found(&self) -> bool {
        matches!(self, DbError::Sqlx(sqlx::Error::RowNotFound))
    }
}

/// Result alias for repository calls.
pub type DbResult<T> = Result<T, DbError>;

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return DbError::UniqueViolation(constraint);
            }
        }
        DbError::Sqlx(err)
    }
}
