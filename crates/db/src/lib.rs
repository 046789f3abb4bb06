//! Persistence layer: models, repository traits and their PostgreSQL
//! implementations.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

pub mod error;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod models;
pub mod repositories;
pub mod repository;

pub use error::{DbError, DbResult};

use crate::repositories::*;
use crate::repository::*;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> DbResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// One handle per repository trait, shared across services.
#[derive(Clone)]
pub struct Repositories {
    pub companies: Arc<dyn CompanyRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub modules: Arc<dyn ModuleRepository>,
    pub checklists: Arc<dyn ChecklistRepository>,
    pub documents: Arc<dyn DocumentRepository>,
    pub activity: Arc<dyn ActivityRepository>,
    pub invites: Arc<dyn InviteRepository>,
    pub users: Arc<dyn UserRepository>,
    pub principals: Arc<dyn PrincipalRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub login_codes: Arc<dyn LoginCodeRepository>,
    pub password_resets: Arc<dyn PasswordResetRepository>,
    pub webhooks: Arc<dyn WebhookRepository>,
    pub integrations: Arc<dyn IntegrationRepository>,
    pub api_credentials: Arc<dyn ApiCredentialRepository>,
    pub email_logs: Arc<dyn EmailLogRepository>,
    pub onboarding: Arc<dyn OnboardingRepository>,
}

impl Repositories {
    /// PostgreSQL-backed repositories sharing one pool.
    pub fn postgres(pool: DbPool) -> Self {
        Self {
            companies: Arc::new(CompanyRepo::new(pool.clone())),
            contacts: Arc::new(ContactRepo::new(pool.clone())),
            projects: Arc::new(ProjectRepo::new(pool.clone())),
            modules: Arc::new(ModuleRepo::new(pool.clone())),
            checklists: Arc::new(ChecklistRepo::new(pool.clone())),
            documents: Arc::new(DocumentRepo::new(pool.clone())),
            activity: Arc::new(ActivityRepo::new(pool.clone())),
            invites: Arc::new(InviteRepo::new(pool.clone())),
            users: Arc::new(UserRepo::new(pool.clone())),
            principals: Arc::new(PrincipalRepo::new(pool.clone())),
            sessions: Arc::new(SessionRepo::new(pool.clone())),
            login_codes: Arc::new(LoginCodeRepo::new(pool.clone())),
            password_resets: Arc::new(PasswordResetRepo::new(pool.clone())),
            webhooks: Arc::new(WebhookRepo::new(pool.clone())),
            integrations: Arc::new(IntegrationRepo::new(pool.clone())),
            api_credentials: Arc::new(ApiCredentialRepo::new(pool.clone())),
            email_logs: Arc::new(EmailLogRepo::new(pool.clone())),
            onboarding: Arc::new(OnboardingRepo::new(pool)),
        }
    }

    /// Every repository backed by a fresh in-memory store.
    #[cfg(any(test, feature = "test-support"))]
    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(memory::MemoryStore::new()))
    }

    /// Every repository backed by `store`, so tests can keep a handle to it.
    #[cfg(any(test, feature = "test-support"))]
    pub fn from_memory(store: Arc<memory::MemoryStore>) -> Self {
        Self {
            companies: store.clone(),
            contacts: store.clone(),
            projects: store.clone(),
            modules: store.clone(),
            checklists: store.clone(),
            documents: store.clone(),
            activity: store.clone(),
            invites: store.clone(),
            users: store.clone(),
            principals: store.clone(),
            sessions: store.clone(),
            login_codes: store.clone(),
            password_resets: store.clone(),
            webhooks: store.clone(),
            integrations: store.clone(),
            api_credentials: store.clone(),
            email_logs: store.clone(),
            onboarding: store,
        }
    }
}
