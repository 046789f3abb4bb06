//! PostgreSQL implementations of the repository traits.
//!
//! Each repository holds a cloned `PgPool` and builds its queries from a
//! shared `COLUMNS` constant.

pub mod activity_repo;
pub mod api_credential_repo;
pub mod checklist_repo;
pub mod company_repo;
pub mod contact_repo;
pub mod document_repo;
pub mod email_log_repo;
pub mod integration_repo;
pub mod invite_repo;
pub mod login_code_repo;
pub mod module_repo;
pub mod onboarding_repo;
pub mod password_reset_repo;
pub mod principal_repo;
pub mod project_repo;
pub mod session_repo;
pub mod user_repo;
pub mod webhook_repo;

pub use activity_repo::ActivityRepo;
pub use api_credential_repo::ApiCredentialRepo;
pub use checklist_repo::ChecklistRepo;
pub use company_repo::CompanyRepo;
pub use contact_repo::ContactRepo;
pub use document_repo::DocumentRepo;
pub use email_log_repo::EmailLogRepo;
pub use integration_repo::IntegrationRepo;
pub use invite_repo::InviteRepo;
pub use login_code_repo::LoginCodeRepo;
pub use module_repo::ModuleRepo;
pub use onboarding_repo::OnboardingRepo;
pub use password_reset_repo::PasswordResetRepo;
pub use principal_repo::PrincipalRepo;
pub use project_repo::ProjectRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
pub use webhook_repo::WebhookRepo;
