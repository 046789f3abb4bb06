//! Fixtures shared by the unit tests in this crate.

use std::sync::Arc;

use onboard_core::onboarding::{CoreRequirements, OnboardingSubmission};
use onboard_core::roles::ROLE_ADMIN;
use onboard_core::status::{CompanySize, ModuleType};
use onboard_core::storage::{DiskObjectStore, UrlSigner};
use onboard_db::models::company::CreateCompany;
use onboard_db::models::onboarding::{NewPrimaryContact, NewSubmission, SubmissionRecord};
use onboard_db::Repositories;
use onboard_events::{Notifier, RecordingMailer};
use tempfile::TempDir;

use crate::auth::jwt::{JwtConfig, JwtTokenIssuer};
use crate::config::{AppEnv, LogFormat, ServerConfig, TokenSettings};
use crate::services::tenant::TenantContext;
use crate::state::AppState;

pub const TEST_BASE_URL: &str = "http://portal.test";

pub fn test_config(storage_dir: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        cors_origins: vec![TEST_BASE_URL.into()],
        request_timeout_secs: 5,
        app_env: AppEnv::Development,
        app_name: "Client Onboarding".into(),
        app_base_url: TEST_BASE_URL.into(),
        tokens: TokenSettings::default(),
        storage_dir: storage_dir.into(),
        storage_signing_secret: "storage-test-secret".into(),
        invite_sweep_interval_secs: 3600,
        log_format: LogFormat::Pretty,
        bootstrap_admin: None,
        jwt: JwtConfig {
            secret: "jwt-test-secret".into(),
            access_token_expiry_mins: 60,
            refresh_token_expiry_days: 7,
        },
    }
}

/// In-memory app state with a recording mailer and a temp-dir object store.
pub struct TestHarness {
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    _storage: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        let storage = tempfile::tempdir().expect("temp dir");
        let config = test_config(&storage.path().to_string_lossy());
        let repos = Repositories::in_memory();
        let mailer = Arc::new(RecordingMailer::new());
        let signer = UrlSigner::new(config.storage_signing_secret.clone(), "/api/storage");

        let state = AppState {
            notifier: Notifier::new(mailer.clone(), repos.clone(), config.app_name.clone(), TEST_BASE_URL),
            store: Arc::new(DiskObjectStore::new(storage.path(), signer.clone())),
            signer,
            tokens: Arc::new(JwtTokenIssuer::new(
                config.jwt.clone(),
                repos.sessions.clone(),
                repos.users.clone(),
            )),
            pool: None,
            config: Arc::new(config),
            repos,
        };
        Self {
            state,
            mailer,
            _storage: storage,
        }
    }
}

/// Wizard payload selecting only the core module.
pub fn submission_payload(company_name: &str, email: &str) -> OnboardingSubmission {
    serde_json::from_value(serde_json::json!({
        "company": {
            "legal_name": company_name,
            "size": "medium",
            "lines_of_business": ["auto"]
        },
        "contact": {
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": email
        },
        "modules": { "core": true },
        "requirements": { "core": { "monthly_claim_volume": 250 } }
    }))
    .expect("fixture deserializes")
}

/// Write a submission straight through the repository.
pub async fn seed_submission(repos: &Repositories, company_name: &str, email: &str) -> SubmissionRecord {
    repos
        .onboarding
        .create_submission(&NewSubmission {
            company: CreateCompany {
                legal_name: company_name.into(),
                trade_name: None,
                address_line1: Some("1 Main St".into()),
                address_line2: None,
                city: Some("Springfield".into()),
                state: None,
                postal_code: None,
                country: Some("US".into()),
                size: CompanySize::Medium,
                lines_of_business: vec!["auto".into()],
                website: None,
            },
            contact: NewPrimaryContact {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: email.into(),
                phone: None,
                title: None,
            },
            modules: ModuleType::ALL
                .iter()
                .map(|m| (*m, *m == ModuleType::Core))
                .collect(),
            core: Some(CoreRequirements {
                monthly_claim_volume: Some(250),
                ..Default::default()
            }),
            comms: None,
            fnol: None,
            activity_details: serde_json::json!({ "company_name": company_name }),
            invite_id: None,
        })
        .await
        .expect("seed submission")
}

pub fn staff_context() -> TenantContext {
    TenantContext::Staff {
        user_id: 1,
        staff_id: 1,
        name: "Sam Staff".into(),
        role: ROLE_ADMIN.into(),
    }
}

/// Portal context for the primary contact of `record`.
pub fn portal_context(record: &SubmissionRecord) -> TenantContext {
    TenantContext::PortalUser {
        user_id: 10_000 + record.contact.id,
        portal_user_id: record.contact.id,
        company_id: record.company.id,
        contact_id: record.contact.id,
    }
}
