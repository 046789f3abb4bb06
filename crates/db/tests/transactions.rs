//! Integration tests for the multi-row writes that must land all-or-nothing.
//!
//! Exercises the repository layer against a real database to verify that:
//! - A submission writes company, contact, project, modules and checklist
//! - A failure at the contact insert leaves no company behind
//! - A team invite whose portal-user insert fails stays pending
//! - Racing SOW signatures leave exactly one signature in place

use onboard_core::onboarding::CoreRequirements;
use onboard_core::status::{CompanySize, InviteStatus, ModuleType, ProjectStatus};
use onboard_db::models::company::CreateCompany;
use onboard_db::models::invite::{CreateInvite, RedeemTeamInvite};
use onboard_db::models::onboarding::{NewPrimaryContact, NewSubmission};
use onboard_db::models::user::CreateUser;
use onboard_db::repositories::{InviteRepo, OnboardingRepo, PrincipalRepo, ProjectRepo, UserRepo};
use onboard_db::repository::{
    InviteRepository, OnboardingRepository, PrincipalRepository, ProjectRepository,
    UserRepository,
};
use onboard_db::DbError;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_submission(legal_name: &str, email: &str) -> NewSubmission {
    NewSubmission {
        company: CreateCompany {
            legal_name: legal_name.to_string(),
            trade_name: None,
            address_line1: None,
            address_line2: None,
            city: None,
            state: None,
            postal_code: None,
            country: None,
            size: CompanySize::Medium,
            lines_of_business: vec!["auto".to_string()],
            website: None,
        },
        contact: NewPrimaryContact {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.to_string(),
            phone: None,
            title: None,
        },
        modules: vec![
            (ModuleType::Core, true),
            (ModuleType::Comms, false),
            (ModuleType::Fnol, false),
        ],
        core: Some(CoreRequirements {
            monthly_claim_volume: Some(250),
            ..Default::default()
        }),
        comms: None,
        fnol: None,
        activity_details: serde_json::json!({}),
        invite_id: None,
    }
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap();
    n
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn submission_writes_every_row(pool: PgPool) {
    let repo = OnboardingRepo::new(pool.clone());
    let record = repo
        .create_submission(&new_submission("Acme Mutual", "ada@acme.example"))
        .await
        .unwrap();

    assert_eq!(record.project.status, ProjectStatus::DiscoveryInProgress);
    assert_eq!(record.selections.len(), 3);
    assert_eq!(count(&pool, "core_configs").await, 1);
    assert_eq!(count(&pool, "comms_configs").await, 0);
    assert!(count(&pool, "checklist_items").await > 0);
    assert_eq!(count(&pool, "activity_logs").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn contact_failure_leaves_no_company(pool: PgPool) {
    sqlx::query(
        "CREATE FUNCTION reject_contact() RETURNS trigger AS $$
         BEGIN RAISE EXCEPTION 'contact insert rejected'; END;
         $$ LANGUAGE plpgsql",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TRIGGER reject_contact BEFORE INSERT ON contacts
         FOR EACH ROW EXECUTE FUNCTION reject_contact()",
    )
    .execute(&pool)
    .await
    .unwrap();

    let repo = OnboardingRepo::new(pool.clone());
    let result = repo
        .create_submission(&new_submission("Acme Mutual", "ada@acme.example"))
        .await;

    assert!(result.is_err());
    assert_eq!(count(&pool, "companies").await, 0);
    assert_eq!(count(&pool, "onboarding_projects").await, 0);
}

// ---------------------------------------------------------------------------
// Team invite redemption
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn failed_redemption_keeps_invite_pending(pool: PgPool) {
    let record = OnboardingRepo::new(pool.clone())
        .create_submission(&new_submission("Acme Mutual", "ada@acme.example"))
        .await
        .unwrap();

    // The invitee already holds a portal seat, so the second link fails.
    let user = UserRepo::new(pool.clone())
        .create(&CreateUser {
            email: "grace@acme.example".to_string(),
            password_hash: Some("old-hash".to_string()),
        })
        .await
        .unwrap();
    PrincipalRepo::new(pool.clone())
        .create_portal_user(user.id, record.company.id, record.contact.id)
        .await
        .unwrap();

    let invites = InviteRepo::new(pool.clone());
    let invite = invites
        .create(&CreateInvite {
            token: "team-token".to_string(),
            email: "grace@acme.example".to_string(),
            company_name: None,
            invited_by: None,
            expires_at: chrono::Utc::now() + chrono::Duration::days(7),
            metadata: serde_json::json!({
                "company_id": record.company.id,
                "contact_id": record.contact.id,
            }),
        })
        .await
        .unwrap();

    let err = invites
        .redeem_team_invite(&RedeemTeamInvite {
            token: "team-token".to_string(),
            email: "grace@acme.example".to_string(),
            password_hash: "new-hash".to_string(),
            company_id: record.company.id,
            contact_id: record.contact.id,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UniqueViolation(c) if c == "uq_portal_users_user"));

    let stored = invites.find_by_id(invite.id).await.unwrap().unwrap();
    assert_eq!(stored.status, InviteStatus::Pending);
    let (hash,): (Option<String>,) =
        sqlx::query_as("SELECT password_hash FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(hash.as_deref(), Some("old-hash"));
}

// ---------------------------------------------------------------------------
// SOW signature
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn racing_sow_signatures_keep_the_first(pool: PgPool) {
    let record = OnboardingRepo::new(pool.clone())
        .create_submission(&new_submission("Acme Mutual", "ada@acme.example"))
        .await
        .unwrap();
    let signer = UserRepo::new(pool.clone())
        .create(&CreateUser {
            email: "ada@acme.example".to_string(),
            password_hash: None,
        })
        .await
        .unwrap();
    let projects = ProjectRepo::new(pool);

    let (a, b) = tokio::join!(
        projects.sign_sow(record.project.id, signer.id, "sow_approved"),
        projects.sign_sow(record.project.id, signer.id, "sow_approved"),
    );
    let signed: Vec<_> = [a.unwrap(), b.unwrap()].into_iter().flatten().collect();
    assert_eq!(signed.len(), 1);

    assert!(projects
        .sign_sow(record.project.id, signer.id, "sow_approved")
        .await
        .unwrap()
        .is_none());
    let stored = projects.find_by_id(record.project.id).await.unwrap().unwrap();
    assert_eq!(stored.sow_signed_at, signed[0].sow_signed_at);
}
