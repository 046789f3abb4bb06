//! Integration tests for the conditional updates that keep invites and login
//! codes single-use.
//!
//! Exercises the repository layer against a real database to verify that:
//! - An invite can be marked used exactly once, even by racing callers
//! - Revoking a used invite is a no-op
//! - The stale sweep only touches pending invites past their expiry
//! - A login code is consumed at most once and never after expiry
//! - Wrong guesses burn a login code and a new code retires the old one

use chrono::{Duration, Utc};
use onboard_core::status::InviteStatus;
use onboard_db::models::invite::CreateInvite;
use onboard_db::repositories::{InviteRepo, LoginCodeRepo};
use onboard_db::repository::{InviteRepository, LoginCodeRepository};
use sqlx::PgPool;

const MAX_ATTEMPTS: i32 = 5;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_invite(token: &str, expires_in: Duration) -> CreateInvite {
    CreateInvite {
        token: token.to_string(),
        email: format!("{token}@example.com"),
        company_name: Some("Acme Mutual".to_string()),
        invited_by: None,
        expires_at: Utc::now() + expires_in,
        metadata: serde_json::json!({}),
    }
}

fn in_ten_minutes() -> chrono::DateTime<Utc> {
    Utc::now() + Duration::minutes(10)
}

// ---------------------------------------------------------------------------
// Invites
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn invite_is_marked_used_once(pool: PgPool) {
    let repo = InviteRepo::new(pool);
    let invite = repo
        .create(&new_invite("tok-once", Duration::days(7)))
        .await
        .unwrap();

    assert!(repo.mark_used("tok-once", None).await.unwrap());
    assert!(!repo.mark_used("tok-once", None).await.unwrap());
    assert!(!repo.revoke(invite.id).await.unwrap());

    let stored = repo.find_by_id(invite.id).await.unwrap().unwrap();
    assert_eq!(stored.status, InviteStatus::Used);
    assert!(stored.used_at.is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn racing_mark_used_has_one_winner(pool: PgPool) {
    let first = InviteRepo::new(pool.clone());
    let second = InviteRepo::new(pool);
    first
        .create(&new_invite("tok-race", Duration::days(7)))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        first.mark_used("tok-race", None),
        second.mark_used("tok-race", None),
    );
    let winners = [a.unwrap(), b.unwrap()].iter().filter(|won| **won).count();
    assert_eq!(winners, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn stale_sweep_skips_fresh_and_revoked(pool: PgPool) {
    let repo = InviteRepo::new(pool);
    let stale = repo
        .create(&new_invite("tok-stale", Duration::hours(-1)))
        .await
        .unwrap();
    let fresh = repo
        .create(&new_invite("tok-fresh", Duration::days(3)))
        .await
        .unwrap();
    let revoked = repo
        .create(&new_invite("tok-revoked", Duration::hours(-2)))
        .await
        .unwrap();
    assert!(repo.revoke(revoked.id).await.unwrap());

    assert_eq!(repo.expire_stale(Utc::now()).await.unwrap(), 1);
    assert_eq!(repo.expire_stale(Utc::now()).await.unwrap(), 0);

    let status = |id| {
        let repo = &repo;
        async move { repo.find_by_id(id).await.unwrap().unwrap().status }
    };
    assert_eq!(status(stale.id).await, InviteStatus::Expired);
    assert_eq!(status(fresh.id).await, InviteStatus::Pending);
    assert_eq!(status(revoked.id).await, InviteStatus::Revoked);
}

// ---------------------------------------------------------------------------
// Login codes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn login_code_consumed_once(pool: PgPool) {
    let repo = LoginCodeRepo::new(pool);
    repo.replace_for_email("ana@example.com", "hash-a", in_ten_minutes())
        .await
        .unwrap();

    assert!(repo
        .consume("ana@example.com", "hash-a", MAX_ATTEMPTS)
        .await
        .unwrap()
        .is_some());
    assert!(repo
        .consume("ana@example.com", "hash-a", MAX_ATTEMPTS)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn expired_login_code_is_rejected(pool: PgPool) {
    let repo = LoginCodeRepo::new(pool);
    repo.replace_for_email("ana@example.com", "hash-b", Utc::now() - Duration::minutes(1))
        .await
        .unwrap();

    assert!(repo
        .consume("ana@example.com", "hash-b", MAX_ATTEMPTS)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn wrong_guesses_burn_the_login_code(pool: PgPool) {
    let repo = LoginCodeRepo::new(pool.clone());
    repo.replace_for_email("ana@example.com", "hash-c", in_ten_minutes())
        .await
        .unwrap();

    for _ in 0..MAX_ATTEMPTS {
        assert!(repo
            .consume("ana@example.com", "guess", MAX_ATTEMPTS)
            .await
            .unwrap()
            .is_none());
    }
    assert!(repo
        .consume("ana@example.com", "hash-c", MAX_ATTEMPTS)
        .await
        .unwrap()
        .is_none());

    let (attempts,): (i32,) = sqlx::query_as("SELECT attempts FROM login_codes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(attempts, MAX_ATTEMPTS);
}

#[sqlx::test(migrations = "./migrations")]
async fn new_login_code_retires_the_old_one(pool: PgPool) {
    let repo = LoginCodeRepo::new(pool.clone());
    repo.replace_for_email("ana@example.com", "hash-old", in_ten_minutes())
        .await
        .unwrap();
    repo.replace_for_email("ANA@example.com", "hash-new", in_ten_minutes())
        .await
        .unwrap();

    let (live,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM login_codes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(live, 1);

    assert!(repo
        .consume("ana@example.com", "hash-old", MAX_ATTEMPTS)
        .await
        .unwrap()
        .is_none());
    assert!(repo
        .consume("ana@example.com", "hash-new", MAX_ATTEMPTS)
        .await
        .unwrap()
        .is_some());
}
