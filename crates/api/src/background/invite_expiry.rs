//! Periodic sweep that marks pending invites past their expiry as expired.
//!
//! Validation also sweeps lazily; this job keeps listings and email logs
//! accurate for invites nobody opens.

use std::time::Duration;

use onboard_db::Repositories;
use tokio_util::sync::CancellationToken;

use crate::services::invites::expire_old_invites;

/// Run the invite expiry loop every `every` until `cancel` is triggered.
pub async fn run(repos: Repositories, every: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = every.as_secs(), "Invite expiry job started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Invite expiry job stopping");
                break;
            }
            _ = interval.tick() => {
                match expire_old_invites(&repos).await {
                    Ok(0) => tracing::debug!("Invite expiry: nothing to expire"),
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "Invite expiry: sweep failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};
    use onboard_core::status::InviteStatus;
    use onboard_db::models::invite::CreateInvite;

    use super::*;

    #[tokio::test]
    async fn sweeps_on_first_tick_and_stops_on_cancel() {
        let repos = Repositories::in_memory();
        let stale = repos
            .invites
            .create(&CreateInvite {
                token: "stale-token".into(),
                email: "late@acme.example".into(),
                company_name: None,
                invited_by: None,
                expires_at: Utc::now() - ChronoDuration::hours(1),
                metadata: serde_json::json!({}),
            })
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(repos.clone(), Duration::from_secs(3600), cancel.clone()));

        // The first tick fires immediately.
        let mut status = InviteStatus::Pending;
        for _ in 0..50 {
            status = repos.invites.find_by_id(stale.id).await.unwrap().unwrap().status;
            if status == InviteStatus::Expired {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, InviteStatus::Expired);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("job stops after cancel")
            .unwrap();
    }
}
