//! Notification dispatcher.
//!
//! Renders a template, hands it to the [`EmailSender`], and appends an
//! [`EmailLog`](onboard_db::models::email_log::EmailLog) row for every
//! attempt, successful or not. Delivery failures never propagate as errors;
//! callers get a [`SendOutcome`] and decide whether to surface a warning.

use std::sync::Arc;

use onboard_core::status::{EmailType, ProjectStatus};
use onboard_core::types::DbId;
use onboard_db::models::activity::{actions, CreateActivity};
use onboard_db::models::contact::Contact;
use onboard_db::models::email_log::CreateEmailLog;
use onboard_db::models::invite::Invite;
use onboard_db::{DbResult, Repositories};
use serde::Serialize;

use crate::email::{EmailSender, OutgoingEmail};
use crate::templates::{self, RenderedEmail};

/// Result of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

/// Per-recipient failure in a fan-out.
#[derive(Debug, Clone, Serialize)]
pub struct RecipientError {
    pub recipient: String,
    pub error: String,
}

/// Result of [`Notifier::notify_all_project_contacts`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct BroadcastSummary {
    pub sent: usize,
    pub errors: Vec<RecipientError>,
}

/// Links attached to an email log row.
#[derive(Debug, Clone, Copy, Default)]
struct LogLinks {
    project_id: Option<DbId>,
    invite_id: Option<DbId>,
}

/// Sends the canned emails and records every attempt.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn EmailSender>,
    repos: Repositories,
    app_name: String,
    base_url: String,
}

impl Notifier {
    /// `base_url` is the public web origin used to build links, e.g.
    /// `https://onboard.example.com`.
    pub fn new(
        mailer: Arc<dyn EmailSender>,
        repos: Repositories,
        app_name: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            mailer,
            repos,
            app_name: app_name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Link a recipient follows to redeem `invite`. Team invites carry a
    /// company id in their metadata and land on the accept page instead of
    /// the intake wizard.
    pub fn invite_url(&self, invite: &Invite) -> String {
        if invite.metadata_company_id().is_some() {
            format!("{}/accept-invite?token={}", self.base_url, invite.token)
        } else {
            format!("{}/onboarding?invite={}", self.base_url, invite.token)
        }
    }

    fn portal_project_url(&self, project_id: DbId) -> String {
        format!("{}/portal/projects/{project_id}", self.base_url)
    }

    /// Deliver one email and log the attempt.
    async fn send(
        &self,
        email_type: EmailType,
        to: &str,
        rendered: RenderedEmail,
        links: LogLinks,
    ) -> SendOutcome {
        let email = OutgoingEmail {
            to: to.to_string(),
            subject: rendered.subject,
            html: rendered.html,
            text: rendered.text,
        };

        let outcome = match self.mailer.send(&email).await {
            Ok(message_id) => SendOutcome {
                success: true,
                message_id: Some(message_id),
                error: None,
            },
            Err(e) => {
                tracing::warn!(
                    email_type = %email_type,
                    recipient = %to,
                    error = %e,
                    "Email delivery failed"
                );
                SendOutcome {
                    success: false,
                    message_id: None,
                    error: Some(e.to_string()),
                }
            }
        };

        let log = CreateEmailLog {
            email_type,
            recipient: email.to,
            subject: email.subject,
            success: outcome.success,
            message_id: outcome.message_id.clone(),
            error: outcome.error.clone(),
            project_id: links.project_id,
            invite_id: links.invite_id,
        };
        if let Err(e) = self.repos.email_logs.create(&log).await {
            tracing::error!(error = %e, email_type = %email_type, "Failed to write email log");
        }

        outcome
    }

    pub async fn send_invite(
        &self,
        invite: &Invite,
        inviter_name: &str,
        expires_in_days: i64,
    ) -> SendOutcome {
        let rendered = templates::invite(
            &self.app_name,
            inviter_name,
            invite.company_name.as_deref(),
            &self.invite_url(invite),
            expires_in_days,
        );
        self.send(
            EmailType::Invite,
            &invite.email,
            rendered,
            LogLinks {
                project_id: invite.project_id,
                invite_id: Some(invite.id),
            },
        )
        .await
    }

    pub async fn send_magic_link(&self, email: &str, code: &str, expires_in_mins: i64) -> SendOutcome {
        let login_url = format!("{}/login", self.base_url);
        let rendered = templates::magic_link(&self.app_name, code, &login_url, expires_in_mins);
        self.send(EmailType::MagicLink, email, rendered, LogLinks::default())
            .await
    }

    pub async fn send_password_reset(
        &self,
        email: &str,
        token: &str,
        expires_in_hours: i64,
    ) -> SendOutcome {
        let reset_url = format!("{}/reset-password?token={token}", self.base_url);
        let rendered = templates::password_reset(&self.app_name, &reset_url, expires_in_hours);
        self.send(EmailType::PasswordReset, email, rendered, LogLinks::default())
            .await
    }

    pub async fn send_welcome(
        &self,
        contact: &Contact,
        company_name: &str,
        project_id: DbId,
    ) -> SendOutcome {
        let rendered = templates::welcome(
            &self.app_name,
            &contact.full_name(),
            company_name,
            &self.portal_project_url(project_id),
        );
        self.send(
            EmailType::Welcome,
            &contact.email,
            rendered,
            LogLinks {
                project_id: Some(project_id),
                invite_id: None,
            },
        )
        .await
    }

    /// Email the company's primary (or first active) contact about a status
    /// change and record a `status_notification_sent` activity.
    ///
    /// Returns `Ok(None)` when the project or a recipient cannot be found.
    pub async fn notify_status_change(
        &self,
        project_id: DbId,
        previous: ProjectStatus,
        new: ProjectStatus,
    ) -> DbResult<Option<SendOutcome>> {
        let Some(project) = self.repos.projects.find_by_id(project_id).await? else {
            tracing::warn!(project_id, "Status notification skipped: project not found");
            return Ok(None);
        };
        let Some(company) = self.repos.companies.find_by_id(project.company_id).await? else {
            tracing::warn!(project_id, "Status notification skipped: company not found");
            return Ok(None);
        };
        let Some(contact) = self.repos.contacts.find_primary(company.id).await? else {
            tracing::warn!(project_id, "Status notification skipped: no contact");
            return Ok(None);
        };

        let rendered = templates::status_update(
            &self.app_name,
            &contact.full_name(),
            &company.legal_name,
            Some(previous),
            new,
            &self.portal_project_url(project_id),
        );
        let outcome = self
            .send(
                EmailType::StatusUpdate,
                &contact.email,
                rendered,
                LogLinks {
                    project_id: Some(project_id),
                    invite_id: None,
                },
            )
            .await;

        self.repos
            .activity
            .create(&CreateActivity::new(
                project_id,
                None,
                actions::STATUS_NOTIFICATION_SENT,
                serde_json::json!({
                    "recipient": contact.email,
                    "previous_status": previous,
                    "new_status": new,
                    "success": outcome.success,
                }),
            ))
            .await?;

        Ok(Some(outcome))
    }

    /// Send the project's current status to every active contact. Individual
    /// failures are collected, never raised.
    pub async fn notify_all_project_contacts(
        &self,
        project_id: DbId,
        previous: Option<ProjectStatus>,
    ) -> DbResult<BroadcastSummary> {
        let mut summary = BroadcastSummary::default();

        let Some(project) = self.repos.projects.find_by_id(project_id).await? else {
            return Ok(summary);
        };
        let Some(company) = self.repos.companies.find_by_id(project.company_id).await? else {
            return Ok(summary);
        };
        let contacts = self
            .repos
            .contacts
            .list_active_by_company(company.id)
            .await?;

        for contact in contacts {
            let rendered = templates::status_update(
                &self.app_name,
                &contact.full_name(),
                &company.legal_name,
                previous,
                project.status,
                &self.portal_project_url(project_id),
            );
            let outcome = self
                .send(
                    EmailType::StatusUpdate,
                    &contact.email,
                    rendered,
                    LogLinks {
                        project_id: Some(project_id),
                        invite_id: None,
                    },
                )
                .await;
            if outcome.success {
                summary.sent += 1;
            } else {
                summary.errors.push(RecipientError {
                    recipient: contact.email,
                    error: outcome.error.unwrap_or_default(),
                });
            }
        }

        tracing::info!(
            project_id,
            sent = summary.sent,
            failed = summary.errors.len(),
            "Status broadcast complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::RecordingMailer;
    use onboard_core::status::{CompanySize, ContactRole, ModuleType};
    use onboard_db::models::company::CreateCompany;
    use onboard_db::models::contact::CreateContact;
    use onboard_db::models::onboarding::{NewPrimaryContact, NewSubmission, SubmissionRecord};

    fn setup() -> (Notifier, Arc<RecordingMailer>, Repositories) {
        let mailer = Arc::new(RecordingMailer::new());
        let repos = Repositories::in_memory();
        let notifier = Notifier::new(
            mailer.clone(),
            repos.clone(),
            "Client Onboarding",
            "https://app.test/",
        );
        (notifier, mailer, repos)
    }

    async fn seed_project(repos: &Repositories) -> SubmissionRecord {
        let submission = NewSubmission {
            company: CreateCompany {
                legal_name: "Acme Insurance".into(),
                trade_name: None,
                address_line1: None,
                address_line2: None,
                city: None,
                state: None,
                postal_code: None,
                country: None,
                size: CompanySize::Small,
                lines_of_business: vec![],
                website: None,
            },
            contact: NewPrimaryContact {
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@acme.example".into(),
                phone: None,
                title: None,
            },
            modules: vec![
                (ModuleType::Core, true),
                (ModuleType::Comms, false),
                (ModuleType::Fnol, false),
            ],
            core: None,
            comms: None,
            fnol: None,
            activity_details: serde_json::json!({}),
            invite_id: None,
        };
        repos.onboarding.create_submission(&submission).await.unwrap()
    }

    #[tokio::test]
    async fn status_change_emails_primary_and_logs_both() {
        let (notifier, mailer, repos) = setup();
        let record = seed_project(&repos).await;

        let outcome = notifier
            .notify_status_change(
                record.project.id,
                ProjectStatus::DiscoveryInProgress,
                ProjectStatus::SowPending,
            )
            .await
            .unwrap()
            .unwrap();
        assert!(outcome.success);

        let email = mailer.last_to("ada@acme.example").unwrap();
        assert!(email.subject.contains("SOW Pending"));
        assert!(email.text.contains("https://app.test/portal/projects/"));

        let logs = repos.email_logs.list(Some(record.project.id), 10, 0).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].email_type, EmailType::StatusUpdate);
        assert!(logs[0].success);

        let activity = repos
            .activity
            .list_for_project(record.project.id, 10, 0)
            .await
            .unwrap();
        assert!(activity
            .iter()
            .any(|a| a.action == actions::STATUS_NOTIFICATION_SENT));
    }

    #[tokio::test]
    async fn failed_delivery_is_logged_not_raised() {
        let (notifier, mailer, repos) = setup();
        let record = seed_project(&repos).await;
        mailer.fail_for("ada@acme.example");

        let outcome = notifier
            .notify_status_change(record.project.id, ProjectStatus::SowPending, ProjectStatus::ContractSigned)
            .await
            .unwrap()
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.is_some());

        let logs = repos.email_logs.list(None, 10, 0).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(!logs[0].success);
    }

    #[tokio::test]
    async fn missing_project_is_skipped() {
        let (notifier, mailer, _) = setup();
        let outcome = notifier
            .notify_status_change(999, ProjectStatus::SowPending, ProjectStatus::Live)
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn broadcast_counts_successes_and_collects_errors() {
        let (notifier, mailer, repos) = setup();
        let record = seed_project(&repos).await;
        repos
            .contacts
            .create(&CreateContact {
                company_id: record.company.id,
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                email: "grace@acme.example".into(),
                phone: None,
                title: None,
                role: ContactRole::Technical,
            })
            .await
            .unwrap();
        mailer.fail_for("grace@acme.example");

        let summary = notifier
            .notify_all_project_contacts(record.project.id, None)
            .await
            .unwrap();
        assert_eq!(summary.sent, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].recipient, "grace@acme.example");
    }

    #[tokio::test]
    async fn password_reset_link_carries_token() {
        let (notifier, mailer, _) = setup();
        let outcome = notifier
            .send_password_reset("ada@acme.example", "tok123", 1)
            .await;
        assert!(outcome.success);
        let email = mailer.last_to("ada@acme.example").unwrap();
        assert!(email.text.contains("https://app.test/reset-password?token=tok123"));
    }
}
