//! The five canned emails. Each returns a subject plus HTML and text bodies
//! built by plain string formatting; interpolated values are HTML-escaped.

use onboard_core::status::ProjectStatus;

/// A rendered subject with both bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Escape the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str, app_name: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body style=\"font-family:Arial,sans-serif;color:#1f2937;max-width:600px;margin:0 auto;padding:24px\">\
         <h1 style=\"font-size:20px\">{title}</h1>{body}\
         <hr style=\"border:none;border-top:1px solid #e5e7eb;margin-top:32px\">\
         <p style=\"font-size:12px;color:#6b7280\">{app}</p></body></html>",
        title = escape_html(title),
        app = escape_html(app_name),
    )
}

fn button(url: &str, label: &str) -> String {
    format!(
        "<p><a href=\"{}\" style=\"display:inline-block;background:#2563eb;color:#fff;\
         padding:12px 20px;border-radius:6px;text-decoration:none\">{}</a></p>",
        escape_html(url),
        escape_html(label)
    )
}

/// Onboarding invitation carrying the invite URL.
pub fn invite(
    app_name: &str,
    inviter_name: &str,
    company_name: Option<&str>,
    invite_url: &str,
    expires_in_days: i64,
) -> RenderedEmail {
    let subject = format!("You're invited to onboard with {app_name}");
    let for_company = company_name
        .map(|c| format!(" for {c}"))
        .unwrap_or_default();

    let html = layout(
        &subject,
        &format!(
            "<p>{inviter} has invited you to start onboarding{company}.</p>{button}\
             <p>This invitation expires in {days} days.</p>",
            inviter = escape_html(inviter_name),
            company = escape_html(&for_company),
            button = button(invite_url, "Start onboarding"),
            days = expires_in_days,
        ),
        app_name,
    );
    let text = format!(
        "{inviter_name} has invited you to start onboarding{for_company}.\n\n\
         Start here: {invite_url}\n\nThis invitation expires in {expires_in_days} days.\n"
    );
    RenderedEmail { subject, html, text }
}

/// One-time sign-in code plus a link that pre-fills it.
pub fn magic_link(app_name: &str, code: &str, login_url: &str, expires_in_mins: i64) -> RenderedEmail {
    let subject = format!("Your {app_name} sign-in code");
    let html = layout(
        &subject,
        &format!(
            "<p>Your sign-in code is:</p>\
             <p style=\"font-size:28px;letter-spacing:6px;font-weight:bold\">{code}</p>{button}\
             <p>The code expires in {mins} minutes. If you did not request it, ignore this email.</p>",
            code = escape_html(code),
            button = button(login_url, "Sign in"),
            mins = expires_in_mins,
        ),
        app_name,
    );
    let text = format!(
        "Your sign-in code is: {code}\n\nOr sign in here: {login_url}\n\n\
         The code expires in {expires_in_mins} minutes. If you did not request it, ignore this email.\n"
    );
    RenderedEmail { subject, html, text }
}

/// Project moved to `new`. Without `previous` the email only states the
/// current stage.
pub fn status_update(
    app_name: &str,
    contact_name: &str,
    company_name: &str,
    previous: Option<ProjectStatus>,
    new: ProjectStatus,
    portal_url: &str,
) -> RenderedEmail {
    let subject = format!("Onboarding update: {}", new.label());
    let (html_change, text_change) = match previous {
        Some(prev) => (
            format!(
                "has moved from <em>{}</em> to <strong>{}</strong>",
                prev.label(),
                new.label()
            ),
            format!("has moved from {} to {}", prev.label(), new.label()),
        ),
        None => (
            format!("is currently at <strong>{}</strong>", new.label()),
            format!("is currently at {}", new.label()),
        ),
    };
    let html = layout(
        &subject,
        &format!(
            "<p>Hi {name},</p><p>The onboarding project for <strong>{company}</strong> \
             {html_change}.</p>{button}",
            name = escape_html(contact_name),
            company = escape_html(company_name),
            button = button(portal_url, "View project"),
        ),
        app_name,
    );
    let text = format!(
        "Hi {contact_name},\n\nThe onboarding project for {company_name} {text_change}.\n\n\
         View project: {portal_url}\n"
    );
    RenderedEmail { subject, html, text }
}

/// Password reset link.
pub fn password_reset(app_name: &str, reset_url: &str, expires_in_hours: i64) -> RenderedEmail {
    let subject = format!("Reset your {app_name} password");
    let html = layout(
        &subject,
        &format!(
            "<p>We received a request to reset your password.</p>{button}\
             <p>This link expires in {hours} hour(s). If you did not request a reset, \
             you can ignore this email.</p>",
            button = button(reset_url, "Reset password"),
            hours = expires_in_hours,
        ),
        app_name,
    );
    let text = format!(
        "We received a request to reset your password.\n\nReset it here: {reset_url}\n\n\
         This link expires in {expires_in_hours} hour(s). If you did not request a reset, \
         you can ignore this email.\n"
    );
    RenderedEmail { subject, html, text }
}

/// Sent to the primary contact once a submission is recorded.
pub fn welcome(app_name: &str, contact_name: &str, company_name: &str, portal_url: &str) -> RenderedEmail {
    let subject = format!("Welcome to {app_name}");
    let html = layout(
        &subject,
        &format!(
            "<p>Hi {name},</p><p>Thanks for submitting onboarding details for \
             <strong>{company}</strong>. Our team will review them and reach out shortly.</p>\
             <p>You can follow progress in the client portal.</p>{button}",
            name = escape_html(contact_name),
            company = escape_html(company_name),
            button = button(portal_url, "Open portal"),
        ),
        app_name,
    );
    let text = format!(
        "Hi {contact_name},\n\nThanks for submitting onboarding details for {company_name}. \
         Our team will review them and reach out shortly.\n\n\
         You can follow progress in the client portal: {portal_url}\n"
    );
    RenderedEmail { subject, html, text }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_replaces_markup() {
        assert_eq!(
            escape_html("<b>\"A&B\"</b>'"),
            "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;&#39;"
        );
    }

    #[test]
    fn invite_embeds_url_and_company() {
        let email = invite(
            "Onboard",
            "Dana",
            Some("Acme <Insurance>"),
            "https://app.test/onboarding?invite=abc",
            7,
        );
        assert!(email.subject.contains("Onboard"));
        assert!(email.text.contains("https://app.test/onboarding?invite=abc"));
        assert!(email.text.contains("Acme <Insurance>"));
        assert!(email.html.contains("Acme &lt;Insurance&gt;"));
        assert!(email.html.contains("7 days"));
    }

    #[test]
    fn status_update_uses_labels() {
        let email = status_update(
            "Onboard",
            "Jo",
            "Acme",
            Some(ProjectStatus::DiscoveryInProgress),
            ProjectStatus::SowPending,
            "https://app.test/portal",
        );
        assert!(email.subject.contains(ProjectStatus::SowPending.label()));
        assert!(email.text.contains(ProjectStatus::DiscoveryInProgress.label()));

        let current = status_update("Onboard", "Jo", "Acme", None, ProjectStatus::Live, "u");
        assert!(current.text.contains("is currently at Live"));
    }

    #[test]
    fn magic_link_shows_code() {
        let email = magic_link("Onboard", "123456", "https://app.test/login", 10);
        assert!(email.html.contains("123456"));
        assert!(email.text.contains("10 minutes"));
    }
}
