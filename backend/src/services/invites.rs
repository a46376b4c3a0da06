//! Group invitation messages and delivery.

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};

/// An invitation email ready to hand to a mail transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub join_url: String,
}

/// Fresh random invite token.
pub fn new_invite_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Link that accepts the invite identified by `token`.
pub fn join_url(base_url: &str, token: &str) -> String {
    format!("{}/api/join?token={}", base_url.trim_end_matches('/'), token)
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Build the invitation email for `to`.
pub fn compose_invite(
    base_url: &str,
    from: &str,
    sender_name: &str,
    group_name: &str,
    to: &str,
    token: &str,
) -> InviteMessage {
    let join_url = join_url(base_url, token);
    let html = format!(
        "<div style=\"font-family: sans-serif; padding: 20px;\">\
         <h2>You're invited!</h2>\
         <p><strong>{sender}</strong> invited you to plan a trip together in the group \
         <strong>\"{group}\"</strong>.</p>\
         <a href=\"{url}\" style=\"background: #0ea5e9; color: white; padding: 10px 20px; \
         text-decoration: none; border-radius: 5px;\">Join group</a>\
         <p style=\"margin-top: 20px; font-size: 12px; color: #888;\">\
         If the button does not work, copy this link: {url}</p>\
         </div>",
        sender = escape_html(sender_name),
        group = escape_html(group_name),
        url = join_url,
    );

    InviteMessage {
        from: from.to_string(),
        to: to.to_string(),
        subject: format!("{} invited you to join \"{}\"!", sender_name, group_name),
        html,
        join_url,
    }
}

/// Outbound transport for invitation emails.
#[async_trait]
pub trait InviteMailer: Send + Sync {
    async fn send(&self, message: &InviteMessage) -> anyhow::Result<()>;
}

/// Mailer that only logs the message. Used when no SMTP relay is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl InviteMailer for LogMailer {
    async fn send(&self, message: &InviteMessage) -> anyhow::Result<()> {
        info!(
            "Invite for {} ready (subject: {}): {}",
            message.to, message.subject, message.join_url
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_random_hex() {
        let a = new_invite_token();
        let b = new_invite_token();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_compose_invite() {
        let msg = compose_invite(
            "https://aroov.app/",
            "no-reply@aroov.app",
            "Nok",
            "Chiang Mai <3",
            "friend@example.com",
            "abc123",
        );
        assert_eq!(msg.join_url, "https://aroov.app/api/join?token=abc123");
        assert_eq!(msg.subject, "Nok invited you to join \"Chiang Mai <3\"!");
        assert!(msg.html.contains("Chiang Mai &lt;3"));
        assert!(msg.html.contains("href=\"https://aroov.app/api/join?token=abc123\""));
        assert_eq!(msg.to, "friend@example.com");
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_message() {
        let msg = compose_invite("http://localhost", "a@b.c", "x", "y", "z@b.c", "t");
        assert!(LogMailer.send(&msg).await.is_ok());
    }
}
