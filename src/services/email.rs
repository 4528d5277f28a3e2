//! Email service
//!
//! Outgoing SMTP mail for password resets. Mail is optional: when no
//! relay is configured the caller logs and moves on.

use crate::config::EmailConfig;
use anyhow::{anyhow, Result};
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

/// Mailer wrapping the configured SMTP relay
pub struct Mailer {
    config: EmailConfig,
}

impl Mailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Check whether outgoing mail is configured
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Send the password reset token to a user.
    pub async fn send_password_reset(&self, to_email: &str, token: &str) -> Result<()> {
        if !self.is_configured() {
            return Err(anyhow!("SMTP relay is not configured"));
        }

        let email = self.build_password_reset(to_email, token)?;

        let mut transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
            .map_err(|e| anyhow!("Failed to create SMTP transport: {}", e))?
            .port(self.config.smtp_port);

        if !self.config.smtp_username.is_empty() {
            transport = transport.credentials(Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            ));
        }

        transport
            .build()
            .send(email)
            .await
            .map_err(|e| anyhow!("Failed to send email: {}", e))?;

        Ok(())
    }

    fn build_password_reset(&self, to_email: &str, token: &str) -> Result<Message> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_address);
        let body = format!(
            "Hello,\n\nA password reset was requested for your account. \
             Use this token within the next hour to choose a new password:\n\n{}\n\n\
             If you did not request a reset, you can ignore this message.\n\n{}",
            token, self.config.from_name
        );

        Message::builder()
            .from(from.parse().map_err(|e| anyhow!("Invalid from address: {}", e))?)
            .to(to_email
                .parse()
                .map_err(|e| anyhow!("Invalid to address: {}", e))?)
            .subject(format!("[{}] Password reset", self.config.from_name))
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| anyhow!("Failed to build email: {}", e))
    }
}
