use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
#[error("Mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Outbound email. Delivery is an external collaborator.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// Writes messages to the log instead of delivering them
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(to = %email.to, subject = %email.subject, "Outgoing email");
        tracing::debug!("Email body:\n{}", email.body);
        Ok(())
    }
}

/// Send and log failures. Used where the caller's response must not depend on delivery.
pub async fn send_logged(mailer: &dyn Mailer, email: OutgoingEmail) {
    let to = email.to.clone();
    if let Err(e) = mailer.send(email).await {
        tracing::error!("Failed to send email to {}: {}", to, e);
    }
}
