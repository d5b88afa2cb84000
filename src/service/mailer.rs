use async_trait::async_trait;
use lettre::message::{Mailbox, Mailboxes, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub recipients: String,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Invalid email address format '{address}': {source}")]
    Address {
        address: String,
        source: lettre::address::AddressError,
    },

    #[error("No recipient address given")]
    NoRecipients,

    #[error("Failed to build email message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("SMTP transport error: {0}")]
    SmtpTransport(#[from] lettre::transport::smtp::Error),
}

#[async_trait]
pub trait MailRelay: Send + Sync {
    async fn deliver(&self, mail: OutgoingMail) -> Result<(), DeliveryError>;
}

/// Parses an RFC 2822 address list; quoted display names may contain commas.
pub fn parse_recipients(recipients: &str) -> Result<Vec<Mailbox>, DeliveryError> {
    let recipients = recipients.trim();
    if recipients.is_empty() {
        return Err(DeliveryError::NoRecipients);
    }

    let mailboxes: Vec<Mailbox> = recipients
        .parse::<Mailboxes>()
        .map_err(|source| DeliveryError::Address {
            address: recipients.to_string(),
            source,
        })?
        .into_iter()
        .collect();

    if mailboxes.is_empty() {
        return Err(DeliveryError::NoRecipients);
    }
    Ok(mailboxes)
}

/// Builds the plain-text message; nothing is sent.
pub fn build_message(sender: &Mailbox, mail: OutgoingMail) -> Result<Message, DeliveryError> {
    let mut builder = Message::builder()
        .from(sender.clone())
        .subject(mail.subject)
        .header(ContentType::TEXT_PLAIN);

    for mailbox in parse_recipients(&mail.recipients)? {
        builder = builder.to(mailbox);
    }

    Ok(builder.body(mail.text)?)
}

pub struct SmtpRelay {
    sender: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpRelay {
    pub fn new(config: &MailConfig) -> Result<Self, DeliveryError> {
        let sender = config
            .sender()
            .parse::<Mailbox>()
            .map_err(|source| DeliveryError::Address {
                address: config.sender().to_string(),
                source,
            })?;

        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.relay)?
            .credentials(creds)
            .build();

        Ok(Self { sender, transport })
    }
}

#[async_trait]
impl MailRelay for SmtpRelay {
    async fn deliver(&self, mail: OutgoingMail) -> Result<(), DeliveryError> {
        tracing::info!(
            "Sending email to '{}' with subject '{}'",
            mail.recipients,
            mail.subject
        );

        let recipients = mail.recipients.clone();
        let message = build_message(&self.sender, mail)?;
        self.transport.send(message).await?;

        tracing::info!("Message to {} sent successfully", recipients);
        Ok(())
    }
}
