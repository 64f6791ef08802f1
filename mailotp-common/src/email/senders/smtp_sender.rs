use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::PoolConfig;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

use crate::email::{EmailError, EmailMessage, SendEmail};

pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpSender {
    pub fn with_credentials(
        smtp_username: &str,
        smtp_password: &str,
        smtp_address: &str,
        max_connections: u32,
        idle_timeout: Duration,
    ) -> Result<Self, EmailError> {
        let credentials = Credentials::new(smtp_username.to_owned(), smtp_password.to_owned());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_address)
            .map_err(|e| EmailError::RelayConnectionFailed(e.to_string()))?
            .credentials(credentials)
            .pool_config(
                PoolConfig::new()
                    .max_size(max_connections)
                    .idle_timeout(idle_timeout),
            )
            .build();

        Ok(Self { transport })
    }

    pub async fn test_connection(&self) -> Result<bool, EmailError> {
        self.transport
            .test_connection()
            .await
            .map_err(EmailError::FailedToSend)
    }
}

#[async_trait]
impl SendEmail for SmtpSender {
    async fn send<'a>(&self, message: EmailMessage<'a>) -> Result<(), EmailError> {
        let destination: Mailbox = message
            .destination
            .parse()
            .map_err(|_| EmailError::InvalidDestination)?;

        let content_type = if message.is_html {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };

        let email = Message::builder()
            .from(message.from)
            .reply_to(message.reply_to)
            .to(destination)
            .subject(message.subject)
            .header(content_type)
            .body(message.body)
            .map_err(EmailError::InvalidMessage)?;

        self.transport
            .send(email)
            .await
            .map_err(EmailError::FailedToSend)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sender_creation() {
        let sender = SmtpSender::with_credentials(
            "user",
            "password",
            "smtp.example.com",
            4,
            Duration::from_secs(30),
        );

        assert!(sender.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_invalid_destination() {
        let sender = SmtpSender::with_credentials(
            "user",
            "password",
            "smtp.example.com",
            1,
            Duration::from_secs(30),
        )
        .unwrap();

        let message = EmailMessage {
            body: String::from("<p>hi</p>"),
            subject: "Test",
            from: "Sender <sender@example.com>".parse().unwrap(),
            reply_to: "sender@example.com".parse().unwrap(),
            destination: "not an address",
            is_html: true,
        };

        assert!(matches!(
            sender.send(message).await,
            Err(EmailError::InvalidDestination)
        ));
    }
}
