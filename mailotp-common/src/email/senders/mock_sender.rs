use async_trait::async_trait;
use std::sync::Mutex;

use crate::email::{EmailError, EmailMessage, SendEmail};

#[derive(Clone, Debug)]
pub struct SentEmail {
    pub destination: String,
    pub subject: String,
    pub body: String,
}

/// Stands in for an SMTP relay when email is disabled. Messages are only logged unless the
/// sender was created with `recording()`.
#[derive(Default)]
pub struct MockSender {
    sent: Option<Mutex<Vec<SentEmail>>>,
    should_fail: bool,
}

impl MockSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps every message it sends so tests can inspect them. Nothing is ever evicted.
    pub fn recording() -> Self {
        Self {
            sent: Some(Mutex::new(Vec::new())),
            should_fail: false,
        }
    }

    /// A sender whose every `send` fails as if the relay were unreachable.
    pub fn failing() -> Self {
        Self {
            sent: Some(Mutex::new(Vec::new())),
            should_fail: true,
        }
    }

    /// Messages sent so far. Always empty for a sender that isn't recording.
    pub fn sent(&self) -> Vec<SentEmail> {
        let Some(sent) = &self.sent else {
            return Vec::new();
        };

        sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SendEmail for MockSender {
    async fn send<'a>(&self, message: EmailMessage<'a>) -> Result<(), EmailError> {
        if self.should_fail {
            return Err(EmailError::RelayConnectionFailed(String::from(
                "Mock relay is configured to fail",
            )));
        }

        log::info!("Mock email to {}:\n{:#?}", message.destination, message);

        if let Some(Ok(mut sent)) = self.sent.as_ref().map(|s| s.lock()) {
            sent.push(SentEmail {
                destination: String::from(message.destination),
                subject: String::from(message.subject),
                body: message.body,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(destination: &str) -> EmailMessage<'_> {
        EmailMessage {
            body: String::from("<b>123456</b>"),
            subject: "Your OTP Code",
            from: "Mail OTP <no-reply@mailotp.test>".parse().unwrap(),
            reply_to: "Support <support@mailotp.test>".parse().unwrap(),
            destination,
            is_html: true,
        }
    }

    #[tokio::test]
    async fn test_default_sender_retains_nothing() {
        let sender = MockSender::new();

        for i in 0..100 {
            let destination = format!("user{i}@test.com");
            sender.send(message(&destination)).await.unwrap();
        }

        assert!(sender.sent().is_empty());
        assert!(sender.sent.is_none());
    }

    #[tokio::test]
    async fn test_recording_sender_keeps_messages() {
        let sender = MockSender::recording();
        sender.send(message("a@b.com")).await.unwrap();

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].destination, "a@b.com");
        assert_eq!(sent[0].body, "<b>123456</b>");
    }

    #[tokio::test]
    async fn test_failing_sender() {
        let sender = MockSender::failing();

        assert!(matches!(
            sender.send(message("a@b.com")).await,
            Err(EmailError::RelayConnectionFailed(_))
        ));
        assert!(sender.sent().is_empty());
    }
}
