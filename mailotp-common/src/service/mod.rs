use lettre::message::Mailbox;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;

use crate::email::templates::OtpMessage;
use crate::email::{EmailMessage, SendEmail};
use crate::otp::{Otp, OTP_LIFETIME};
use crate::store::OtpStore;

pub const MAX_EMAIL_LENGTH: usize = 255;

const ISSUED_MSG: &str = "OTP sent successfully!";
const VERIFIED_MSG: &str = "OTP verified successfully!";

#[derive(Debug, PartialEq, Eq)]
pub enum OtpError {
    InvalidArgument(&'static str),
    NotFound,
    DeadlineExceeded,
    PermissionDenied,
    Internal(&'static str),
}

impl OtpError {
    pub fn code(&self) -> &'static str {
        match self {
            OtpError::InvalidArgument(_) => "invalid-argument",
            OtpError::NotFound => "not-found",
            OtpError::DeadlineExceeded => "deadline-exceeded",
            OtpError::PermissionDenied => "permission-denied",
            OtpError::Internal(_) => "internal",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            OtpError::InvalidArgument(msg) => *msg,
            OtpError::NotFound => "No OTP found for this email",
            OtpError::DeadlineExceeded => "OTP expired, please request again",
            OtpError::PermissionDenied => "Invalid OTP",
            OtpError::Internal(msg) => *msg,
        }
    }
}

impl std::error::Error for OtpError {}

impl fmt::Display for OtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OtpError: {}: {}", self.code(), self.message())
    }
}

impl From<JoinError> for OtpError {
    fn from(_err: JoinError) -> Self {
        OtpError::Internal("Blocking thread pool failure")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IssueAck {
    pub message: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerifiedAck {
    pub verified: bool,
    pub message: &'static str,
}

#[derive(Clone, Debug)]
pub struct OtpServiceConfig {
    pub otp_lifetime: Duration,
    pub from_address: Mailbox,
    pub reply_to_address: Mailbox,
}

impl OtpServiceConfig {
    pub fn new(from_address: Mailbox, reply_to_address: Mailbox) -> Self {
        Self {
            otp_lifetime: OTP_LIFETIME,
            from_address,
            reply_to_address,
        }
    }
}

/// Issues codes to email addresses and verifies them.
///
/// The store and the sender are injected so that both operations share the same
/// collaborators. The service holds no other state.
pub struct OtpService {
    store: Arc<dyn OtpStore>,
    email_sender: Arc<dyn SendEmail>,
    config: OtpServiceConfig,
}

impl OtpService {
    pub fn new(
        store: Arc<dyn OtpStore>,
        email_sender: Arc<dyn SendEmail>,
        config: OtpServiceConfig,
    ) -> Self {
        Self {
            store,
            email_sender,
            config,
        }
    }

    pub fn otp_lifetime(&self) -> Duration {
        self.config.otp_lifetime
    }

    /// Generates a code for `email`, stores it (replacing any pending code), and mails it.
    ///
    /// If the email cannot be sent, the stored code is removed again so a code the user
    /// never received cannot linger.
    pub async fn issue(&self, email: &str) -> Result<IssueAck, OtpError> {
        validate_email(email, "Email is required")?;

        let otp = Otp::generate();

        let store = Arc::clone(&self.store);
        let email_copy = String::from(email);
        let otp_copy = otp.clone();

        match tokio::task::spawn_blocking(move || store.put(&email_copy, &otp_copy)).await? {
            Ok(_) => (),
            Err(e) => {
                log::error!("{e}");
                return Err(OtpError::Internal("Failed to save OTP"));
            }
        };

        let message = EmailMessage {
            body: OtpMessage::generate(&otp, self.config.otp_lifetime),
            subject: OtpMessage::SUBJECT,
            from: self.config.from_address.clone(),
            reply_to: self.config.reply_to_address.clone(),
            destination: email,
            is_html: true,
        };

        if let Err(e) = self.email_sender.send(message).await {
            log::error!("Failed to send OTP to {email}: {e}");
            self.discard_undelivered(email, otp).await;
            return Err(OtpError::Internal("Failed to send OTP"));
        }

        log::info!("OTP sent to {email}");

        Ok(IssueAck {
            message: ISSUED_MSG,
        })
    }

    /// Checks `submitted_otp` against the pending code for `email` and consumes it on a
    /// match.
    ///
    /// Expired codes are left in the store for the reaper. The final delete only removes
    /// the exact code that was checked, so a code re-issued concurrently survives and this
    /// call fails with `PermissionDenied`.
    pub async fn verify(
        &self,
        email: &str,
        submitted_otp: &str,
    ) -> Result<VerifiedAck, OtpError> {
        if submitted_otp.is_empty() {
            return Err(OtpError::InvalidArgument("Email and OTP required"));
        }

        validate_email(email, "Email and OTP required")?;

        let store = Arc::clone(&self.store);
        let email_copy = String::from(email);

        let record = match tokio::task::spawn_blocking(move || store.get(&email_copy)).await? {
            Ok(Some(r)) => r,
            Ok(None) => return Err(OtpError::NotFound),
            Err(e) => {
                log::error!("{e}");
                return Err(OtpError::Internal("Failed to verify OTP"));
            }
        };

        if Otp::is_expired(Some(record.issued_at), self.config.otp_lifetime) {
            return Err(OtpError::DeadlineExceeded);
        }

        if !Otp::are_equal(submitted_otp, &record.code) {
            return Err(OtpError::PermissionDenied);
        }

        let store = Arc::clone(&self.store);
        let email_copy = String::from(email);

        let was_deleted = match tokio::task::spawn_blocking(move || {
            store.delete_if_code_matches(&email_copy, &record.code)
        })
        .await?
        {
            Ok(d) => d,
            Err(e) => {
                log::error!("{e}");
                return Err(OtpError::Internal("Failed to verify OTP"));
            }
        };

        if !was_deleted {
            log::warn!("OTP for {email} was replaced while it was being verified");
            return Err(OtpError::PermissionDenied);
        }

        log::info!("OTP verified for {email}");

        Ok(VerifiedAck {
            verified: true,
            message: VERIFIED_MSG,
        })
    }

    async fn discard_undelivered(&self, email: &str, otp: String) {
        let store = Arc::clone(&self.store);
        let email_copy = String::from(email);

        match tokio::task::spawn_blocking(move || store.delete_if_code_matches(&email_copy, &otp))
            .await
        {
            Ok(Ok(_)) => (),
            Ok(Err(e)) => log::error!("Failed to discard undelivered OTP for {email}: {e}"),
            Err(e) => log::error!("Failed to discard undelivered OTP for {email}: {e}"),
        }
    }
}

fn validate_email(email: &str, empty_msg: &'static str) -> Result<(), OtpError> {
    if email.is_empty() {
        return Err(OtpError::InvalidArgument(empty_msg));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(OtpError::InvalidArgument("Email is too long"));
    }

    Ok(())
}
