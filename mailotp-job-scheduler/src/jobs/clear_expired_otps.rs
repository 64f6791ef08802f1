use mailotp_common::store::OtpStore;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::jobs::{Job, JobError};

pub struct ClearExpiredOtpsJob {
    store: Arc<dyn OtpStore>,
    otp_lifetime: Duration,
    is_running: bool,
}

impl ClearExpiredOtpsJob {
    pub fn new(store: Arc<dyn OtpStore>, otp_lifetime: Duration) -> Self {
        Self {
            store,
            otp_lifetime,
            is_running: false,
        }
    }
}

#[async_trait]
impl Job for ClearExpiredOtpsJob {
    fn name(&self) -> &'static str {
        "Clear Expired Otps"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        self.is_running = true;

        let store = Arc::clone(&self.store);
        let otp_lifetime = self.otp_lifetime;
        let result = tokio::task::spawn_blocking(move || store.delete_all_expired(otp_lifetime))
            .await
            .map_err(JobError::from)
            .and_then(|r| r.map_err(JobError::from));

        self.is_running = false;

        let deleted_count = result?;
        log::info!("Cleared {deleted_count} expired OTP(s)");

        Ok(())
    }
}
