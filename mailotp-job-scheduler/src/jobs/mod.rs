mod clear_expired_otps;

pub use clear_expired_otps::ClearExpiredOtpsJob;

use mailotp_common::db::DaoError;

use async_trait::async_trait;
use std::fmt;
use tokio::task::JoinError;

#[derive(Debug)]
pub enum JobError {
    DaoFailure(Option<DaoError>),
    ConcurrencyError(JoinError),
    NotReady,
}

impl std::error::Error for JobError {}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::DaoFailure(e) => {
                if let Some(inner_err) = e {
                    write!(f, "JobError: {inner_err}")
                } else {
                    write!(f, "JobError: DaoFailure")
                }
            }
            JobError::ConcurrencyError(e) => {
                write!(f, "JobError: ConcurrencyError: {e}")
            }
            JobError::NotReady => {
                write!(f, "JobError: Attempted execution before job was ready")
            }
        }
    }
}

impl From<DaoError> for JobError {
    fn from(e: DaoError) -> Self {
        JobError::DaoFailure(Some(e))
    }
}

impl From<JoinError> for JobError {
    fn from(e: JoinError) -> Self {
        JobError::ConcurrencyError(e)
    }
}

#[async_trait]
pub trait Job: Send {
    fn name(&self) -> &'static str;
    fn is_ready(&self) -> bool;
    async fn execute(&mut self) -> Result<(), JobError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    pub struct MockJob {
        pub is_running: bool,
        pub should_fail: bool,
        pub runs: Arc<Mutex<usize>>,
    }

    impl MockJob {
        pub fn new() -> Self {
            Self {
                is_running: false,
                should_fail: false,
                runs: Arc::new(Mutex::new(0)),
            }
        }

        pub fn failing() -> Self {
            Self {
                should_fail: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl Job for MockJob {
        fn name(&self) -> &'static str {
            "Mock"
        }

        fn is_ready(&self) -> bool {
            !self.is_running
        }

        async fn execute(&mut self) -> Result<(), JobError> {
            if !self.is_ready() {
                return Err(JobError::NotReady);
            }

            *self.runs.lock().unwrap() += 1;

            if self.should_fail {
                return Err(JobError::DaoFailure(None));
            }

            Ok(())
        }
    }

    #[tokio::test]
    async fn test_job_execute() {
        let mut job = MockJob::new();
        let job_run_count = Arc::clone(&job.runs);
        assert_eq!(*job_run_count.lock().unwrap(), 0);

        job.is_running = true;
        assert!(!job.is_ready());
        assert!(
            matches!(job.execute().await.unwrap_err(), JobError::NotReady),
            "Job should not have been ready while it was already running"
        );
        assert_eq!(*job_run_count.lock().unwrap(), 0);

        job.is_running = false;
        job.execute().await.unwrap();
        assert_eq!(*job_run_count.lock().unwrap(), 1);
    }

    #[test]
    fn test_job_error_display() {
        assert_eq!(
            JobError::DaoFailure(None).to_string(),
            "JobError: DaoFailure"
        );
        assert_eq!(
            JobError::from(DaoError::CannotRunQuery("down")).to_string(),
            "JobError: DaoError: Cannot run query: down"
        );
    }
}
