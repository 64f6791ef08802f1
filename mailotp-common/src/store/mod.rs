use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use crate::db::DaoError;
use crate::models::otp_record::OtpRecord;

/// Persistence for pending codes, keyed by the exact bytes of the email address.
///
/// Each method must be atomic on its own. Callers never rely on atomicity across two
/// calls, which is why `delete_if_code_matches` exists.
pub trait OtpStore: Send + Sync {
    /// Inserts or replaces the record for `email`, stamping it with the store's clock.
    /// Returns the stamp that was written.
    fn put(&self, email: &str, code: &str) -> Result<SystemTime, DaoError>;

    fn get(&self, email: &str) -> Result<Option<OtpRecord>, DaoError>;

    fn delete(&self, email: &str) -> Result<(), DaoError>;

    /// Deletes the record for `email` only if its code is still `code`. Returns whether
    /// a record was deleted.
    fn delete_if_code_matches(&self, email: &str, code: &str) -> Result<bool, DaoError>;

    /// Deletes every record older than `lifetime` and returns how many were removed.
    fn delete_all_expired(&self, lifetime: Duration) -> Result<usize, DaoError>;
}

#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, OtpRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, DaoError> {
        Ok(self
            .records
            .read()
            .map_err(|_| DaoError::CannotRunQuery(POISONED_MSG))?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool, DaoError> {
        Ok(self.len()? == 0)
    }

    /// Writes a record with a caller-chosen `issued_at`. Only meant for backdating records
    /// in tests.
    pub fn put_record(&self, record: OtpRecord) -> Result<(), DaoError> {
        self.records
            .write()
            .map_err(|_| DaoError::CannotRunQuery(POISONED_MSG))?
            .insert(record.email.clone(), record);

        Ok(())
    }
}

const POISONED_MSG: &str = "OTP store lock was poisoned";

impl OtpStore for MemoryStore {
    fn put(&self, email: &str, code: &str) -> Result<SystemTime, DaoError> {
        let issued_at = SystemTime::now();

        let record = OtpRecord {
            email: String::from(email),
            code: String::from(code),
            issued_at,
        };

        self.put_record(record)?;
        Ok(issued_at)
    }

    fn get(&self, email: &str) -> Result<Option<OtpRecord>, DaoError> {
        Ok(self
            .records
            .read()
            .map_err(|_| DaoError::CannotRunQuery(POISONED_MSG))?
            .get(email)
            .cloned())
    }

    fn delete(&self, email: &str) -> Result<(), DaoError> {
        self.records
            .write()
            .map_err(|_| DaoError::CannotRunQuery(POISONED_MSG))?
            .remove(email);

        Ok(())
    }

    fn delete_if_code_matches(&self, email: &str, code: &str) -> Result<bool, DaoError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| DaoError::CannotRunQuery(POISONED_MSG))?;

        let is_match = records.get(email).is_some_and(|r| r.code == code);
        if is_match {
            records.remove(email);
        }

        Ok(is_match)
    }

    fn delete_all_expired(&self, lifetime: Duration) -> Result<usize, DaoError> {
        let Some(cutoff) = SystemTime::now().checked_sub(lifetime) else {
            return Ok(0);
        };

        let mut records = self
            .records
            .write()
            .map_err(|_| DaoError::CannotRunQuery(POISONED_MSG))?;

        let before = records.len();
        records.retain(|_, r| r.issued_at >= cutoff);

        Ok(before - records.len())
    }
}
