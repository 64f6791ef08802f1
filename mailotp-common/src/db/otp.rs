use diesel::dsl::{self, IntervalDsl};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};
use std::time::{Duration, SystemTime};

use crate::db::{DaoError, DbThreadPool};
use crate::models::otp_record::OtpRecord;
use crate::schema::email_otps as email_otp_fields;
use crate::schema::email_otps::dsl::email_otps;
use crate::store::OtpStore;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }
}

impl OtpStore for Dao {
    fn put(&self, email: &str, code: &str) -> Result<SystemTime, DaoError> {
        // issued_at comes from the database clock, not this host's
        Ok(dsl::insert_into(email_otps)
            .values((
                email_otp_fields::email.eq(email),
                email_otp_fields::code.eq(code),
                email_otp_fields::issued_at.eq(dsl::now),
            ))
            .on_conflict(email_otp_fields::email)
            .do_update()
            .set((
                email_otp_fields::code.eq(code),
                email_otp_fields::issued_at.eq(dsl::now),
            ))
            .returning(email_otp_fields::issued_at)
            .get_result::<SystemTime>(&mut self.db_thread_pool.get()?)?)
    }

    fn get(&self, email: &str) -> Result<Option<OtpRecord>, DaoError> {
        Ok(email_otps
            .find(email)
            .select(OtpRecord::as_select())
            .first(&mut self.db_thread_pool.get()?)
            .optional()?)
    }

    fn delete(&self, email: &str) -> Result<(), DaoError> {
        diesel::delete(email_otps.find(email)).execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }

    fn delete_if_code_matches(&self, email: &str, code: &str) -> Result<bool, DaoError> {
        let deleted_count = diesel::delete(
            email_otps
                .find(email)
                .filter(email_otp_fields::code.eq(code)),
        )
        .execute(&mut self.db_thread_pool.get()?)?;

        Ok(deleted_count > 0)
    }

    fn delete_all_expired(&self, lifetime: Duration) -> Result<usize, DaoError> {
        let lifetime_micros = i64::try_from(lifetime.as_micros()).unwrap_or(i64::MAX);

        let cutoff = dsl::now - lifetime_micros.microseconds();

        Ok(
            diesel::delete(email_otps.filter(email_otp_fields::issued_at.lt(cutoff)))
                .execute(&mut self.db_thread_pool.get()?)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils;
    use crate::models::otp_record::NewOtpRecord;

    fn dao() -> Dao {
        Dao::new(test_utils::db_thread_pool())
    }

    #[test]
    #[ignore = "requires a Postgres database at MAILOTP_DB_URI"]
    fn test_put_overwrites_and_conditional_delete() {
        let dao = dao();
        let email = test_utils::unique_email();

        assert!(dao.get(&email).unwrap().is_none());

        dao.put(&email, "111111").unwrap();
        let issued_at = dao.put(&email, "222222").unwrap();

        let saved = dao.get(&email).unwrap().unwrap();
        assert_eq!(saved.code, "222222");
        assert_eq!(saved.issued_at, issued_at);

        assert!(!dao.delete_if_code_matches(&email, "111111").unwrap());
        assert!(dao.get(&email).unwrap().is_some());

        assert!(dao.delete_if_code_matches(&email, "222222").unwrap());
        assert!(dao.get(&email).unwrap().is_none());
    }

    #[test]
    #[ignore = "requires a Postgres database at MAILOTP_DB_URI"]
    fn test_delete_all_expired() {
        let dao = dao();
        let expired_email = test_utils::unique_email();
        let fresh_email = test_utils::unique_email();

        let expired = NewOtpRecord {
            email: &expired_email,
            code: "111111",
            issued_at: SystemTime::now() - Duration::from_secs(600),
        };

        dsl::insert_into(email_otps)
            .values(&expired)
            .execute(&mut test_utils::db_thread_pool().get().unwrap())
            .unwrap();

        dao.put(&fresh_email, "222222").unwrap();

        assert!(dao.delete_all_expired(Duration::from_secs(300)).unwrap() >= 1);
        assert!(dao.get(&expired_email).unwrap().is_none());
        assert!(dao.get(&fresh_email).unwrap().is_some());

        dao.delete(&fresh_email).unwrap();
        assert!(dao.get(&fresh_email).unwrap().is_none());
    }
}
