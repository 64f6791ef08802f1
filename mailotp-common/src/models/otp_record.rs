use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::schema::email_otps;

#[derive(Clone, Debug, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = email_otps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OtpRecord {
    pub email: String,
    pub code: String,
    pub issued_at: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = email_otps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewOtpRecord<'a> {
    pub email: &'a str,
    pub code: &'a str,
    pub issued_at: SystemTime,
}
