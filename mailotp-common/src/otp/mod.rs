use rand::Rng;
use std::time::{Duration, SystemTime};

use crate::threadrand::SecureRng;

pub const OTP_LENGTH: usize = 6;
pub const OTP_LIFETIME: Duration = Duration::from_secs(5 * 60);

const OTP_MIN: u32 = 100_000;
const OTP_MAX: u32 = 999_999;

pub struct Otp {}

impl Otp {
    /// Draws a six-digit code in `100000..=999999`, so the leading digit is never zero.
    pub fn generate() -> String {
        let mut rng = SecureRng;
        rng.gen_range(OTP_MIN..=OTP_MAX).to_string()
    }

    pub fn are_equal(given: &str, saved: &str) -> bool {
        let given = given.as_bytes();
        let saved = saved.as_bytes();

        if given.len() != saved.len() {
            return false;
        }

        let mut otps_dont_match = 0u8;

        // Do bitwise comparison to prevent timing attacks
        for (saved_byte, given_byte) in saved.iter().zip(given) {
            otps_dont_match |= saved_byte ^ given_byte;
        }

        otps_dont_match == 0
    }

    pub fn is_expired(issued_at: Option<SystemTime>, lifetime: Duration) -> bool {
        Self::is_expired_at(issued_at, lifetime, SystemTime::now())
    }

    /// A code issued exactly `lifetime` ago is still valid. A missing timestamp counts as
    /// expired. An `issued_at` later than `now` (clock stepped backwards) is not expired.
    pub fn is_expired_at(
        issued_at: Option<SystemTime>,
        lifetime: Duration,
        now: SystemTime,
    ) -> bool {
        let Some(issued_at) = issued_at else {
            return true;
        };

        match now.duration_since(issued_at) {
            Ok(age) => age > lifetime,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_format() {
        for _ in 0..10_000 {
            let otp = Otp::generate();
            assert_eq!(otp.len(), OTP_LENGTH);
            assert!(otp.bytes().all(|b| b.is_ascii_digit()));
            assert_ne!(otp.as_bytes()[0], b'0');

            let value: u32 = otp.parse().unwrap();
            assert!((OTP_MIN..=OTP_MAX).contains(&value));
        }
    }

    #[test]
    fn test_generate_is_not_constant() {
        let codes = (0..100)
            .map(|_| Otp::generate())
            .collect::<std::collections::HashSet<_>>();

        // 900,000 possible codes, so 100 draws should almost never collide
        assert!(codes.len() > 95);
    }

    #[test]
    fn test_generate_covers_every_leading_digit() {
        let mut seen = [false; 10];
        for _ in 0..10_000 {
            let otp = Otp::generate();
            seen[(otp.as_bytes()[0] - b'0') as usize] = true;
        }

        assert!(!seen[0]);
        assert!(seen[1..].iter().all(|s| *s));
    }

    #[test]
    fn test_are_equal() {
        let otp = Otp::generate();
        assert!(Otp::are_equal(&otp, &otp));
        assert!(!Otp::are_equal("123456", "123457"));
        assert!(!Otp::are_equal(&otp, &otp[..5]));
        assert!(!Otp::are_equal("", &otp));

        let mut longer_otp = String::from(&otp);
        longer_otp.push('9');
        assert!(!Otp::are_equal(&otp, &longer_otp));
    }

    #[test]
    fn test_expiration_boundary() {
        let now = SystemTime::now();

        assert!(!Otp::is_expired_at(Some(now), OTP_LIFETIME, now));
        assert!(!Otp::is_expired_at(
            Some(now - Duration::from_secs(4 * 60 + 59)),
            OTP_LIFETIME,
            now
        ));
        assert!(!Otp::is_expired_at(Some(now - OTP_LIFETIME), OTP_LIFETIME, now));
        assert!(Otp::is_expired_at(
            Some(now - OTP_LIFETIME - Duration::from_nanos(1)),
            OTP_LIFETIME,
            now
        ));
        assert!(Otp::is_expired_at(
            Some(now - OTP_LIFETIME - Duration::from_secs(1)),
            OTP_LIFETIME,
            now
        ));
    }

    #[test]
    fn test_missing_timestamp_is_expired() {
        assert!(Otp::is_expired(None, OTP_LIFETIME));
        assert!(Otp::is_expired_at(None, Duration::MAX, SystemTime::now()));
    }

    #[test]
    fn test_future_timestamp_is_not_expired() {
        let now = SystemTime::now();
        assert!(!Otp::is_expired_at(
            Some(now + Duration::from_secs(30)),
            OTP_LIFETIME,
            now
        ));
    }
}
