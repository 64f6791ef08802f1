use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroize;

pub static CONF: Lazy<Config> = Lazy::new(|| Config::from_env().expect("Failed to load config"));

const DB_URI_VAR: &str = "MAILOTP_DB_URI";
const DB_MAX_CONNECTIONS_VAR: &str = "MAILOTP_DB_MAX_CONNECTIONS";
const DB_IDLE_TIMEOUT_SECS_VAR: &str = "MAILOTP_DB_IDLE_TIMEOUT_SECS";

const OTP_LIFETIME_MINS_VAR: &str = "MAILOTP_OTP_LIFETIME_MINS";

const UPDATE_FREQUENCY_SECS_VAR: &str = "MAILOTP_UPDATE_FREQUENCY_SECS";
const WORKER_THREADS_VAR: &str = "MAILOTP_WORKER_THREADS";
const MAX_BLOCKING_THREADS_VAR: &str = "MAILOTP_MAX_BLOCKING_THREADS";

const CLEAR_EXPIRED_OTPS_JOB_FREQUENCY_SECS_VAR: &str =
    "MAILOTP_CLEAR_EXPIRED_OTPS_JOB_FREQUENCY_SECS";

const LOG_LEVEL_VAR: &str = "MAILOTP_LOG_LEVEL";

#[derive(Zeroize)]
pub struct ConfigInner {
    pub db_uri: String,
    #[zeroize(skip)]
    pub db_max_connections: u32,
    #[zeroize(skip)]
    pub db_idle_timeout: Duration,

    #[zeroize(skip)]
    pub otp_lifetime: Duration,

    #[zeroize(skip)]
    pub update_frequency: Duration,
    #[zeroize(skip)]
    pub worker_threads: usize,
    #[zeroize(skip)]
    pub max_blocking_threads: usize,

    #[zeroize(skip)]
    pub clear_expired_otps_job_frequency: Duration,

    #[zeroize(skip)]
    pub log_level: String,
}

pub struct Config {
    inner: UnsafeCell<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        // Safe as long as `unsafe Config::zeroize()` hasn't been called
        unsafe { &*self.inner.get() }
    }
}

// Safe to be shared across threads as long as `unsafe Config::zeroize()` hasn't been called
unsafe impl Sync for Config {}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let otp_lifetime_mins: u64 = env_var_or(OTP_LIFETIME_MINS_VAR, 5);
        if otp_lifetime_mins == 0 {
            return Err(ConfigError::InvalidVar(OTP_LIFETIME_MINS_VAR));
        }

        let inner = ConfigInner {
            db_uri: env_var(DB_URI_VAR)?,
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 8),
            db_idle_timeout: Duration::from_secs(env_var_or(DB_IDLE_TIMEOUT_SECS_VAR, 30)),

            otp_lifetime: Duration::from_secs(otp_lifetime_mins * 60),

            update_frequency: Duration::from_secs(env_var_or(UPDATE_FREQUENCY_SECS_VAR, 5)),
            worker_threads: env_var_or(WORKER_THREADS_VAR, num_cpus::get()),
            max_blocking_threads: env_var_or(MAX_BLOCKING_THREADS_VAR, 16),

            clear_expired_otps_job_frequency: Duration::from_secs(env_var_or(
                CLEAR_EXPIRED_OTPS_JOB_FREQUENCY_SECS_VAR,
                60,
            )),

            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
        };

        Ok(Config {
            inner: UnsafeCell::new(inner),
        })
    }

    /// # Safety
    ///
    /// Safe only if the Config isn't being used by other threads or across an async
    /// boundary. Generally, this should only be used at the end of the main function once
    /// all threads have been joined.
    pub unsafe fn zeroize(&self) {
        unsafe {
            (*self.inner.get()).zeroize();
        }
    }
}

fn env_var<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let var = std::env::var(key).map_err(|_| ConfigError::missing(key))?;
    let var: T = var.parse().map_err(|_| ConfigError::invalid(key))?;
    Ok(var)
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

#[derive(Clone, Copy, Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl ConfigError {
    fn missing(var_name: &'static str) -> Self {
        Self::MissingVar(var_name)
    }

    fn invalid(var_name: &'static str) -> Self {
        Self::InvalidVar(var_name)
    }
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(key) => write!(f, "Missing environment variable '{}'", key),
            Self::InvalidVar(key) => write!(f, "Environment variable '{}' is invalid", key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Every case lives in one test because they share process-wide environment variables
    #[test]
    fn test_from_env_otp_lifetime() {
        std::env::set_var(DB_URI_VAR, "postgres://localhost/mailotp");

        std::env::remove_var(OTP_LIFETIME_MINS_VAR);
        let conf = Config::from_env().unwrap();
        assert_eq!(conf.otp_lifetime, Duration::from_secs(5 * 60));

        std::env::set_var(OTP_LIFETIME_MINS_VAR, "10");
        let conf = Config::from_env().unwrap();
        assert_eq!(conf.otp_lifetime, Duration::from_secs(10 * 60));

        std::env::set_var(OTP_LIFETIME_MINS_VAR, "0");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidVar(OTP_LIFETIME_MINS_VAR))
        ));

        std::env::remove_var(DB_URI_VAR);
        std::env::remove_var(OTP_LIFETIME_MINS_VAR);
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingVar(DB_URI_VAR))
        ));
    }
}
