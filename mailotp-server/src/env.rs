use lettre::message::Mailbox;
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

const EMAIL_ENABLED_VAR: &str = "MAILOTP_EMAIL_ENABLED";
const EMAIL_FROM_ADDR: &str = "MAILOTP_EMAIL_FROM_ADDR";
const EMAIL_REPLY_TO_ADDR: &str = "MAILOTP_EMAIL_REPLY_TO_ADDR";
const SMTP_ADDRESS_VAR: &str = "MAILOTP_SMTP_ADDRESS";
const SMTP_USERNAME_VAR: &str = "MAILOTP_SMTP_USERNAME";
const SMTP_PASSWORD_VAR: &str = "MAILOTP_SMTP_PASSWORD";
const MAX_SMTP_CONNECTIONS_VAR: &str = "MAILOTP_MAX_SMTP_CONNECTIONS";
const SMTP_IDLE_TIMEOUT_SECS_VAR: &str = "MAILOTP_SMTP_IDLE_TIMEOUT_SECS";

const OTP_LIFETIME_MINS_VAR: &str = "MAILOTP_OTP_LIFETIME_MINS";

const HEALTH_ENDPOINT_KEY_VAR: &str = "MAILOTP_HEALTH_ENDPOINT_KEY";
const ACTIX_WORKER_COUNT_VAR: &str = "MAILOTP_ACTIX_WORKER_COUNT";
const PORT_VAR: &str = "MAILOTP_PORT";

const LOG_LEVEL_VAR: &str = "MAILOTP_LOG_LEVEL";

#[derive(Zeroize)]
pub struct ConfigInner {
    pub db_uri: Option<String>,
    #[zeroize(skip)]
    pub db_max_connections: u32,
    #[zeroize(skip)]
    pub db_idle_timeout: Duration,

    pub email_enabled: bool,
    #[zeroize(skip)]
    pub email_from_address: Mailbox,
    #[zeroize(skip)]
    pub email_reply_to_address: Mailbox,
    pub smtp_address: String,
    pub smtp_username: String,
    pub smtp_password: String,
    #[zeroize(skip)]
    pub max_smtp_connections: u32,
    #[zeroize(skip)]
    pub smtp_idle_timeout: Duration,

    #[zeroize(skip)]
    pub otp_lifetime: Duration,

    pub health_endpoint_key: String,
    #[zeroize(skip)]
    pub actix_worker_count: usize,
    #[zeroize(skip)]
    pub port: u16,

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
        let email_enabled = env_var_or(EMAIL_ENABLED_VAR, false);

        let email_from_address: Mailbox = env_var::<String>(EMAIL_FROM_ADDR)?
            .parse()
            .map_err(|_| ConfigError::InvalidVar(EMAIL_FROM_ADDR))?;
        let email_reply_to_address: Mailbox = env_var::<String>(EMAIL_REPLY_TO_ADDR)?
            .parse()
            .map_err(|_| ConfigError::InvalidVar(EMAIL_REPLY_TO_ADDR))?;

        // SMTP settings are only required when emails are actually sent
        let (smtp_address, smtp_username, smtp_password) = if email_enabled {
            (
                env_var(SMTP_ADDRESS_VAR)?,
                env_var(SMTP_USERNAME_VAR)?,
                env_var(SMTP_PASSWORD_VAR)?,
            )
        } else {
            (String::new(), String::new(), String::new())
        };

        let otp_lifetime_mins: u64 = env_var_or(OTP_LIFETIME_MINS_VAR, 5);
        if otp_lifetime_mins == 0 {
            return Err(ConfigError::InvalidVar(OTP_LIFETIME_MINS_VAR));
        }

        let inner = ConfigInner {
            db_uri: std::env::var(DB_URI_VAR).ok(),
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 48),
            db_idle_timeout: Duration::from_secs(env_var_or(DB_IDLE_TIMEOUT_SECS_VAR, 30)),

            email_enabled,
            email_from_address,
            email_reply_to_address,
            smtp_address,
            smtp_username,
            smtp_password,
            max_smtp_connections: env_var_or(MAX_SMTP_CONNECTIONS_VAR, 24),
            smtp_idle_timeout: Duration::from_secs(env_var_or(SMTP_IDLE_TIMEOUT_SECS_VAR, 60)),

            otp_lifetime: Duration::from_secs(otp_lifetime_mins * 60),

            health_endpoint_key: env_var(HEALTH_ENDPOINT_KEY_VAR)?,
            actix_worker_count: env_var_or(ACTIX_WORKER_COUNT_VAR, num_cpus::get()),
            port: env_var_or(PORT_VAR, 9000),

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
