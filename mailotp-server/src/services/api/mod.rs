use actix_web::web::*;

use crate::handlers::error::HttpErrorResponse;

mod health;
mod otp;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/api")
            .configure(health::configure)
            .configure(otp::configure),
    );
}

/// Only the OTP routes, for tests that don't need the health check state.
#[cfg(test)]
pub fn configure_otp(cfg: &mut ServiceConfig) {
    cfg.service(scope("/api").configure(otp::configure));
}

/// Rejects malformed bodies with the same JSON error shape as every other failure.
pub fn json_config() -> JsonConfig {
    JsonConfig::default()
        .limit(4096)
        .error_handler(|err, _req| HttpErrorResponse::from(err).into())
}
