use actix_web::web::*;

use crate::handlers::otp;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/otp")
            .route("/issue", post().to(otp::issue))
            .route("/verify", post().to(otp::verify)),
    );
}
