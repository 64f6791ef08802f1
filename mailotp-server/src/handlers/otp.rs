use mailotp_common::request_io::{InputEmail, InputEmailAndOtp};
use mailotp_common::service::OtpService;

use actix_web::{web, HttpResponse};

use crate::handlers::error::HttpErrorResponse;

pub async fn issue(
    otp_service: web::Data<OtpService>,
    body: web::Json<InputEmail>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let ack = otp_service.issue(&body.email).await?;
    Ok(HttpResponse::Ok().json(ack))
}

pub async fn verify(
    otp_service: web::Data<OtpService>,
    body: web::Json<InputEmailAndOtp>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let ack = otp_service.verify(&body.email, &body.otp).await?;
    Ok(HttpResponse::Ok().json(ack))
}
