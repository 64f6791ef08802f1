pub mod health;
pub mod otp;

pub mod error {
    use mailotp_common::request_io::ServerErrorResponse;
    use mailotp_common::service::OtpError;

    use actix_web::http::StatusCode;
    use actix_web::{HttpResponse, HttpResponseBuilder};
    use std::fmt;

    #[derive(Debug)]
    pub enum HttpErrorResponse {
        // 400
        InvalidArgument(String),

        // 403
        PermissionDenied(String),

        // 404
        NotFound(String),

        // 410
        DeadlineExceeded(String),

        // 500
        InternalError(String),
    }

    impl HttpErrorResponse {
        pub fn code(&self) -> &'static str {
            match self {
                HttpErrorResponse::InvalidArgument(_) => "invalid-argument",
                HttpErrorResponse::PermissionDenied(_) => "permission-denied",
                HttpErrorResponse::NotFound(_) => "not-found",
                HttpErrorResponse::DeadlineExceeded(_) => "deadline-exceeded",
                HttpErrorResponse::InternalError(_) => "internal",
            }
        }

        fn message(&self) -> &str {
            match self {
                HttpErrorResponse::InvalidArgument(msg)
                | HttpErrorResponse::PermissionDenied(msg)
                | HttpErrorResponse::NotFound(msg)
                | HttpErrorResponse::DeadlineExceeded(msg)
                | HttpErrorResponse::InternalError(msg) => msg,
            }
        }
    }

    impl std::error::Error for HttpErrorResponse {}

    impl fmt::Display for HttpErrorResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let server_error: ServerErrorResponse = self.into();
            write!(f, "{:?}", server_error)
        }
    }

    impl From<&HttpErrorResponse> for ServerErrorResponse {
        fn from(resp: &HttpErrorResponse) -> Self {
            ServerErrorResponse {
                code: String::from(resp.code()),
                message: String::from(resp.message()),
            }
        }
    }

    impl actix_web::error::ResponseError for HttpErrorResponse {
        fn error_response(&self) -> HttpResponse {
            HttpResponseBuilder::new(self.status_code()).json(ServerErrorResponse::from(self))
        }

        fn status_code(&self) -> StatusCode {
            match *self {
                HttpErrorResponse::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                HttpErrorResponse::PermissionDenied(_) => StatusCode::FORBIDDEN,
                HttpErrorResponse::NotFound(_) => StatusCode::NOT_FOUND,
                HttpErrorResponse::DeadlineExceeded(_) => StatusCode::GONE,
                HttpErrorResponse::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl From<OtpError> for HttpErrorResponse {
        fn from(err: OtpError) -> Self {
            let msg = String::from(err.message());

            match err {
                OtpError::InvalidArgument(_) => HttpErrorResponse::InvalidArgument(msg),
                OtpError::NotFound => HttpErrorResponse::NotFound(msg),
                OtpError::DeadlineExceeded => HttpErrorResponse::DeadlineExceeded(msg),
                OtpError::PermissionDenied => HttpErrorResponse::PermissionDenied(msg),
                OtpError::Internal(_) => HttpErrorResponse::InternalError(msg),
            }
        }
    }

    impl From<actix_web::error::JsonPayloadError> for HttpErrorResponse {
        fn from(err: actix_web::error::JsonPayloadError) -> Self {
            HttpErrorResponse::InvalidArgument(format!("Invalid request body: {err}"))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use actix_web::body::MessageBody;
        use actix_web::ResponseError;

        #[test]
        fn test_status_codes() {
            let cases = [
                (OtpError::InvalidArgument("Email is required"), 400),
                (OtpError::PermissionDenied, 403),
                (OtpError::NotFound, 404),
                (OtpError::DeadlineExceeded, 410),
                (OtpError::Internal("Failed to send OTP"), 500),
            ];

            for (err, status) in cases {
                let code = err.code();
                let resp = HttpErrorResponse::from(err);

                assert_eq!(resp.status_code().as_u16(), status);
                assert_eq!(resp.code(), code);
            }
        }

        #[test]
        fn test_error_body() {
            let resp = HttpErrorResponse::from(OtpError::DeadlineExceeded).error_response();
            assert_eq!(resp.status(), StatusCode::GONE);

            let body = resp.into_body().try_into_bytes().unwrap();
            let body: ServerErrorResponse = serde_json::from_slice(&body).unwrap();

            assert_eq!(body.code, "deadline-exceeded");
            assert_eq!(body.message, "OTP expired, please request again");
        }
    }
}
