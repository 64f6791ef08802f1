use serde::{Deserialize, Serialize};

// Missing fields deserialize to empty strings so that they are rejected by the service
// with `invalid-argument` rather than by the JSON extractor.

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InputEmail {
    #[serde(default)]
    pub email: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct InputEmailAndOtp {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerErrorResponse {
    pub code: String,
    pub message: String,
}
