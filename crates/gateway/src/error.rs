use {
    axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
    },
    tracing::{error, warn},
};

use pairgate_session::SessionError;

/// Request-level failures. Bodies stay empty; the status code is the whole
/// contract.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid request body: {0}")]
    BadRequest(String),

    #[error("missing request signature")]
    MissingSignature,

    #[error("request signature mismatch")]
    SignatureMismatch,

    #[error("malformed message payload: {0}")]
    Payload(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("qr encoding: {0}")]
    Qr(String),

    #[error("qr image: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid signing key")]
    SigningKey,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::MissingSignature => StatusCode::BAD_REQUEST,
            Self::SignatureMismatch => StatusCode::FORBIDDEN,
            Self::Payload(_)
            | Self::Session(_)
            | Self::Qr(_)
            | Self::Image(_)
            | Self::SigningKey => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            warn!(error = %self, %status, "request rejected");
        }
        status.into_response()
    }
}
