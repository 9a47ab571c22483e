use axum::http::StatusCode;

use crate::PdfError;

/// Every failure the gateway reports to a caller or to the operator at startup.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum GatewayError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    LocationNotFound(String),
    #[error("{0}")]
    UpstreamFailure(String),
    #[error("Missing required configuration value: {0}")]
    ConfigurationMissing(&'static str),
}

impl GatewayError {
    /// Only input rejected before any upstream call is a client error; everything
    /// else is reported as a server failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::LocationNotFound(_)
            | GatewayError::UpstreamFailure(_)
            | GatewayError::ConfigurationMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PdfError> for GatewayError {
    fn from(err: PdfError) -> Self {
        match err {
            PdfError::MissingContent => GatewayError::InvalidInput(err.to_string()),
            other => GatewayError::UpstreamFailure(other.to_string()),
        }
    }
}
