use core::num::ParseIntError;

use http::header::{InvalidHeaderName, InvalidHeaderValue, ToStrError};
use http::status::InvalidStatusCode;
use http::uri::InvalidUri;
use thiserror::Error;

/// Every failure the builder, the transfer session, or the transport reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestQueryError {
    /// The environment or the transfer session could not be set up, or an
    /// option was rejected by the session.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A caller-supplied value failed a local check.
    #[error("validation error: {0}")]
    Validation(String),

    /// An operation was invoked out of order.
    #[error("state error: {0}")]
    State(String),

    /// The network transfer failed. Carries the transport's message verbatim.
    #[error("transfer error: {0}")]
    Transfer(String),
}

pub type RestQueryResult<T> = Result<T, RestQueryError>;

impl RestQueryError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    pub fn transfer(message: impl Into<String>) -> Self {
        Self::Transfer(message.into())
    }

    /// Message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Configuration(m) | Self::Validation(m) | Self::State(m) | Self::Transfer(m) => m,
        }
    }
}

impl From<core::convert::Infallible> for RestQueryError {
    fn from(e: core::convert::Infallible) -> Self {
        match e {}
    }
}

// Wire-level failures all surface as transfer errors so the transport can use `?`.
macro_rules! transfer_error_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for RestQueryError {
                fn from(e: $ty) -> Self {
                    RestQueryError::Transfer(e.to_string())
                }
            }
        )*
    };
}

transfer_error_from!(
    std::io::Error,
    http::Error,
    InvalidHeaderName,
    InvalidHeaderValue,
    ToStrError,
    InvalidUri,
    InvalidStatusCode,
    ParseIntError,
);
