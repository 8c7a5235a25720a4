use core::time::Duration;

use http::{Request, Response};

use crate::error::RestQueryResult;

#[cfg(feature = "std")]
pub mod std_impl;

#[cfg(feature = "std")]
use futures_lite::{AsyncRead, AsyncWrite};

#[cfg(feature = "std")]
pub trait AsyncConnection: AsyncRead + AsyncWrite + Send + Sync + Unpin {
    fn is_encrypted(&self) -> bool;
}

/// Where and how a single exchange connects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub proxy: Option<ProxySettings>,
    /// Remaining budget for this exchange.
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    /// `user:password`
    pub credentials: Option<String>,
}

/// The network capability a transfer session delegates to.
///
/// An implementation performs exactly one request/response exchange per
/// call; redirects, auth headers and option handling live in the session.
pub trait Transport: Send {
    /// Checks that the capability is usable in this environment. Called once
    /// when a session is opened; an error is reported as a configuration error.
    fn check_available(&self) -> Result<(), String>;

    fn send_request(
        &mut self,
        request: &Request<Vec<u8>>,
        settings: &ConnectionSettings,
    ) -> RestQueryResult<Response<Vec<u8>>>;
}
