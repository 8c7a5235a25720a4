//! Fluent, blocking HTTP requests.
//!
//! A [`RequestBuilder`] collects a URL, a [`Method`], credentials, proxy
//! settings and a body into a [`TransferSession`], then runs one synchronous
//! transfer through a [`Transport`]. With the default `std` feature the
//! transport is [`StdTransport`], built on `async-io` and `async-tls`.

mod builder;
mod error;
mod method;
mod option;
mod platform;
mod request;
mod session;

#[cfg(feature = "std")]
mod async_connection_factory;
#[cfg(feature = "std")]
mod response;

pub use builder::RequestBuilder;
pub use error::{RestQueryError, RestQueryResult};
pub use method::Method;
pub use option::{AuthScheme, ProxyType, TransferOption};
pub use platform::{ConnectionSettings, ProxySettings, Transport};
pub use session::{TransferInfo, TransferSession, DEFAULT_MAX_REDIRECTS, DEFAULT_PROXY_PORT, DEFAULT_USER_AGENT};

#[cfg(feature = "std")]
pub use platform::std_impl::StdTransport;
