//! Typed transfer options understood by a [`TransferSession`](crate::TransferSession).

use core::fmt;
use core::str::FromStr;
use core::time::Duration;

use crate::error::RestQueryError;

/// One configuration entry on a transfer session.
///
/// Options are applied in order; later values replace earlier ones, except
/// where noted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOption {
    /// Destination URL.
    Url(String),
    /// Reset the request to a plain GET: clears the POST flag and any custom verb.
    HttpGet,
    /// Send a POST. `false` clears the flag.
    Post(bool),
    /// Verb to send instead of GET/POST. `None` clears it.
    CustomRequest(Option<String>),
    /// Request body. Sent for POST and custom verbs. `None` clears it.
    PostFields(Option<Vec<u8>>),
    /// Extra request headers as `Name: value` lines. Replaces the previous list.
    HttpHeader(Vec<String>),
    UserAgent(String),
    HttpAuth(AuthScheme),
    /// Credentials as `user:password`.
    UserPwd(String),
    ProxyType(ProxyType),
    /// Proxy host, optionally with `:port` and an `http://` prefix.
    Proxy(String),
    ProxyPort(u16),
    /// Proxy credentials as `user:password`.
    ProxyUserPwd(String),
    FollowLocation(bool),
    MaxRedirs(u32),
    /// Limit for the whole transfer including redirects. Zero disables it.
    Timeout(Duration),
    /// Limit for establishing each connection. Zero disables it.
    ConnectTimeout(Duration),
    /// Treat a response status of 400 or above as a transfer failure.
    FailOnError(bool),
}

impl TransferOption {
    pub fn name(&self) -> &'static str {
        match self {
            TransferOption::Url(_) => "URL",
            TransferOption::HttpGet => "HTTPGET",
            TransferOption::Post(_) => "POST",
            TransferOption::CustomRequest(_) => "CUSTOMREQUEST",
            TransferOption::PostFields(_) => "POSTFIELDS",
            TransferOption::HttpHeader(_) => "HTTPHEADER",
            TransferOption::UserAgent(_) => "USERAGENT",
            TransferOption::HttpAuth(_) => "HTTPAUTH",
            TransferOption::UserPwd(_) => "USERPWD",
            TransferOption::ProxyType(_) => "PROXYTYPE",
            TransferOption::Proxy(_) => "PROXY",
            TransferOption::ProxyPort(_) => "PROXYPORT",
            TransferOption::ProxyUserPwd(_) => "PROXYUSERPWD",
            TransferOption::FollowLocation(_) => "FOLLOWLOCATION",
            TransferOption::MaxRedirs(_) => "MAXREDIRS",
            TransferOption::Timeout(_) => "TIMEOUT",
            TransferOption::ConnectTimeout(_) => "CONNECTTIMEOUT",
            TransferOption::FailOnError(_) => "FAILONERROR",
        }
    }
}

/// HTTP authentication schemes a caller can ask for.
///
/// Only [`AuthScheme::Basic`] and [`AuthScheme::Any`] (which resolves to basic)
/// are implemented by the transport; the rest are rejected when set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    #[default]
    Basic,
    Digest,
    Ntlm,
    Negotiate,
    Any,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Basic => "basic",
            AuthScheme::Digest => "digest",
            AuthScheme::Ntlm => "ntlm",
            AuthScheme::Negotiate => "negotiate",
            AuthScheme::Any => "any",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthScheme {
    type Err = RestQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(AuthScheme::Basic),
            "digest" => Ok(AuthScheme::Digest),
            "ntlm" => Ok(AuthScheme::Ntlm),
            "negotiate" | "gssnegotiate" => Ok(AuthScheme::Negotiate),
            "any" | "anysafe" => Ok(AuthScheme::Any),
            _ => Err(RestQueryError::configuration(format!("Unknown auth scheme '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProxyType {
    #[default]
    Http,
    Socks5,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_scheme_from_str() {
        assert_eq!("Basic".parse::<AuthScheme>().unwrap(), AuthScheme::Basic);
        assert_eq!("anysafe".parse::<AuthScheme>().unwrap(), AuthScheme::Any);
        assert_eq!("NTLM".parse::<AuthScheme>().unwrap(), AuthScheme::Ntlm);
        assert!(matches!(
            "kerberos5".parse::<AuthScheme>(),
            Err(RestQueryError::Configuration(_))
        ));
    }

    #[test]
    fn option_names() {
        assert_eq!(TransferOption::Url("http://a".into()).name(), "URL");
        assert_eq!(TransferOption::Timeout(Duration::from_secs(1)).name(), "TIMEOUT");
    }
}
