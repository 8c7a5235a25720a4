use std::borrow::Cow;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::{RestQueryError, RestQueryResult};
use crate::method::Method;
use crate::option::{AuthScheme, ProxyType, TransferOption};
use crate::platform::Transport;
use crate::session::{TransferInfo, TransferSession};

/// Fluent configuration for one HTTP request, executed synchronously.
///
/// ```no_run
/// use rest_query::{Method, RequestBuilder};
///
/// # fn main() -> Result<(), rest_query::RestQueryError> {
/// let mut query = RequestBuilder::new(None)?;
/// let body = query
///     .set_method(Method::Get)?
///     .set_url("https://example.com")?
///     .execute()?;
/// println!("{}", String::from_utf8_lossy(body));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RequestBuilder {
    session: Option<TransferSession>,
    url: Option<String>,
    method: Option<Method>,
    data: Option<Vec<u8>>,
    headers: Vec<String>,
    last_result: Option<Vec<u8>>,
    last_info: Option<TransferInfo>,
}

impl RequestBuilder {
    /// Creates a builder on the native transport.
    ///
    /// Fails with [`RestQueryError::Configuration`] when the transfer capability
    /// is unavailable, and with [`RestQueryError::Validation`] when `url` is
    /// given but malformed.
    #[cfg(feature = "std")]
    pub fn new(url: Option<&str>) -> RestQueryResult<Self> {
        Self::with_transport(url, crate::platform::std_impl::StdTransport::new())
    }

    #[cfg(not(feature = "std"))]
    pub fn new(_url: Option<&str>) -> RestQueryResult<Self> {
        Err(RestQueryError::configuration(
            "Transfer capability not available: built without the `std` feature",
        ))
    }

    /// Creates a builder that delegates transfers to `transport`.
    pub fn with_transport(url: Option<&str>, transport: impl Transport + 'static) -> RestQueryResult<Self> {
        let session = TransferSession::open(Box::new(transport))?;
        let mut builder = Self {
            session: Some(session),
            url: None,
            method: None,
            data: None,
            headers: Vec::new(),
            last_result: None,
            last_info: None,
        };
        if let Some(url) = url.filter(|url| !url.is_empty()) {
            builder.set_url(url)?;
        }
        Ok(builder)
    }

    // Absolute URL with a scheme and a non-empty host, normalized
    fn parse_url(url: &str) -> Option<Url> {
        if url.is_empty() || url.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return None;
        }
        Url::parse(url)
            .ok()
            .filter(|parsed| parsed.host_str().is_some_and(|host| !host.is_empty()))
    }

    /// True for an absolute URL with a scheme and a non-empty host.
    pub fn is_valid_url(url: &str) -> bool {
        Self::parse_url(url).is_some()
    }

    fn session(&mut self) -> RestQueryResult<&mut TransferSession> {
        self.session
            .as_mut()
            .ok_or_else(|| RestQueryError::state("No valid transfer handle"))
    }

    pub fn set_url(&mut self, url: &str) -> RestQueryResult<&mut Self> {
        let parsed = Self::parse_url(url).ok_or_else(|| RestQueryError::validation(format!("Invalid URL '{url}'")))?;
        self.apply_options([TransferOption::Url(parsed.into())])?;
        self.url = Some(url.to_string());
        Ok(self)
    }

    /// Accepts a [`Method`] or its name; any other verb is a validation error.
    pub fn set_method<M>(&mut self, method: M) -> RestQueryResult<&mut Self>
    where
        M: TryInto<Method>,
        M::Error: Into<RestQueryError>,
    {
        let method = method.try_into().map_err(Into::into)?;
        // A body only ever rides along with POST
        let options = match method {
            Method::Get => vec![TransferOption::HttpGet, TransferOption::PostFields(None)],
            Method::Post => vec![TransferOption::CustomRequest(None), TransferOption::Post(true)],
            Method::Put | Method::Delete => vec![
                TransferOption::Post(false),
                TransferOption::CustomRequest(Some(method.as_str().to_string())),
                TransferOption::PostFields(None),
            ],
        };
        self.apply_options(options)?;
        if method != Method::Post {
            self.data = None;
        }
        self.method = Some(method);
        Ok(self)
    }

    /// Attaches a request body. Only allowed once the method is POST.
    pub fn set_data(&mut self, payload: impl Into<Vec<u8>>) -> RestQueryResult<&mut Self> {
        if self.method != Some(Method::Post) {
            return Err(RestQueryError::state("Method is not POST"));
        }
        let payload = payload.into();
        self.apply_options([TransferOption::PostFields(Some(payload.clone()))])?;
        self.data = Some(payload);
        Ok(self)
    }

    /// Basic authentication.
    pub fn set_auth(&mut self, user: &str, pass: &str) -> RestQueryResult<&mut Self> {
        self.set_auth_with_scheme(user, pass, AuthScheme::Basic)
    }

    pub fn set_auth_with_scheme(&mut self, user: &str, pass: &str, scheme: AuthScheme) -> RestQueryResult<&mut Self> {
        self.set_transfer_options([
            TransferOption::HttpAuth(scheme),
            TransferOption::UserPwd(format!("{user}:{pass}")),
        ])
    }

    /// Routes requests through an HTTP proxy.
    ///
    /// `port` is anything that displays as a number (`8080` or `"8080"`); the
    /// check happens before the session is touched. Credentials are only used
    /// when both are present and non-empty.
    pub fn set_proxy(
        &mut self,
        host: &str,
        port: impl ToString,
        user: Option<&str>,
        pass: Option<&str>,
    ) -> RestQueryResult<&mut Self> {
        let port = port.to_string();
        let port = port
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| RestQueryError::validation(format!("Port must be numeric, got '{port}'")))?;

        let mut options = vec![
            TransferOption::ProxyType(ProxyType::Http),
            TransferOption::Proxy(host.to_string()),
            TransferOption::ProxyPort(port),
        ];
        match (user, pass) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                options.push(TransferOption::ProxyUserPwd(format!("{user}:{pass}")));
            }
            _ => {}
        }
        self.set_transfer_options(options)
    }

    /// Adds a request header. Headers accumulate across calls.
    pub fn set_header(&mut self, name: &str, value: &str) -> RestQueryResult<&mut Self> {
        let mut headers = self.headers.clone();
        headers.push(format!("{name}: {value}"));
        self.apply_options([TransferOption::HttpHeader(headers.clone())])?;
        self.headers = headers;
        Ok(self)
    }

    pub fn follow_redirects(&mut self, follow: bool) -> RestQueryResult<&mut Self> {
        self.set_transfer_option(TransferOption::FollowLocation(follow))
    }

    pub fn max_redirects(&mut self, max: u32) -> RestQueryResult<&mut Self> {
        self.set_transfer_option(TransferOption::MaxRedirs(max))
    }

    /// Limit for the whole transfer, redirects included.
    pub fn set_timeout(&mut self, timeout: Duration) -> RestQueryResult<&mut Self> {
        self.set_transfer_option(TransferOption::Timeout(timeout))
    }

    /// Low-level passthrough to the transfer session.
    ///
    /// URL, method and body options go through [`set_url`](Self::set_url),
    /// [`set_method`](Self::set_method) and [`set_data`](Self::set_data) so
    /// that [`url`](Self::url), [`method`](Self::method) and
    /// [`data`](Self::data) always describe what will be sent. A custom verb
    /// outside [`Method`] is therefore a validation error, and a body needs
    /// POST. A header list replaces the one built by
    /// [`set_header`](Self::set_header).
    pub fn set_transfer_option(&mut self, option: TransferOption) -> RestQueryResult<&mut Self> {
        match option {
            TransferOption::Url(url) => self.set_url(&url),
            TransferOption::HttpGet => self.set_method(Method::Get),
            TransferOption::Post(true) => self.set_method(Method::Post),
            TransferOption::CustomRequest(Some(verb)) => self.set_method(verb.as_str()),
            TransferOption::PostFields(Some(payload)) => self.set_data(payload),
            TransferOption::HttpHeader(headers) => {
                self.apply_options([TransferOption::HttpHeader(headers.clone())])?;
                self.headers = headers;
                Ok(self)
            }
            TransferOption::PostFields(None) => {
                self.apply_options([TransferOption::PostFields(None)])?;
                self.data = None;
                Ok(self)
            }
            option @ (TransferOption::Post(false) | TransferOption::CustomRequest(None)) => {
                let session = self.session()?;
                session.set_option(option)?;
                let method = Method::from_str(session.effective_method().as_str()).ok();
                if method != Some(Method::Post) {
                    self.apply_options([TransferOption::PostFields(None)])?;
                    self.data = None;
                }
                self.method = method;
                Ok(self)
            }
            option => self.apply_options([option]),
        }
    }

    pub fn set_transfer_options<I>(&mut self, options: I) -> RestQueryResult<&mut Self>
    where
        I: IntoIterator<Item = TransferOption>,
    {
        self.session()?;
        for option in options {
            self.set_transfer_option(option)?;
        }
        Ok(self)
    }

    // Straight to the session, bypassing the bookkeeping above
    fn apply_options<I>(&mut self, options: I) -> RestQueryResult<&mut Self>
    where
        I: IntoIterator<Item = TransferOption>,
    {
        let session = self.session()?;
        for option in options {
            session.set_option(option)?;
        }
        Ok(self)
    }

    /// Runs the transfer and returns the response body.
    ///
    /// The builder keeps its configuration after a failure; a failed run only
    /// clears the previous result.
    pub fn execute(&mut self) -> RestQueryResult<&[u8]> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| RestQueryError::state("No valid transfer handle"))?;
        let url = self.url.as_deref().ok_or_else(|| RestQueryError::state("No URL set"))?;
        let method = self
            .method
            .ok_or_else(|| RestQueryError::state("HTTP method isn't set"))?;

        self.last_result = None;
        self.last_info = None;

        log::debug!("executing {method} {url}");
        let (body, info) = session.perform()?;
        log::debug!("{url} -> {} ({} bytes)", info.status, body.len());

        self.last_info = Some(info);
        Ok(self.last_result.insert(body).as_slice())
    }

    pub fn result(&self) -> Option<&[u8]> {
        self.last_result.as_deref()
    }

    /// The last result as text, with invalid UTF-8 replaced.
    pub fn result_text(&self) -> Option<Cow<'_, str>> {
        self.last_result.as_deref().map(String::from_utf8_lossy)
    }

    pub fn info(&self) -> Option<&TransferInfo> {
        self.last_info.as_ref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn method(&self) -> Option<Method> {
        self.method
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Releases the transfer session. The builder cannot transfer afterwards.
    pub fn close(&mut self) {
        if self.session.take().is_some() {
            log::debug!("transfer session released");
        }
    }
}
