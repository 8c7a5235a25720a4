//! The transfer handle: an option set plus the transport that executes it.

use core::str::FromStr;
use core::time::Duration;
use std::time::Instant;

use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Request, StatusCode, Uri};
use url::Url;

use crate::error::{RestQueryError, RestQueryResult};
use crate::option::{AuthScheme, ProxyType, TransferOption};
use crate::platform::{ConnectionSettings, ProxySettings, Transport};
use crate::request::basic_authorization;

pub const DEFAULT_MAX_REDIRECTS: u32 = 30;
pub const DEFAULT_PROXY_PORT: u16 = 1080;
pub const DEFAULT_USER_AGENT: &str = concat!("rest_query/", env!("CARGO_PKG_VERSION"));

/// What the last successful transfer looked like on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInfo {
    pub status: StatusCode,
    /// URL of the final hop after redirects.
    pub effective_url: String,
    pub redirect_count: u32,
    pub headers: HeaderMap,
}

#[derive(Debug, Clone)]
struct SessionOptions {
    url: Option<Uri>,
    post: bool,
    custom_request: Option<http::Method>,
    post_fields: Option<Vec<u8>>,
    headers: HeaderMap,
    user_agent: HeaderValue,
    credentials: Option<String>,
    proxy_host: Option<String>,
    proxy_port: Option<u16>,
    proxy_credentials: Option<String>,
    follow_location: bool,
    max_redirects: u32,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    fail_on_error: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            url: None,
            post: false,
            custom_request: None,
            post_fields: None,
            headers: HeaderMap::new(),
            user_agent: HeaderValue::from_static(DEFAULT_USER_AGENT),
            credentials: None,
            proxy_host: None,
            proxy_port: None,
            proxy_credentials: None,
            follow_location: false,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            timeout: None,
            connect_timeout: None,
            fail_on_error: false,
        }
    }
}

fn non_zero(duration: Duration) -> Option<Duration> {
    (!duration.is_zero()).then_some(duration)
}

fn parse_header_line(line: &str) -> Result<(HeaderName, HeaderValue), String> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| format!("header line '{line}' has no ':' separator"))?;
    let name = HeaderName::from_str(name.trim()).map_err(|e| format!("invalid header name in '{line}': {e}"))?;
    let value = HeaderValue::from_str(value.trim()).map_err(|e| format!("invalid header value in '{line}': {e}"))?;
    Ok((name, value))
}

// `host`, `host:port` or `http://host:port/`
fn parse_proxy(proxy: &str) -> Result<(String, Option<u16>), String> {
    let trimmed = proxy.trim();
    let without_scheme = match trimmed.split_once("://") {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("http") => rest,
        Some((scheme, _)) => return Err(format!("proxy scheme '{scheme}' not supported")),
        None => trimmed,
    };
    let authority = without_scheme.trim_end_matches('/');
    let authority = http::uri::Authority::from_str(authority).map_err(|e| format!("invalid proxy '{proxy}': {e}"))?;
    if authority.host().is_empty() {
        return Err(format!("invalid proxy '{proxy}': empty host"));
    }
    Ok((authority.host().to_string(), authority.port_u16()))
}

// Resolves a Location header against the URL that produced it
fn resolve_location(base: &Uri, location: &str) -> RestQueryResult<Uri> {
    let invalid = |e: &dyn core::fmt::Display| {
        RestQueryError::transfer(format!("Invalid redirect location '{location}': {e}"))
    };
    let base = Url::parse(&base.to_string()).map_err(|e| invalid(&e))?;
    let resolved = base.join(location.trim()).map_err(|e| invalid(&e))?;
    Uri::from_str(resolved.as_str()).map_err(|e| invalid(&e))
}

fn host_header(uri: &Uri) -> RestQueryResult<HeaderValue> {
    let authority = uri
        .authority()
        .ok_or_else(|| RestQueryError::transfer("No authority found in URI"))?;
    let host = match authority.port_u16() {
        Some(port) => format!("{}:{port}", authority.host()),
        None => authority.host().to_string(),
    };
    Ok(HeaderValue::from_str(&host)?)
}

/// A configurable, executable HTTP transfer.
///
/// Options are validated as they are set, so a rejected option never leaves
/// the session half-configured.
pub struct TransferSession {
    transport: Box<dyn Transport>,
    options: SessionOptions,
}

impl core::fmt::Debug for TransferSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TransferSession")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TransferSession {
    /// Opens a session on `transport` after checking the capability is available.
    pub fn open(transport: Box<dyn Transport>) -> RestQueryResult<Self> {
        transport
            .check_available()
            .map_err(|e| RestQueryError::configuration(format!("Transfer capability not available: {e}")))?;

        Ok(Self {
            transport,
            options: SessionOptions::default(),
        })
    }

    pub fn set_option(&mut self, option: TransferOption) -> RestQueryResult<()> {
        let name = option.name();
        self.apply(option)
            .map_err(|e| RestQueryError::configuration(format!("Error setting option {name}: {e}")))
    }

    fn apply(&mut self, option: TransferOption) -> Result<(), String> {
        let options = &mut self.options;
        match option {
            TransferOption::Url(url) => {
                let uri = Uri::from_str(url.trim()).map_err(|e| format!("malformed URL '{url}': {e}"))?;
                options.url = Some(uri);
            }
            TransferOption::HttpGet => {
                options.post = false;
                options.custom_request = None;
            }
            TransferOption::Post(post) => options.post = post,
            TransferOption::CustomRequest(None) => options.custom_request = None,
            TransferOption::CustomRequest(Some(verb)) => {
                let method = http::Method::from_bytes(verb.trim().as_bytes())
                    .map_err(|e| format!("invalid request verb '{verb}': {e}"))?;
                options.custom_request = Some(method);
            }
            TransferOption::PostFields(fields) => options.post_fields = fields,
            TransferOption::HttpHeader(lines) => {
                let mut headers = HeaderMap::new();
                for line in &lines {
                    let (name, value) = parse_header_line(line)?;
                    headers.append(name, value);
                }
                options.headers = headers;
            }
            TransferOption::UserAgent(agent) => {
                options.user_agent =
                    HeaderValue::from_str(&agent).map_err(|e| format!("invalid user agent '{agent}': {e}"))?;
            }
            // Any resolves to basic, the only scheme sent preemptively
            TransferOption::HttpAuth(AuthScheme::Basic | AuthScheme::Any) => {}
            TransferOption::HttpAuth(scheme) => {
                return Err(format!("auth scheme '{scheme}' not supported by this transport"));
            }
            TransferOption::UserPwd(credentials) => options.credentials = Some(credentials),
            TransferOption::ProxyType(ProxyType::Http) => {}
            TransferOption::ProxyType(other) => {
                return Err(format!("proxy type {other:?} not supported by this transport"));
            }
            TransferOption::Proxy(proxy) => {
                if proxy.trim().is_empty() {
                    options.proxy_host = None;
                } else {
                    let (host, port) = parse_proxy(&proxy)?;
                    options.proxy_host = Some(host);
                    if port.is_some() {
                        options.proxy_port = port;
                    }
                }
            }
            TransferOption::ProxyPort(0) => return Err("proxy port must be between 1 and 65535".to_string()),
            TransferOption::ProxyPort(port) => options.proxy_port = Some(port),
            TransferOption::ProxyUserPwd(credentials) => options.proxy_credentials = Some(credentials),
            TransferOption::FollowLocation(follow) => options.follow_location = follow,
            TransferOption::MaxRedirs(max) => options.max_redirects = max,
            TransferOption::Timeout(timeout) => options.timeout = non_zero(timeout),
            TransferOption::ConnectTimeout(timeout) => options.connect_timeout = non_zero(timeout),
            TransferOption::FailOnError(fail) => options.fail_on_error = fail,
        }
        Ok(())
    }

    pub fn url(&self) -> Option<&Uri> {
        self.options.url.as_ref()
    }

    /// The verb the next transfer will send.
    pub fn effective_method(&self) -> http::Method {
        match (&self.options.custom_request, self.options.post) {
            (Some(method), _) => method.clone(),
            (None, true) => http::Method::POST,
            (None, false) => http::Method::GET,
        }
    }

    fn proxy_settings(&self) -> Option<ProxySettings> {
        self.options.proxy_host.as_ref().map(|host| ProxySettings {
            host: host.clone(),
            port: self.options.proxy_port.unwrap_or(DEFAULT_PROXY_PORT),
            credentials: self.options.proxy_credentials.clone(),
        })
    }

    fn build_request(
        &self,
        uri: &Uri,
        method: &http::Method,
        body: Option<&[u8]>,
        send_credentials: bool,
    ) -> RestQueryResult<Request<Vec<u8>>> {
        let options = &self.options;
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, host_header(uri)?);
        headers.insert(header::USER_AGENT, options.user_agent.clone());
        headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("close"));

        if let Some(body) = body {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
            if *method == http::Method::POST {
                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                );
            }
        }

        if send_credentials {
            if let Some(credentials) = &options.credentials {
                headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&basic_authorization(credentials))?);
            }
        }

        // Tunneled requests authenticate on the CONNECT instead
        if uri.scheme_str() == Some("http") && options.proxy_host.is_some() {
            if let Some(credentials) = &options.proxy_credentials {
                headers.insert(
                    header::PROXY_AUTHORIZATION,
                    HeaderValue::from_str(&basic_authorization(credentials))?,
                );
            }
        }

        // Caller-supplied headers win over the defaults above
        let mut last_name = None;
        for (name, value) in &options.headers {
            if last_name.as_ref() != Some(name) {
                headers.remove(name);
                last_name = Some(name.clone());
            }
            headers.append(name.clone(), value.clone());
        }

        let mut request = Request::builder()
            .method(method.clone())
            .uri(uri.clone())
            .body(body.map(<[u8]>::to_vec).unwrap_or_default())?;
        *request.headers_mut() = headers;
        Ok(request)
    }

    /// Runs the transfer, following redirects when enabled, and returns the
    /// final response body.
    pub fn perform(&mut self) -> RestQueryResult<(Vec<u8>, TransferInfo)> {
        let original = self
            .options
            .url
            .clone()
            .ok_or_else(|| RestQueryError::state("No URL set"))?;

        let started = Instant::now();
        let mut uri = original.clone();
        let mut method = self.effective_method();
        let mut body = self.options.post_fields.clone().filter(|_| method != http::Method::GET);
        let mut redirect_count = 0;

        loop {
            let send_credentials = uri.authority() == original.authority();
            let request = self.build_request(&uri, &method, body.as_deref(), send_credentials)?;

            let timeout = match self.options.timeout {
                Some(limit) => Some(limit.checked_sub(started.elapsed()).ok_or_else(|| {
                    RestQueryError::transfer(format!(
                        "Operation timed out after {} milliseconds",
                        limit.as_millis()
                    ))
                })?),
                None => None,
            };
            let settings = ConnectionSettings {
                proxy: self.proxy_settings(),
                timeout,
                connect_timeout: self.options.connect_timeout,
            };

            log::debug!("{method} {uri} (hop {redirect_count})");
            let response = self.transport.send_request(&request, &settings)?;
            let status = response.status();
            log::debug!("{uri} -> {status}");

            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);

            let redirect = matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308);
            if let (true, true, Some(location)) = (self.options.follow_location, redirect, location) {
                if redirect_count >= self.options.max_redirects {
                    return Err(RestQueryError::transfer(format!(
                        "Maximum ({}) redirects followed",
                        self.options.max_redirects
                    )));
                }
                let switch_to_get = status == StatusCode::SEE_OTHER
                    || (method == http::Method::POST
                        && matches!(status, StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND));
                if switch_to_get {
                    method = http::Method::GET;
                    body = None;
                }
                uri = resolve_location(&uri, &location)?;
                redirect_count += 1;
                log::debug!("following redirect to {uri}");
                continue;
            }

            if self.options.fail_on_error && status.as_u16() >= 400 {
                return Err(RestQueryError::transfer(format!(
                    "The requested URL returned error: {}",
                    status.as_u16()
                )));
            }

            let (parts, body) = response.into_parts();
            let info = TransferInfo {
                status,
                effective_url: uri.to_string(),
                redirect_count,
                headers: parts.headers,
            };
            return Ok((body, info));
        }
    }
}
