use base64::{engine::general_purpose::STANDARD, Engine as _};
use http::{Request, Version};

use crate::error::RestQueryResult;

// Serializes the request head. `absolute_form` writes the full URI as the
// request target, which is what a forwarding proxy expects.
pub fn serialize_http_request<T>(req: &Request<T>, absolute_form: bool) -> RestQueryResult<String> {
    let method = req.method();
    let uri = req.uri();

    let target = if absolute_form {
        uri.to_string()
    } else {
        uri.path_and_query().map_or("/", |pq| pq.as_str()).to_string()
    };

    let version = match req.version() {
        Version::HTTP_10 => "HTTP/1.0",
        _ => "HTTP/1.1",
    };

    let mut request_head = format!("{method} {target} {version}\r\n");

    for (name, value) in req.headers() {
        request_head.push_str(&format!("{}: {}\r\n", name.as_str(), value.to_str()?));
    }

    request_head.push_str("\r\n");

    Ok(request_head)
}

// Serializes a CONNECT request used to open a tunnel through a proxy
pub fn serialize_connect_request(host: &str, port: u16, proxy_credentials: Option<&str>) -> String {
    let mut request_head = format!("CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n");
    if let Some(credentials) = proxy_credentials {
        request_head.push_str(&format!("Proxy-Authorization: {}\r\n", basic_authorization(credentials)));
    }
    request_head.push_str("\r\n");
    request_head
}

// `user:password` -> `Basic dXNlcjpwYXNzd29yZA==`
pub fn basic_authorization(credentials: &str) -> String {
    format!("Basic {}", STANDARD.encode(credentials))
}

// Copy of a serialized head with credential header values masked, for logging
pub fn redact_credentials(head: &str) -> String {
    head.split_inclusive("\r\n")
        .map(|line| match line.split_once(':') {
            Some((name, _))
                if name.eq_ignore_ascii_case("authorization") || name.eq_ignore_ascii_case("proxy-authorization") =>
            {
                let ending = if line.ends_with("\r\n") { "\r\n" } else { "" };
                format!("{name}: <redacted>{ending}")
            }
            _ => line.to_string(),
        })
        .collect()
}
