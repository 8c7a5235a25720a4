use std::future::Future;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use async_io::Async;
use async_tls::TlsConnector;
use futures_lite::{io::BufReader, AsyncWriteExt};
use http::Request;

use crate::error::{RestQueryError, RestQueryResult};
use crate::platform::std_impl::with_timeout;
use crate::platform::{AsyncConnection, ConnectionSettings, ProxySettings};
use crate::{request, response};

pub struct AsyncConnectionFactory;

impl AsyncConnectionFactory {
    // Extracts the scheme, host, and port from the request URI
    fn extract_host_from_request<T>(req: &Request<T>) -> RestQueryResult<(String, String, u16)> {
        let uri = req.uri();
        let authority = uri
            .authority()
            .ok_or_else(|| RestQueryError::transfer("No authority found in URI"))?;
        let scheme = uri
            .scheme_str()
            .ok_or_else(|| RestQueryError::transfer("No scheme found in URI"))?;

        let default_port = match scheme {
            "http" => 80,
            "https" => 443,
            other => {
                return Err(RestQueryError::transfer(format!(
                    "Protocol \"{other}\" not supported"
                )))
            }
        };
        let port = authority.port_u16().unwrap_or(default_port);

        Ok((scheme.to_string(), authority.host().to_string(), port))
    }

    // Name resolution is blocking; the timeouts only cover the connects
    fn resolve(host: &str, port: u16) -> RestQueryResult<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = format!("{host}:{port}")
            .to_socket_addrs()
            .map_err(|e| RestQueryError::transfer(format!("Could not resolve host: {host} ({e})")))?
            .collect();
        if addrs.is_empty() {
            return Err(RestQueryError::transfer(format!("Could not resolve host: {host}")));
        }
        Ok(addrs)
    }

    // Tries each address in order and keeps the first one that answers
    async fn connect_first<T, F, Fut>(addrs: &[SocketAddr], mut attempt: F) -> RestQueryResult<T>
    where
        F: FnMut(SocketAddr) -> Fut,
        Fut: Future<Output = RestQueryResult<T>>,
    {
        let mut last_error = RestQueryError::transfer("No address to connect to");
        for &addr in addrs {
            log::debug!("connecting to {addr}");
            match attempt(addr).await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    log::debug!("connect to {addr} failed: {e}");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    async fn connect_tcp(
        host: &str,
        port: u16,
        settings: &ConnectionSettings,
    ) -> RestQueryResult<Async<TcpStream>> {
        let addrs = Self::resolve(host, port)?;
        Self::connect_first(&addrs, |addr| {
            with_timeout(settings.connect_timeout, "Connection", async move {
                Async::<TcpStream>::connect(addr).await.map_err(RestQueryError::from)
            })
        })
        .await
    }

    // Asks the proxy for a tunnel to host:port and hands back the raw stream
    async fn open_tunnel(
        mut stream: Async<TcpStream>,
        host: &str,
        port: u16,
        proxy: &ProxySettings,
    ) -> RestQueryResult<Async<TcpStream>> {
        let connect_request = request::serialize_connect_request(host, port, proxy.credentials.as_deref());
        log::debug!("connect_request = {}", request::redact_credentials(&connect_request));
        stream.write_all(connect_request.as_bytes()).await?;
        stream.flush().await?;

        let mut reader = BufReader::new(stream);
        let status_line = response::read_response_status_line(&mut reader).await?;
        log::debug!("proxy_status_line = {status_line}");
        let (_, status) = response::parse_response_status_line(&status_line)?;
        response::read_response_headers(&mut reader).await?;

        if !status.is_success() {
            return Err(RestQueryError::transfer(format!(
                "Received HTTP code {} from proxy after CONNECT",
                status.as_u16()
            )));
        }

        Ok(reader.into_inner())
    }

    pub async fn connect<T: core::fmt::Debug>(
        request: &Request<T>,
        settings: &ConnectionSettings,
        tls_connector: &TlsConnector,
    ) -> RestQueryResult<Box<dyn AsyncConnection>> {
        log::debug!("request = {} {}", request.method(), request.uri());

        // Extract the scheme, host, and port from the request
        let (scheme, host, port) = Self::extract_host_from_request(request)?;
        let secure = scheme == "https";

        let stream = match &settings.proxy {
            None => Self::connect_tcp(&host, port, settings).await?,
            Some(proxy) => {
                let stream = Self::connect_tcp(&proxy.host, proxy.port, settings).await?;
                if secure {
                    Self::open_tunnel(stream, &host, port, proxy).await?
                } else {
                    stream
                }
            }
        };

        // Optionally add TLS based on the scheme
        let stream: Box<dyn AsyncConnection> = if secure {
            Box::new(tls_connector.connect(&host, stream).await?)
        } else {
            Box::new(stream)
        };

        Ok(stream)
    }
}
