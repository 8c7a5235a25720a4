use std::future::Future;
use std::net::TcpStream;
use std::sync::OnceLock;
use std::time::Duration;

use async_io::{Async, Timer};
use async_tls::{client::TlsStream, TlsConnector};
use futures_lite::{future, io::BufReader, AsyncWriteExt};
use http::{Request, Response};

use crate::async_connection_factory::AsyncConnectionFactory;
use crate::error::{RestQueryError, RestQueryResult};
use crate::{request, response};

use super::{AsyncConnection, ConnectionSettings, Transport};

impl AsyncConnection for Async<TcpStream> {
    fn is_encrypted(&self) -> bool {
        false
    }
}

impl AsyncConnection for TlsStream<Async<TcpStream>> {
    fn is_encrypted(&self) -> bool {
        true
    }
}

// Loaded once per process and shared by every session
static TLS_CONNECTOR: OnceLock<TlsConnector> = OnceLock::new();

fn tls_connector() -> &'static TlsConnector {
    TLS_CONNECTOR.get_or_init(TlsConnector::new)
}

// Races `fut` against a timer when a limit is set
pub(crate) async fn with_timeout<T, F>(limit: Option<Duration>, what: &'static str, fut: F) -> RestQueryResult<T>
where
    F: Future<Output = RestQueryResult<T>>,
{
    match limit {
        None => fut.await,
        Some(limit) => {
            future::or(fut, async move {
                Timer::after(limit).await;
                Err(RestQueryError::transfer(format!(
                    "{what} timed out after {} milliseconds",
                    limit.as_millis()
                )))
            })
            .await
        }
    }
}

/// Blocking transport over `async-io` sockets and `async-tls`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdTransport;

impl StdTransport {
    pub fn new() -> Self {
        Self
    }

    async fn exchange(
        request: &Request<Vec<u8>>,
        settings: &ConnectionSettings,
    ) -> RestQueryResult<Response<Vec<u8>>> {
        let mut stream = AsyncConnectionFactory::connect(request, settings, tls_connector()).await?;

        // Plain requests through a proxy go out in absolute form; tunneled ones do not
        let absolute_form = settings.proxy.is_some() && !stream.is_encrypted();

        // Write the HTTP request to the stream
        let serialized_request = request::serialize_http_request(request, absolute_form)?;
        log::debug!("serialized_request = {}", request::redact_credentials(&serialized_request));
        stream.write_all(serialized_request.as_bytes()).await?;

        // Write request body if there is one
        let body = request.body();
        if !body.is_empty() {
            log::trace!("request_body = {} bytes", body.len());
            stream.write_all(body).await?;
        }
        stream.flush().await?;

        // Read and parse the response
        let mut reader = BufReader::new(&mut stream);
        let response_status_line = response::read_response_status_line(&mut reader).await?;
        log::debug!("response_status_line = {response_status_line}");
        let (response_version, response_status) = response::parse_response_status_line(&response_status_line)?;
        let response_headers = response::read_response_headers(&mut reader).await?;
        log::debug!("response_headers = {response_headers:?}");
        let response_body = response::read_response_body(&mut reader, response_status, &response_headers).await?;
        log::trace!("response_body = {response_body:02x?}");

        // Build response
        let mut response = Response::builder()
            .status(response_status)
            .version(response_version)
            .body(response_body)?;
        *response.headers_mut() = response_headers;

        Ok(response)
    }
}

impl Transport for StdTransport {
    fn check_available(&self) -> Result<(), String> {
        tls_connector();
        Ok(())
    }

    fn send_request(
        &mut self,
        request: &Request<Vec<u8>>,
        settings: &ConnectionSettings,
    ) -> RestQueryResult<Response<Vec<u8>>> {
        future::block_on(with_timeout(
            settings.timeout,
            "Operation",
            Self::exchange(request, settings),
        ))
    }
}
