//! HTTP transport.
//!
//! Each RPC is one `POST` of the encoded call; the response body is the
//! encoded reply. The underlying `reqwest::Client` is exposed as a
//! [`Closeable`] so the transport handle can release it on close.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::TransportError;

use super::protocol::{Closeable, TransportProtocol};

const THRIFT_CONTENT_TYPE: &str = "application/x-thrift";
const XSRF_HEADER: &str = "X-XSRF-HEADER";

/// Connection parameters for the HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpParams {
    pub host: String,
    pub port: u16,
    pub endpoint: String,
    pub use_ssl: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connect_timeout: Duration,
}

impl HttpParams {
    /// Build the endpoint URL from parameters.
    pub fn to_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!(
            "{}://{}:{}/{}",
            scheme,
            self.host,
            self.port,
            self.endpoint.trim_start_matches('/')
        )
    }
}

/// Shared, closeable holder of the HTTP client.
#[derive(Debug)]
pub struct HttpClientResource {
    client: Mutex<Option<Client>>,
}

impl HttpClientResource {
    fn new(client: Client) -> Self {
        Self {
            client: Mutex::new(Some(client)),
        }
    }

    async fn get(&self) -> Option<Client> {
        self.client.lock().await.clone()
    }
}

#[async_trait]
impl Closeable for HttpClientResource {
    async fn close(&self) -> Result<(), TransportError> {
        self.client.lock().await.take();
        Ok(())
    }
}

/// HTTP transport implementation.
pub struct HttpTransport {
    url: String,
    username: Option<String>,
    password: Option<String>,
    resource: Arc<HttpClientResource>,
    open: bool,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::HttpError` if the client cannot be built.
    pub fn new(params: HttpParams) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(THRIFT_CONTENT_TYPE));
        headers.insert(ACCEPT, HeaderValue::from_static(THRIFT_CONTENT_TYPE));
        headers.insert(XSRF_HEADER, HeaderValue::from_static("true"));

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(params.connect_timeout)
            .build()?;

        Ok(Self {
            url: params.to_url(),
            username: params.username,
            password: params.password,
            resource: Arc::new(HttpClientResource::new(client)),
            open: false,
        })
    }

    /// The closeable client resource, registered with the transport handle.
    pub fn client_resource(&self) -> Arc<HttpClientResource> {
        Arc::clone(&self.resource)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TransportProtocol for HttpTransport {
    async fn open(&mut self) -> Result<(), TransportError> {
        if self.resource.get().await.is_none() {
            return Err(TransportError::Closed);
        }
        debug!(url = %self.url, "http transport open");
        self.open = true;
        Ok(())
    }

    async fn round_trip(&mut self, request: Bytes) -> Result<Bytes, TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        let client = self.resource.get().await.ok_or(TransportError::Closed)?;

        let mut builder = client.post(&self.url).body(request);
        if let Some(username) = &self.username {
            builder = builder.basic_auth(username, self.password.as_ref());
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::HttpStatus {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.bytes().await?)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> HttpParams {
        HttpParams {
            host: "hs2.example.com".to_string(),
            port: 10001,
            endpoint: "cliservice".to_string(),
            use_ssl: false,
            username: Some("hive".to_string()),
            password: None,
            connect_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_url_construction() {
        assert_eq!(params().to_url(), "http://hs2.example.com:10001/cliservice");

        let mut secure = params();
        secure.use_ssl = true;
        secure.endpoint = "/gateway/default/hive".to_string();
        assert_eq!(
            secure.to_url(),
            "https://hs2.example.com:10001/gateway/default/hive"
        );
    }

    #[tokio::test]
    async fn test_round_trip_requires_open() {
        let mut transport = HttpTransport::new(params()).unwrap();
        assert!(!transport.is_open());
        let err = transport.round_trip(Bytes::new()).await.unwrap_err();
        assert!(matches!(err, TransportError::NotOpen));
    }

    #[tokio::test]
    async fn test_closed_resource_refuses_calls() {
        let mut transport = HttpTransport::new(params()).unwrap();
        transport.open().await.unwrap();
        assert!(transport.is_open());

        transport.client_resource().close().await.unwrap();
        let err = transport.round_trip(Bytes::new()).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));

        let mut reopened = HttpTransport::new(params()).unwrap();
        reopened.client_resource().close().await.unwrap();
        assert!(matches!(
            reopened.open().await.unwrap_err(),
            TransportError::Closed
        ));
    }
}
