//! Transport handle: ownership and teardown of one connection's transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::connection::params::ConnectionProperties;
use crate::error::{ConnectionError, HiveError};

use super::client::{CliService, ThriftCliClient};
use super::http::{HttpParams, HttpTransport};
use super::protocol::{Closeable, TransportMode, TransportProtocol};
use super::socket::{SocketParams, SocketTransport};

/// Owns the RPC client of one connection plus the resources that must be
/// released with it.
///
/// The handle is closed at most once and never reopened.
pub struct TransportHandle {
    client: Arc<Mutex<dyn CliService>>,
    resources: Vec<Arc<dyn Closeable>>,
    closed: AtomicBool,
}

impl TransportHandle {
    /// Build the transport selected by `properties` and open it.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::Timeout` if the transport does not open
    /// within `transport_timeout`, or `ConnectionError::ConnectionFailed` if
    /// opening fails.
    pub async fn open(properties: &ConnectionProperties) -> Result<Self, HiveError> {
        properties.validate()?;

        let (transport, resources): (Box<dyn TransportProtocol>, Vec<Arc<dyn Closeable>>) =
            match properties.transport_mode {
                TransportMode::Binary => (
                    Box::new(SocketTransport::new(SocketParams {
                        host: properties.host.clone(),
                        port: properties.port,
                        auth: properties.auth,
                        username: properties.username.clone(),
                        password: properties.password.clone(),
                    })),
                    Vec::new(),
                ),
                TransportMode::Http => {
                    let transport = HttpTransport::new(HttpParams {
                        host: properties.host.clone(),
                        port: properties.port,
                        endpoint: properties.http_endpoint.clone(),
                        use_ssl: properties.use_ssl,
                        username: properties.username.clone(),
                        password: properties.password.clone(),
                        connect_timeout: properties.transport_timeout,
                    })
                    .map_err(ConnectionError::Transport)?;
                    let resource: Arc<dyn Closeable> = transport.client_resource();
                    (Box::new(transport), vec![resource])
                }
            };

        Self::open_with(
            ThriftCliClient::new(transport),
            resources,
            properties,
        )
        .await
    }

    /// Open an already constructed client.
    ///
    /// The open runs on a spawned task; on timeout the task is aborted and
    /// the client is dropped.
    pub async fn open_with<C>(
        client: C,
        resources: Vec<Arc<dyn Closeable>>,
        properties: &ConnectionProperties,
    ) -> Result<Self, HiveError>
    where
        C: CliService + 'static,
    {
        let timeout = properties.transport_timeout;
        let mut task = tokio::spawn(async move {
            let mut client = client;
            let result = client.open_transport().await;
            (client, result)
        });

        let client = match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok((client, Ok(())))) => client,
            Ok(Ok((_, Err(e)))) => {
                return Err(connect_failed(properties, e.to_string()).into());
            }
            Ok(Err(join_error)) => {
                return Err(connect_failed(properties, join_error.to_string()).into());
            }
            Err(_) => {
                task.abort();
                return Err(ConnectionError::Timeout {
                    timeout_ms: duration_ms(timeout),
                }
                .into());
            }
        };
        debug!(host = %properties.host, port = properties.port, "transport open");

        Ok(Self::from_parts(Arc::new(Mutex::new(client)), resources))
    }

    /// Wrap an open client without going through `open`.
    pub fn from_parts(
        client: Arc<Mutex<dyn CliService>>,
        resources: Vec<Arc<dyn Closeable>>,
    ) -> Self {
        Self {
            client,
            resources,
            closed: AtomicBool::new(false),
        }
    }

    /// Shared reference to the RPC client, guarded by the session lock.
    pub fn client(&self) -> Arc<Mutex<dyn CliService>> {
        Arc::clone(&self.client)
    }

    /// Whether the handle is not closed and its transport is open.
    pub async fn is_valid(&self) -> bool {
        !self.is_closed() && self.client.lock().await.is_open()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close auxiliary resources, then the transport.
    ///
    /// Only the first call does anything. Failures are logged and do not stop
    /// the remaining closes.
    pub async fn close(&self) {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!("transport handle already closed");
            return;
        }

        for resource in &self.resources {
            trace!("closing transport resource");
            if let Err(e) = resource.close().await {
                warn!(error = %e, "failed to close transport resource");
            }
        }

        trace!("closing transport");
        if let Err(e) = self.client.lock().await.shutdown().await {
            warn!(error = %e, "failed to close transport");
        }
    }
}

fn connect_failed(properties: &ConnectionProperties, message: String) -> ConnectionError {
    ConnectionError::ConnectionFailed {
        host: properties.host.clone(),
        port: properties.port,
        message,
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
