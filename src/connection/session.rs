//! Server sessions.
//!
//! A [`Session`] wraps the server session handle returned by `OpenSession`
//! together with the RPC client of the transport it was opened on. The
//! client sits behind one `tokio::sync::Mutex`; every RPC of the session and
//! of its operations goes through that lock.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::connection::params::{ConnectionProperties, HIVE_CONF_PREFIX};
use crate::connection::status::{check_status, is_protocol_mismatch};
use crate::error::{ConnectionError, HiveError, QueryError, TransportError};
use crate::transport::client::CliService;
use crate::transport::handle::TransportHandle;
use crate::transport::messages::{
    GetInfoReq, InfoType, InfoValue, OpenSessionReq, ProtocolVersion, SessionHandle, SessionReq,
};

/// Prefix under which `hive.*` properties are sent to the server.
const HIVECONF_KEY_PREFIX: &str = "set:hiveconf:";

/// Session configuration key selecting the initial database.
const USE_DATABASE_KEY: &str = "use:database";

const DEFAULT_DATABASE: &str = "default";

/// An open server session.
pub struct Session {
    handle: SessionHandle,
    client: Arc<Mutex<dyn CliService>>,
    properties: Arc<ConnectionProperties>,
    protocol_version: ProtocolVersion,
    server_configuration: BTreeMap<String, String>,
    closed: AtomicBool,
}

impl Session {
    /// Open a session on `transport`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::ProtocolNotSupported` when the server rejects
    /// the requested protocol version, `ConnectionError::Protocol` for any
    /// other non-success status, and transport errors as they occur.
    pub async fn open(
        transport: &TransportHandle,
        properties: ConnectionProperties,
    ) -> Result<Arc<Session>, HiveError> {
        if transport.is_closed() {
            return Err(ConnectionError::ConnectionClosed.into());
        }

        let requested = properties.protocol_version;
        let request = OpenSessionReq {
            client_protocol: requested,
            username: properties.username.clone(),
            password: properties.password.clone(),
            configuration: session_configuration(&properties),
        };

        let client = transport.client();
        let response = client
            .lock()
            .await
            .open_session(request)
            .await
            .map_err(|e| classify_transport_failure(requested, e))?;

        check_status(&response.status).map_err(|status| {
            if is_protocol_mismatch(status.message()) {
                ConnectionError::ProtocolNotSupported {
                    version: requested.as_i32(),
                    message: status.message().to_string(),
                }
            } else {
                ConnectionError::Protocol(status)
            }
        })?;

        let handle = response.session_handle.ok_or_else(|| {
            ConnectionError::Transport(TransportError::ProtocolError(
                "OpenSession response carried no session handle".to_string(),
            ))
        })?;

        let protocol_version = ProtocolVersion::from_i32(response.server_protocol_version)
            .map(|served| served.min(requested))
            .unwrap_or(requested);
        debug!(
            requested = %requested,
            negotiated = %protocol_version,
            "session opened"
        );

        Ok(Arc::new(Session {
            handle,
            client,
            properties: Arc::new(properties),
            protocol_version,
            server_configuration: response.configuration,
            closed: AtomicBool::new(false),
        }))
    }

    /// Open a session, stepping down one protocol version at a time while
    /// the server reports the requested version as unsupported.
    pub async fn open_with_fallback(
        transport: &TransportHandle,
        properties: ConnectionProperties,
    ) -> Result<Arc<Session>, HiveError> {
        let mut properties = properties;
        loop {
            match Session::open(transport, properties.clone()).await {
                Err(e) if e.is_protocol_not_supported() => {
                    let Some(lower) = properties.protocol_version.lower() else {
                        return Err(e);
                    };
                    debug!(
                        rejected = %properties.protocol_version,
                        retry = %lower,
                        "protocol version not supported, retrying"
                    );
                    properties.protocol_version = lower;
                }
                result => return result,
            }
        }
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn properties(&self) -> &ConnectionProperties {
        &self.properties
    }

    /// The lower of the requested and the server's protocol version.
    pub fn protocol_version(&self) -> ProtocolVersion {
        self.protocol_version
    }

    /// Configuration the server returned with `OpenSession`.
    pub fn server_configuration(&self) -> &BTreeMap<String, String> {
        &self.server_configuration
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn client(&self) -> &Arc<Mutex<dyn CliService>> {
        &self.client
    }

    pub(crate) fn ensure_open(&self) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::ConnectionClosed);
        }
        Ok(())
    }

    /// Look up one server property.
    pub async fn server_info(&self, info_type: InfoType) -> Result<InfoValue, HiveError> {
        self.ensure_open()?;
        let request = GetInfoReq {
            session_handle: self.handle.clone(),
            info_type,
        };
        let response = self
            .client
            .lock()
            .await
            .get_info(request)
            .await
            .map_err(QueryError::Transport)?;
        check_status(&response.status).map_err(QueryError::Status)?;
        Ok(response.info_value.ok_or(QueryError::MissingInfoValue)?)
    }

    /// Close the server session.
    ///
    /// Only the first call sends `CloseSession`. Failures are logged and not
    /// returned.
    pub async fn close(&self) {
        let mut client = self.client.lock().await;
        if self.closed.swap(true, Ordering::AcqRel) {
            trace!("session already closed");
            return;
        }

        trace!("closing session");
        let request = SessionReq {
            session_handle: self.handle.clone(),
        };
        match client.close_session(request).await {
            Ok(response) => {
                if let Err(status) = check_status(&response.status) {
                    warn!(error = %status, "failed to close session");
                }
            }
            Err(e) => warn!(error = %e, "failed to close session"),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("handle", &self.handle)
            .field("properties", &self.properties)
            .field("protocol_version", &self.protocol_version)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Configuration sent with `OpenSession`.
///
/// Every `hive.*` property becomes `set:hiveconf:<key>`. `use:database` is
/// always sent, falling back to `default` when no database is set.
pub(crate) fn session_configuration(
    properties: &ConnectionProperties,
) -> BTreeMap<String, String> {
    let mut configuration: BTreeMap<String, String> = properties
        .session_config
        .iter()
        .filter(|(key, _)| key.starts_with(HIVE_CONF_PREFIX))
        .map(|(key, value)| (format!("{}{}", HIVECONF_KEY_PREFIX, key), value.clone()))
        .collect();
    let database = match properties.database.trim() {
        "" => DEFAULT_DATABASE,
        database => database,
    };
    configuration.insert(USE_DATABASE_KEY.to_string(), database.to_string());
    configuration
}

fn classify_transport_failure(
    requested: ProtocolVersion,
    error: TransportError,
) -> ConnectionError {
    let message = error.message();
    if is_protocol_mismatch(&message) {
        ConnectionError::ProtocolNotSupported {
            version: requested.as_i32(),
            message,
        }
    } else {
        ConnectionError::Transport(error)
    }
}
