//! Connection properties parsing and validation.
//!
//! This module holds the typed configuration of one connection and parses
//! HiveServer2 connection URLs into it.

use crate::error::ConnectionError;
use crate::query::poll::PollPolicy;
use crate::transport::messages::ProtocolVersion;
use crate::transport::protocol::{AuthMode, TransportMode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 10000;

/// Prefix marking a key as a server configuration property.
pub const HIVE_CONF_PREFIX: &str = "hive.";

/// Properties of one connection.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionProperties {
    /// Server host
    pub host: String,

    /// Server port (default: 10000)
    pub port: u16,

    /// Socket or HTTP transport
    pub transport_mode: TransportMode,

    /// SASL PLAIN or raw socket
    pub auth: AuthMode,

    /// Username sent with the session open and the SASL handshake
    pub username: Option<String>,

    /// Password (never logged)
    pub password: Option<String>,

    /// Database selected when the session opens
    pub database: String,

    /// Protocol version requested from the server
    pub protocol_version: ProtocolVersion,

    /// Bound on opening the transport
    pub transport_timeout: Duration,

    /// Server-side statement timeout, whole seconds; zero for the server default
    pub query_timeout: Duration,

    /// Rows requested per page
    pub fetch_size: usize,

    /// Cap on rows returned by a result sequence; zero for no cap
    pub max_rows: usize,

    /// Fetch and log server log lines for executed statements
    pub fetch_server_logs: bool,

    /// Path of the HTTP endpoint
    pub http_endpoint: String,

    /// Use HTTPS for the HTTP transport
    pub use_ssl: bool,

    /// `hive.*` properties sent to the server on session open
    pub session_config: BTreeMap<String, String>,

    /// Completion-poll pacing
    pub poll: PollPolicy,
}

impl Default for ConnectionProperties {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            transport_mode: TransportMode::default(),
            auth: AuthMode::default(),
            username: None,
            password: None,
            database: "default".to_string(),
            protocol_version: ProtocolVersion::default(),
            transport_timeout: Duration::from_secs(30),
            query_timeout: Duration::ZERO,
            fetch_size: 1000,
            max_rows: 0,
            fetch_server_logs: false,
            http_endpoint: "cliservice".to_string(),
            use_ssl: false,
            session_config: BTreeMap::new(),
            poll: PollPolicy::default(),
        }
    }
}

impl ConnectionProperties {
    /// Properties for `host:port` with every other field at its default.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Set username and password.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Check the properties for values the driver cannot work with.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::InvalidParameter` naming the offending field.
    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.host.is_empty() {
            return Err(invalid("host", "Host cannot be empty"));
        }
        if self.port == 0 {
            return Err(invalid("port", "Port cannot be 0"));
        }
        if self.fetch_size == 0 {
            return Err(invalid("fetch_size", "Fetch size must be positive"));
        }
        if let Some(key) = self
            .session_config
            .keys()
            .find(|key| !key.starts_with(HIVE_CONF_PREFIX))
        {
            return Err(invalid(
                "session_config",
                &format!("'{}' does not start with '{}'", key, HIVE_CONF_PREFIX),
            ));
        }
        Ok(())
    }
}

impl FromStr for ConnectionProperties {
    type Err = ConnectionError;

    /// Parse a connection URL in the format:
    /// `[jdbc:]hive2://host[:port][/database][;key=value]*[?hive.key=value&...]`
    ///
    /// # Examples
    ///
    /// ```
    /// # use hivearrow_rs::connection::ConnectionProperties;
    /// # use std::str::FromStr;
    /// let props = ConnectionProperties::from_str(
    ///     "hive2://hs2.example.com:10001/sales;transportMode=http;httpPath=cliservice?hive.exec.parallel=true"
    /// )?;
    /// assert_eq!(props.database, "sales");
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = s.trim();
        let url = url.strip_prefix("jdbc:").unwrap_or(url);
        let url = url.strip_prefix("hive2://").ok_or_else(|| {
            ConnectionError::ParseError(
                "Connection URL must start with 'hive2://' or 'jdbc:hive2://'".to_string(),
            )
        })?;

        let (main_part, conf_part) = match url.split_once('?') {
            Some((main, conf)) => (main, Some(conf)),
            None => (url, None),
        };

        let mut segments = main_part.split(';');
        let authority = segments.next().unwrap_or_default();

        let (host_port, database) = match authority.split_once('/') {
            Some((host_port, db)) => (host_port, Some(db)),
            None => (authority, None),
        };
        let (host, port) = parse_host_port(host_port)?;

        let mut props = ConnectionProperties::new(host, port);
        if let Some(db) = database.filter(|db| !db.is_empty()) {
            props.database = decode(db)?;
        }

        for segment in segments.filter(|segment| !segment.is_empty()) {
            let (key, value) = split_pair(segment)?;
            apply_session_var(&mut props, &key, value)?;
        }

        if let Some(conf) = conf_part {
            for pair in conf.split(['&', ';']).filter(|pair| !pair.is_empty()) {
                let (key, value) = split_pair(pair)?;
                if !key.starts_with(HIVE_CONF_PREFIX) {
                    return Err(invalid(
                        &key,
                        "Only hive.* properties are allowed after '?'",
                    ));
                }
                props.session_config.insert(key, value);
            }
        }

        props.validate()?;
        Ok(props)
    }
}

// Prevent password from being displayed in debug or display output
impl fmt::Debug for ConnectionProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProperties")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("transport_mode", &self.transport_mode)
            .field("auth", &self.auth)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("protocol_version", &self.protocol_version)
            .field("transport_timeout", &self.transport_timeout)
            .field("query_timeout", &self.query_timeout)
            .field("fetch_size", &self.fetch_size)
            .field("max_rows", &self.max_rows)
            .field("fetch_server_logs", &self.fetch_server_logs)
            .field("http_endpoint", &self.http_endpoint)
            .field("use_ssl", &self.use_ssl)
            .field("session_config", &self.session_config)
            .field("poll", &self.poll)
            .finish()
    }
}

impl fmt::Display for ConnectionProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.transport_mode {
            TransportMode::Binary => "binary",
            TransportMode::Http => "http",
        };
        write!(
            f,
            "hive2://{}:{}/{} ({}, user: {})",
            self.host,
            self.port,
            self.database,
            scheme,
            self.username.as_deref().unwrap_or("<none>")
        )
    }
}

fn invalid(parameter: &str, message: &str) -> ConnectionError {
    ConnectionError::InvalidParameter {
        parameter: parameter.to_string(),
        message: message.to_string(),
    }
}

fn decode(value: &str) -> Result<String, ConnectionError> {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ConnectionError::ParseError(format!("Failed to decode '{}': {}", value, e)))
}

/// Split and decode one `key=value` pair.
fn split_pair(pair: &str) -> Result<(String, String), ConnectionError> {
    match pair.split_once('=') {
        Some((key, value)) => Ok((decode(key)?, decode(value)?)),
        None => Err(ConnectionError::ParseError(format!(
            "Invalid parameter format: {}",
            pair
        ))),
    }
}

/// Parse host and port.
fn parse_host_port(host_port: &str) -> Result<(String, u16), ConnectionError> {
    if host_port.is_empty() {
        return Err(ConnectionError::ParseError("Host is required".to_string()));
    }

    // Check for IPv6 address format [host]:port
    if let Some(rest) = host_port.strip_prefix('[') {
        let (host, port_part) = rest
            .split_once(']')
            .ok_or_else(|| ConnectionError::ParseError(format!("Invalid host: {}", host_port)))?;
        let port = match port_part.strip_prefix(':') {
            Some(port) => parse_port(port)?,
            None => DEFAULT_PORT,
        };
        return Ok((host.to_string(), port));
    }

    match host_port.rsplit_once(':') {
        Some((host, port)) => Ok((host.to_string(), parse_port(port)?)),
        None => Ok((host_port.to_string(), DEFAULT_PORT)),
    }
}

fn parse_port(port: &str) -> Result<u16, ConnectionError> {
    port.parse()
        .map_err(|_| ConnectionError::ParseError(format!("Invalid port: {}", port)))
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConnectionError> {
    value
        .parse()
        .map_err(|_| invalid(key, &format!("Invalid numeric value: {}", value)))
}

/// Apply one `;key=value` session variable.
fn apply_session_var(
    props: &mut ConnectionProperties,
    key: &str,
    value: String,
) -> Result<(), ConnectionError> {
    match key {
        "transportMode" => {
            props.transport_mode = match value.to_ascii_lowercase().as_str() {
                "binary" => TransportMode::Binary,
                "http" => TransportMode::Http,
                _ => return Err(invalid(key, &format!("Unknown transport mode: {}", value))),
            }
        }
        "httpPath" => props.http_endpoint = value,
        "ssl" => props.use_ssl = parse_bool(key, &value)?,
        "user" => props.username = Some(value),
        "password" => props.password = Some(value),
        "auth" => {
            props.auth = match value.to_ascii_lowercase().as_str() {
                "nosasl" => AuthMode::NoSasl,
                "none" | "plain" => AuthMode::Plain,
                _ => return Err(invalid(key, &format!("Unsupported auth: {}", value))),
            }
        }
        "fetchSize" => props.fetch_size = parse_number(key, &value)?,
        "maxRows" => props.max_rows = parse_number(key, &value)?,
        "fetchServerLogs" => props.fetch_server_logs = parse_bool(key, &value)?,
        "queryTimeout" => {
            props.query_timeout = Duration::from_secs(parse_number(key, &value)?);
        }
        "transportTimeout" => {
            props.transport_timeout = Duration::from_millis(parse_number(key, &value)?);
        }
        "protocolVersion" => {
            let number: u8 = parse_number(key, &value)?;
            props.protocol_version = ProtocolVersion::from_number(number)
                .ok_or_else(|| invalid(key, "Protocol version must be between 1 and 10"))?;
        }
        _ if key.starts_with(HIVE_CONF_PREFIX) => {
            props.session_config.insert(key.to_string(), value);
        }
        _ => return Err(invalid(key, "Unknown connection parameter")),
    }
    Ok(())
}

/// Parse boolean value from string.
fn parse_bool(key: &str, s: &str) -> Result<bool, ConnectionError> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, &format!("Invalid boolean value: {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let props = ConnectionProperties::default();

        assert_eq!(props.host, "localhost");
        assert_eq!(props.port, 10000);
        assert_eq!(props.transport_mode, TransportMode::Binary);
        assert_eq!(props.auth, AuthMode::Plain);
        assert_eq!(props.database, "default");
        assert_eq!(props.protocol_version, ProtocolVersion::V10);
        assert_eq!(props.transport_timeout, Duration::from_secs(30));
        assert_eq!(props.query_timeout, Duration::ZERO);
        assert_eq!(props.fetch_size, 1000);
        assert_eq!(props.max_rows, 0);
        assert!(!props.fetch_server_logs);
        assert_eq!(props.http_endpoint, "cliservice");
        assert!(props.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let mut props = ConnectionProperties::new("", 10000);
        assert!(matches!(
            props.validate().unwrap_err(),
            ConnectionError::InvalidParameter { parameter, .. } if parameter == "host"
        ));

        props.host = "localhost".to_string();
        props.port = 0;
        assert!(props.validate().is_err());

        props.port = 10000;
        props.fetch_size = 0;
        assert!(matches!(
            props.validate().unwrap_err(),
            ConnectionError::InvalidParameter { parameter, .. } if parameter == "fetch_size"
        ));

        props.fetch_size = 10;
        props
            .session_config
            .insert("mapred.job.queue".to_string(), "etl".to_string());
        assert!(props.validate().is_err());
    }

    #[test]
    fn test_parse_basic() {
        let props = ConnectionProperties::from_str("hive2://localhost").unwrap();

        assert_eq!(props.host, "localhost");
        assert_eq!(props.port, 10000);
        assert_eq!(props.database, "default");
    }

    #[test]
    fn test_parse_jdbc_prefix_port_and_database() {
        let props =
            ConnectionProperties::from_str("jdbc:hive2://hs2.example.com:10001/sales").unwrap();

        assert_eq!(props.host, "hs2.example.com");
        assert_eq!(props.port, 10001);
        assert_eq!(props.database, "sales");
    }

    #[test]
    fn test_parse_session_vars() {
        let props = ConnectionProperties::from_str(
            "hive2://localhost:10001/db;transportMode=http;httpPath=gateway/hive;ssl=true;\
             user=etl;password=p%40ss;fetchSize=500;maxRows=10000;fetchServerLogs=true;\
             queryTimeout=60;transportTimeout=1500;protocolVersion=8",
        )
        .unwrap();

        assert_eq!(props.transport_mode, TransportMode::Http);
        assert_eq!(props.http_endpoint, "gateway/hive");
        assert!(props.use_ssl);
        assert_eq!(props.username.as_deref(), Some("etl"));
        assert_eq!(props.password.as_deref(), Some("p@ss"));
        assert_eq!(props.fetch_size, 500);
        assert_eq!(props.max_rows, 10000);
        assert!(props.fetch_server_logs);
        assert_eq!(props.query_timeout, Duration::from_secs(60));
        assert_eq!(props.transport_timeout, Duration::from_millis(1500));
        assert_eq!(props.protocol_version, ProtocolVersion::V8);
    }

    #[test]
    fn test_parse_hive_conf() {
        let props = ConnectionProperties::from_str(
            "hive2://localhost/db;hive.server2.idle=1h?hive.exec.parallel=true&hive.cbo.enable=false;hive.x=1",
        )
        .unwrap();

        assert_eq!(props.session_config.len(), 4);
        assert_eq!(
            props.session_config.get("hive.exec.parallel").map(String::as_str),
            Some("true")
        );
        assert_eq!(
            props.session_config.get("hive.server2.idle").map(String::as_str),
            Some("1h")
        );
    }

    #[test]
    fn test_parse_auth_nosasl() {
        let props = ConnectionProperties::from_str("hive2://localhost;auth=noSasl").unwrap();
        assert_eq!(props.auth, AuthMode::NoSasl);

        assert!(ConnectionProperties::from_str("hive2://localhost;auth=kerberos").is_err());
    }

    #[test]
    fn test_parse_ipv6() {
        let props = ConnectionProperties::from_str("hive2://[::1]:10002").unwrap();

        assert_eq!(props.host, "::1");
        assert_eq!(props.port, 10002);
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let err =
            ConnectionProperties::from_str("hive2://localhost;principal=hive/_HOST").unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::InvalidParameter { parameter, .. } if parameter == "principal"
        ));

        assert!(ConnectionProperties::from_str("hive2://localhost?fetchSize=10").is_err());
    }

    #[test]
    fn test_parse_invalid_values() {
        assert!(ConnectionProperties::from_str("postgres://localhost").is_err());
        assert!(ConnectionProperties::from_str("hive2://localhost:port").is_err());
        assert!(ConnectionProperties::from_str("hive2://localhost;fetchSize=0").is_err());
        assert!(ConnectionProperties::from_str("hive2://localhost;protocolVersion=11").is_err());
        assert!(ConnectionProperties::from_str("hive2://localhost;ssl=maybe").is_err());
        assert!(ConnectionProperties::from_str("hive2://;user=x").is_err());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let props: ConnectionProperties = serde_json::from_str(
            r#"{"host": "hs2", "transport_mode": "http", "session_config": {"hive.exec.parallel": "true"}}"#,
        )
        .unwrap();

        assert_eq!(props.host, "hs2");
        assert_eq!(props.port, 10000);
        assert_eq!(props.transport_mode, TransportMode::Http);
        assert_eq!(props.fetch_size, 1000);
        assert!(props.validate().is_ok());
    }

    #[test]
    fn test_debug_and_display_no_password_leak() {
        let props =
            ConnectionProperties::new("localhost", 10000).with_credentials("admin", "super_secret");

        let debug = format!("{:?}", props);
        assert!(!debug.contains("super_secret"));
        assert!(debug.contains("<redacted>"));

        let display = format!("{}", props);
        assert!(!display.contains("super_secret"));
        assert!(display.contains("admin"));
    }
}
