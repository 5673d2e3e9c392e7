//! Common test utilities for hivearrow-rs integration tests.
//!
//! # Integration Test Prerequisites
//!
//! These integration tests require a running HiveServer2 instance.
//! The recommended approach is to use the Apache Hive Docker image:
//!
//! ```bash
//! docker run -d --name hive-test \
//!   -p 10000:10000 \
//!   --env SERVICE_NAME=hiveserver2 \
//!   apache/hive:4.0.0
//! ```
//!
//! # Configuration
//!
//! | Default Constant   | Environment Variable | Default Value |
//! |--------------------|----------------------|---------------|
//! | `DEFAULT_HOST`     | `HIVE_HOST`          | "localhost"   |
//! | `DEFAULT_PORT`     | `HIVE_PORT`          | 10000         |
//! | `DEFAULT_USER`     | `HIVE_USER`          | "hive"        |
//! | `DEFAULT_PASSWORD` | `HIVE_PASSWORD`      | "hive"        |
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration_tests -- --ignored
//! HIVE_HOST=myhost HIVE_PORT=10001 cargo test --test integration_tests -- --ignored
//! ```

#![allow(dead_code)]

use hivearrow_rs::{ConnectionProperties, HiveError, Session, TransportHandle};
use std::env;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

/// Default host for HiveServer2 connections.
pub const DEFAULT_HOST: &str = "localhost";

/// Default port for HiveServer2 connections.
pub const DEFAULT_PORT: u16 = 10000;

pub const DEFAULT_USER: &str = "hive";

pub const DEFAULT_PASSWORD: &str = "hive";

const ENV_HIVE_HOST: &str = "HIVE_HOST";
const ENV_HIVE_PORT: &str = "HIVE_PORT";
const ENV_HIVE_USER: &str = "HIVE_USER";
const ENV_HIVE_PASSWORD: &str = "HIVE_PASSWORD";

/// Get the HiveServer2 host from `HIVE_HOST` or use the default.
pub fn get_host() -> String {
    env::var(ENV_HIVE_HOST).unwrap_or_else(|_| DEFAULT_HOST.to_string())
}

/// Get the port from `HIVE_PORT`; an invalid value falls back to the default.
pub fn get_port() -> u16 {
    env::var(ENV_HIVE_PORT)
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

pub fn get_user() -> String {
    env::var(ENV_HIVE_USER).unwrap_or_else(|_| DEFAULT_USER.to_string())
}

pub fn get_password() -> String {
    env::var(ENV_HIVE_PASSWORD).unwrap_or_else(|_| DEFAULT_PASSWORD.to_string())
}

/// Build a connection URL from the current configuration.
///
/// ```ignore
/// let url = get_test_connection_url();
/// // "hive2://localhost:10000/default;user=hive;password=hive"
/// ```
pub fn get_test_connection_url() -> String {
    format!(
        "hive2://{}:{}/default;user={};password={}",
        get_host(),
        get_port(),
        urlencoding::encode(&get_user()),
        urlencoding::encode(&get_password())
    )
}

pub fn get_test_properties() -> ConnectionProperties {
    ConnectionProperties::new(get_host(), get_port()).with_credentials(get_user(), get_password())
}

/// Open a transport and a session with the test configuration.
pub async fn get_test_session() -> Result<(TransportHandle, Arc<Session>), HiveError> {
    let properties = get_test_properties();
    let transport = TransportHandle::open(&properties).await?;
    let session = Session::open_with_fallback(&transport, properties).await?;
    Ok((transport, session))
}

/// Check if HiveServer2 accepts TCP connections at the configured address.
pub fn is_hive_available() -> bool {
    let addr = format!("{}:{}", get_host(), get_port());

    let socket_addrs: Vec<_> = match addr.to_socket_addrs() {
        Ok(addrs) => addrs.collect(),
        Err(_) => return false,
    };

    socket_addrs
        .iter()
        .any(|socket_addr| TcpStream::connect_timeout(socket_addr, Duration::from_secs(2)).is_ok())
}

/// Skip a test if HiveServer2 is not available.
#[macro_export]
macro_rules! skip_if_no_hive {
    () => {
        if !$crate::common::is_hive_available() {
            eprintln!(
                "Skipping test: HiveServer2 not available at {}:{}",
                $crate::common::get_host(),
                $crate::common::get_port()
            );
            return;
        }
    };
}

/// Unique table name for one test run.
pub fn generate_test_table_name() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis();

    format!("test_integration_{}", timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_HOST, "localhost");
        assert_eq!(DEFAULT_PORT, 10000);
        assert_eq!(DEFAULT_USER, "hive");
    }

    #[test]
    fn test_connection_url_parses() {
        let properties: ConnectionProperties = get_test_connection_url().parse().unwrap();
        assert_eq!(properties.host, get_host());
        assert_eq!(properties.port, get_port());
        assert_eq!(properties.username, Some(get_user()));
    }
}
