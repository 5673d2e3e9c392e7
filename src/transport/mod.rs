//! Transport layer for HiveServer2 communication.
//!
//! The transport layer is organized into:
//! - `thrift` - Thrift binary protocol codec
//! - `messages` - TCLIService request and response types
//! - `protocol` - byte transport traits and modes
//! - `socket` - TCP transport with optional SASL PLAIN framing
//! - `http` - HTTP transport posting one message per request
//! - `client` - typed RPC client over a byte transport
//! - `handle` - ownership and teardown of one connection's transport
//!
//! # Example
//!
//! ```no_run
//! use hivearrow_rs::connection::ConnectionProperties;
//! use hivearrow_rs::transport::TransportHandle;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let properties = ConnectionProperties::new("localhost", 10000)
//!     .with_credentials("hive", "hive");
//! let transport = TransportHandle::open(&properties).await?;
//! assert!(transport.is_valid().await);
//! transport.close().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod handle;
pub mod http;
pub mod messages;
pub mod protocol;
pub mod socket;
pub mod thrift;

pub use client::{CliService, ThriftCliClient};
pub use handle::TransportHandle;
pub use http::{HttpParams, HttpTransport};
pub use protocol::{AuthMode, Closeable, TransportMode, TransportProtocol};
pub use socket::{SocketParams, SocketTransport};
