//! # hivearrow-rs
//!
//! Async HiveServer2 client driver with Apache Arrow data format support.
//!
//! This library speaks the TCLIService Thrift protocol over a TCP socket
//! (optionally SASL PLAIN framed) or over HTTP. Statements run
//! asynchronously on the server and are polled to completion; results are
//! fetched page by page and exposed as typed rows or Arrow record batches.
//!
//! ## Example
//!
//! ```no_run
//! # use hivearrow_rs::*;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let properties: ConnectionProperties =
//!     "hive2://localhost:10000/default;user=hive;password=hive".parse()?;
//!
//! // Open the transport and a session on it
//! let transport = TransportHandle::open(&properties).await?;
//! let session = Session::open(&transport, properties).await?;
//!
//! // Execute a query and wait for it to finish
//! let operation = session.execute_sql("SELECT * FROM my_table").await?;
//!
//! // Process Arrow RecordBatch
//! for batch in operation.record_batches().await? {
//!     println!("Rows: {}", batch.num_rows());
//! }
//!
//! operation.close().await;
//! session.close().await;
//! transport.close().await;
//! # Ok(())
//! # }
//! ```

pub mod arrow_conversion;
pub mod connection;
pub mod data;
pub mod error;
pub mod query;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export public API
pub use arrow_conversion::ArrowConverter;
pub use connection::{ConnectionProperties, Session};
pub use data::{ColumnBatch, Row};
pub use error::{ConnectionError, ConversionError, HiveError, QueryError, TransportError};
pub use query::{Operation, PollPolicy, RowIterator};
pub use transport::messages::{InfoType, InfoValue, ProtocolVersion};
pub use transport::{AuthMode, TransportHandle, TransportMode};
pub use types::{ColumnValue, Decimal, HiveType, Schema, TypeMapper};
