//! Connection configuration and server sessions.
//!
//! # Example
//!
//! ```no_run
//! # use hivearrow_rs::connection::{ConnectionProperties, Session};
//! # use hivearrow_rs::transport::TransportHandle;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let properties: ConnectionProperties =
//!     "hive2://localhost:10000/default;user=hive;password=hive".parse()?;
//!
//! let transport = TransportHandle::open(&properties).await?;
//! let session = Session::open(&transport, properties).await?;
//! // ...
//! session.close().await;
//! transport.close().await;
//! # Ok(())
//! # }
//! ```

pub mod params;
pub mod session;
pub mod status;

pub use params::{ConnectionProperties, HIVE_CONF_PREFIX};
pub use session::Session;
pub use status::check_status;
