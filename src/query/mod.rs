//! Operation submission, completion polling and result retrieval.
//!
//! - `statement` - SQL execution on a [`Session`](crate::connection::Session)
//! - `metadata` - catalog requests
//! - `operation` - the [`Operation`] handle: status, cancel, close, schema
//! - `results` - paginated fetching and the lazy row sequence
//! - `poll` - pacing between status polls
//!
//! # Example
//!
//! ```no_run
//! # use hivearrow_rs::connection::Session;
//! # use std::sync::Arc;
//! # async fn example(session: Arc<Session>) -> Result<(), hivearrow_rs::HiveError> {
//! let operation = session.execute_sql("SELECT id, name FROM customers").await?;
//! let mut rows = operation.results().await?;
//! while let Some(row) = rows.next().await? {
//!     println!("{:?}", row.get(1));
//! }
//! operation.close().await;
//! # Ok(())
//! # }
//! ```

mod metadata;
pub mod operation;
pub mod poll;
pub mod results;
mod statement;

pub use operation::{
    FetchDirection, FetchOptions, Holdability, Operation, OperationKind, ResultConcurrency,
    ResultSetType,
};
pub use poll::{PollIntervals, PollPolicy};
pub use results::{PageSource, RowIterator};
