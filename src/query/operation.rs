//! Submitted server operations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arrow::array::RecordBatch;
use tokio::sync::OnceCell;
use tracing::{debug, trace, warn};

use crate::arrow_conversion::ArrowConverter;
use crate::connection::params::ConnectionProperties;
use crate::connection::session::Session;
use crate::connection::status::check_status;
use crate::error::{HiveError, OperationStateValue, QueryError};
use crate::query::results::{PageSource, RowIterator};
use crate::transport::messages::{
    GetOperationStatusResp, OperationHandle, OperationReq, OperationResp, OperationState,
    OperationType,
};
use crate::types::Schema;

/// Whether an operation was a catalog request or a SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Catalog request, complete on return
    Metadata,
    /// SQL statement, executed asynchronously by the server
    Statement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchDirection {
    #[default]
    Forward,
    Reverse,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultConcurrency {
    #[default]
    ReadOnly,
    Updatable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Holdability {
    HoldCursorsOverCommit,
    #[default]
    CloseCursorsAtCommit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultSetType {
    #[default]
    ForwardOnly,
    ScrollInsensitive,
    ScrollSensitive,
}

/// Client-side fetch parameters of an operation.
///
/// Only `fetch_size` and `max_rows` affect fetching; the remaining fields are
/// carried for cursor layers built on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Rows requested per `FetchResults` call
    pub fetch_size: usize,
    /// Row cap, 0 for none
    pub max_rows: usize,
    pub direction: FetchDirection,
    pub concurrency: ResultConcurrency,
    pub holdability: Holdability,
    pub result_set_type: ResultSetType,
}

impl FetchOptions {
    pub fn from_properties(properties: &ConnectionProperties) -> Self {
        Self {
            fetch_size: properties.fetch_size,
            max_rows: properties.max_rows,
            direction: FetchDirection::default(),
            concurrency: ResultConcurrency::default(),
            holdability: Holdability::default(),
            result_set_type: ResultSetType::default(),
        }
    }
}

/// One server-side unit of work.
///
/// Cloning is cheap and clones refer to the same operation, so one task may
/// wait or fetch while another cancels.
#[derive(Debug, Clone)]
pub struct Operation {
    inner: Arc<OperationInner>,
}

#[derive(Debug)]
struct OperationInner {
    handle: OperationHandle,
    session: Arc<Session>,
    kind: OperationKind,
    options: FetchOptions,
    schema: OnceCell<Arc<Schema>>,
    closed: AtomicBool,
}

/// Where polling stands after one status response.
enum Progress {
    Finished,
    Pending,
    Failed(OperationStateValue),
}

fn classify(state: Option<i32>) -> Progress {
    let Some(raw) = state else {
        return Progress::Pending;
    };
    match OperationState::from_i32(raw) {
        Some(OperationState::Finished) => Progress::Finished,
        Some(OperationState::Initialized | OperationState::Pending | OperationState::Running) => {
            Progress::Pending
        }
        Some(state) => Progress::Failed(OperationStateValue::Known(state)),
        None => Progress::Failed(OperationStateValue::Unrecognized(raw)),
    }
}

impl Operation {
    pub(crate) fn new(
        handle: OperationHandle,
        session: Arc<Session>,
        kind: OperationKind,
        options: FetchOptions,
    ) -> Self {
        Self {
            inner: Arc::new(OperationInner {
                handle,
                session,
                kind,
                options,
                schema: OnceCell::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Check a submission response and wrap its handle.
    pub(crate) fn from_response(
        response: OperationResp,
        method: &'static str,
        session: &Arc<Session>,
        kind: OperationKind,
    ) -> Result<Self, QueryError> {
        check_status(&response.status).map_err(QueryError::Status)?;
        let handle = response
            .operation_handle
            .ok_or(QueryError::MissingHandle(method))?;
        trace!(method, "operation submitted");
        Ok(Self::new(
            handle,
            Arc::clone(session),
            kind,
            FetchOptions::from_properties(session.properties()),
        ))
    }

    #[cfg(test)]
    pub(crate) fn for_test(session: Arc<Session>, operation_type: i32) -> Self {
        let options = FetchOptions::from_properties(session.properties());
        Self::new(
            crate::testing::operation_handle(operation_type),
            session,
            OperationKind::Statement,
            options,
        )
    }

    pub fn handle(&self) -> &OperationHandle {
        &self.inner.handle
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.inner.session
    }

    pub fn kind(&self) -> OperationKind {
        self.inner.kind
    }

    pub fn operation_type(&self) -> OperationType {
        self.inner.handle.kind()
    }

    pub fn has_result_set(&self) -> bool {
        self.inner.handle.has_result_set
    }

    pub fn options(&self) -> &FetchOptions {
        &self.inner.options
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Current server-side status.
    pub async fn status(&self) -> Result<GetOperationStatusResp, HiveError> {
        self.inner.session.ensure_open()?;
        let request = OperationReq {
            operation_handle: self.inner.handle.clone(),
        };
        let response = self
            .inner
            .session
            .client()
            .lock()
            .await
            .get_operation_status(request)
            .await
            .map_err(QueryError::Transport)?;
        check_status(&response.status).map_err(QueryError::Status)?;
        Ok(response)
    }

    /// Poll until the operation reaches a terminal state.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::OperationFailed` for any terminal state other
    /// than `FINISHED`, including states this client does not recognize.
    pub async fn wait_for_completion(&self) -> Result<(), HiveError> {
        let mut waits = self.inner.session.properties().poll.intervals();
        loop {
            let response = self.status().await?;
            match classify(response.operation_state) {
                Progress::Finished => {
                    debug!("operation finished");
                    return Ok(());
                }
                Progress::Failed(state) => {
                    debug!(state = %state, "operation failed");
                    return Err(QueryError::OperationFailed {
                        state,
                        sql_state: response.sql_state,
                        error_code: response.error_code,
                        message: response.error_message,
                    }
                    .into());
                }
                Progress::Pending => {
                    trace!(state = ?response.operation_state, "operation pending");
                    match waits.next() {
                        Some(wait) if !wait.is_zero() => tokio::time::sleep(wait).await,
                        _ => tokio::task::yield_now().await,
                    }
                }
            }
        }
    }

    /// Ask the server to abort the operation.
    ///
    /// Safe to call while another task polls or fetches. Failures are
    /// logged and not returned. Nothing is sent once the session is closed.
    pub async fn cancel(&self) {
        if self.inner.session.is_closed() {
            debug!("session closed, not cancelling operation");
            return;
        }
        let request = OperationReq {
            operation_handle: self.inner.handle.clone(),
        };
        let result = self
            .inner
            .session
            .client()
            .lock()
            .await
            .cancel_operation(request)
            .await;
        match result {
            Ok(response) => {
                if let Err(status) = check_status(&response.status) {
                    warn!(error = %status, "failed to cancel operation");
                }
            }
            Err(e) => warn!(error = %e, "failed to cancel operation"),
        }
    }

    /// Release the operation on the server.
    ///
    /// Only the first call sends `CloseOperation`, and only while the
    /// session is open. Failures are logged and not returned.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.inner.session.is_closed() {
            debug!("session closed, operation released with it");
            return;
        }
        trace!("closing operation");
        let request = OperationReq {
            operation_handle: self.inner.handle.clone(),
        };
        let result = self
            .inner
            .session
            .client()
            .lock()
            .await
            .close_operation(request)
            .await;
        match result {
            Ok(response) => {
                if let Err(status) = check_status(&response.status) {
                    warn!(error = %status, "failed to close operation");
                }
            }
            Err(e) => warn!(error = %e, "failed to close operation"),
        }
    }

    /// Result schema, fetched once and cached.
    pub async fn schema(&self) -> Result<Arc<Schema>, HiveError> {
        self.inner.session.ensure_open()?;
        let schema = self
            .inner
            .schema
            .get_or_try_init(|| async {
                let request = OperationReq {
                    operation_handle: self.inner.handle.clone(),
                };
                let response = self
                    .inner
                    .session
                    .client()
                    .lock()
                    .await
                    .get_result_set_metadata(request)
                    .await
                    .map_err(QueryError::Transport)?;
                check_status(&response.status).map_err(QueryError::Status)?;
                let schema = response.schema.ok_or(QueryError::MissingSchema)?;
                Ok::<_, QueryError>(Arc::new(Schema::from_table_schema(&schema)))
            })
            .await?;
        Ok(Arc::clone(schema))
    }

    /// Lazy row sequence over the results.
    pub async fn results(&self) -> Result<RowIterator, HiveError> {
        let source = self.batches().await?;
        Ok(RowIterator::new(source, self.inner.options.max_rows))
    }

    /// Page-by-page access to the results.
    pub async fn batches(&self) -> Result<PageSource, HiveError> {
        let schema = self.schema().await?;
        Ok(PageSource::new(
            self.clone(),
            schema,
            self.inner.options.fetch_size,
        ))
    }

    /// Fetch all remaining pages as Arrow record batches.
    pub async fn record_batches(&self) -> Result<Vec<RecordBatch>, HiveError> {
        let mut source = self.batches().await?;
        let converter = ArrowConverter::new(source.schema());
        let mut batches = Vec::new();
        while let Some(batch) = source.next_batch().await? {
            batches.push(converter.convert(&batch).map_err(QueryError::Conversion)?);
        }
        Ok(batches)
    }
}
