//! Paginated result retrieval.
//!
//! [`PageSource`] pulls one decoded page per `FetchResults` call.
//! [`RowIterator`] flattens those pages into rows, fetching lazily.

use std::sync::Arc;

use futures_util::stream::{self, Stream};
use tracing::debug;

use crate::connection::status::check_status;
use crate::data::{BatchRows, ColumnBatch, Row};
use crate::error::{HiveError, QueryError};
use crate::query::operation::Operation;
use crate::transport::messages::{FetchOrientation, FetchResultsReq, FetchType};
use crate::types::Schema;

/// Source of decoded pages for one operation.
///
/// Once a fetch returns no page or an empty page the source is ended and
/// issues no further calls.
#[derive(Debug)]
pub struct PageSource {
    operation: Operation,
    schema: Arc<Schema>,
    page_size: usize,
    orientation: FetchOrientation,
    fetch_type: FetchType,
    ended: bool,
}

impl PageSource {
    pub(crate) fn new(operation: Operation, schema: Arc<Schema>, page_size: usize) -> Self {
        Self {
            operation,
            schema,
            page_size,
            orientation: FetchOrientation::Next,
            fetch_type: FetchType::QueryOutput,
            ended: false,
        }
    }

    /// Server log lines of the operation, from the first line on.
    pub(crate) fn server_log(operation: Operation, page_size: usize) -> Self {
        Self {
            orientation: FetchOrientation::First,
            fetch_type: FetchType::Log,
            ..Self::new(operation, Schema::server_log(), page_size)
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Fetch and decode the next page, `None` once the results are drained.
    pub async fn next_batch(&mut self) -> Result<Option<ColumnBatch>, HiveError> {
        if self.ended {
            return Ok(None);
        }
        self.operation.session().ensure_open()?;

        let request = FetchResultsReq {
            operation_handle: self.operation.handle().clone(),
            orientation: self.orientation,
            max_rows: i64::try_from(self.page_size).unwrap_or(i64::MAX),
            fetch_type: self.fetch_type,
        };
        let response = self
            .operation
            .session()
            .client()
            .lock()
            .await
            .fetch_results(request)
            .await
            .map_err(QueryError::Transport)?;
        check_status(&response.status).map_err(QueryError::Status)?;

        let Some(row_set) = response.results else {
            self.ended = true;
            return Ok(None);
        };
        let batch =
            ColumnBatch::decode(row_set, Arc::clone(&self.schema)).map_err(QueryError::Conversion)?;
        if batch.is_empty() {
            self.ended = true;
            return Ok(None);
        }
        debug!(rows = batch.row_count(), "fetched page");
        Ok(Some(batch))
    }
}

/// Lazy row sequence over the pages of one operation.
///
/// A page shorter than the page size is taken as the last one. A positive
/// `max_rows` caps the number of rows returned.
#[derive(Debug)]
pub struct RowIterator {
    source: PageSource,
    current: Option<BatchRows>,
    page_rows: usize,
    page_size: usize,
    max_rows: usize,
    returned: usize,
    done: bool,
}

impl RowIterator {
    pub(crate) fn new(source: PageSource, max_rows: usize) -> Self {
        let page_size = source.page_size;
        Self {
            source,
            current: None,
            page_rows: 0,
            page_size,
            max_rows,
            returned: 0,
            done: false,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.source.schema()
    }

    /// Number of rows returned so far.
    pub fn rows_returned(&self) -> usize {
        self.returned
    }

    pub async fn next(&mut self) -> Result<Option<Row>, HiveError> {
        loop {
            if self.done {
                return Ok(None);
            }
            if self.max_rows > 0 && self.returned >= self.max_rows {
                self.done = true;
                return Ok(None);
            }

            if let Some(rows) = self.current.as_mut() {
                if let Some(row) = rows.next() {
                    self.page_rows += 1;
                    self.returned += 1;
                    return Ok(Some(row));
                }
                self.current = None;
                if self.page_rows < self.page_size {
                    self.done = true;
                    return Ok(None);
                }
            }

            match self.source.next_batch().await? {
                Some(batch) => {
                    self.current = Some(batch.into_rows());
                    self.page_rows = 0;
                }
                None => {
                    self.done = true;
                    return Ok(None);
                }
            }
        }
    }

    /// Drain the remaining rows.
    pub async fn collect(mut self) -> Result<Vec<Row>, HiveError> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Row, HiveError>> {
        stream::try_unfold(self, |mut rows| async move {
            Ok(rows.next().await?.map(|row| (row, rows)))
        })
    }
}
