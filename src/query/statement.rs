//! SQL statement execution.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::connection::session::Session;
use crate::error::{HiveError, QueryError};
use crate::query::operation::{Operation, OperationKind};
use crate::query::results::PageSource;
use crate::transport::messages::ExecuteStatementReq;

impl Session {
    /// Submit `sql` for asynchronous execution without waiting for it.
    pub async fn submit_sql(self: &Arc<Self>, sql: &str) -> Result<Operation, HiveError> {
        self.ensure_open()?;
        let request = ExecuteStatementReq {
            session_handle: self.handle().clone(),
            statement: sql.trim().to_string(),
            conf_overlay: BTreeMap::new(),
            run_async: true,
            query_timeout: i64::try_from(self.properties().query_timeout.as_secs())
                .unwrap_or(i64::MAX),
        };
        let response = self
            .client()
            .lock()
            .await
            .execute_statement(request)
            .await
            .map_err(QueryError::Transport)?;
        Ok(Operation::from_response(
            response,
            "ExecuteStatement",
            self,
            OperationKind::Statement,
        )?)
    }

    /// Execute `sql` and wait until the server has finished it.
    ///
    /// With `fetch_server_logs` set, the first page of server log lines is
    /// fetched in the background and written to the `debug` log.
    pub async fn execute_sql(self: &Arc<Self>, sql: &str) -> Result<Operation, HiveError> {
        let operation = self.submit_sql(sql).await?;
        if self.properties().fetch_server_logs {
            spawn_log_fetch(operation.clone());
        }
        operation.wait_for_completion().await?;
        Ok(operation)
    }
}

fn spawn_log_fetch(operation: Operation) {
    tokio::spawn(async move {
        if let Err(e) = log_first_page(operation).await {
            warn!(error = %e, "failed to fetch server logs");
        }
    });
}

async fn log_first_page(operation: Operation) -> Result<(), HiveError> {
    let page_size = operation.options().fetch_size;
    let mut source = PageSource::server_log(operation, page_size);
    if let Some(batch) = source.next_batch().await? {
        for row in batch.into_rows() {
            if let Some(line) = row.get(1) {
                debug!(target: "hivearrow_rs::server_log", "{}", line);
            }
        }
    }
    Ok(())
}
