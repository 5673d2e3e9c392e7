//! Shared mocks and fixtures for unit tests.

use async_trait::async_trait;
use mockall::mock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::connection::{ConnectionProperties, Session};
use crate::error::TransportError;
use crate::transport::client::CliService;
use crate::transport::messages::{
    ColumnDesc, ExecuteStatementReq, FetchResultsReq, FetchResultsResp, GetColumnsReq,
    GetFunctionsReq, GetInfoReq, GetInfoResp, GetOperationStatusResp, GetResultSetMetadataResp,
    GetSchemasReq, GetTablesReq, HandleIdentifier, OpenSessionReq, OpenSessionResp,
    OperationHandle, OperationReq, OperationResp, PrimitiveTypeEntry, RowSet, SessionHandle,
    SessionReq, StatusResp, TColumn, TStatus, TableSchema, TypeDesc, TypeEntry, TypedColumn,
};
use crate::transport::TransportHandle;

mock! {
    pub CliService {}

    #[async_trait]
    impl CliService for CliService {
        async fn open_session(&mut self, req: OpenSessionReq) -> Result<OpenSessionResp, TransportError>;
        async fn close_session(&mut self, req: SessionReq) -> Result<StatusResp, TransportError>;
        async fn get_info(&mut self, req: GetInfoReq) -> Result<GetInfoResp, TransportError>;
        async fn execute_statement(&mut self, req: ExecuteStatementReq) -> Result<OperationResp, TransportError>;
        async fn get_type_info(&mut self, req: SessionReq) -> Result<OperationResp, TransportError>;
        async fn get_catalogs(&mut self, req: SessionReq) -> Result<OperationResp, TransportError>;
        async fn get_schemas(&mut self, req: GetSchemasReq) -> Result<OperationResp, TransportError>;
        async fn get_tables(&mut self, req: GetTablesReq) -> Result<OperationResp, TransportError>;
        async fn get_table_types(&mut self, req: SessionReq) -> Result<OperationResp, TransportError>;
        async fn get_columns(&mut self, req: GetColumnsReq) -> Result<OperationResp, TransportError>;
        async fn get_functions(&mut self, req: GetFunctionsReq) -> Result<OperationResp, TransportError>;
        async fn get_operation_status(&mut self, req: OperationReq) -> Result<GetOperationStatusResp, TransportError>;
        async fn cancel_operation(&mut self, req: OperationReq) -> Result<StatusResp, TransportError>;
        async fn close_operation(&mut self, req: OperationReq) -> Result<StatusResp, TransportError>;
        async fn get_result_set_metadata(&mut self, req: OperationReq) -> Result<GetResultSetMetadataResp, TransportError>;
        async fn fetch_results(&mut self, req: FetchResultsReq) -> Result<FetchResultsResp, TransportError>;
        async fn open_transport(&mut self) -> Result<(), TransportError>;
        fn is_open(&self) -> bool;
        async fn shutdown(&mut self) -> Result<(), TransportError>;
    }
}

pub(crate) fn session_handle() -> SessionHandle {
    SessionHandle {
        session_id: HandleIdentifier {
            guid: vec![1; 16],
            secret: vec![2; 16],
        },
    }
}

pub(crate) fn operation_handle(operation_type: i32) -> OperationHandle {
    OperationHandle {
        operation_id: HandleIdentifier {
            guid: vec![3; 16],
            secret: vec![4; 16],
        },
        operation_type,
        has_result_set: true,
        modified_row_count: None,
    }
}

pub(crate) fn open_session_ok(server_protocol_version: i32) -> OpenSessionResp {
    OpenSessionResp {
        status: TStatus::success(),
        server_protocol_version,
        session_handle: Some(session_handle()),
        configuration: BTreeMap::new(),
    }
}

pub(crate) fn operation_ok(operation_type: i32) -> OperationResp {
    OperationResp {
        status: TStatus::success(),
        operation_handle: Some(operation_handle(operation_type)),
    }
}

pub(crate) fn status_ok() -> StatusResp {
    StatusResp {
        status: TStatus::success(),
    }
}

pub(crate) fn state_resp(state: Option<i32>) -> GetOperationStatusResp {
    GetOperationStatusResp {
        status: TStatus::success(),
        operation_state: state,
        ..GetOperationStatusResp::default()
    }
}

pub(crate) fn column_desc(name: &str, type_id: i32, position: i32) -> ColumnDesc {
    ColumnDesc {
        column_name: name.to_string(),
        type_desc: TypeDesc {
            types: vec![TypeEntry::Primitive(PrimitiveTypeEntry {
                type_id,
                qualifiers: BTreeMap::new(),
            })],
        },
        position,
        comment: None,
    }
}

pub(crate) fn metadata_resp(columns: Vec<ColumnDesc>) -> GetResultSetMetadataResp {
    GetResultSetMetadataResp {
        status: TStatus::success(),
        schema: Some(TableSchema { columns }),
    }
}

/// A page with one BIGINT column holding `start..start + rows`.
pub(crate) fn i64_page(start: i64, rows: usize) -> FetchResultsResp {
    let values = (start..start + rows as i64).collect();
    FetchResultsResp {
        status: TStatus::success(),
        has_more_rows: None,
        results: Some(RowSet {
            start_row_offset: start,
            columns: Some(vec![Some(TColumn::I64(TypedColumn::new(values, vec![])))]),
            column_count: Some(1),
        }),
    }
}

/// A page with one STRING column.
pub(crate) fn string_page(lines: &[&str]) -> FetchResultsResp {
    let values = lines.iter().map(|line| line.to_string()).collect();
    FetchResultsResp {
        status: TStatus::success(),
        has_more_rows: None,
        results: Some(RowSet {
            start_row_offset: 0,
            columns: Some(vec![Some(TColumn::String(TypedColumn::new(values, vec![])))]),
            column_count: Some(1),
        }),
    }
}

/// Open a session on `mock`, adding the `OpenSession` expectation.
pub(crate) async fn session_with(
    mut mock: MockCliService,
    properties: ConnectionProperties,
) -> Arc<Session> {
    mock.expect_open_session()
        .returning(|_| Ok(open_session_ok(9)));
    let transport = TransportHandle::from_parts(Arc::new(Mutex::new(mock)), Vec::new());
    Session::open(&transport, properties)
        .await
        .expect("session should open")
}
