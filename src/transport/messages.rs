//! TCLIService message types.
//!
//! This module defines the request and response structures of the HiveServer2
//! RPC interface together with their Thrift binary encodings. Requests are
//! encoded, responses are decoded; handles go both ways.

use super::thrift::{DecodeError, TType, ThriftDecode, ThriftEncode, ThriftReader, ThriftWriter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Protocol versions understood by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    V1 = 0,
    V2 = 1,
    V3 = 2,
    V4 = 3,
    V5 = 4,
    V6 = 5,
    V7 = 6,
    V8 = 7,
    V9 = 8,
    V10 = 9,
}

impl ProtocolVersion {
    const ALL: [ProtocolVersion; 10] = [
        ProtocolVersion::V1,
        ProtocolVersion::V2,
        ProtocolVersion::V3,
        ProtocolVersion::V4,
        ProtocolVersion::V5,
        ProtocolVersion::V6,
        ProtocolVersion::V7,
        ProtocolVersion::V8,
        ProtocolVersion::V9,
        ProtocolVersion::V10,
    ];

    pub fn from_i32(value: i32) -> Option<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    /// Version from its 1-based number, as written in connection URLs.
    pub fn from_number(number: u8) -> Option<Self> {
        Self::from_i32(i32::from(number) - 1)
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// The next older version, `None` for V1.
    pub fn lower(self) -> Option<Self> {
        Self::from_i32(self.as_i32() - 1)
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        ProtocolVersion::V10
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HIVE_CLI_SERVICE_PROTOCOL_V{}", self.as_i32() + 1)
    }
}

/// Response status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Success = 0,
    SuccessWithInfo = 1,
    StillExecuting = 2,
    Error = 3,
    InvalidHandle = 4,
}

impl StatusCode {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(StatusCode::Success),
            1 => Some(StatusCode::SuccessWithInfo),
            2 => Some(StatusCode::StillExecuting),
            3 => Some(StatusCode::Error),
            4 => Some(StatusCode::InvalidHandle),
            _ => None,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::Success => "SUCCESS_STATUS",
            StatusCode::SuccessWithInfo => "SUCCESS_WITH_INFO_STATUS",
            StatusCode::StillExecuting => "STILL_EXECUTING_STATUS",
            StatusCode::Error => "ERROR_STATUS",
            StatusCode::InvalidHandle => "INVALID_HANDLE_STATUS",
        };
        f.write_str(name)
    }
}

/// Operation lifecycle states reported by `GetOperationStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Initialized = 0,
    Running = 1,
    Finished = 2,
    Canceled = 3,
    Closed = 4,
    Error = 5,
    Unknown = 6,
    Pending = 7,
    TimedOut = 8,
}

impl OperationState {
    pub fn from_i32(value: i32) -> Option<Self> {
        Some(match value {
            0 => OperationState::Initialized,
            1 => OperationState::Running,
            2 => OperationState::Finished,
            3 => OperationState::Canceled,
            4 => OperationState::Closed,
            5 => OperationState::Error,
            6 => OperationState::Unknown,
            7 => OperationState::Pending,
            8 => OperationState::TimedOut,
            _ => return None,
        })
    }

    /// Whether the server will not move the operation out of this state.
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            OperationState::Initialized | OperationState::Pending | OperationState::Running
        )
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationState::Initialized => "INITIALIZED_STATE",
            OperationState::Running => "RUNNING_STATE",
            OperationState::Finished => "FINISHED_STATE",
            OperationState::Canceled => "CANCELED_STATE",
            OperationState::Closed => "CLOSED_STATE",
            OperationState::Error => "ERROR_STATE",
            OperationState::Unknown => "UKNOWN_STATE",
            OperationState::Pending => "PENDING_STATE",
            OperationState::TimedOut => "TIMEDOUT_STATE",
        };
        f.write_str(name)
    }
}

/// Kinds of server-side operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    ExecuteStatement = 0,
    GetTypeInfo = 1,
    GetCatalogs = 2,
    GetSchemas = 3,
    GetTables = 4,
    GetTableTypes = 5,
    GetColumns = 6,
    GetFunctions = 7,
    Unknown = 8,
}

impl OperationType {
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => OperationType::ExecuteStatement,
            1 => OperationType::GetTypeInfo,
            2 => OperationType::GetCatalogs,
            3 => OperationType::GetSchemas,
            4 => OperationType::GetTables,
            5 => OperationType::GetTableTypes,
            6 => OperationType::GetColumns,
            7 => OperationType::GetFunctions,
            _ => OperationType::Unknown,
        }
    }
}

/// Fetch orientation of `FetchResults`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrientation {
    Next = 0,
    Prior = 1,
    Relative = 2,
    Absolute = 3,
    First = 4,
    Last = 5,
}

/// What a `FetchResults` call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchType {
    /// Query result rows
    QueryOutput = 0,
    /// Server log lines
    Log = 1,
}

/// Server info keys for `GetInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoType {
    MaxDriverConnections = 0,
    MaxConcurrentActivities = 1,
    DataSourceName = 2,
    FetchDirection = 8,
    ServerName = 13,
    SearchPatternEscape = 14,
    DbmsName = 17,
    DbmsVersion = 18,
    AccessibleTables = 19,
    DataSourceReadOnly = 25,
    IdentifierCase = 28,
    IdentifierQuoteChar = 29,
    MaxColumnNameLen = 30,
    MaxSchemaNameLen = 32,
    MaxCatalogNameLen = 34,
    MaxTableNameLen = 35,
    TxnCapable = 46,
    UserName = 47,
}

/// Value returned by `GetInfo`.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    String(String),
    SmallInt(i16),
    IntegerBitmask(i32),
    IntegerFlag(i32),
    BinaryValue(i32),
    Len(i64),
}

/// Response status carried by every response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TStatus {
    pub status_code: i32,
    pub info_messages: Vec<String>,
    pub sql_state: Option<String>,
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
}

impl TStatus {
    /// A plain success status.
    pub fn success() -> Self {
        Self::default()
    }

    /// An error status with a message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::Error as i32,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn code(&self) -> Option<StatusCode> {
        StatusCode::from_i32(self.status_code)
    }
}

impl ThriftDecode for TStatus {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut code = None;
        let mut status = TStatus::default();
        r.read_struct(|r, id, ttype| {
            match (id, ttype) {
                (1, TType::I32) => code = Some(r.read_i32()?),
                (2, TType::List) => status.info_messages = r.read_list(|r| r.read_string())?,
                (3, TType::String) => status.sql_state = Some(r.read_string()?),
                (4, TType::I32) => status.error_code = Some(r.read_i32()?),
                (5, TType::String) => status.error_message = Some(r.read_string()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        status.status_code = required(code, "TStatus", "statusCode")?;
        Ok(status)
    }
}

/// Opaque server handle identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct HandleIdentifier {
    pub guid: Vec<u8>,
    pub secret: Vec<u8>,
}

impl ThriftEncode for HandleIdentifier {
    fn encode(&self, w: &mut ThriftWriter) {
        w.field_binary(1, &self.guid);
        w.field_binary(2, &self.secret);
        w.write_field_stop();
    }
}

impl ThriftDecode for HandleIdentifier {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut guid = None;
        let mut secret = None;
        r.read_struct(|r, id, ttype| {
            match (id, ttype) {
                (1, TType::String) => guid = Some(r.read_binary()?),
                (2, TType::String) => secret = Some(r.read_binary()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Self {
            guid: required(guid, "THandleIdentifier", "guid")?,
            secret: required(secret, "THandleIdentifier", "secret")?,
        })
    }
}

/// Server session handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SessionHandle {
    pub session_id: HandleIdentifier,
}

impl ThriftEncode for SessionHandle {
    fn encode(&self, w: &mut ThriftWriter) {
        w.field_struct(1, &self.session_id);
        w.write_field_stop();
    }
}

impl ThriftDecode for SessionHandle {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut session_id = None;
        r.read_struct(|r, id, ttype| {
            if (id, ttype) == (1, TType::Struct) {
                session_id = Some(r.read()?);
                return Ok(true);
            }
            Ok(false)
        })?;
        Ok(Self {
            session_id: required(session_id, "TSessionHandle", "sessionId")?,
        })
    }
}

/// Server operation handle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperationHandle {
    pub operation_id: HandleIdentifier,
    pub operation_type: i32,
    pub has_result_set: bool,
    pub modified_row_count: Option<f64>,
}

impl OperationHandle {
    pub fn kind(&self) -> OperationType {
        OperationType::from_i32(self.operation_type)
    }
}

impl ThriftEncode for OperationHandle {
    fn encode(&self, w: &mut ThriftWriter) {
        w.field_struct(1, &self.operation_id);
        w.field_i32(2, self.operation_type);
        w.field_bool(3, self.has_result_set);
        if let Some(count) = self.modified_row_count {
            w.field_double(4, count);
        }
        w.write_field_stop();
    }
}

impl ThriftDecode for OperationHandle {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut operation_id = None;
        let mut operation_type = None;
        let mut handle = OperationHandle::default();
        r.read_struct(|r, id, ttype| {
            match (id, ttype) {
                (1, TType::Struct) => operation_id = Some(r.read()?),
                (2, TType::I32) => operation_type = Some(r.read_i32()?),
                (3, TType::Bool) => handle.has_result_set = r.read_bool()?,
                (4, TType::Double) => handle.modified_row_count = Some(r.read_double()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        handle.operation_id = required(operation_id, "TOperationHandle", "operationId")?;
        handle.operation_type = required(operation_type, "TOperationHandle", "operationType")?;
        Ok(handle)
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// `OpenSession` request.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenSessionReq {
    pub client_protocol: ProtocolVersion,
    pub username: Option<String>,
    pub password: Option<String>,
    pub configuration: BTreeMap<String, String>,
}

impl ThriftEncode for OpenSessionReq {
    fn encode(&self, w: &mut ThriftWriter) {
        w.field_i32(1, self.client_protocol.as_i32());
        w.field_opt_string(2, self.username.as_deref());
        w.field_opt_string(3, self.password.as_deref());
        if !self.configuration.is_empty() {
            w.field_string_map(4, &self.configuration);
        }
        w.write_field_stop();
    }
}

/// Request carrying only a session handle.
///
/// Used by `CloseSession`, `GetTypeInfo`, `GetCatalogs` and `GetTableTypes`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReq {
    pub session_handle: SessionHandle,
}

impl ThriftEncode for SessionReq {
    fn encode(&self, w: &mut ThriftWriter) {
        w.field_struct(1, &self.session_handle);
        w.write_field_stop();
    }
}

/// `GetInfo` request.
#[derive(Debug, Clone, PartialEq)]
pub struct GetInfoReq {
    pub session_handle: SessionHandle,
    pub info_type: InfoType,
}

impl ThriftEncode for GetInfoReq {
    fn encode(&self, w: &mut ThriftWriter) {
        w.field_struct(1, &self.session_handle);
        w.field_i32(2, self.info_type as i32);
        w.write_field_stop();
    }
}

/// `ExecuteStatement` request.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteStatementReq {
    pub session_handle: SessionHandle,
    pub statement: String,
    pub conf_overlay: BTreeMap<String, String>,
    pub run_async: bool,
    /// Seconds, 0 for the server default
    pub query_timeout: i64,
}

impl ThriftEncode for ExecuteStatementReq {
    fn encode(&self, w: &mut ThriftWriter) {
        w.field_struct(1, &self.session_handle);
        w.field_string(2, &self.statement);
        if !self.conf_overlay.is_empty() {
            w.field_string_map(3, &self.conf_overlay);
        }
        w.field_bool(4, self.run_async);
        w.field_i64(5, self.query_timeout);
        w.write_field_stop();
    }
}

/// `GetSchemas` request.
#[derive(Debug, Clone, PartialEq)]
pub struct GetSchemasReq {
    pub session_handle: SessionHandle,
    pub catalog_name: Option<String>,
    pub schema_name: Option<String>,
}

impl ThriftEncode for GetSchemasReq {
    fn encode(&self, w: &mut ThriftWriter) {
        w.field_struct(1, &self.session_handle);
        w.field_opt_string(2, self.catalog_name.as_deref());
        w.field_opt_string(3, self.schema_name.as_deref());
        w.write_field_stop();
    }
}

/// `GetTables` request.
#[derive(Debug, Clone, PartialEq)]
pub struct GetTablesReq {
    pub session_handle: SessionHandle,
    pub catalog_name: Option<String>,
    pub schema_name: Option<String>,
    pub table_name: Option<String>,
    pub table_types: Option<Vec<String>>,
}

impl ThriftEncode for GetTablesReq {
    fn encode(&self, w: &mut ThriftWriter) {
        w.field_struct(1, &self.session_handle);
        w.field_opt_string(2, self.catalog_name.as_deref());
        w.field_opt_string(3, self.schema_name.as_deref());
        w.field_opt_string(4, self.table_name.as_deref());
        if let Some(types) = &self.table_types {
            w.field_string_list(5, types);
        }
        w.write_field_stop();
    }
}

/// `GetColumns` request.
#[derive(Debug, Clone, PartialEq)]
pub struct GetColumnsReq {
    pub session_handle: SessionHandle,
    pub catalog_name: Option<String>,
    pub schema_name: Option<String>,
    pub table_name: Option<String>,
    pub column_name: Option<String>,
}

impl ThriftEncode for GetColumnsReq {
    fn encode(&self, w: &mut ThriftWriter) {
        w.field_struct(1, &self.session_handle);
        w.field_opt_string(2, self.catalog_name.as_deref());
        w.field_opt_string(3, self.schema_name.as_deref());
        w.field_opt_string(4, self.table_name.as_deref());
        w.field_opt_string(5, self.column_name.as_deref());
        w.write_field_stop();
    }
}

/// `GetFunctions` request.
#[derive(Debug, Clone, PartialEq)]
pub struct GetFunctionsReq {
    pub session_handle: SessionHandle,
    pub catalog_name: Option<String>,
    pub schema_name: Option<String>,
    pub function_name: String,
}

impl ThriftEncode for GetFunctionsReq {
    fn encode(&self, w: &mut ThriftWriter) {
        w.field_struct(1, &self.session_handle);
        w.field_opt_string(2, self.catalog_name.as_deref());
        w.field_opt_string(3, self.schema_name.as_deref());
        w.field_string(4, &self.function_name);
        w.write_field_stop();
    }
}

/// Request carrying only an operation handle.
///
/// Used by `GetOperationStatus`, `CancelOperation`, `CloseOperation` and
/// `GetResultSetMetadata`.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationReq {
    pub operation_handle: OperationHandle,
}

impl ThriftEncode for OperationReq {
    fn encode(&self, w: &mut ThriftWriter) {
        w.field_struct(1, &self.operation_handle);
        w.write_field_stop();
    }
}

/// `FetchResults` request.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResultsReq {
    pub operation_handle: OperationHandle,
    pub orientation: FetchOrientation,
    pub max_rows: i64,
    pub fetch_type: FetchType,
}

impl ThriftEncode for FetchResultsReq {
    fn encode(&self, w: &mut ThriftWriter) {
        w.field_struct(1, &self.operation_handle);
        w.field_i32(2, self.orientation as i32);
        w.field_i64(3, self.max_rows);
        w.field_i16(4, self.fetch_type as i16);
        w.write_field_stop();
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// `OpenSession` response.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenSessionResp {
    pub status: TStatus,
    pub server_protocol_version: i32,
    pub session_handle: Option<SessionHandle>,
    pub configuration: BTreeMap<String, String>,
}

impl ThriftDecode for OpenSessionResp {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut status = None;
        let mut server_protocol_version = None;
        let mut session_handle = None;
        let mut configuration = BTreeMap::new();
        r.read_struct(|r, id, ttype| {
            match (id, ttype) {
                (1, TType::Struct) => status = Some(r.read()?),
                (2, TType::I32) => server_protocol_version = Some(r.read_i32()?),
                (3, TType::Struct) => session_handle = Some(r.read()?),
                (4, TType::Map) => configuration = r.read_string_map()?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Self {
            status: required(status, "TOpenSessionResp", "status")?,
            server_protocol_version: server_protocol_version.unwrap_or_default(),
            session_handle,
            configuration,
        })
    }
}

/// Response carrying only a status.
///
/// Returned by `CloseSession`, `CancelOperation` and `CloseOperation`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusResp {
    pub status: TStatus,
}

impl ThriftDecode for StatusResp {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut status = None;
        r.read_struct(|r, id, ttype| {
            if (id, ttype) == (1, TType::Struct) {
                status = Some(r.read()?);
                return Ok(true);
            }
            Ok(false)
        })?;
        Ok(Self {
            status: required(status, "TStatusResp", "status")?,
        })
    }
}

/// `GetInfo` response.
#[derive(Debug, Clone, PartialEq)]
pub struct GetInfoResp {
    pub status: TStatus,
    pub info_value: Option<InfoValue>,
}

impl ThriftDecode for GetInfoResp {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut status = None;
        let mut info_value = None;
        r.read_struct(|r, id, ttype| {
            match (id, ttype) {
                (1, TType::Struct) => status = Some(r.read()?),
                (2, TType::Struct) => info_value = decode_info_value(r)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Self {
            status: required(status, "TGetInfoResp", "status")?,
            info_value,
        })
    }
}

fn decode_info_value(r: &mut ThriftReader<'_>) -> Result<Option<InfoValue>, DecodeError> {
    let mut value = None;
    r.read_struct(|r, id, ttype| {
        let member = match (id, ttype) {
            (1, TType::String) => InfoValue::String(r.read_string()?),
            (2, TType::I16) => InfoValue::SmallInt(r.read_i16()?),
            (3, TType::I32) => InfoValue::IntegerBitmask(r.read_i32()?),
            (4, TType::I32) => InfoValue::IntegerFlag(r.read_i32()?),
            (5, TType::I32) => InfoValue::BinaryValue(r.read_i32()?),
            (6, TType::I64) => InfoValue::Len(r.read_i64()?),
            _ => return Ok(false),
        };
        set_union_member(&mut value, member, "TGetInfoValue")?;
        Ok(true)
    })?;
    Ok(value)
}

/// Response of every operation-submitting call.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResp {
    pub status: TStatus,
    pub operation_handle: Option<OperationHandle>,
}

impl ThriftDecode for OperationResp {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut status = None;
        let mut operation_handle = None;
        r.read_struct(|r, id, ttype| {
            match (id, ttype) {
                (1, TType::Struct) => status = Some(r.read()?),
                (2, TType::Struct) => operation_handle = Some(r.read()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Self {
            status: required(status, "TOperationResp", "status")?,
            operation_handle,
        })
    }
}

/// `GetOperationStatus` response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetOperationStatusResp {
    pub status: TStatus,
    /// Raw state; may be unset or outside the known enum
    pub operation_state: Option<i32>,
    pub sql_state: Option<String>,
    pub error_code: Option<i32>,
    pub error_message: Option<String>,
    pub task_status: Option<String>,
    pub operation_started: Option<i64>,
    pub operation_completed: Option<i64>,
    pub has_result_set: Option<bool>,
}

impl ThriftDecode for GetOperationStatusResp {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut status = None;
        let mut resp = GetOperationStatusResp::default();
        r.read_struct(|r, id, ttype| {
            match (id, ttype) {
                (1, TType::Struct) => status = Some(r.read()?),
                (2, TType::I32) => resp.operation_state = Some(r.read_i32()?),
                (3, TType::String) => resp.sql_state = Some(r.read_string()?),
                (4, TType::I32) => resp.error_code = Some(r.read_i32()?),
                (5, TType::String) => resp.error_message = Some(r.read_string()?),
                (6, TType::String) => resp.task_status = Some(r.read_string()?),
                (7, TType::I64) => resp.operation_started = Some(r.read_i64()?),
                (8, TType::I64) => resp.operation_completed = Some(r.read_i64()?),
                (9, TType::Bool) => resp.has_result_set = Some(r.read_bool()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        resp.status = required(status, "TGetOperationStatusResp", "status")?;
        Ok(resp)
    }
}

/// `GetResultSetMetadata` response.
#[derive(Debug, Clone, PartialEq)]
pub struct GetResultSetMetadataResp {
    pub status: TStatus,
    pub schema: Option<TableSchema>,
}

impl ThriftDecode for GetResultSetMetadataResp {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut status = None;
        let mut schema = None;
        r.read_struct(|r, id, ttype| {
            match (id, ttype) {
                (1, TType::Struct) => status = Some(r.read()?),
                (2, TType::Struct) => schema = Some(r.read()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Self {
            status: required(status, "TGetResultSetMetadataResp", "status")?,
            schema,
        })
    }
}

/// Result set schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSchema {
    pub columns: Vec<ColumnDesc>,
}

impl ThriftDecode for TableSchema {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut columns = Vec::new();
        r.read_struct(|r, id, ttype| {
            if (id, ttype) == (1, TType::List) {
                columns = r.read_list(|r| r.read())?;
                return Ok(true);
            }
            Ok(false)
        })?;
        Ok(Self { columns })
    }
}

/// Column description inside a result set schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDesc {
    pub column_name: String,
    pub type_desc: TypeDesc,
    /// 1-based
    pub position: i32,
    pub comment: Option<String>,
}

impl ThriftDecode for ColumnDesc {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut column_name = None;
        let mut type_desc = None;
        let mut position = None;
        let mut comment = None;
        r.read_struct(|r, id, ttype| {
            match (id, ttype) {
                (1, TType::String) => column_name = Some(r.read_string()?),
                (2, TType::Struct) => type_desc = Some(r.read()?),
                (3, TType::I32) => position = Some(r.read_i32()?),
                (4, TType::String) => comment = Some(r.read_string()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Self {
            column_name: required(column_name, "TColumnDesc", "columnName")?,
            type_desc: required(type_desc, "TColumnDesc", "typeDesc")?,
            position: required(position, "TColumnDesc", "position")?,
            comment,
        })
    }
}

/// Type description: the first entry is the column's type, later entries
/// are referenced by index from complex types.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeDesc {
    pub types: Vec<TypeEntry>,
}

impl TypeDesc {
    pub fn primitive(&self) -> Option<&PrimitiveTypeEntry> {
        match self.types.first() {
            Some(TypeEntry::Primitive(entry)) => Some(entry),
            _ => None,
        }
    }
}

impl ThriftDecode for TypeDesc {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut types = Vec::new();
        r.read_struct(|r, id, ttype| {
            if (id, ttype) == (1, TType::List) {
                let entries = r.read_list(decode_type_entry)?;
                types = entries.into_iter().flatten().collect();
                return Ok(true);
            }
            Ok(false)
        })?;
        Ok(Self { types })
    }
}

/// One entry of a type description.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeEntry {
    Primitive(PrimitiveTypeEntry),
    Array { element: i32 },
    Map { key: i32, value: i32 },
    Struct(BTreeMap<String, i32>),
    Union(BTreeMap<String, i32>),
    UserDefined(String),
}

/// Primitive type id plus qualifiers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrimitiveTypeEntry {
    pub type_id: i32,
    pub qualifiers: BTreeMap<String, TypeQualifierValue>,
}

/// Type qualifier value such as precision or maximum length.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeQualifierValue {
    I32(i32),
    String(String),
}

fn decode_type_entry(r: &mut ThriftReader<'_>) -> Result<Option<TypeEntry>, DecodeError> {
    let mut entry = None;
    r.read_struct(|r, id, ttype| {
        let member = match (id, ttype) {
            (1, TType::Struct) => TypeEntry::Primitive(decode_primitive_entry(r)?),
            (2, TType::Struct) => {
                let mut element = 0;
                r.read_struct(|r, id, ttype| {
                    if (id, ttype) == (1, TType::I32) {
                        element = r.read_i32()?;
                        return Ok(true);
                    }
                    Ok(false)
                })?;
                TypeEntry::Array { element }
            }
            (3, TType::Struct) => {
                let (mut key, mut value) = (0, 0);
                r.read_struct(|r, id, ttype| {
                    match (id, ttype) {
                        (1, TType::I32) => key = r.read_i32()?,
                        (2, TType::I32) => value = r.read_i32()?,
                        _ => return Ok(false),
                    }
                    Ok(true)
                })?;
                TypeEntry::Map { key, value }
            }
            (4, TType::Struct) => TypeEntry::Struct(decode_name_to_type(r)?),
            (5, TType::Struct) => TypeEntry::Union(decode_name_to_type(r)?),
            (6, TType::Struct) => {
                let mut class_name = String::new();
                r.read_struct(|r, id, ttype| {
                    if (id, ttype) == (1, TType::String) {
                        class_name = r.read_string()?;
                        return Ok(true);
                    }
                    Ok(false)
                })?;
                TypeEntry::UserDefined(class_name)
            }
            _ => return Ok(false),
        };
        set_union_member(&mut entry, member, "TTypeEntry")?;
        Ok(true)
    })?;
    Ok(entry)
}

fn decode_primitive_entry(r: &mut ThriftReader<'_>) -> Result<PrimitiveTypeEntry, DecodeError> {
    let mut type_id = None;
    let mut qualifiers = BTreeMap::new();
    r.read_struct(|r, id, ttype| {
        match (id, ttype) {
            (1, TType::I32) => type_id = Some(r.read_i32()?),
            (2, TType::Struct) => qualifiers = decode_qualifiers(r)?,
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    Ok(PrimitiveTypeEntry {
        type_id: required(type_id, "TPrimitiveTypeEntry", "type")?,
        qualifiers,
    })
}

fn decode_qualifiers(
    r: &mut ThriftReader<'_>,
) -> Result<BTreeMap<String, TypeQualifierValue>, DecodeError> {
    let mut out = BTreeMap::new();
    r.read_struct(|r, id, ttype| {
        if (id, ttype) != (1, TType::Map) {
            return Ok(false);
        }
        let (_, _, len) = r.read_map_begin()?;
        for _ in 0..len {
            let name = r.read_string()?;
            let mut value = None;
            r.read_struct(|r, id, ttype| {
                let member = match (id, ttype) {
                    (1, TType::I32) => TypeQualifierValue::I32(r.read_i32()?),
                    (2, TType::String) => TypeQualifierValue::String(r.read_string()?),
                    _ => return Ok(false),
                };
                set_union_member(&mut value, member, "TTypeQualifierValue")?;
                Ok(true)
            })?;
            if let Some(value) = value {
                out.insert(name, value);
            }
        }
        Ok(true)
    })?;
    Ok(out)
}

fn decode_name_to_type(r: &mut ThriftReader<'_>) -> Result<BTreeMap<String, i32>, DecodeError> {
    let mut out = BTreeMap::new();
    r.read_struct(|r, id, ttype| {
        if (id, ttype) != (1, TType::Map) {
            return Ok(false);
        }
        let (_, _, len) = r.read_map_begin()?;
        for _ in 0..len {
            let name = r.read_string()?;
            out.insert(name, r.read_i32()?);
        }
        Ok(true)
    })?;
    Ok(out)
}

/// `FetchResults` response.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResultsResp {
    pub status: TStatus,
    pub has_more_rows: Option<bool>,
    pub results: Option<RowSet>,
}

impl ThriftDecode for FetchResultsResp {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut status = None;
        let mut has_more_rows = None;
        let mut results = None;
        r.read_struct(|r, id, ttype| {
            match (id, ttype) {
                (1, TType::Struct) => status = Some(r.read()?),
                (2, TType::Bool) => has_more_rows = Some(r.read_bool()?),
                (3, TType::Struct) => results = Some(r.read()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(Self {
            status: required(status, "TFetchResultsResp", "status")?,
            has_more_rows,
            results,
        })
    }
}

/// A page of results in columnar form.
///
/// Row-oriented `rows` and the `binaryColumns` blob are not used by columnar
/// servers and are skipped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowSet {
    pub start_row_offset: i64,
    /// One entry per column; `None` where no value kind was set
    pub columns: Option<Vec<Option<TColumn>>>,
    pub column_count: Option<i32>,
}

impl ThriftDecode for RowSet {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut row_set = RowSet::default();
        r.read_struct(|r, id, ttype| {
            match (id, ttype) {
                (1, TType::I64) => row_set.start_row_offset = r.read_i64()?,
                (3, TType::List) => row_set.columns = Some(r.read_list(decode_column)?),
                (5, TType::I32) => row_set.column_count = Some(r.read_i32()?),
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(row_set)
    }
}

/// Values of one column plus its null bitmap.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypedColumn<T> {
    pub values: Vec<T>,
    pub nulls: Vec<u8>,
}

impl<T> TypedColumn<T> {
    pub fn new(values: Vec<T>, nulls: Vec<u8>) -> Self {
        Self { values, nulls }
    }
}

/// Wire column, one variant per physical value kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TColumn {
    Bool(TypedColumn<bool>),
    Byte(TypedColumn<i8>),
    I16(TypedColumn<i16>),
    I32(TypedColumn<i32>),
    I64(TypedColumn<i64>),
    Double(TypedColumn<f64>),
    String(TypedColumn<String>),
    Binary(TypedColumn<Vec<u8>>),
}

impl TColumn {
    pub fn len(&self) -> usize {
        match self {
            TColumn::Bool(c) => c.values.len(),
            TColumn::Byte(c) => c.values.len(),
            TColumn::I16(c) => c.values.len(),
            TColumn::I32(c) => c.values.len(),
            TColumn::I64(c) => c.values.len(),
            TColumn::Double(c) => c.values.len(),
            TColumn::String(c) => c.values.len(),
            TColumn::Binary(c) => c.values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn nulls(&self) -> &[u8] {
        match self {
            TColumn::Bool(c) => &c.nulls,
            TColumn::Byte(c) => &c.nulls,
            TColumn::I16(c) => &c.nulls,
            TColumn::I32(c) => &c.nulls,
            TColumn::I64(c) => &c.nulls,
            TColumn::Double(c) => &c.nulls,
            TColumn::String(c) => &c.nulls,
            TColumn::Binary(c) => &c.nulls,
        }
    }
}

fn decode_column(r: &mut ThriftReader<'_>) -> Result<Option<TColumn>, DecodeError> {
    let mut column = None;
    r.read_struct(|r, id, ttype| {
        if ttype != TType::Struct {
            return Ok(false);
        }
        let member = match id {
            1 => TColumn::Bool(decode_typed(r, |r| r.read_bool())?),
            2 => TColumn::Byte(decode_typed(r, |r| r.read_byte())?),
            3 => TColumn::I16(decode_typed(r, |r| r.read_i16())?),
            4 => TColumn::I32(decode_typed(r, |r| r.read_i32())?),
            5 => TColumn::I64(decode_typed(r, |r| r.read_i64())?),
            6 => TColumn::Double(decode_typed(r, |r| r.read_double())?),
            7 => TColumn::String(decode_typed(r, |r| r.read_string())?),
            8 => TColumn::Binary(decode_typed(r, |r| r.read_binary())?),
            _ => return Ok(false),
        };
        set_union_member(&mut column, member, "TColumn")?;
        Ok(true)
    })?;
    Ok(column)
}

fn decode_typed<T, F>(
    r: &mut ThriftReader<'_>,
    mut read_value: F,
) -> Result<TypedColumn<T>, DecodeError>
where
    F: FnMut(&mut ThriftReader<'_>) -> Result<T, DecodeError>,
{
    let mut values = Vec::new();
    let mut nulls = Vec::new();
    r.read_struct(|r, id, ttype| {
        match (id, ttype) {
            (1, TType::List) => values = r.read_list(|r| read_value(r))?,
            (2, TType::String) => nulls = r.read_binary()?,
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    Ok(TypedColumn { values, nulls })
}

/// Exception raised by the RPC layer instead of a reply.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApplicationException {
    pub message: String,
    pub kind: i32,
}

impl ThriftDecode for ApplicationException {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut exception = ApplicationException::default();
        r.read_struct(|r, id, ttype| {
            match (id, ttype) {
                (1, TType::String) => exception.message = r.read_string()?,
                (2, TType::I32) => exception.kind = r.read_i32()?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;
        Ok(exception)
    }
}

fn required<T>(
    value: Option<T>,
    structure: &'static str,
    field: &'static str,
) -> Result<T, DecodeError> {
    value.ok_or(DecodeError::MissingField { structure, field })
}

fn set_union_member<T>(
    slot: &mut Option<T>,
    member: T,
    union: &'static str,
) -> Result<(), DecodeError> {
    if slot.is_some() {
        return Err(DecodeError::UnionConflict(union));
    }
    *slot = Some(member);
    Ok(())
}
