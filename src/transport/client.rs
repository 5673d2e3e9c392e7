//! RPC client for the TCLIService interface.
//!
//! [`CliService`] is the seam the rest of the driver talks to: one async
//! method per RPC. [`ThriftCliClient`] implements it by framing each call as a
//! Thrift message and sending it through a [`TransportProtocol`].

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::TransportError;

use super::messages::{
    ApplicationException, ExecuteStatementReq, FetchResultsReq, FetchResultsResp, GetColumnsReq,
    GetFunctionsReq, GetInfoReq, GetInfoResp, GetOperationStatusResp, GetResultSetMetadataResp,
    GetSchemasReq, GetTablesReq, OpenSessionReq, OpenSessionResp, OperationReq, OperationResp,
    SessionReq, StatusResp,
};
use super::protocol::TransportProtocol;
use super::thrift::{
    DecodeError, MessageType, TType, ThriftDecode, ThriftEncode, ThriftReader, ThriftWriter,
};

/// One async method per TCLIService RPC.
///
/// Implementations are driven through `&mut self`; callers serialize access
/// with the session lock.
#[async_trait]
pub trait CliService: Send + Sync {
    async fn open_session(&mut self, req: OpenSessionReq)
        -> Result<OpenSessionResp, TransportError>;
    async fn close_session(&mut self, req: SessionReq) -> Result<StatusResp, TransportError>;
    async fn get_info(&mut self, req: GetInfoReq) -> Result<GetInfoResp, TransportError>;
    async fn execute_statement(
        &mut self,
        req: ExecuteStatementReq,
    ) -> Result<OperationResp, TransportError>;
    async fn get_type_info(&mut self, req: SessionReq) -> Result<OperationResp, TransportError>;
    async fn get_catalogs(&mut self, req: SessionReq) -> Result<OperationResp, TransportError>;
    async fn get_schemas(&mut self, req: GetSchemasReq) -> Result<OperationResp, TransportError>;
    async fn get_tables(&mut self, req: GetTablesReq) -> Result<OperationResp, TransportError>;
    async fn get_table_types(&mut self, req: SessionReq)
        -> Result<OperationResp, TransportError>;
    async fn get_columns(&mut self, req: GetColumnsReq) -> Result<OperationResp, TransportError>;
    async fn get_functions(
        &mut self,
        req: GetFunctionsReq,
    ) -> Result<OperationResp, TransportError>;
    async fn get_operation_status(
        &mut self,
        req: OperationReq,
    ) -> Result<GetOperationStatusResp, TransportError>;
    async fn cancel_operation(&mut self, req: OperationReq) -> Result<StatusResp, TransportError>;
    async fn close_operation(&mut self, req: OperationReq) -> Result<StatusResp, TransportError>;
    async fn get_result_set_metadata(
        &mut self,
        req: OperationReq,
    ) -> Result<GetResultSetMetadataResp, TransportError>;
    async fn fetch_results(
        &mut self,
        req: FetchResultsReq,
    ) -> Result<FetchResultsResp, TransportError>;

    /// Open the underlying transport.
    async fn open_transport(&mut self) -> Result<(), TransportError>;

    /// Whether the underlying transport is open.
    fn is_open(&self) -> bool;

    /// Close the underlying transport.
    async fn shutdown(&mut self) -> Result<(), TransportError>;
}

/// Thrift `args` wrapper: the request is field 1.
struct CallArgs<'a, T>(&'a T);

impl<T: ThriftEncode> ThriftEncode for CallArgs<'_, T> {
    fn encode(&self, w: &mut ThriftWriter) {
        w.field_struct(1, self.0);
        w.write_field_stop();
    }
}

/// Thrift `result` wrapper: the response is field 0.
struct CallResult<T>(Option<T>);

impl<T: ThriftDecode> ThriftDecode for CallResult<T> {
    fn decode(r: &mut ThriftReader<'_>) -> Result<Self, DecodeError> {
        let mut success = None;
        r.read_struct(|r, id, ttype| {
            if (id, ttype) == (0, TType::Struct) {
                success = Some(T::decode(r)?);
                return Ok(true);
            }
            Ok(false)
        })?;
        Ok(CallResult(success))
    }
}

/// `CliService` over a Thrift binary transport.
///
/// A call whose future is dropped between sending the request and reading
/// the reply leaves that reply on the wire. The client then refuses every
/// later call and closes the transport.
pub struct ThriftCliClient {
    transport: Box<dyn TransportProtocol>,
    seq_id: i32,
    /// Method of a round trip that started and has not finished
    in_flight: Option<&'static str>,
}

impl ThriftCliClient {
    pub fn new(transport: Box<dyn TransportProtocol>) -> Self {
        Self {
            transport,
            seq_id: 0,
            in_flight: None,
        }
    }

    /// Whether an abandoned call left the transport out of sync.
    pub fn is_desynchronized(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Encode a call, send it, and decode the matching reply.
    async fn call<Req, Resp>(
        &mut self,
        method: &'static str,
        req: &Req,
    ) -> Result<Resp, TransportError>
    where
        Req: ThriftEncode + Sync,
        Resp: ThriftDecode,
    {
        if let Some(abandoned) = self.in_flight {
            warn!(method, abandoned, "refusing call on desynchronized transport");
            if self.transport.is_open() {
                if let Err(e) = self.transport.close().await {
                    warn!(error = %e, "failed to close desynchronized transport");
                }
            }
            return Err(TransportError::Desynchronized { method: abandoned });
        }

        self.seq_id = self.seq_id.wrapping_add(1);
        let seq_id = self.seq_id;

        let mut w = ThriftWriter::new();
        w.write_message_begin(method, MessageType::Call, seq_id);
        w.write_struct(&CallArgs(req));
        debug!(method, seq_id, bytes = w.len(), "rpc call");

        self.in_flight = Some(method);
        let reply = self.transport.round_trip(w.into_bytes()).await;
        self.in_flight = None;
        decode_reply(method, seq_id, &reply?)
    }
}

/// Decode a reply message for `method` with sequence id `seq_id`.
pub(crate) fn decode_reply<Resp: ThriftDecode>(
    method: &str,
    seq_id: i32,
    reply: &[u8],
) -> Result<Resp, TransportError> {
    let mut r = ThriftReader::new(reply);
    let header = r.read_message_begin()?;

    if header.kind == MessageType::Exception {
        let exception: ApplicationException = r.read()?;
        return Err(TransportError::ApplicationException {
            kind: exception.kind,
            message: exception.message,
        });
    }
    if header.kind != MessageType::Reply {
        return Err(TransportError::ProtocolError(format!(
            "expected reply to {}, got {:?}",
            method, header.kind
        )));
    }
    if header.name != method {
        return Err(TransportError::ProtocolError(format!(
            "reply name {} does not match call {}",
            header.name, method
        )));
    }
    if header.seq_id != seq_id {
        return Err(TransportError::ProtocolError(format!(
            "reply sequence id {} does not match call {}",
            header.seq_id, seq_id
        )));
    }

    let CallResult(success) = r.read::<CallResult<Resp>>()?;
    success.ok_or_else(|| {
        TransportError::ProtocolError(format!("{} failed: unknown result", method))
    })
}

#[async_trait]
impl CliService for ThriftCliClient {
    async fn open_session(
        &mut self,
        req: OpenSessionReq,
    ) -> Result<OpenSessionResp, TransportError> {
        self.call("OpenSession", &req).await
    }

    async fn close_session(&mut self, req: SessionReq) -> Result<StatusResp, TransportError> {
        self.call("CloseSession", &req).await
    }

    async fn get_info(&mut self, req: GetInfoReq) -> Result<GetInfoResp, TransportError> {
        self.call("GetInfo", &req).await
    }

    async fn execute_statement(
        &mut self,
        req: ExecuteStatementReq,
    ) -> Result<OperationResp, TransportError> {
        self.call("ExecuteStatement", &req).await
    }

    async fn get_type_info(&mut self, req: SessionReq) -> Result<OperationResp, TransportError> {
        self.call("GetTypeInfo", &req).await
    }

    async fn get_catalogs(&mut self, req: SessionReq) -> Result<OperationResp, TransportError> {
        self.call("GetCatalogs", &req).await
    }

    async fn get_schemas(&mut self, req: GetSchemasReq) -> Result<OperationResp, TransportError> {
        self.call("GetSchemas", &req).await
    }

    async fn get_tables(&mut self, req: GetTablesReq) -> Result<OperationResp, TransportError> {
        self.call("GetTables", &req).await
    }

    async fn get_table_types(
        &mut self,
        req: SessionReq,
    ) -> Result<OperationResp, TransportError> {
        self.call("GetTableTypes", &req).await
    }

    async fn get_columns(&mut self, req: GetColumnsReq) -> Result<OperationResp, TransportError> {
        self.call("GetColumns", &req).await
    }

    async fn get_functions(
        &mut self,
        req: GetFunctionsReq,
    ) -> Result<OperationResp, TransportError> {
        self.call("GetFunctions", &req).await
    }

    async fn get_operation_status(
        &mut self,
        req: OperationReq,
    ) -> Result<GetOperationStatusResp, TransportError> {
        self.call("GetOperationStatus", &req).await
    }

    async fn cancel_operation(&mut self, req: OperationReq) -> Result<StatusResp, TransportError> {
        self.call("CancelOperation", &req).await
    }

    async fn close_operation(&mut self, req: OperationReq) -> Result<StatusResp, TransportError> {
        self.call("CloseOperation", &req).await
    }

    async fn get_result_set_metadata(
        &mut self,
        req: OperationReq,
    ) -> Result<GetResultSetMetadataResp, TransportError> {
        self.call("GetResultSetMetadata", &req).await
    }

    async fn fetch_results(
        &mut self,
        req: FetchResultsReq,
    ) -> Result<FetchResultsResp, TransportError> {
        self.call("FetchResults", &req).await
    }

    async fn open_transport(&mut self) -> Result<(), TransportError> {
        self.transport.open().await
    }

    fn is_open(&self) -> bool {
        !self.is_desynchronized() && self.transport.is_open()
    }

    async fn shutdown(&mut self) -> Result<(), TransportError> {
        self.transport.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::messages::{HandleIdentifier, SessionHandle, StatusCode};
    use bytes::Bytes;
    use mockall::mock;
    use mockall::predicate::always;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    mock! {
        pub Transport {}

        #[async_trait]
        impl TransportProtocol for Transport {
            async fn open(&mut self) -> Result<(), TransportError>;
            async fn round_trip(&mut self, request: Bytes) -> Result<Bytes, TransportError>;
            fn is_open(&self) -> bool;
            async fn close(&mut self) -> Result<(), TransportError>;
        }
    }

    fn session_req() -> SessionReq {
        SessionReq {
            session_handle: SessionHandle {
                session_id: HandleIdentifier {
                    guid: vec![7; 16],
                    secret: vec![8; 16],
                },
            },
        }
    }

    fn status_reply(name: &str, seq_id: i32, code: i32) -> Bytes {
        let mut w = ThriftWriter::new();
        w.write_message_begin(name, MessageType::Reply, seq_id);
        w.write_field_begin(TType::Struct, 0);
        w.write_field_begin(TType::Struct, 1);
        w.field_i32(1, code);
        w.write_field_stop();
        w.write_field_stop();
        w.write_field_stop();
        w.into_bytes()
    }

    fn exception_reply(name: &str, seq_id: i32, message: &str) -> Bytes {
        let mut w = ThriftWriter::new();
        w.write_message_begin(name, MessageType::Exception, seq_id);
        w.field_string(1, message);
        w.field_i32(2, 7);
        w.write_field_stop();
        w.into_bytes()
    }

    #[tokio::test]
    async fn test_call_encodes_envelope_and_decodes_reply() {
        let mut transport = MockTransport::new();
        transport
            .expect_round_trip()
            .with(always())
            .times(1)
            .returning(|request| {
                let mut r = ThriftReader::new(&request);
                let header = r.read_message_begin().unwrap();
                assert_eq!(header.name, "CloseSession");
                assert_eq!(header.kind, MessageType::Call);
                assert_eq!(r.read_field_begin().unwrap(), Some((TType::Struct, 1)));
                Ok(status_reply("CloseSession", header.seq_id, 0))
            });

        let mut client = ThriftCliClient::new(Box::new(transport));
        let resp = client.close_session(session_req()).await.unwrap();
        assert_eq!(resp.status.code(), Some(StatusCode::Success));
    }

    #[tokio::test]
    async fn test_sequence_ids_increase() {
        let mut transport = MockTransport::new();
        let mut expected = 0;
        transport.expect_round_trip().times(2).returning(move |request| {
            expected += 1;
            let header = ThriftReader::new(&request).read_message_begin().unwrap();
            assert_eq!(header.seq_id, expected);
            Ok(status_reply("CloseSession", header.seq_id, 0))
        });

        let mut client = ThriftCliClient::new(Box::new(transport));
        client.close_session(session_req()).await.unwrap();
        client.close_session(session_req()).await.unwrap();
    }

    #[tokio::test]
    async fn test_application_exception_reply() {
        let mut transport = MockTransport::new();
        transport.expect_round_trip().returning(|_| {
            Ok(exception_reply(
                "OpenSession",
                1,
                "Required field 'client_protocol' is unset!",
            ))
        });

        let mut client = ThriftCliClient::new(Box::new(transport));
        let err = client.close_session(session_req()).await.unwrap_err();
        match err {
            TransportError::ApplicationException { kind, message } => {
                assert_eq!(kind, 7);
                assert!(message.contains("client_protocol"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mismatched_sequence_id_rejected() {
        let mut transport = MockTransport::new();
        transport
            .expect_round_trip()
            .returning(|_| Ok(status_reply("CloseSession", 42, 0)));

        let mut client = ThriftCliClient::new(Box::new(transport));
        let err = client.close_session(session_req()).await.unwrap_err();
        assert!(matches!(err, TransportError::ProtocolError(_)));
    }

    #[test]
    fn test_mismatched_name_rejected() {
        let reply = status_reply("CancelOperation", 1, 0);
        let err = decode_reply::<StatusResp>("CloseOperation", 1, &reply).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_reply_without_success_rejected() {
        let mut w = ThriftWriter::new();
        w.write_message_begin("GetInfo", MessageType::Reply, 1);
        w.write_field_stop();
        let reply = w.into_bytes();

        let err = decode_reply::<GetInfoResp>("GetInfo", 1, &reply).unwrap_err();
        assert!(err.to_string().contains("unknown result"));
    }

    #[tokio::test]
    async fn test_transport_lifecycle_delegates() {
        let mut transport = MockTransport::new();
        transport.expect_open().times(1).returning(|| Ok(()));
        transport.expect_is_open().return_const(true);
        transport.expect_close().times(1).returning(|| Ok(()));

        let mut client = ThriftCliClient::new(Box::new(transport));
        client.open_transport().await.unwrap();
        assert!(client.is_open());
        client.shutdown().await.unwrap();
    }

    /// Sends never get a reply; counts closes.
    struct StalledTransport {
        open: bool,
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TransportProtocol for StalledTransport {
        async fn open(&mut self) -> Result<(), TransportError> {
            self.open = true;
            Ok(())
        }

        async fn round_trip(&mut self, _request: Bytes) -> Result<Bytes, TransportError> {
            std::future::pending().await
        }

        fn is_open(&self) -> bool {
            self.open
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.open = false;
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_abandoned_call_poisons_client() {
        let closes = Arc::new(AtomicUsize::new(0));
        let transport = StalledTransport {
            open: true,
            closes: Arc::clone(&closes),
        };
        let mut client = ThriftCliClient::new(Box::new(transport));

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), client.close_session(session_req()))
                .await;
        assert!(abandoned.is_err());
        assert!(client.is_desynchronized());
        assert!(!client.is_open());

        for _ in 0..2 {
            let err = client.close_session(session_req()).await.unwrap_err();
            assert!(matches!(
                err,
                TransportError::Desynchronized {
                    method: "CloseSession"
                }
            ));
        }
        // The stale reply is never read; the transport is closed once.
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
