//! Integration tests against a live HiveServer2.
//!
//! See `common` for the server setup and the environment variables that
//! point the tests at it. Tests that need a server are `#[ignore]`d and also
//! skip themselves when nothing listens at the configured address:
//!
//! ```bash
//! cargo test --test integration_tests -- --ignored --nocapture
//! ```
//!
//! Tests are grouped by prefix:
//! - `test_infrastructure_*` - test helpers
//! - `test_connection_*` - transport and session lifecycle
//! - `test_query_*` - statement execution and result fetching
//! - `test_metadata_*` - catalog operations
//! - `test_arrow_*` - Arrow conversion of live results

mod common;

use arrow::array::{Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use common::{
    generate_test_table_name, get_host, get_port, get_test_connection_url, get_test_properties,
    get_test_session, get_user, is_hive_available, DEFAULT_HOST, DEFAULT_PORT,
};
use hivearrow_rs::{
    ColumnValue, ConnectionProperties, HiveError, InfoType, InfoValue, QueryError, Session,
    TransportHandle,
};
use std::time::Duration;

// ============================================================================
// Infrastructure
// ============================================================================

#[test]
fn test_infrastructure_defaults() {
    assert_eq!(DEFAULT_HOST, "localhost");
    assert_eq!(DEFAULT_PORT, 10000);
}

#[test]
fn test_infrastructure_connection_url() {
    let url = get_test_connection_url();
    assert!(url.starts_with("hive2://"), "unexpected url: {}", url);
    assert!(url.contains(&get_host()));
    assert!(url.contains(&get_port().to_string()));
    assert!(url.contains(&get_user()));
}

#[test]
fn test_infrastructure_table_names() {
    let name = generate_test_table_name();
    assert!(name.starts_with("test_integration_"));
}

#[test]
fn test_infrastructure_availability_check() {
    // Must not panic whether or not a server is running.
    let _ = is_hive_available();
}

// ============================================================================
// Connection
// ============================================================================

#[tokio::test]
#[ignore]
async fn test_connection_open_and_close() {
    skip_if_no_hive!();

    let (transport, session) = get_test_session()
        .await
        .expect("should connect to HiveServer2");

    assert!(transport.is_valid().await);
    assert!(!session.is_closed());

    session.close().await;
    assert!(session.is_closed());

    transport.close().await;
    assert!(transport.is_closed());
}

#[tokio::test]
#[ignore]
async fn test_connection_from_url() {
    skip_if_no_hive!();

    let properties: ConnectionProperties = get_test_connection_url()
        .parse()
        .expect("test url should parse");
    let transport = TransportHandle::open(&properties).await.unwrap();
    let session = Session::open_with_fallback(&transport, properties)
        .await
        .unwrap();

    assert!(session.protocol_version() <= session.properties().protocol_version);

    session.close().await;
    transport.close().await;
}

#[tokio::test]
#[ignore]
async fn test_connection_refused_port() {
    skip_if_no_hive!();

    let mut properties = get_test_properties();
    properties.port = 1;
    properties.transport_timeout = Duration::from_secs(2);

    let result = TransportHandle::open(&properties).await;
    assert!(
        matches!(result, Err(HiveError::Connection(_))),
        "expected a connection error, got {:?}",
        result.err()
    );
}

#[tokio::test]
#[ignore]
async fn test_connection_server_info() {
    skip_if_no_hive!();

    let (transport, session) = get_test_session().await.unwrap();

    let value = session.server_info(InfoType::DbmsName).await.unwrap();
    match value {
        InfoValue::String(name) => {
            assert!(name.to_lowercase().contains("hive"), "dbms name: {}", name)
        }
        other => panic!("unexpected info value: {:?}", other),
    }

    session.close().await;
    transport.close().await;
}

#[tokio::test]
#[ignore]
async fn test_connection_session_configuration() {
    skip_if_no_hive!();

    let mut properties = get_test_properties();
    properties
        .session_config
        .insert("hive.exec.parallel".to_string(), "true".to_string());
    let transport = TransportHandle::open(&properties).await.unwrap();
    let session = Session::open(&transport, properties).await.unwrap();

    let rows = session
        .execute_sql("SET hive.exec.parallel")
        .await
        .unwrap()
        .results()
        .await
        .unwrap()
        .collect()
        .await
        .unwrap();
    let setting = rows[0].get(1).and_then(ColumnValue::as_str).unwrap_or("");
    assert!(setting.ends_with("true"), "setting: {}", setting);

    session.close().await;
    transport.close().await;
}

// ============================================================================
// Query
// ============================================================================

#[tokio::test]
#[ignore]
async fn test_query_select_literal() {
    skip_if_no_hive!();

    let (transport, session) = get_test_session().await.unwrap();

    let operation = session.execute_sql("SELECT 1 AS one, 'a' AS letter").await.unwrap();
    let rows = operation.results().await.unwrap().collect().await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_by_name("one"), Some(&ColumnValue::Int(1)));
    assert_eq!(
        rows[0].get_by_name("letter").and_then(ColumnValue::as_str),
        Some("a")
    );

    operation.close().await;
    session.close().await;
    transport.close().await;
}

#[tokio::test]
#[ignore]
async fn test_query_table_round_trip() {
    skip_if_no_hive!();

    let (transport, session) = get_test_session().await.unwrap();
    let table = generate_test_table_name();

    session
        .execute_sql(&format!("CREATE TABLE {} (id INT, name STRING)", table))
        .await
        .unwrap()
        .close()
        .await;
    session
        .execute_sql(&format!(
            "INSERT INTO {} VALUES (1, 'one'), (2, NULL), (3, 'three')",
            table
        ))
        .await
        .unwrap()
        .close()
        .await;

    let operation = session
        .execute_sql(&format!("SELECT id, name FROM {} ORDER BY id", table))
        .await
        .unwrap();
    let rows = operation.results().await.unwrap().collect().await.unwrap();
    operation.close().await;

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].get(1), Some(&ColumnValue::Int(2)));
    assert_eq!(rows[1].get(2), Some(&ColumnValue::Null));

    session
        .execute_sql(&format!("DROP TABLE {}", table))
        .await
        .unwrap()
        .close()
        .await;
    session.close().await;
    transport.close().await;
}

#[tokio::test]
#[ignore]
async fn test_query_paged_fetch_with_max_rows() {
    skip_if_no_hive!();

    let mut properties = get_test_properties();
    properties.fetch_size = 2;
    properties.max_rows = 3;
    let transport = TransportHandle::open(&properties).await.unwrap();
    let session = Session::open(&transport, properties).await.unwrap();

    let operation = session
        .execute_sql("SELECT stack(5, 1, 2, 3, 4, 5) AS n")
        .await
        .unwrap();
    let rows = operation.results().await.unwrap().collect().await.unwrap();

    assert_eq!(rows.len(), 3);

    operation.close().await;
    session.close().await;
    transport.close().await;
}

#[tokio::test]
#[ignore]
async fn test_query_syntax_error() {
    skip_if_no_hive!();

    let (transport, session) = get_test_session().await.unwrap();

    let result = session.execute_sql("SELEKT nothing").await;
    assert!(
        matches!(
            result,
            Err(HiveError::Query(QueryError::Status(_)))
                | Err(HiveError::Query(QueryError::OperationFailed { .. }))
        ),
        "expected a query error, got {:?}",
        result.err()
    );

    session.close().await;
    transport.close().await;
}

#[tokio::test]
#[ignore]
async fn test_query_with_server_logs() {
    skip_if_no_hive!();

    let mut properties = get_test_properties();
    properties.fetch_server_logs = true;
    let transport = TransportHandle::open(&properties).await.unwrap();
    let session = Session::open(&transport, properties).await.unwrap();

    // Log fetching never fails the statement.
    let operation = session.execute_sql("SELECT 1").await.unwrap();
    operation.close().await;

    session.close().await;
    transport.close().await;
}

// ============================================================================
// Metadata
// ============================================================================

#[tokio::test]
#[ignore]
async fn test_metadata_schemas_include_default() {
    skip_if_no_hive!();

    let (transport, session) = get_test_session().await.unwrap();

    let operation = session.get_schemas(None, None).await.unwrap();
    operation.wait_for_completion().await.unwrap();
    let rows = operation.results().await.unwrap().collect().await.unwrap();

    let found = rows.iter().any(|row| {
        row.get_by_name("TABLE_SCHEM")
            .and_then(ColumnValue::as_str)
            .is_some_and(|name| name.eq_ignore_ascii_case("default"))
    });
    assert!(found, "default schema should be listed");

    operation.close().await;
    session.close().await;
    transport.close().await;
}

#[tokio::test]
#[ignore]
async fn test_metadata_table_types_and_type_info() {
    skip_if_no_hive!();

    let (transport, session) = get_test_session().await.unwrap();

    for operation in [
        session.get_table_types().await.unwrap(),
        session.get_type_info().await.unwrap(),
        session.get_catalogs().await.unwrap(),
    ] {
        operation.wait_for_completion().await.unwrap();
        let schema = operation.schema().await.unwrap();
        assert!(!schema.is_empty());
        operation.close().await;
    }

    session.close().await;
    transport.close().await;
}

// ============================================================================
// Arrow
// ============================================================================

#[tokio::test]
#[ignore]
async fn test_arrow_record_batches() {
    skip_if_no_hive!();

    let (transport, session) = get_test_session().await.unwrap();

    let operation = session
        .execute_sql("SELECT 7 AS small, CAST(9 AS BIGINT) AS big, 'x' AS label")
        .await
        .unwrap();
    let batches = operation.record_batches().await.unwrap();
    let batch = &batches[0];

    assert_eq!(batch.num_rows(), 1);
    let schema = batch.schema();
    assert_eq!(schema.field(0).data_type(), &DataType::Int32);
    assert_eq!(schema.field(1).data_type(), &DataType::Int64);
    assert_eq!(schema.field(2).data_type(), &DataType::Utf8);

    let small = batch.column(0).as_any().downcast_ref::<Int32Array>().unwrap();
    let big = batch.column(1).as_any().downcast_ref::<Int64Array>().unwrap();
    let label = batch.column(2).as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(small.value(0), 7);
    assert_eq!(big.value(0), 9);
    assert_eq!(label.value(0), "x");
    assert!(!label.is_null(0));

    operation.close().await;
    session.close().await;
    transport.close().await;
}
