//! Basic usage example for the hivearrow-rs HiveServer2 driver.
//!
//! Set `RUST_LOG=hivearrow_rs=debug` to see driver logs, or
//! `RUST_LOG=hivearrow_rs::server_log=debug` for server-side query logs.

use futures_util::TryStreamExt;
use hivearrow_rs::{ConnectionProperties, Session, TransportHandle};
use std::error::Error;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const URL: &str = "hive2://localhost:10000/default;user=hive;password=hive;fetchSize=500";
const TABLE: &str = "hivearrow_example";

/// Opens a transport and a session, stepping down protocol versions if the
/// server is older than this client.
async fn example_connection() -> Result<(TransportHandle, Arc<Session>), Box<dyn Error>> {
    let properties: ConnectionProperties = URL.parse()?;
    let transport = TransportHandle::open(&properties).await?;
    let session = Session::open_with_fallback(&transport, properties).await?;
    Ok((transport, session))
}

/// Runs a literal query and reads it as Arrow record batches.
async fn example_simple_select(session: &Arc<Session>) -> Result<usize, Box<dyn Error>> {
    let operation = session.execute_sql("SELECT 1 + 1 AS two").await?;
    let batches = operation.record_batches().await?;
    operation.close().await;
    Ok(batches.iter().map(|b| b.num_rows()).sum())
}

/// Creates a table, fills it, streams it back row by row and drops it.
async fn example_table(session: &Arc<Session>) -> Result<usize, Box<dyn Error>> {
    session
        .execute_sql(&format!(
            "CREATE TABLE IF NOT EXISTS {} (id INT, name STRING)",
            TABLE
        ))
        .await?
        .close()
        .await;
    session
        .execute_sql(&format!(
            "INSERT INTO {} VALUES (1, 'Alice'), (2, 'Bob'), (3, 'Charlie')",
            TABLE
        ))
        .await?
        .close()
        .await;

    let operation = session
        .execute_sql(&format!("SELECT id, name FROM {} ORDER BY id", TABLE))
        .await?;
    let rows: Vec<_> = operation.results().await?.into_stream().try_collect().await?;
    for row in &rows {
        println!("{:?} {:?}", row.get(1), row.get_by_name("name"));
    }
    operation.close().await;

    session
        .execute_sql(&format!("DROP TABLE {}", TABLE))
        .await?
        .close()
        .await;
    Ok(rows.len())
}

/// Lists the tables of the current database.
async fn example_metadata(session: &Arc<Session>) -> Result<usize, Box<dyn Error>> {
    let operation = session.get_tables(None, Some("default"), None, None).await?;
    operation.wait_for_completion().await?;
    let tables = operation.results().await?.collect().await?;
    operation.close().await;
    Ok(tables.len())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let (transport, session) = example_connection().await?;
    println!("Connected: protocol {}", session.protocol_version());

    let rows = example_simple_select(&session).await?;
    println!("Simple select: {} row(s)", rows);

    let rows = example_table(&session).await?;
    println!("Table: {} row(s)", rows);

    let tables = example_metadata(&session).await?;
    println!("Tables in default: {}", tables);

    session.close().await;
    transport.close().await;
    println!("Done");

    Ok(())
}
