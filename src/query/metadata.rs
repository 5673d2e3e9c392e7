//! Catalog requests.
//!
//! Each request returns an [`Operation`] whose results list the matching
//! catalog objects. Name patterns use SQL `LIKE` syntax; an unset table,
//! column or function pattern matches everything.

use std::sync::Arc;

use crate::connection::session::Session;
use crate::error::{HiveError, QueryError, TransportError};
use crate::query::operation::{Operation, OperationKind};
use crate::transport::messages::{
    GetColumnsReq, GetFunctionsReq, GetSchemasReq, GetTablesReq, OperationResp, SessionReq,
};

/// Pattern matching every name.
const WILDCARD: &str = "%";

fn pattern_or_wildcard(pattern: Option<&str>) -> String {
    pattern.unwrap_or(WILDCARD).to_string()
}

impl Session {
    fn session_req(&self) -> SessionReq {
        SessionReq {
            session_handle: self.handle().clone(),
        }
    }

    fn metadata_operation(
        self: &Arc<Self>,
        response: Result<OperationResp, TransportError>,
        method: &'static str,
    ) -> Result<Operation, HiveError> {
        let response = response.map_err(QueryError::Transport)?;
        Ok(Operation::from_response(
            response,
            method,
            self,
            OperationKind::Metadata,
        )?)
    }

    pub async fn get_catalogs(self: &Arc<Self>) -> Result<Operation, HiveError> {
        self.ensure_open()?;
        let request = self.session_req();
        let response = self.client().lock().await.get_catalogs(request).await;
        self.metadata_operation(response, "GetCatalogs")
    }

    /// Schemas matching `schema_pattern`, both filters forwarded as given.
    pub async fn get_schemas(
        self: &Arc<Self>,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
    ) -> Result<Operation, HiveError> {
        self.ensure_open()?;
        let request = GetSchemasReq {
            session_handle: self.handle().clone(),
            catalog_name: catalog.map(str::to_string),
            schema_name: schema_pattern.map(str::to_string),
        };
        let response = self.client().lock().await.get_schemas(request).await;
        self.metadata_operation(response, "GetSchemas")
    }

    /// Tables matching the patterns, optionally restricted to `table_types`
    /// such as `TABLE` or `VIEW`.
    pub async fn get_tables(
        self: &Arc<Self>,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: Option<&str>,
        table_types: Option<&[&str]>,
    ) -> Result<Operation, HiveError> {
        self.ensure_open()?;
        let request = GetTablesReq {
            session_handle: self.handle().clone(),
            catalog_name: catalog.map(str::to_string),
            schema_name: schema_pattern.map(str::to_string),
            table_name: Some(pattern_or_wildcard(table_pattern)),
            table_types: table_types.map(|types| types.iter().map(|t| t.to_string()).collect()),
        };
        let response = self.client().lock().await.get_tables(request).await;
        self.metadata_operation(response, "GetTables")
    }

    pub async fn get_table_types(self: &Arc<Self>) -> Result<Operation, HiveError> {
        self.ensure_open()?;
        let request = self.session_req();
        let response = self.client().lock().await.get_table_types(request).await;
        self.metadata_operation(response, "GetTableTypes")
    }

    pub async fn get_columns(
        self: &Arc<Self>,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_pattern: Option<&str>,
        column_pattern: Option<&str>,
    ) -> Result<Operation, HiveError> {
        self.ensure_open()?;
        let request = GetColumnsReq {
            session_handle: self.handle().clone(),
            catalog_name: catalog.map(str::to_string),
            schema_name: schema_pattern.map(str::to_string),
            table_name: Some(pattern_or_wildcard(table_pattern)),
            column_name: Some(pattern_or_wildcard(column_pattern)),
        };
        let response = self.client().lock().await.get_columns(request).await;
        self.metadata_operation(response, "GetColumns")
    }

    pub async fn get_functions(
        self: &Arc<Self>,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        function_pattern: Option<&str>,
    ) -> Result<Operation, HiveError> {
        self.ensure_open()?;
        let request = GetFunctionsReq {
            session_handle: self.handle().clone(),
            catalog_name: catalog.map(str::to_string),
            schema_name: schema_pattern.map(str::to_string),
            function_name: pattern_or_wildcard(function_pattern),
        };
        let response = self.client().lock().await.get_functions(request).await;
        self.metadata_operation(response, "GetFunctions")
    }

    /// Data types supported by the server.
    pub async fn get_type_info(self: &Arc<Self>) -> Result<Operation, HiveError> {
        self.ensure_open()?;
        let request = self.session_req();
        let response = self.client().lock().await.get_type_info(request).await;
        self.metadata_operation(response, "GetTypeInfo")
    }
}
