//! Data models for the Trino MCP server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use connection::{
    ConnectionConfig, ConnectionInfo, DEFAULT_CONNECTION_NAME, ManagerConfig,
    PartialConnectionConfig,
};
pub use query::{
    ColumnMetadata, DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_ROW_LIMIT, ExplainType,
    MAX_QUERY_TIMEOUT_SECS, MAX_ROW_LIMIT, QueryOptions, QueryResult, QueryStats, Row,
};
pub use schema::{ColumnDefinition, TableRef, TableSchema, quote_identifier};
