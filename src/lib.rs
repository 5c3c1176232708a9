//! Trino MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to explore and query Trino clusters: catalog/schema/table introspection,
//! read-only and write SQL, execution plans and multi-cluster routing, with
//! an extension pipeline and optional semantic (business) metadata.

pub mod config;
pub mod db;
pub mod error;
pub mod extensions;
pub mod mcp;
pub mod models;
pub mod semantic;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::TrinoError;
pub use mcp::TrinoService;
pub use tools::Toolkit;
