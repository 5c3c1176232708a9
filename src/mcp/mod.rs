//! MCP server integration module.
//!
//! This module binds the [`Toolkit`](crate::tools::Toolkit) to the MCP
//! protocol using the rmcp framework.

pub mod service;

pub use service::TrinoService;
