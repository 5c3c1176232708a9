//! Trino tools and the toolkit that dispatches them.
//!
//! - `query` / `execute`: run SQL (`query` is read-only)
//! - `explain`: execution plans
//! - `list_catalogs`, `list_schemas`, `list_tables`, `describe_table`: introspection
//! - `list_connections`: configured Trino servers
//! - `sql_validator`: write-statement classification for the read-only gate

pub mod connections;
pub mod error;
pub mod explain;
pub mod format;
pub mod input;
mod pipeline;
pub mod progress;
pub mod query;
pub mod result;
pub mod schema;
pub mod names;
pub mod sql_validator;
pub mod toolkit;

pub use error::ToolError;
pub use format::{OutputFormat, QueryOutput};
pub use input::ToolInput;
pub use names::{ToolAnnotations, ToolIcon, ToolName};
pub use progress::ProgressNotifier;
pub use result::{ToolContent, ToolResult};
pub use sql_validator::is_write_sql;
pub use toolkit::{ToolDefinition, Toolkit, ToolkitBuilder, ToolkitConfig};
