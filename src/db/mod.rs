//! Trino access layer.
//!
//! This module provides:
//! - The [`Executor`] contract consumed by tool handlers
//! - A REST statement-protocol client for Trino
//! - The connection manager with lazily opened, shared executors

pub mod executor;
pub mod pool;
pub mod trino;

pub use executor::{Executor, ExecutorFactory, TrinoClientFactory, with_deadline};
pub use pool::ConnectionManager;
pub use trino::TrinoClient;
