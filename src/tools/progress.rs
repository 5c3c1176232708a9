//! Progress reporting for long-running tools.

use async_trait::async_trait;

/// Sink for progress notifications of one invocation.
///
/// Delivery is best-effort; implementations swallow their own errors.
#[async_trait]
pub trait ProgressNotifier: Send + Sync {
    async fn notify(&self, progress: f64, total: Option<f64>, message: Option<String>);
}

/// Steps reported by `query` and `execute`.
pub const QUERY_PROGRESS_TOTAL: f64 = 3.0;

pub fn executing_message() -> String {
    "Executing query".to_string()
}

pub fn formatting_message(row_count: usize) -> String {
    format!("Formatting {} rows", row_count)
}

pub fn complete_message() -> String {
    "Complete".to_string()
}
