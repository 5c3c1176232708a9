//! Stdio transport for the MCP server.
//!
//! JSON-RPC messages are read from stdin and responses written to stdout, so
//! logging must go to stderr.

use crate::error::{TrinoError, TrinoResult};
use crate::mcp::TrinoService;
use crate::tools::Toolkit;
use crate::transport::{Transport, wait_for_signal};
use rmcp::{ServiceExt, transport::stdio};
use std::sync::Arc;
use tracing::{info, warn};

pub struct StdioTransport {
    toolkit: Arc<Toolkit>,
}

impl StdioTransport {
    pub fn new(toolkit: Arc<Toolkit>) -> Self {
        Self { toolkit }
    }
}

impl Transport for StdioTransport {
    async fn run(&self) -> TrinoResult<()> {
        info!("Starting MCP server with stdio transport");

        let service = TrinoService::new(Arc::clone(&self.toolkit));
        let running_service = service.serve(stdio()).await.map_err(|e| {
            TrinoError::internal(format!("Failed to start stdio transport: {}", e))
        })?;

        let shutdown_requested = tokio::select! {
            result = running_service.waiting() => {
                match result {
                    Ok(_quit_reason) => info!("Stdio transport completed normally"),
                    Err(e) => {
                        warn!(error = %e, "Stdio transport error");
                        if let Err(close_err) = self.toolkit.close().await {
                            warn!(error = %close_err, "Error while closing toolkit");
                        }
                        return Err(TrinoError::internal(format!("Stdio transport error: {}", e)));
                    }
                }
                false
            }
            _ = wait_for_signal() => {
                info!("Shutdown signal received (send again to force exit)");
                true
            }
        };

        if shutdown_requested {
            tokio::spawn(async {
                wait_for_signal().await;
                warn!("Received second signal, forcing immediate exit");
                std::process::exit(1);
            });
        }

        info!("Closing Trino connections");
        if let Err(e) = self.toolkit.close().await {
            warn!(error = %e, "Error while closing toolkit");
        }

        if shutdown_requested {
            // A blocking stdin read cannot be interrupted by select!.
            info!("Exiting process");
            std::process::exit(0);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "stdio"
    }
}
