//! Runs one invocation through the extension chains.
//!
//! Middleware is an onion: `before` hooks run outermost first and the
//! `after` hook of every layer whose `before` succeeded runs on the way out,
//! innermost first. Transformers run last and only on non-error results.

use crate::extensions::{MiddlewareChain, ToolContext};
use crate::tools::error::ToolError;
use crate::tools::input::ToolInput;
use crate::tools::names::ToolName;
use crate::tools::progress::ProgressNotifier;
use crate::tools::result::ToolResult;
use crate::tools::toolkit::Toolkit;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) async fn run(
    toolkit: &Toolkit,
    tool: ToolName,
    registration: &MiddlewareChain,
    args: JsonValue,
    progress: Option<Arc<dyn ProgressNotifier>>,
) -> ToolResult {
    let input = match ToolInput::decode(tool, args.clone()) {
        Ok(input) => input,
        Err(e) => {
            warn!(tool = %tool, error = %e, "Failed to decode tool input");
            return ToolResult::error(e.to_string());
        }
    };

    let ctx = ToolContext::new(tool, args).with_progress(progress);
    let chain = toolkit.extensions.effective_middleware(tool, registration);

    let mut entered = 0;
    let mut rejected: Option<ToolError> = None;
    for middleware in chain.iter() {
        if let Err(e) = middleware.before(&ctx).await {
            debug!(tool = %tool, middleware = middleware.name(), error = %e, "Middleware rejected invocation");
            rejected = Some(ToolError::Middleware(e.message));
            break;
        }
        entered += 1;
    }

    let outcome = match rejected {
        Some(err) => Err(err),
        None => toolkit.dispatch(&ctx, input).await,
    };
    let (mut result, error) = match outcome {
        Ok(result) => (result, None),
        Err(err) => (ToolResult::error(err.to_string()), Some(err)),
    };

    for middleware in chain.iter().take(entered).rev() {
        result = match middleware.after(&ctx, result, error.as_ref()).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %tool, middleware = middleware.name(), error = %e, "Middleware after hook failed");
                ToolResult::error(ToolError::Middleware(e.message).to_string())
            }
        };
    }

    if result.is_error {
        return result;
    }

    match toolkit.extensions.transformers.apply(&ctx, tool, result).await {
        Ok(result) => result,
        Err(e) => ToolResult::error(ToolError::Transformer(e.message).to_string()),
    }
}
