//! Transport-neutral tool result.

use serde::Serialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Self::Text { text } => text,
        }
    }
}

/// Outcome of a tool invocation.
///
/// Error results carry `is_error = true` and a single text item describing
/// the failure. Successful results carry the formatted output plus an
/// optional structured payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    pub is_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<JsonValue>,
}

impl ToolResult {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
            is_error: false,
            structured_content: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(message)],
            is_error: true,
            structured_content: None,
        }
    }

    /// Attach a structured payload. Values that fail to serialize are dropped.
    pub fn with_structured<T: Serialize>(mut self, value: &T) -> Self {
        self.structured_content = serde_json::to_value(value).ok();
        self
    }

    /// All text items joined with newlines.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(ToolContent::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Append to the last text item, or add one if there is none.
    pub fn append_text(&mut self, extra: &str) {
        match self.content.last_mut() {
            Some(ToolContent::Text { text }) => text.push_str(extra),
            None => self.content.push(ToolContent::text(extra)),
        }
    }
}
