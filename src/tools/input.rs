//! Typed tool inputs and their JSON schemas.

use crate::tools::connections::ListConnectionsInput;
use crate::tools::error::ToolError;
use crate::tools::explain::ExplainInput;
use crate::tools::names::ToolName;
use crate::tools::query::QueryInput;
use crate::tools::schema::{DescribeTableInput, ListCatalogsInput, ListSchemasInput, ListTablesInput};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

/// Decoded arguments of one invocation.
#[derive(Debug, Clone)]
pub enum ToolInput {
    Query(QueryInput),
    Execute(QueryInput),
    Explain(ExplainInput),
    ListCatalogs(ListCatalogsInput),
    ListSchemas(ListSchemasInput),
    ListTables(ListTablesInput),
    DescribeTable(DescribeTableInput),
    ListConnections(ListConnectionsInput),
}

fn decode<T: DeserializeOwned>(args: JsonValue) -> Result<T, ToolError> {
    let args = match args {
        JsonValue::Null => JsonValue::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

impl ToolInput {
    /// Decode raw arguments for `tool`. Missing arguments decode as `{}`.
    pub fn decode(tool: ToolName, args: JsonValue) -> Result<Self, ToolError> {
        Ok(match tool {
            ToolName::Query => Self::Query(decode(args)?),
            ToolName::Execute => Self::Execute(decode(args)?),
            ToolName::Explain => Self::Explain(decode(args)?),
            ToolName::ListCatalogs => Self::ListCatalogs(decode(args)?),
            ToolName::ListSchemas => Self::ListSchemas(decode(args)?),
            ToolName::ListTables => Self::ListTables(decode(args)?),
            ToolName::DescribeTable => Self::DescribeTable(decode(args)?),
            ToolName::ListConnections => Self::ListConnections(decode(args)?),
        })
    }

    pub fn tool(&self) -> ToolName {
        match self {
            Self::Query(_) => ToolName::Query,
            Self::Execute(_) => ToolName::Execute,
            Self::Explain(_) => ToolName::Explain,
            Self::ListCatalogs(_) => ToolName::ListCatalogs,
            Self::ListSchemas(_) => ToolName::ListSchemas,
            Self::ListTables(_) => ToolName::ListTables,
            Self::DescribeTable(_) => ToolName::DescribeTable,
            Self::ListConnections(_) => ToolName::ListConnections,
        }
    }
}

fn schema_object<T: JsonSchema>() -> Map<String, JsonValue> {
    let schema = schemars::schema_for!(T);
    match serde_json::to_value(&schema) {
        Ok(JsonValue::Object(map)) => map,
        _ => {
            let mut map = Map::new();
            map.insert("type".to_string(), JsonValue::String("object".to_string()));
            map
        }
    }
}

/// JSON schema of the arguments of `tool`.
pub fn input_schema(tool: ToolName) -> Map<String, JsonValue> {
    let mut schema = match tool {
        ToolName::Query | ToolName::Execute => schema_object::<QueryInput>(),
        ToolName::Explain => schema_object::<ExplainInput>(),
        ToolName::ListCatalogs => schema_object::<ListCatalogsInput>(),
        ToolName::ListSchemas => schema_object::<ListSchemasInput>(),
        ToolName::ListTables => schema_object::<ListTablesInput>(),
        ToolName::DescribeTable => schema_object::<DescribeTableInput>(),
        ToolName::ListConnections => schema_object::<ListConnectionsInput>(),
    };
    // Fields carry serde defaults, so mark the ones handlers insist on.
    let required: &[&str] = match tool {
        ToolName::Query | ToolName::Execute | ToolName::Explain => &["sql"],
        ToolName::ListSchemas => &["catalog"],
        ToolName::ListTables => &["catalog", "schema"],
        ToolName::DescribeTable => &["catalog", "schema", "table"],
        ToolName::ListCatalogs | ToolName::ListConnections => &[],
    };
    if !required.is_empty() {
        schema.insert(
            "required".to_string(),
            JsonValue::Array(required.iter().map(|r| JsonValue::from(*r)).collect()),
        );
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_null_as_empty_object() {
        let input = ToolInput::decode(ToolName::ListCatalogs, JsonValue::Null).unwrap();
        assert_eq!(input.tool(), ToolName::ListCatalogs);
    }

    #[test]
    fn test_decode_type_mismatch() {
        let err = ToolInput::decode(ToolName::Query, json!({"sql": 42})).unwrap_err();
        assert!(err.to_string().starts_with("internal error: invalid input type"));
    }

    #[test]
    fn test_execute_decodes_like_query() {
        let input = ToolInput::decode(ToolName::Execute, json!({"sql": "DELETE FROM t"})).unwrap();
        assert!(matches!(input, ToolInput::Execute(ref q) if q.sql == "DELETE FROM t"));
    }

    #[test]
    fn test_schemas_mark_required_fields() {
        let schema = input_schema(ToolName::DescribeTable);
        assert_eq!(schema["required"], json!(["catalog", "schema", "table"]));
        assert!(schema["properties"]["include_sample"].is_object());

        let schema = input_schema(ToolName::Explain);
        assert!(schema["properties"]["type"].is_object());
        assert!(input_schema(ToolName::ListConnections).get("required").is_none());
    }
}
