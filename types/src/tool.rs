//! Tool contract types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the single tool served by this server.
pub const GET_COUNTRY_DATA: &str = "get_country_data";

/// A tool as advertised by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    pub input_schema: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

/// Arguments of `get_country_data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCountryDataParams {
    /// Country name, passed to the upstream API as-is
    pub country_name: String,
}

/// Structured output of `get_country_data`.
///
/// `data` is the first matching record, or an empty array when nothing matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryDataOutput {
    pub data: Value,
}

impl CountryDataOutput {
    /// Output for a lookup that produced no record.
    pub fn empty() -> Self {
        Self {
            data: Value::Array(Vec::new()),
        }
    }
}

/// Text content block of a tool result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl TextContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: text.into(),
        }
    }
}

/// Result envelope of `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<TextContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}
