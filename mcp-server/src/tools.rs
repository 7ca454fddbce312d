//! Tool registry for the MCP server.
//!
//! Declares `get_country_data` and runs it against a [`CountryLookup`].

use crate::client::CountryLookup;
use countries_mcp_types::tool::GET_COUNTRY_DATA;
use countries_mcp_types::{
    CallToolResult, CountryDataOutput, GetCountryDataParams, TextContent, ToolDefinition,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Error raised before a tool could run.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool {0} not found")]
    UnknownTool(String),

    #[error("Invalid arguments for tool {tool}: {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize tool result: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// The set of tools a protocol server exposes.
#[derive(Clone)]
pub struct ToolRegistry {
    lookup: Arc<dyn CountryLookup>,
}

impl ToolRegistry {
    pub fn new(lookup: Arc<dyn CountryLookup>) -> Self {
        Self { lookup }
    }

    /// Definitions advertised by `tools/list`.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: GET_COUNTRY_DATA.to_string(),
            title: Some("Get Country Data".to_string()),
            description: String::new(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "countryName": {
                        "type": "string",
                        "description": "Country name"
                    }
                },
                "required": ["countryName"]
            }),
            output_schema: Some(json!({
                "type": "object",
                "properties": {
                    "data": {}
                },
                "required": ["data"]
            })),
        }]
    }

    /// Invoke a tool by name with its raw JSON arguments.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<CallToolResult, ToolError> {
        match name {
            GET_COUNTRY_DATA => {
                let params: GetCountryDataParams =
                    serde_json::from_value(arguments).map_err(|source| {
                        ToolError::InvalidArguments {
                            tool: name.to_string(),
                            source,
                        }
                    })?;
                let output = self.get_country_data(&params.country_name).await;
                Self::envelope(output)
            }
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    async fn get_country_data(&self, country_name: &str) -> CountryDataOutput {
        info!("MCP: Getting country data for '{}'", country_name);
        match self.lookup.lookup(country_name).await {
            Ok(records) => records
                .into_iter()
                .next()
                .filter(|record| !record.is_null())
                .map(|data| CountryDataOutput { data })
                .unwrap_or_else(CountryDataOutput::empty),
            // Already logged by the lookup; callers see the same outcome as no match
            Err(_) => CountryDataOutput::empty(),
        }
    }

    fn envelope(output: CountryDataOutput) -> Result<CallToolResult, ToolError> {
        let text = serde_json::to_string(&output).map_err(ToolError::Serialization)?;
        let structured = serde_json::to_value(&output).map_err(ToolError::Serialization)?;
        Ok(CallToolResult {
            content: vec![TextContent::new(text)],
            structured_content: Some(structured),
        })
    }
}
