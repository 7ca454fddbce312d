//! MCP JSON-RPC request handler.
//!
//! Implements the protocol methods of a single server instance and routes
//! tool calls to the [`ToolRegistry`].

use countries_mcp_types::jsonrpc::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND,
};
use countries_mcp_types::{JsonRpcRequest, JsonRpcResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use super::server::ServerIdentity;
use crate::tools::{ToolError, ToolRegistry};

/// Protocol versions this server can speak, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] =
    &["2025-06-18", "2025-03-26", "2024-11-05", "2024-10-07"];

/// Version offered when the client asks for one we do not support.
pub const LATEST_PROTOCOL_VERSION: &str = SUPPORTED_PROTOCOL_VERSIONS[0];

/// Tool call parameters from MCP.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    #[serde(default)]
    protocol_version: Option<String>,
}

/// MCP request handler bound to one server identity and tool set.
pub struct McpHandler {
    identity: ServerIdentity,
    tools: ToolRegistry,
}

impl McpHandler {
    pub fn new(identity: ServerIdentity, tools: ToolRegistry) -> Self {
        Self { identity, tools }
    }

    /// Handle an MCP JSON-RPC message.
    ///
    /// Returns `None` for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!("MCP: Handling method: {}", request.method);

        let Some(id) = request.id else {
            debug!("MCP: Notification {}", request.method);
            return None;
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("Unsupported JSON-RPC version: {}", request.jsonrpc),
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "resources/list" => JsonRpcResponse::success(id, json!({ "resources": [] })),
            "resources/templates/list" => {
                JsonRpcResponse::success(id, json!({ "resourceTemplates": [] }))
            }
            _ => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };
        Some(response)
    }

    /// Handle the initialize request.
    fn handle_initialize(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        let protocol_version = params
            .protocol_version
            .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(&v.as_str()))
            .unwrap_or_else(|| LATEST_PROTOCOL_VERSION.to_string());

        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": protocol_version,
                "capabilities": {
                    "resources": {},
                    "tools": {}
                },
                "serverInfo": {
                    "name": self.identity.name,
                    "version": self.identity.version
                }
            }),
        )
    }

    /// Handle the tools/list request.
    fn handle_list_tools(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "tools": self.tools.definitions() }))
    }

    /// Handle a tools/call request.
    async fn handle_call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match serde_json::from_value(params.unwrap_or(Value::Null)) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid tools/call params: {}", e),
                )
            }
        };

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        match self.tools.call(&params.name, arguments).await {
            Ok(result) => match serde_json::to_value(result) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
            },
            Err(e @ (ToolError::UnknownTool(_) | ToolError::InvalidArguments { .. })) => {
                JsonRpcResponse::error(id, INVALID_PARAMS, e.to_string())
            }
            Err(e) => {
                error!("MCP: Tool {} failed: {}", params.name, e);
                JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tests::FakeLookup;
    use std::sync::Arc;

    fn handler(lookup: FakeLookup) -> McpHandler {
        McpHandler::new(
            ServerIdentity::default(),
            ToolRegistry::new(Arc::new(lookup)),
        )
    }

    fn call(name: &str, arguments: Value) -> JsonRpcRequest {
        JsonRpcRequest::new(
            1,
            "tools/call",
            Some(json!({ "name": name, "arguments": arguments })),
        )
    }

    #[tokio::test]
    async fn test_initialize_echoes_supported_version() {
        let handler = handler(FakeLookup::Records(Vec::new()));
        let response = handler
            .handle_request(JsonRpcRequest::new(
                1,
                "initialize",
                Some(json!({"protocolVersion": "2024-11-05", "capabilities": {}})),
            ))
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "countries-mcp");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_initialize_falls_back_to_latest_version() {
        let handler = handler(FakeLookup::Records(Vec::new()));
        let response = handler
            .handle_request(JsonRpcRequest::new(
                1,
                "initialize",
                Some(json!({"protocolVersion": "1999-01-01"})),
            ))
            .await
            .unwrap();
        assert_eq!(
            response.result.unwrap()["protocolVersion"],
            LATEST_PROTOCOL_VERSION
        );
    }

    #[tokio::test]
    async fn test_notifications_get_no_response() {
        let handler = handler(FakeLookup::Records(Vec::new()));
        let response = handler
            .handle_request(JsonRpcRequest::notification(
                "notifications/initialized",
                None,
            ))
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_list_tools() {
        let handler = handler(FakeLookup::Records(Vec::new()));
        let response = handler
            .handle_request(JsonRpcRequest::new(2, "tools/list", None))
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["tools"][0]["name"], "get_country_data");
        assert_eq!(
            result["tools"][0]["inputSchema"]["properties"]["countryName"]["type"],
            "string"
        );
    }

    #[tokio::test]
    async fn test_call_tool_returns_first_record() {
        let handler = handler(FakeLookup::Records(vec![
            json!({"name": {"common": "Japan"}}),
        ]));
        let response = handler
            .handle_request(call("get_country_data", json!({"countryName": "Japan"})))
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["structuredContent"]["data"]["name"]["common"], "Japan");
        assert_eq!(result["content"][0]["type"], "text");
    }

    #[tokio::test]
    async fn test_call_tool_failure_is_empty_data() {
        let handler = handler(FakeLookup::Failure);
        let response = handler
            .handle_request(call("get_country_data", json!({"countryName": "Japan"})))
            .await
            .unwrap();
        assert!(response.error.is_none());
        assert_eq!(response.result.unwrap()["structuredContent"]["data"], json!([]));
    }

    #[tokio::test]
    async fn test_call_tool_bad_arguments() {
        let handler = handler(FakeLookup::Records(Vec::new()));
        let response = handler
            .handle_request(call("get_country_data", json!({"countryName": 42})))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_call_unknown_tool() {
        let handler = handler(FakeLookup::Records(Vec::new()));
        let response = handler
            .handle_request(call("get_weather", json!({})))
            .await
            .unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, INVALID_PARAMS);
        assert!(error.message.contains("get_weather"));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let handler = handler(FakeLookup::Records(Vec::new()));
        let response = handler
            .handle_request(JsonRpcRequest::new(3, "prompts/list", None))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_jsonrpc_version() {
        let handler = handler(FakeLookup::Records(Vec::new()));
        let mut request = JsonRpcRequest::new(4, "ping", None);
        request.jsonrpc = "1.0".to_string();
        let response = handler.handle_request(request).await.unwrap();
        assert_eq!(response.error.unwrap().code, INVALID_REQUEST);
    }
}
