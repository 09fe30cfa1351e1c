//! HTTP transport implementation.
//!
//! JSON-RPC 2.0 over `POST <rpc_path>`, one message or a batch array per
//! request, plus `GET /health` for platform health checks. The endpoint is
//! stateless: `initialize` only reports capabilities.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use http::{Method, header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument, warn};

use super::{TransportError, TransportResult, config::HttpConfig};
use crate::core::McpServer;

const PROTOCOL_VERSION: &str = "2024-11-05";

/// HTTP transport handler.
pub struct HttpTransport {
    config: HttpConfig,
}

/// JSON-RPC request structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Notifications carry no id and get no response.
    fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }

    pub fn method_not_found(id: Option<Value>, method: &str) -> Self {
        Self::error(id, -32601, format!("Method not found: {method}"))
    }

    pub fn invalid_request(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32600, msg)
    }

    pub fn invalid_params(id: Option<Value>, msg: impl Into<String>) -> Self {
        Self::error(id, -32602, msg)
    }
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the axum application.
    pub fn router(&self, server: McpServer) -> Router {
        let app = Router::new()
            .route(&self.config.rpc_path, post(handle_rpc))
            .route("/health", get(health_check))
            .with_state(server)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

        if !self.config.enable_cors {
            return app;
        }
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT]),
        )
    }

    /// Run the HTTP transport until the listener fails.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();
        let app = self.router(server);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        info!(
            "Ready - listening on {} (CORS {})",
            addr,
            if self.config.enable_cors { "enabled" } else { "disabled" }
        );
        info!("  → JSON-RPC: POST {}", self.config.rpc_path);
        info!("  → Health:   GET /health");

        axum::serve(listener, app)
            .await
            .map_err(|e| TransportError::http(e.to_string()))
    }
}

/// Health check endpoint.
async fn health_check(State(server): State<McpServer>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "server": server.name(),
        "transport": "streamable-http"
    }))
}

/// Handle a JSON-RPC message or batch.
async fn handle_rpc(State(server): State<McpServer>, Json(body): Json<Value>) -> Response {
    match process_body(&server, body).await {
        Some(reply) => (StatusCode::OK, Json(reply)).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Dispatch a request body. `None` means nothing to send back (only notifications).
async fn process_body(server: &McpServer, body: Value) -> Option<Value> {
    match body {
        Value::Array(messages) if messages.is_empty() => Some(to_value(
            JsonRpcResponse::invalid_request(None, "Empty batch"),
        )),
        Value::Array(messages) => {
            debug!("Processing batch of {} messages", messages.len());
            let mut replies = Vec::with_capacity(messages.len());
            for message in messages {
                if let Some(reply) = process_message(server, message).await {
                    replies.push(to_value(reply));
                }
            }
            (!replies.is_empty()).then_some(Value::Array(replies))
        }
        message => process_message(server, message).await.map(to_value),
    }
}

fn to_value(response: JsonRpcResponse) -> Value {
    serde_json::to_value(&response).unwrap_or_else(|e| {
        json!({
            "jsonrpc": "2.0",
            "id": response.id,
            "error": { "code": -32603, "message": e.to_string() }
        })
    })
}

async fn process_message(server: &McpServer, message: Value) -> Option<JsonRpcResponse> {
    let id = message.get("id").cloned();
    let request: JsonRpcRequest = match serde_json::from_value(message) {
        Ok(request) => request,
        Err(e) => return Some(JsonRpcResponse::invalid_request(id, e.to_string())),
    };
    if request.jsonrpc != "2.0" {
        return Some(JsonRpcResponse::invalid_request(
            request.id,
            "jsonrpc must be \"2.0\"",
        ));
    }

    if request.is_notification() {
        info!("Received notification: {}", request.method);
        return None;
    }
    Some(dispatch(server, request).await)
}

#[instrument(skip_all, fields(method = %request.method))]
async fn dispatch(server: &McpServer, request: JsonRpcRequest) -> JsonRpcResponse {
    let JsonRpcRequest { id, method, params, .. } = request;
    let params = params.unwrap_or_else(|| json!({}));

    match method.as_str() {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {}, "resources": {} },
                "serverInfo": { "name": server.name(), "version": server.version() },
                "instructions": server.instructions()
            }),
        ),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => JsonRpcResponse::success(id, json!({ "tools": server.list_tools() })),
        "tools/call" => {
            let Some(name) = params.get("name").and_then(Value::as_str) else {
                return JsonRpcResponse::invalid_params(id, "Missing tool name");
            };
            let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
            match server.call_tool(name, arguments).await {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::invalid_params(id, e.to_string()),
            }
        }
        "resources/list" => {
            JsonRpcResponse::success(id, json!({ "resources": server.list_resources().await }))
        }
        "resources/read" => {
            let Some(uri) = params.get("uri").and_then(Value::as_str) else {
                return JsonRpcResponse::invalid_params(id, "Missing resource URI");
            };
            match server.read_resource(uri).await {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::invalid_params(id, e),
            }
        }
        other => {
            warn!("Unknown method: {}", other);
            JsonRpcResponse::method_not_found(id, other)
        }
    }
}
