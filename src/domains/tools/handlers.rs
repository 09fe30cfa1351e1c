//! Shared tool plumbing.
//!
//! Every nonprofit tool implements [`NonprofitTool`]; the generic helpers in
//! this module turn one implementation into rmcp metadata, a STDIO route and
//! an HTTP handler, and apply the common result/error rendering.

use std::sync::Arc;

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Content, Tool},
};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{info, warn};

use super::error::ToolError;
use crate::domains::nonprofit::NonprofitClient;

/// A tool backed by the nonprofit API client.
#[async_trait::async_trait]
pub trait NonprofitTool: Send + Sync + 'static {
    /// Tool name as registered in MCP.
    const NAME: &'static str;

    /// Tool description shown to clients.
    const DESCRIPTION: &'static str;

    /// Prefix of the `error` message on failure (e.g. "Search failed").
    const FAILURE_CONTEXT: &'static str;

    type Params: DeserializeOwned + JsonSchema + Send + 'static;

    /// Produce the tool's JSON result.
    async fn run(params: Self::Params, client: &NonprofitClient) -> Result<Value, ToolError>;
}

/// Create a Tool model for `T` (metadata).
pub fn tool_model<T: NonprofitTool>() -> Tool {
    Tool {
        name: T::NAME.into(),
        description: Some(T::DESCRIPTION.into()),
        input_schema: cached_schema_for_type::<T::Params>(),
        annotations: None,
        output_schema: None,
        icons: None,
        meta: None,
        title: None,
    }
}

/// Create a ToolRoute for STDIO transport.
pub fn route_for<T, S>(client: Arc<NonprofitClient>) -> ToolRoute<S>
where
    T: NonprofitTool,
    S: Send + Sync + 'static,
{
    ToolRoute::new_dyn(tool_model::<T>(), move |ctx: ToolCallContext<'_, S>| {
        let args = ctx.arguments.clone().unwrap_or_default();
        let client = client.clone();
        async move { Ok::<_, McpError>(call::<T>(Value::Object(args), &client).await) }.boxed()
    })
}

/// Parse raw arguments and run `T`, rendering success or failure.
///
/// Argument errors are reported like any other tool failure, so the caller
/// always gets a JSON body.
pub async fn call<T: NonprofitTool>(arguments: Value, client: &NonprofitClient) -> CallToolResult {
    info!("Tool called: {}", T::NAME);

    let outcome = match serde_json::from_value::<T::Params>(arguments) {
        Ok(params) => T::run(params, client).await,
        Err(e) => Err(ToolError::invalid_arguments(e.to_string())),
    };

    match outcome.and_then(|value| Ok(serde_json::to_string_pretty(&value)?)) {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => {
            warn!("{} failed: {}", T::NAME, e);
            let payload = e.to_payload(T::FAILURE_CONTEXT);
            let text = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
            CallToolResult::error(vec![Content::text(text)])
        }
    }
}

/// HTTP handler for `T` (for HTTP transport).
#[cfg(feature = "http")]
pub async fn http_call<T: NonprofitTool>(arguments: Value, client: &NonprofitClient) -> Value {
    let result = call::<T>(arguments, client).await;
    serde_json::json!({
        "content": result.content,
        "isError": result.is_error.unwrap_or(false)
    })
}

/// Text of the first content item, for tests and logging.
pub fn result_text(result: &CallToolResult) -> Option<&str> {
    result.content.first().and_then(|c| match &c.raw {
        rmcp::model::RawContent::Text(text) => Some(text.text.as_str()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::testing::client_for;
    use serde::Deserialize;
    use serde_json::json;
    use wiremock::MockServer;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct EchoParams {
        value: i64,
    }

    struct EchoTool;

    #[async_trait::async_trait]
    impl NonprofitTool for EchoTool {
        const NAME: &'static str = "echo";
        const DESCRIPTION: &'static str = "Echo a number";
        const FAILURE_CONTEXT: &'static str = "Echo failed";
        type Params = EchoParams;

        async fn run(params: EchoParams, _client: &NonprofitClient) -> Result<Value, ToolError> {
            if params.value < 0 {
                return Err(ToolError::no_data("negative"));
            }
            Ok(json!({ "value": params.value }))
        }
    }

    #[test]
    fn test_tool_model_metadata() {
        let tool = tool_model::<EchoTool>();
        assert_eq!(tool.name, "echo");
        assert_eq!(tool.description.as_deref(), Some("Echo a number"));
        assert!(tool.input_schema.contains_key("properties"));
    }

    #[tokio::test]
    async fn test_call_renders_success_as_pretty_json() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        let result = call::<EchoTool>(json!({"value": 7}), &client).await;
        assert_ne!(result.is_error, Some(true));
        let body: Value = serde_json::from_str(result_text(&result).unwrap()).unwrap();
        assert_eq!(body["value"], 7);
    }

    #[tokio::test]
    async fn test_call_renders_failures_as_payload() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        let result = call::<EchoTool>(json!({"value": -1}), &client).await;
        assert_eq!(result.is_error, Some(true));
        let body: Value = serde_json::from_str(result_text(&result).unwrap()).unwrap();
        assert_eq!(body["error"], "Echo failed: negative");
        assert_eq!(body["error_type"], "NoData");

        let result = call::<EchoTool>(json!({"value": "seven"}), &client).await;
        assert_eq!(result.is_error, Some(true));
        let body: Value = serde_json::from_str(result_text(&result).unwrap()).unwrap();
        assert_eq!(body["error_type"], "InvalidArguments");
    }
}
