//! Tool registry and dispatcher.
//!
//! Provides a `ToolHandler` trait for implementing tools and a `ToolRegistry`
//! that routes invocation requests: lookup by name, validate arguments
//! against the handler's declared schema, run the handler, and normalize the
//! outcome into a `CallToolResult` envelope.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use rmcp::model::{CallToolResult, Content, JsonObject, Tool as McpTool};
use tokio_util::sync::CancellationToken;

use super::schema::{self, ParamSpec, ValidationError};

/// Context passed to tool handlers during execution.
#[derive(Clone, Default)]
pub struct ToolContext {
    /// Cancelled when the client aborts the request or the server shuts
    /// down; long-running handlers should observe it.
    pub ct: CancellationToken,
}

impl ToolContext {
    pub fn new(ct: CancellationToken) -> Self {
        Self { ct }
    }
}

/// Trait for handling MCP tool invocations.
///
/// Every handler is invoked through the same boxed-future path whether it
/// suspends on remote I/O or completes immediately.
pub trait ToolHandler: Send + Sync {
    /// The tool's name (e.g. "get_node_status").
    fn name(&self) -> &str;

    /// Human-readable description shown to the calling agent.
    fn description(&self) -> &str;

    /// Parameter declarations; validated before `execute` is called.
    fn params(&self) -> &[ParamSpec] {
        &[]
    }

    /// Executes the tool. Arguments have already passed structural
    /// validation against `params()`.
    fn execute(
        &self,
        args: JsonObject,
        ctx: &ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>>;

    /// Converts this handler to an `McpTool` for use in `list_tools`.
    fn to_mcp_tool(&self) -> McpTool {
        use std::borrow::Cow;

        McpTool {
            name: Cow::Owned(self.name().to_string()),
            title: None,
            description: Some(Cow::Owned(self.description().to_string())),
            input_schema: Arc::new(schema::input_schema(self.params())),
            output_schema: None,
            annotations: None,
            icons: None,
            meta: None,
        }
    }
}

/// Fatal registration failure at startup.
#[derive(Debug)]
pub enum RegistryError {
    /// A tool with this name is already registered.
    Duplicate(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::Duplicate(name) => {
                write!(f, "tool already registered: {}", name)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Recoverable dispatch failure, surfaced to the caller as a protocol error.
#[derive(Debug)]
pub enum DispatchError {
    UnknownTool(String),
    Validation(ValidationError),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::UnknownTool(name) => write!(f, "tool not found: {}", name),
            DispatchError::Validation(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<ValidationError> for DispatchError {
    fn from(err: ValidationError) -> Self {
        DispatchError::Validation(err)
    }
}

/// Build a successful envelope from ordered text blocks.
pub fn text_result(blocks: Vec<String>) -> CallToolResult {
    CallToolResult {
        content: blocks.into_iter().map(Content::text).collect(),
        structured_content: None,
        is_error: Some(false),
        meta: None,
    }
}

/// Build an error envelope with a single descriptive text block.
pub fn error_result(text: String) -> CallToolResult {
    CallToolResult {
        content: vec![Content::text(text)],
        structured_content: None,
        is_error: Some(true),
        meta: None,
    }
}

/// Registry for managing tool handlers.
///
/// Created once at startup and shared immutably behind `Arc` afterwards.
#[derive(Clone)]
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    /// Registration order, so `list_tools` is deterministic.
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool handler. Fails on a duplicate name and leaves the
    /// existing entry untouched.
    pub fn register<T: ToolHandler + 'static>(mut self, handler: T) -> Result<Self, RegistryError> {
        let name = handler.name().to_string();
        if self.handlers.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.order.push(name.clone());
        self.handlers.insert(name, Arc::new(handler));
        Ok(self)
    }

    /// Get a tool handler by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// All registered tools as `McpTool` descriptors, in registration order.
    pub fn list_tools(&self) -> Vec<McpTool> {
        self.order
            .iter()
            .filter_map(|name| self.handlers.get(name))
            .map(|handler| handler.to_mcp_tool())
            .collect()
    }

    /// Dispatch one invocation: lookup, validate, execute, normalize.
    ///
    /// Unknown tools and malformed arguments return `DispatchError` without
    /// running the handler. Handler failures become an error envelope with a
    /// single text block; no retry is attempted here.
    pub async fn call_tool(
        &self,
        name: &str,
        args: JsonObject,
        ctx: &ToolContext,
    ) -> Result<CallToolResult, DispatchError> {
        let handler = self
            .get(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        schema::validate(handler.params(), &args)?;

        match handler.execute(args, ctx).await {
            Ok(result) => Ok(result),
            Err(e) => Ok(error_result(format!("Tool {} failed: {:#}", name, e))),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::ParamKind;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Handler that records every invocation and echoes configured blocks.
    struct RecordingHandler {
        name: &'static str,
        params: Vec<ParamSpec>,
        calls: Arc<AtomicUsize>,
        seen_args: Arc<Mutex<Vec<JsonObject>>>,
        blocks: Vec<String>,
        fail: bool,
    }

    impl RecordingHandler {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                params: Vec::new(),
                calls: Arc::new(AtomicUsize::new(0)),
                seen_args: Arc::new(Mutex::new(Vec::new())),
                blocks: vec!["ok".to_string()],
                fail: false,
            }
        }

        fn with_params(mut self, params: Vec<ParamSpec>) -> Self {
            self.params = params;
            self
        }

        fn with_blocks(mut self, blocks: Vec<String>) -> Self {
            self.blocks = blocks;
            self
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    impl ToolHandler for RecordingHandler {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "test handler"
        }

        fn params(&self) -> &[ParamSpec] {
            &self.params
        }

        fn execute(
            &self,
            args: JsonObject,
            _ctx: &ToolContext,
        ) -> Pin<Box<dyn Future<Output = Result<CallToolResult>> + Send + '_>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_args.lock().unwrap().push(args);
            let blocks = self.blocks.clone();
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    anyhow::bail!("node unreachable");
                }
                Ok(text_result(blocks))
            })
        }
    }

    fn args(raw: &str) -> JsonObject {
        serde_json::from_str(raw).unwrap()
    }

    fn text_of(result: &CallToolResult, index: usize) -> String {
        result.content[index]
            .as_text()
            .map(|t| t.text.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_descriptor_round_trip() {
        let params = vec![ParamSpec::required(
            "node",
            ParamKind::String,
            "Name/ID of node to query",
        )];
        let registry = ToolRegistry::new()
            .register(RecordingHandler::new("get_node_status").with_params(params))
            .unwrap();

        let tools = registry.list_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "get_node_status");
        assert_eq!(tools[0].description.as_deref(), Some("test handler"));

        let schema = &tools[0].input_schema;
        let required = schema.get("required").unwrap().as_array().unwrap();
        assert_eq!(required.len(), 1);
        assert_eq!(required[0], "node");
    }

    #[test]
    fn test_duplicate_registration_fails_and_keeps_original() {
        let first = RecordingHandler::new("get_nodes").with_blocks(vec!["first".into()]);
        let registry = ToolRegistry::new().register(first).unwrap();

        let second = RecordingHandler::new("get_nodes").with_blocks(vec!["second".into()]);
        let Err(err) = registry.clone().register(second) else {
            panic!("duplicate registration must fail");
        };
        assert!(matches!(err, RegistryError::Duplicate(name) if name == "get_nodes"));

        // The surviving registry still holds the original handler.
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("get_nodes"));
    }

    #[tokio::test]
    async fn test_missing_required_param_never_calls_handler() {
        let handler = RecordingHandler::new("get_node_status").with_params(vec![
            ParamSpec::required("node", ParamKind::String, "node"),
        ]);
        let calls = handler.calls.clone();
        let registry = ToolRegistry::new().register(handler).unwrap();

        let err = registry
            .call_tool("get_node_status", args("{}"), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Validation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_params_call_handler_once_with_exact_values() {
        let handler = RecordingHandler::new("execute_vm_command").with_params(vec![
            ParamSpec::required("node", ParamKind::String, "node"),
            ParamSpec::required("vmid", ParamKind::String, "vmid"),
            ParamSpec::required("command", ParamKind::String, "command"),
        ]);
        let calls = handler.calls.clone();
        let seen = handler.seen_args.clone();
        let registry = ToolRegistry::new().register(handler).unwrap();

        let invocation = args(r#"{"node":"pve1","vmid":"100","command":"uptime"}"#);
        registry
            .call_tool("execute_vm_command", invocation.clone(), &ToolContext::default())
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(seen.lock().unwrap()[0], invocation);
    }

    #[tokio::test]
    async fn test_blocks_preserve_handler_order() {
        let blocks: Vec<String> = (0..4).map(|i| format!("block-{}", i)).collect();
        let handler = RecordingHandler::new("get_nodes").with_blocks(blocks.clone());
        let registry = ToolRegistry::new().register(handler).unwrap();

        let result = registry
            .call_tool("get_nodes", args("{}"), &ToolContext::default())
            .await
            .unwrap();

        assert_eq!(result.content.len(), blocks.len());
        for (i, expected) in blocks.iter().enumerate() {
            assert_eq!(&text_of(&result, i), expected);
        }
        assert_eq!(result.is_error, Some(false));
    }

    #[tokio::test]
    async fn test_handler_failure_becomes_error_envelope() {
        let registry = ToolRegistry::new()
            .register(RecordingHandler::new("execute_vm_command").failing())
            .unwrap();

        let result = registry
            .call_tool("execute_vm_command", args("{}"), &ToolContext::default())
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(true));
        assert_eq!(result.content.len(), 1);
        assert!(text_of(&result, 0).contains("node unreachable"));

        // The registry keeps serving after a handler failure.
        let registry = registry
            .register(RecordingHandler::new("get_nodes"))
            .unwrap();
        let ok = registry
            .call_tool("get_nodes", args("{}"), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(ok.is_error, Some(false));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .call_tool("no_such_tool", args("{}"), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownTool(name) if name == "no_such_tool"));
    }

    #[test]
    fn test_list_tools_registration_order() {
        let registry = ToolRegistry::new()
            .register(RecordingHandler::new("zeta"))
            .unwrap()
            .register(RecordingHandler::new("alpha"))
            .unwrap();
        let names: Vec<_> = registry.list_tools().iter().map(|t| t.name.to_string()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }
}
