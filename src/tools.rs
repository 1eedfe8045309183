//! # Tool registry and dispatch
//!
//! The agent may answer a prompt with tool calls instead of (or alongside)
//! text. Each call names a tool and carries a string of JSON arguments. This
//! module resolves those calls against a [`ToolRegistry`] and turns every
//! outcome, success or failure, into a `tool` message for the history.
//!
//! ## Dispatch Flow
//!
//! ```text
//! ToolCall { id, function: { name, arguments } }
//!     │
//!     ├─> name not registered        → "Error: Unknown tool '<name>'."
//!     │
//!     ├─> arguments not JSON         → "Error: Invalid arguments for <name>."
//!     │
//!     ├─> handler rejects the input  → "Error: Invalid arguments for <name>."
//!     │
//!     ├─> handler fails otherwise    → "Error: <error>"
//!     │
//!     └─> handler succeeds           → its text
//!             │
//!             ▼
//!     Message { role: tool, tool_call_id: id, name, content }
//! ```
//!
//! A failing call never aborts the batch: every call gets exactly one tool
//! message, in input order.
//!
//! ## Adding a Tool
//!
//! ```rust,no_run
//! use nerdalert_chat::{Tool, ToolRegistry};
//! use serde_json::Value;
//!
//! let echo = Tool::new("echo", "Echo the 'text' argument", |args: Value| async move {
//!     Ok(args["text"].as_str().unwrap_or_default().to_string())
//! });
//!
//! let registry = ToolRegistry::new().with(echo);
//! assert!(registry.get("echo").is_some());
//! ```

use crate::types::{Message, ToolCall};
use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for tool handler functions.
///
/// ```text
/// Arc<                                       // shared by every clone of the Tool
///   dyn Fn(Value)                            // parsed JSON arguments
///     -> Pin<Box<
///       dyn Future<Output = Result<String>>  // text handed back to the agent
///         + Send>>
///     + Send + Sync>
/// ```
pub type ToolHandler =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<String>> + Send>> + Send + Sync>;

/// A named capability the agent can invoke.
///
/// The agent owns the tool schemas, so a client-side tool is only a name, a
/// description for diagnostics, and a handler.
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    handler: ToolHandler,
}

impl Tool {
    /// Create a new tool.
    ///
    /// The handler receives the already-parsed arguments. Returning
    /// [`Error::InvalidInput`] marks the arguments as unusable, which the
    /// dispatcher reports the same way as arguments that are not JSON.
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    /// Execute the tool with the provided arguments.
    pub async fn execute(&self, arguments: Value) -> Result<String> {
        (self.handler)(arguments).await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Name → tool lookup used to resolve the agent's tool calls.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any previous tool with the same name.
    pub fn register(&mut self, tool: Tool) -> &mut Self {
        self.tools.insert(tool.name.clone(), tool);
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, tool: Tool) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Runs a single call and returns the text for its tool message.
    pub async fn resolve(&self, call: &ToolCall) -> String {
        let name = call.name();

        let Some(tool) = self.get(name) else {
            tracing::warn!(tool = name, id = %call.id, "agent requested an unknown tool");
            return format!("Error: Unknown tool '{}'.", name);
        };

        let arguments: Value = match serde_json::from_str(call.arguments()) {
            Ok(arguments) => arguments,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool arguments are not valid JSON");
                return invalid_arguments(name);
            }
        };

        tracing::debug!(tool = name, id = %call.id, "executing tool");
        match tool.execute(arguments).await {
            Ok(text) => text,
            Err(Error::InvalidInput(reason)) => {
                tracing::warn!(tool = name, %reason, "tool rejected its arguments");
                invalid_arguments(name)
            }
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool execution failed");
                format!("Error: {}", e)
            }
        }
    }

    /// Resolves every call in order and appends one tool message per call.
    pub async fn dispatch(&self, calls: &[ToolCall], history: &mut Vec<Message>) {
        for call in calls {
            let content = self.resolve(call).await;
            history.push(Message::tool(call.id.clone(), call.name(), content));
        }
    }
}

fn invalid_arguments(name: &str) -> String {
    format!("Error: Invalid arguments for {}.", name)
}
