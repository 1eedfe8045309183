//! # NerdAlert Chat
//!
//! A terminal chat client for a streaming conversational agent.
//!
//! ## Overview
//!
//! The agent lives behind two HTTP endpoints, `/start` and `/prompt`. Each
//! request posts the whole conversation history; each response streams back
//! text deltas and, when the agent wants outside information, tool calls. The
//! client executes those tool calls locally (today: `web_search`, backed by the
//! DuckDuckGo instant answer API), appends the results to the history and asks
//! the agent again until it produces a plain answer.
//!
//! ## Example
//!
//! ```rust,no_run
//! use nerdalert_chat::{AgentClient, ChatConfig, ChatSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ChatConfig::from_env()?;
//!     let client = AgentClient::new(config)?;
//!     let tools = client.default_tools();
//!
//!     let mut session = ChatSession::new(client, tools);
//!     let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//!     session.run(stdin, &mut std::io::stdout()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **config**: agent base URL, search URL, timeouts and round limit
//! - **types**: wire-format messages, tool calls and stream deltas
//! - **sse**: line reassembly, `data:` classification and delta accumulation
//! - **search**: the search API client and the `web_search` tool
//! - **tools**: tool registry and per-call dispatch
//! - **client**: streamed exchanges with automatic tool rounds
//! - **session**: the interactive loop that owns the history
//! - **error**: the `Error` enum and `Result<T>` alias

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

/// Streamed exchanges with the agent, including tool rounds.
mod client;

/// Configuration with environment override for the agent address.
mod config;

/// Error types and conversions used across the crate.
mod error;

/// Web search client and the `web_search` tool built on it.
mod search;

/// The interactive chat loop.
mod session;

/// Tool registry and dispatch of agent tool calls.
mod tools;

/// Wire-format types for messages, tool calls and stream chunks.
mod types;

/// Decoding of the agent's newline-delimited event stream.
pub mod sse;

// ============================================================================
// PUBLIC EXPORTS
// ============================================================================

pub use client::{AgentClient, Endpoint};

pub use config::{
    AGENT_URL_ENV, ChatConfig, ChatConfigBuilder, DEFAULT_AGENT_URL, DEFAULT_SEARCH_URL,
};

pub use error::{Error, Result};

pub use search::{NO_ANSWER, PARSE_ERROR, SearchClient, WEB_SEARCH_TOOL, summarize};

pub use session::{ChatSession, FAREWELL, SessionEnd, is_exit_command};

pub use tools::{Tool, ToolHandler, ToolRegistry};

pub use types::{
    ChatRequest, FunctionCall, Message, MessageRole, StreamChoice, StreamChunk, StreamDelta,
    ToolCall,
};
