//! Agent client: streamed exchanges with automatic tool rounds.
//!
//! This module talks to the agent's two endpoints. Every request carries the
//! complete conversation history and every response is a newline-delimited
//! stream of `data:` events (see [`crate::sse`]).
//!
//! # Exchange Flow
//!
//! ```text
//! exchange(endpoint, history)
//!     │
//!     ├─> POST <base>/start or <base>/prompt   {"messages": history}
//!     │
//!     ├─> stream_turn(): echo text deltas to `out`, collect tool calls
//!     │
//!     ├─> no tool calls?  ──────────────────────────────> done
//!     │
//!     ├─> round limit reached?  ────────> Err(ToolRoundsExceeded)
//!     │
//!     ├─> history += assistant { content: text, tool_calls }
//!     │
//!     ├─> ToolRegistry::dispatch(): history += one tool message per call
//!     │
//!     └─> next round against <base>/prompt
//! ```
//!
//! Rounds run in a loop rather than recursively, and the limit is checked
//! before the assistant message is recorded, so the history never holds tool
//! calls that lack their tool messages.
//!
//! # Shared HTTP State
//!
//! One [`reqwest::Client`] with a cookie store is created per process. The
//! agent may correlate a conversation through cookies, and the web search tool
//! reuses the same client (and connection pool) through
//! [`AgentClient::search_client`].
//!
//! # Timeouts
//!
//! The agent stream can legitimately stay open for a long time, so there is no
//! whole-request deadline. Instead connecting, waiting for the response head,
//! and every read of the body are each bounded by
//! [`ChatConfig::request_timeout`]; a stream that goes quiet for longer fails
//! with [`Error::Timeout`].

use crate::config::ChatConfig;
use crate::search::SearchClient;
use crate::sse::{AssistantTurn, LineDecoder, SseLine, StreamAccumulator, classify_line};
use crate::tools::ToolRegistry;
use crate::types::{ChatRequest, Message};
use crate::{Error, Result};
use futures::stream::StreamExt;
use std::io::Write;

/// The two agent endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Opens a session; the agent introduces itself
    Start,
    /// Continues a session with the full history
    Prompt,
}

/// Client for the conversational agent.
#[derive(Debug, Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    config: ChatConfig,
}

impl AgentClient {
    /// Creates the client and its HTTP session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] when the underlying HTTP client cannot be built
    /// (for example, no TLS backend is available).
    pub fn new(config: ChatConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .connect_timeout(config.timeout())
            .build()
            .map_err(Error::Http)?;

        Ok(Self::with_http_client(http, config))
    }

    /// Creates the client around an existing HTTP session.
    pub fn with_http_client(http: reqwest::Client, config: ChatConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Search client sharing this client's HTTP session.
    pub fn search_client(&self) -> SearchClient {
        SearchClient::new(
            self.http.clone(),
            self.config.search_url.clone(),
            self.config.timeout(),
        )
    }

    /// Registry holding the built-in `web_search` tool.
    pub fn default_tools(&self) -> ToolRegistry {
        ToolRegistry::new().with(self.search_client().into_tool())
    }

    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        match endpoint {
            Endpoint::Start => self.config.start_url(),
            Endpoint::Prompt => self.config.prompt_url(),
        }
    }

    /// Runs one exchange, including every tool round it triggers.
    ///
    /// Text is written to `out` as it arrives. When a response requests tools,
    /// the assistant message and the tool results are appended to `history`
    /// and the agent is asked again via [`Endpoint::Prompt`].
    ///
    /// # Errors
    ///
    /// - [`Error::Http`] / [`Error::Timeout`]: the request or the stream failed
    /// - [`Error::Stream`]: a stream line grew past the decoder limit
    /// - [`Error::Api`]: the agent answered with a non-success status
    /// - [`Error::ToolRoundsExceeded`]: the agent still wanted tools after
    ///   `max_tool_rounds` rounds
    /// - [`Error::Io`]: writing to `out` failed
    pub async fn exchange<W: Write>(
        &self,
        endpoint: Endpoint,
        history: &mut Vec<Message>,
        tools: &ToolRegistry,
        out: &mut W,
    ) -> Result<()> {
        let max_rounds = self.config.max_tool_rounds;
        let mut url = self.endpoint_url(endpoint);
        let mut rounds = 0;

        loop {
            let turn = self.stream_turn(&url, history, out).await?;
            if !turn.requests_tools() {
                return Ok(());
            }

            if rounds >= max_rounds {
                tracing::warn!(rounds, "agent exceeded the tool round limit");
                return Err(Error::ToolRoundsExceeded(max_rounds));
            }
            rounds += 1;

            let AssistantTurn { text, tool_calls } = turn;
            tracing::debug!(round = rounds, calls = tool_calls.len(), "dispatching tool calls");

            history.push(Message::assistant(text, tool_calls.clone()));
            tools.dispatch(&tool_calls, history).await;

            eprintln!("\nSending search results back to agent...");
            url = self.endpoint_url(Endpoint::Prompt);
        }
    }

    /// Sends `history` to `url` and consumes the streamed response.
    ///
    /// Text fragments are written and flushed to `out` one by one. Malformed
    /// `data:` payloads are reported on stderr and skipped; `[DONE]` stops the
    /// read even if the body continues.
    pub async fn stream_turn<W: Write>(
        &self,
        url: &str,
        history: &[Message],
        out: &mut W,
    ) -> Result<AssistantTurn> {
        tracing::debug!(url, messages = history.len(), "sending agent request");

        let idle_timeout = self.config.timeout();
        let request = self
            .http
            .post(url)
            .json(&ChatRequest { messages: history })
            .send();
        let response = tokio::time::timeout(idle_timeout, request)
            .await
            .map_err(|_| Error::timeout())?
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to read error response body");
                "Unknown error (failed to read response body)".to_string()
            });
            return Err(Error::api(format!("API error {}: {}", status, body)));
        }

        let mut body = response.bytes_stream();
        let mut decoder = LineDecoder::new();
        let mut accumulator = StreamAccumulator::new();

        loop {
            let next = tokio::time::timeout(idle_timeout, body.next())
                .await
                .map_err(|_| Error::timeout())?;

            let (lines, finished) = match next {
                Some(chunk) => (decoder.push(&chunk?)?, false),
                None => (decoder.finish().into_iter().collect(), true),
            };

            for line in lines {
                if !apply_line(&line, &mut accumulator, out)? {
                    tracing::debug!("stream finished with [DONE]");
                    return Ok(accumulator.finish());
                }
            }

            if finished {
                tracing::debug!("stream body ended");
                return Ok(accumulator.finish());
            }
        }
    }
}

/// Applies one stream line. Returns `false` once the stream is done.
fn apply_line<W: Write>(
    line: &str,
    accumulator: &mut StreamAccumulator,
    out: &mut W,
) -> Result<bool> {
    match classify_line(line) {
        SseLine::Ignored | SseLine::Delta(None) => Ok(true),
        SseLine::Done => Ok(false),
        SseLine::Delta(Some(delta)) => {
            if let Some(text) = accumulator.apply(delta) {
                out.write_all(text.as_bytes())?;
                out.flush()?;
            }
            Ok(true)
        }
        SseLine::Malformed(payload) => {
            tracing::warn!(%payload, "skipping undecodable stream line");
            eprintln!("\nError decoding JSON: {}", payload);
            Ok(true)
        }
    }
}
