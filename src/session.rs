//! Interactive chat session (the REPL).
//!
//! The session owns the conversation history for the lifetime of the process
//! and drives the top-level flow:
//!
//! ```text
//! greeting (/start, throwaway history)
//!     │
//!     ▼
//! ┌─> "You: " ── read line ── exit/quit? ──> farewell
//! │                 │
//! │                 ├── end of input ───────> farewell
//! │                 │
//! │                 ▼
//! │     history += user message
//! │     exchange (/prompt, full history)
//! └─────────────────┘
//!
//! Ctrl-C at any point ─────────────────────> farewell
//! ```
//!
//! A failed exchange ends the turn, not the session: the error is reported on
//! stderr and the user is prompted again.

use crate::client::{AgentClient, Endpoint};
use crate::tools::ToolRegistry;
use crate::types::Message;
use crate::Result;
use std::future::Future;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Printed once, however the session ends
pub const FAREWELL: &str = "\n\nChat session ended.";

/// Why the session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The user typed `exit` or `quit`
    ExitCommand,
    /// Standard input was closed
    EndOfInput,
    /// The interrupt signal fired
    Interrupted,
}

/// True when `input` asks to leave the session.
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim();
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

/// A chat session against one agent.
#[derive(Debug)]
pub struct ChatSession {
    client: AgentClient,
    tools: ToolRegistry,
    history: Vec<Message>,
}

impl ChatSession {
    pub fn new(client: AgentClient, tools: ToolRegistry) -> Self {
        Self {
            client,
            tools,
            history: Vec::new(),
        }
    }

    /// The conversation so far. The greeting is not part of it.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Runs the session until exit, end of input, or Ctrl-C.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<SessionEnd>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        self.run_until(input, out, ctrl_c()).await
    }

    /// Like [`run`](Self::run), with a custom interrupt source.
    ///
    /// The farewell is written whichever way the session ends, including when
    /// reading input or writing output fails.
    pub async fn run_until<R, W, I>(
        &mut self,
        input: R,
        out: &mut W,
        interrupt: I,
    ) -> Result<SessionEnd>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
        I: Future<Output = ()>,
    {
        tokio::pin!(interrupt);
        let end = self.drive(input, out, &mut interrupt).await;

        writeln!(out, "{}", FAREWELL)?;
        out.flush()?;

        let end = end?;
        tracing::debug!(?end, messages = self.history.len(), "chat session ended");
        Ok(end)
    }

    async fn drive<R, W, I>(
        &mut self,
        input: R,
        out: &mut W,
        interrupt: &mut std::pin::Pin<&mut I>,
    ) -> Result<SessionEnd>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
        I: Future<Output = ()>,
    {
        writeln!(out, "Connecting to agent for introduction...")?;
        write!(out, "\nAgent: ")?;
        out.flush()?;

        tokio::select! {
            biased;
            _ = interrupt.as_mut() => return Ok(SessionEnd::Interrupted),
            _ = self.greet(out) => {}
        }
        writeln!(out, "\n")?;

        writeln!(out, "Chat session started. Type 'exit' or 'quit' to end.")?;

        let mut lines = input.lines();
        loop {
            write!(out, "\nYou: ")?;
            out.flush()?;

            let line = tokio::select! {
                biased;
                _ = interrupt.as_mut() => return Ok(SessionEnd::Interrupted),
                line = lines.next_line() => line?,
            };

            let Some(line) = line else {
                return Ok(SessionEnd::EndOfInput);
            };

            if is_exit_command(&line) {
                return Ok(SessionEnd::ExitCommand);
            }

            self.history.push(Message::user(line));
            write!(out, "Agent: ")?;
            out.flush()?;

            tokio::select! {
                biased;
                _ = interrupt.as_mut() => return Ok(SessionEnd::Interrupted),
                result = self.client.exchange(Endpoint::Prompt, &mut self.history, &self.tools, out) => {
                    if let Err(e) = result {
                        tracing::warn!(error = %e, "prompt exchange failed");
                        eprintln!("\nError: {}", e);
                    }
                }
            }
        }
    }

    /// Asks the agent to introduce itself, outside the conversation history.
    async fn greet<W: Write>(&self, out: &mut W) {
        let mut intro = Vec::new();
        if let Err(e) = self
            .client
            .exchange(Endpoint::Start, &mut intro, &self.tools, out)
            .await
        {
            tracing::warn!(error = %e, "greeting exchange failed");
            eprintln!("\nError: {}", e);
        }
    }
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves,
/// so the session is not torn down by accident.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
