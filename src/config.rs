//! Configuration for the chat client

use crate::{Error, Result};
use std::env;
use std::time::Duration;
use url::Url;

/// Environment variable overriding the agent's base address
pub const AGENT_URL_ENV: &str = "AGENT_URL";

/// Agent base address used when `AGENT_URL` is unset
pub const DEFAULT_AGENT_URL: &str = "http://localhost:80";

/// Public search API queried by the `web_search` tool
pub const DEFAULT_SEARCH_URL: &str = "https://api.duckduckgo.com/";

/// Settings shared by the agent client, the search client and the session.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Agent base address; `/start` and `/prompt` are resolved against it
    pub base_url: String,

    /// Search API endpoint
    pub search_url: String,

    /// Connect timeout and maximum idle time between stream reads, in seconds
    pub request_timeout: u64,

    /// Tool rounds allowed for a single user turn before failing closed
    pub max_tool_rounds: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_AGENT_URL.to_string(),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            request_timeout: 60,
            max_tool_rounds: 5,
        }
    }
}

impl ChatConfig {
    /// Create a new builder for ChatConfig
    pub fn builder() -> ChatConfigBuilder {
        ChatConfigBuilder::default()
    }

    /// Build the configuration from the process environment.
    ///
    /// Only `AGENT_URL` is read; everything else keeps its default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = Self::builder();
        if let Some(url) = lookup(AGENT_URL_ENV).filter(|v| !v.trim().is_empty()) {
            builder = builder.base_url(url.trim());
        }
        builder.build()
    }

    /// Endpoint that opens a session and returns the agent's introduction
    pub fn start_url(&self) -> String {
        format!("{}/start", self.base_url)
    }

    /// Endpoint that continues a session with the full history
    pub fn prompt_url(&self) -> String {
        format!("{}/prompt", self.base_url)
    }

    /// `request_timeout` as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// Builder for ChatConfig
#[derive(Debug, Default)]
pub struct ChatConfigBuilder {
    base_url: Option<String>,
    search_url: Option<String>,
    request_timeout: Option<u64>,
    max_tool_rounds: Option<u32>,
}

impl ChatConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = Some(url.into());
        self
    }

    pub fn request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout = Some(seconds);
        self
    }

    pub fn max_tool_rounds(mut self, rounds: u32) -> Self {
        self.max_tool_rounds = Some(rounds);
        self
    }

    pub fn build(self) -> Result<ChatConfig> {
        let defaults = ChatConfig::default();

        let base_url = validate_http_url(self.base_url.unwrap_or(defaults.base_url), "base_url")?;
        let search_url = validate_http_url(
            self.search_url.unwrap_or(defaults.search_url),
            "search_url",
        )?;

        let request_timeout = self.request_timeout.unwrap_or(defaults.request_timeout);
        if request_timeout == 0 {
            return Err(Error::config("request_timeout must be at least 1 second"));
        }

        let max_tool_rounds = self.max_tool_rounds.unwrap_or(defaults.max_tool_rounds);
        if max_tool_rounds == 0 {
            return Err(Error::config("max_tool_rounds must be at least 1"));
        }

        Ok(ChatConfig {
            // Endpoints are appended with a leading slash
            base_url: base_url.trim_end_matches('/').to_string(),
            search_url,
            request_timeout,
            max_tool_rounds,
        })
    }
}

fn validate_http_url(raw: String, field: &str) -> Result<String> {
    let parsed =
        Url::parse(&raw).map_err(|e| Error::config(format!("{} '{}': {}", field, raw, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(raw),
        other => Err(Error::config(format!(
            "{} '{}': unsupported scheme '{}'",
            field, raw, other
        ))),
    }
}
