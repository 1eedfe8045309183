//! Web search backed by the DuckDuckGo instant answer API.
//!
//! The API is unauthenticated and returns a JSON document; only two fields are
//! read:
//!
//! ```text
//! {
//!   "AbstractText": "Paris is the capital and largest city of France...",
//!   "RelatedTopics": [ { "Text": "Paris Agreement - ..." }, ... ]
//! }
//! ```
//!
//! [`SearchClient::search`] never fails. Transport and decoding problems are
//! folded into the returned string so the agent can read them as a tool result.

use crate::tools::Tool;
use crate::Error;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Returned when the response has neither an abstract nor a related topic
pub const NO_ANSWER: &str = "No definitive answer found.";

/// Returned when the response body is not the expected JSON document
pub const PARSE_ERROR: &str = "Error: Could not parse search engine response.";

/// Name under which the search tool is registered
pub const WEB_SEARCH_TOOL: &str = "web_search";

#[derive(Debug, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: Option<String>,

    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

/// Topic groups carry `Name`/`Topics` instead of `Text`, hence the Option
#[derive(Debug, Deserialize)]
struct RelatedTopic {
    #[serde(rename = "Text", default)]
    text: Option<String>,
}

/// Picks the best-effort summary out of a search API response body.
///
/// Priority: non-empty `AbstractText`, then the non-empty `Text` of the first
/// related topic, then [`NO_ANSWER`]. A body that is not valid JSON of that
/// shape yields [`PARSE_ERROR`].
pub fn summarize(body: &str) -> String {
    let answer: InstantAnswer = match serde_json::from_str(body) {
        Ok(answer) => answer,
        Err(e) => {
            tracing::debug!(error = %e, "search response did not decode");
            return PARSE_ERROR.to_string();
        }
    };

    if let Some(text) = answer.abstract_text.filter(|t| !t.is_empty()) {
        return text;
    }

    answer
        .related_topics
        .into_iter()
        .next()
        .and_then(|topic| topic.text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NO_ANSWER.to_string())
}

/// Client for the search API, sharing the session's HTTP client.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl SearchClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            url: url.into(),
            timeout,
        }
    }

    /// Searches for `query` and returns a text summary or an error string.
    pub async fn search(&self, query: &str) -> String {
        eprintln!("\nPerforming web search for: {}...", query);

        match self.fetch(query).await {
            Ok(body) => summarize(&body),
            Err(e) => {
                tracing::warn!(error = %e, query, "web search failed");
                format!("Error performing web search: {}", e)
            }
        }
    }

    async fn fetch(&self, query: &str) -> std::result::Result<String, reqwest::Error> {
        tracing::debug!(url = %self.url, query, "sending search request");

        self.http
            .get(&self.url)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    /// Wraps this client as the `web_search` tool.
    ///
    /// The tool expects arguments of the form `{"query": "<text>"}`; anything
    /// else is rejected as invalid input.
    pub fn into_tool(self) -> Tool {
        Tool::new(
            WEB_SEARCH_TOOL,
            "Search the web and return a short summary of the best answer",
            move |args: Value| {
                let client = self.clone();
                async move {
                    let query = args
                        .get("query")
                        .and_then(Value::as_str)
                        .ok_or_else(|| Error::invalid_input("'query' must be a string"))?;
                    Ok::<String, Error>(client.search(query).await)
                }
            },
        )
    }
}
