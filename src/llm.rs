//! Chat-completions collaborator for OpenAI-compatible endpoints.
//!
//! The diff is sent with a fixed system prompt describing the expected JSON
//! reply. The reply text is returned as is; decoding is left to
//! [`crate::annotations::parse_annotations`].

use log::debug;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::RevkError;
use crate::http::{self, HttpSettings, RetryConfig};
use crate::review::Annotator;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub const SYSTEM_PROMPT: &str = "\
You are a meticulous code reviewer. You receive a unified diff and report \
at most 3 concrete problems introduced by the added lines (lines starting \
with '+'). Only report bugs, security issues or clear correctness risks; \
ignore style.

Reply with JSON only, in exactly this shape:
{\"comments\":[{\"context\":\"...\",\"comment\":\"...\",\"suggestion\":\"...\"}]}

- context: code copied verbatim from a single added line, without the \
leading '+'.
- comment: what is wrong, in one or two sentences.
- suggestion: how to fix it.

If there is nothing to report, reply with {\"comments\":[]}.";

/// User message carrying `diff` in a fenced block.
///
/// # Examples
/// ```
/// use revk::llm::build_prompt;
///
/// let prompt = build_prompt("+let x = 1;\n");
/// assert!(prompt.contains("```diff\n+let x = 1;\n```"));
/// ```
#[must_use]
pub fn build_prompt(diff: &str) -> String {
    let diff = diff.trim_end_matches('\n');
    format!("Review the following changes.\n\n```diff\n{diff}\n```")
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for `POST {endpoint}/chat/completions`.
pub struct LlmClient {
    completions: Url,
    model: String,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl LlmClient {
    /// Create a client for `endpoint` (default [`DEFAULT_ENDPOINT`]) and
    /// `model` (default [`DEFAULT_MODEL`]).
    ///
    /// # Errors
    ///
    /// Returns [`RevkError::Config`] for an invalid endpoint or API key and
    /// [`RevkError::RequestContext`] when the HTTP client cannot be built.
    pub fn new(
        api_key: &str,
        endpoint: Option<&str>,
        model: Option<&str>,
        settings: &HttpSettings,
    ) -> Result<Self, RevkError> {
        let base = http::base_url(endpoint.unwrap_or(DEFAULT_ENDPOINT))?;
        let completions = http::join(&base, "chat/completions")?;
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("revk"));
        let auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| RevkError::config(format!("invalid LLM API key: {e}")))?;
        headers.insert(AUTHORIZATION, auth);
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|e| RevkError::RequestContext {
                context: "build LLM client".into(),
                source: Box::new(e),
            })?;
        Ok(Self {
            completions,
            model: model.unwrap_or(DEFAULT_MODEL).to_owned(),
            client,
            retry: settings.retry,
        })
    }
}

impl Annotator for LlmClient {
    async fn annotate(&self, diff: &str) -> Result<String, RevkError> {
        let prompt = build_prompt(diff);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.0,
        };
        let context = format!("chat completion with {}", self.model);
        let body = http::send_with_retry(self.retry, &context, || {
            self.client.post(self.completions.clone()).json(&request)
        })
        .await?;
        let response: ChatResponse = http::decode_json(&body)?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RevkError::MalformedResponse {
                message: "completion has no message content".into(),
                snippet: http::snippet(&body, 200).into(),
            })?;
        debug!("model replied with {} characters", content.len());
        Ok(content)
    }
}
