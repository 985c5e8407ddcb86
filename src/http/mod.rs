//! Shared HTTP plumbing for the GitHub and model collaborators.
//!
//! Requests are retried with exponential backoff while the failure is
//! transient (see [`RevkError::is_transient`]). Non-success statuses surface
//! as [`RevkError::HttpStatus`] carrying a truncated body snippet.

pub mod retry;

use backon::Retryable;
use log::warn;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

use crate::error::RevkError;
pub use retry::RetryConfig;
use retry::build_retry_builder;

const BODY_SNIPPET_LEN: usize = 500;

/// Timeouts and retry policy shared by every HTTP collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
        }
    }
}

/// Truncate `text` to at most `max` characters, marking the cut.
#[must_use]
pub fn snippet(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_owned()
    } else {
        let mut out = text.chars().take(max).collect::<String>();
        out.push_str("...");
        out
    }
}

/// Parse `raw` as a base URL that [`Url::join`] appends to.
///
/// # Errors
///
/// Returns [`RevkError::Config`] when `raw` is not a valid URL.
pub fn base_url(raw: &str) -> Result<Url, RevkError> {
    let mut url = Url::parse(raw.trim_end_matches('/'))
        .map_err(|e| RevkError::config(format!("invalid API URL {raw}: {e}")))?;
    let normalised_path = match url.path().trim_end_matches('/') {
        "" => "/".to_owned(),
        path => format!("{path}/"),
    };
    url.set_path(&normalised_path);
    Ok(url)
}

/// Resolve `path` against `base`.
///
/// # Errors
///
/// Returns [`RevkError::RequestContext`] when the joined URL is invalid.
pub fn join(base: &Url, path: &str) -> Result<Url, RevkError> {
    base.join(path).map_err(|e| RevkError::RequestContext {
        context: format!("build URL for {path}").into(),
        source: Box::new(e),
    })
}

async fn send_once(request: RequestBuilder, context: &str) -> Result<String, RevkError> {
    let response = request.send().await.map_err(|e| RevkError::RequestContext {
        context: context.into(),
        source: e.into(),
    })?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| RevkError::RequestContext {
        context: format!("{context}; status {status}").into(),
        source: e.into(),
    })?;
    if !(200..300).contains(&status) {
        return Err(RevkError::HttpStatus {
            status,
            context: context.into(),
            snippet: snippet(&body, BODY_SNIPPET_LEN).into(),
        });
    }
    Ok(body)
}

/// Send the request produced by `build` and return the response body.
///
/// `build` is called once per attempt.
///
/// # Errors
///
/// Returns the error of the last attempt: [`RevkError::RequestContext`] for
/// transport failures or [`RevkError::HttpStatus`] for non-2xx responses.
pub async fn send_with_retry<F>(
    retry: RetryConfig,
    context: &str,
    build: F,
) -> Result<String, RevkError>
where
    F: Fn() -> RequestBuilder,
{
    let build = &build;
    (move || async move { send_once(build(), context).await })
        .retry(build_retry_builder(retry))
        .sleep(sleep)
        .when(RevkError::is_transient)
        .notify(|err: &RevkError, dur: Duration| warn!("retrying {context} after {dur:?}: {err}"))
        .await
}

/// Decode a JSON body, reporting the failing path on error.
///
/// # Errors
///
/// Returns [`RevkError::MalformedResponse`] when `body` does not match `T`.
pub fn decode_json<T: DeserializeOwned>(body: &str) -> Result<T, RevkError> {
    let mut de = serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(&mut de).map_err(|e| {
        let path = e.path().to_string();
        let inner = e.into_inner();
        RevkError::MalformedResponse {
            message: format!("{inner} at {path}").into(),
            snippet: snippet(body, BODY_SNIPPET_LEN).into(),
        }
    })
}
