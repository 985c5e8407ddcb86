//! GitHub REST collaborator.
//!
//! Reads pull request metadata and diffs and submits reviews. The API base
//! URL defaults to `https://api.github.com` and can be overridden with the
//! `GITHUB_API_URL` environment variable or configuration.

use log::debug;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::Deserialize;
use url::Url;

use crate::environment;
use crate::error::RevkError;
use crate::http::{self, HttpSettings, RetryConfig};
use crate::ref_parser::PullRequestRef;
use crate::review::{PullRequestMeta, PullRequestSource, ReviewSink, ReviewSubmission};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";

/// Build an authenticated client with GitHub headers.
///
/// Returns [`RevkError::RequestContext`] when the client cannot be built.
fn github_client(token: &str, settings: &HttpSettings) -> Result<reqwest::Client, RevkError> {
    let mut headers = HeaderMap::new();
    let parse_value = |value: &str, context: &str| -> Result<HeaderValue, RevkError> {
        HeaderValue::from_str(value).map_err(|e| RevkError::RequestContext {
            context: context.into(),
            source: e.into(),
        })
    };
    headers.insert(USER_AGENT, parse_value("revk", "build user agent header")?);
    let auth_header = format!("Bearer {token}");
    headers.insert(
        AUTHORIZATION,
        parse_value(&auth_header, "build authorization header")?,
    );
    headers.insert(
        ACCEPT,
        parse_value("application/vnd.github+json", "build accept header")?,
    );
    headers.insert(
        HeaderName::from_static("x-github-api-version"),
        HeaderValue::from_static("2022-11-28"),
    );
    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(settings.timeout)
        .connect_timeout(settings.connect_timeout)
        .build()
        .map_err(|e| RevkError::RequestContext {
            context: "build client".into(),
            source: Box::new(e),
        })
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PullPayload {
    head: CommitRef,
    base: CommitRef,
}

/// GitHub REST client.
pub struct GitHubClient {
    api: Url,
    client: reqwest::Client,
    retry: RetryConfig,
}

impl GitHubClient {
    /// Create a client targeting `api`.
    ///
    /// Falls back to `GITHUB_API_URL` or the public GitHub endpoint when `api`
    /// is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`RevkError::Config`] for an invalid base URL and
    /// [`RevkError::RequestContext`] when the HTTP client cannot be built.
    pub fn new(token: &str, api: Option<&str>, settings: &HttpSettings) -> Result<Self, RevkError> {
        let base = api
            .map(str::to_owned)
            .or_else(|| environment::var("GITHUB_API_URL").ok())
            .unwrap_or_else(|| DEFAULT_API_URL.into());
        Ok(Self {
            api: http::base_url(&base)?,
            client: github_client(token, settings)?,
            retry: settings.retry,
        })
    }

    fn pull_url(&self, pr: &PullRequestRef, suffix: &str) -> Result<Url, RevkError> {
        let path = format!(
            "repos/{}/{}/pulls/{}{suffix}",
            pr.repo.owner, pr.repo.name, pr.number
        );
        http::join(&self.api, &path)
    }
}

impl PullRequestSource for GitHubClient {
    async fn metadata(&self, pr: &PullRequestRef) -> Result<PullRequestMeta, RevkError> {
        let url = self.pull_url(pr, "")?;
        let context = format!("fetch metadata for {pr}");
        let body =
            http::send_with_retry(self.retry, &context, || self.client.get(url.clone())).await?;
        let pull: PullPayload = http::decode_json(&body)?;
        debug!("{pr}: head {} base {}", pull.head.sha, pull.base.sha);
        Ok(PullRequestMeta {
            head_commit: pull.head.sha,
            base_commit: pull.base.sha,
        })
    }

    async fn diff(
        &self,
        pr: &PullRequestRef,
        base: &str,
        head: &str,
    ) -> Result<String, RevkError> {
        let path = format!(
            "repos/{}/{}/compare/{base}...{head}",
            pr.repo.owner, pr.repo.name
        );
        let url = http::join(&self.api, &path)?;
        let context = format!("fetch diff {base}...{head} for {pr}");
        http::send_with_retry(self.retry, &context, || {
            self.client
                .get(url.clone())
                .header(ACCEPT, DIFF_MEDIA_TYPE)
        })
        .await
    }
}

impl ReviewSink for GitHubClient {
    async fn submit(
        &self,
        pr: &PullRequestRef,
        review: &ReviewSubmission,
    ) -> Result<(), RevkError> {
        let url = self.pull_url(pr, "/reviews")?;
        let context = format!("submit {:?} review for {pr}", review.event);
        // A failed or timed-out POST may still have created the review.
        http::send_with_retry(RetryConfig::none(), &context, || {
            self.client.post(url.clone()).json(review)
        })
        .await?;
        Ok(())
    }
}
