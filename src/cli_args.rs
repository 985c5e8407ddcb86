//! Command-line argument structures.
//!
//! Isolates clap derivations so lint expectations remain scoped, keeping
//! `main.rs` focused on runtime logic.

use clap::Parser;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global options that apply to every sub-command (e.g. `--repo`).
#[derive(Parser, Deserialize, Serialize, Default, Debug, OrthoConfig, Clone, PartialEq, Eq)]
#[ortho_config(prefix = "REVK")]
pub struct GlobalArgs {
    /// Repository used when passing only a pull request number
    #[arg(long)]
    pub repo: Option<String>,
    /// GitHub token for authenticated API requests
    #[arg(long, value_name = "TOKEN")]
    pub github_token: Option<String>,
    /// GitHub REST API base URL
    #[arg(long, value_name = "URL")]
    pub github_api_url: Option<String>,
    /// API key for the chat-completions endpoint
    #[arg(long, value_name = "KEY")]
    pub llm_api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API
    #[arg(long, value_name = "URL")]
    pub llm_endpoint: Option<String>,
    /// Model used to annotate diffs
    #[arg(long, value_name = "MODEL")]
    pub llm_model: Option<String>,
    /// Directory holding review state and collected artifacts
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,
    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub http_timeout: Option<u64>,
    /// HTTP connection timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,
    /// Attempts per HTTP request, including the first (1 disables retries)
    #[arg(long, value_name = "N")]
    pub retry_attempts: Option<usize>,
}

impl GlobalArgs {
    /// Merge another instance into `self`, overwriting only fields that are
    /// set in `other`.
    ///
    /// CLI flags have higher priority than configuration sources.
    pub fn merge(&mut self, other: Self) {
        self.repo = other.repo.or_else(|| self.repo.take());
        self.github_token = other.github_token.or_else(|| self.github_token.take());
        self.github_api_url = other.github_api_url.or_else(|| self.github_api_url.take());
        self.llm_api_key = other.llm_api_key.or_else(|| self.llm_api_key.take());
        self.llm_endpoint = other.llm_endpoint.or_else(|| self.llm_endpoint.take());
        self.llm_model = other.llm_model.or_else(|| self.llm_model.take());
        self.workspace = other.workspace.or_else(|| self.workspace.take());
        self.http_timeout = other.http_timeout.or_else(|| self.http_timeout.take());
        self.connect_timeout = other
            .connect_timeout
            .or_else(|| self.connect_timeout.take());
        self.retry_attempts = other.retry_attempts.or_else(|| self.retry_attempts.take());
    }
}

/// Parameters accepted by the `review` sub-command.
#[derive(Parser, Deserialize, Serialize, Debug, OrthoConfig, Clone, Default)]
#[command(name = "review")]
#[ortho_config(prefix = "REVK")]
pub struct ReviewArgs {
    /// Pull request URL or number
    #[arg(required = true)]
    // Clap marks the argument as required so parsing yields `Some(value)`. The
    // `Option` allows `ReviewArgs::default()` and config merging to leave it unset.
    pub reference: Option<String>,
}

/// Parameters accepted by the `collect` sub-command.
#[derive(Parser, Deserialize, Serialize, Debug, OrthoConfig, Clone, Default)]
#[command(name = "collect")]
#[ortho_config(prefix = "REVK")]
pub struct CollectArgs {
    /// Pull request URL or number
    #[arg(required = true)]
    pub reference: Option<String>,
    /// Write the collected review here instead of the workspace default
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Parameters accepted by the `submit` sub-command.
#[derive(Parser, Deserialize, Serialize, Debug, OrthoConfig, Clone, Default)]
#[command(name = "submit")]
#[ortho_config(prefix = "REVK")]
pub struct SubmitArgs {
    /// Pull request URL or number
    #[arg(required = true)]
    pub reference: Option<String>,
    /// Read the collected review from here instead of the workspace default
    #[arg(short = 'i', long = "input", value_name = "PATH")]
    pub input: Option<PathBuf>,
}

/// Parameters accepted by the `approve` sub-command.
#[derive(Parser, Deserialize, Serialize, Debug, OrthoConfig, Clone, Default)]
#[command(name = "approve")]
#[ortho_config(prefix = "REVK")]
pub struct ApproveArgs {
    /// Pull request URL or number
    #[arg(required = true)]
    pub reference: Option<String>,
    /// Review body to send with the approval
    #[arg(
        short = 'm',
        long = "message",
        value_name = "MESSAGE",
        help = "Review body to send with the approval"
    )]
    pub message: Option<String>,
}
