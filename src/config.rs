//! Configuration loading.
//!
//! Global options are layered as defaults < config file < `REVK_*`
//! environment < CLI flags, then resolved once into an immutable
//! [`ReviewConfig`]. Sub-command arguments go through `ortho_config`, which
//! tolerates a missing `reference` field by falling back to command-line
//! values.

use figment::Figment;
use figment::error::{Error as FigmentError, Kind as FigmentKind};
use figment::providers::{Env, Format, Toml};
use log::debug;
use ortho_config::{OrthoConfig, OrthoError, load_and_merge_subcommand_for};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{resolve_github_token, resolve_llm_api_key};
use crate::cli_args::GlobalArgs;
use crate::environment;
use crate::error::RevkError;
use crate::http::{HttpSettings, RetryConfig};
use crate::ref_parser::{PullRequestRef, parse_pr_reference};

/// Config file read when `REVK_CONFIG_PATH` is unset.
pub const DEFAULT_CONFIG_FILE: &str = ".revk.toml";

fn missing_reference(err: &FigmentError) -> bool {
    // FigmentError yields its causes only by value; clone to inspect without ownership.
    err.clone()
        .into_iter()
        .any(|e| matches!(e.kind, FigmentKind::MissingField(ref f) if f == "reference"))
}

/// Load configuration for a set of CLI arguments, falling back when `reference`
/// is omitted.
///
/// # Errors
///
/// Returns an [`OrthoError`] if configuration gathering fails for reasons other
/// than a missing reference field.
#[expect(
    clippy::result_large_err,
    reason = "configuration loading errors can be verbose"
)]
pub fn load_with_reference_fallback<T>(cli_args: T) -> Result<T, Arc<OrthoError>>
where
    T: OrthoConfig + serde::Serialize + Default + clap::CommandFactory + Clone,
{
    match load_and_merge_subcommand_for::<T>(&cli_args) {
        Ok(v) => Ok(v),
        Err(e) => match &*e {
            OrthoError::Gathering(fe) => {
                if missing_reference(fe) {
                    Ok(cli_args)
                } else {
                    Err(e)
                }
            }
            _ => Err(e),
        },
    }
}

/// Layer the config file and `REVK_*` environment under the CLI flags.
///
/// # Errors
///
/// Returns [`RevkError::Config`] when the config file or an environment
/// value cannot be decoded.
pub fn load_global_args(cli: GlobalArgs) -> Result<GlobalArgs, RevkError> {
    let path = environment::var("REVK_CONFIG_PATH")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
    debug!("reading configuration from {}", path.display());
    let figment = Figment::new()
        .merge(Toml::file(&path))
        .merge(Env::prefixed("REVK_"));
    let mut merged: GlobalArgs = environment::with_lock(|| figment.extract::<GlobalArgs>())
        .map_err(|e| RevkError::config(e.to_string()))?;
    merged.merge(cli);
    Ok(merged)
}

/// Settings for the chat-completions collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettings {
    pub api_key: String,
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

/// Everything a run needs, resolved once before any external call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewConfig {
    pub pull_request: PullRequestRef,
    pub github_token: String,
    pub github_api_url: Option<String>,
    llm: Option<LlmSettings>,
    pub workspace: PathBuf,
    pub http: HttpSettings,
}

fn positive_secs(value: Option<u64>, default: Duration, name: &str) -> Result<Duration, RevkError> {
    match value {
        None => Ok(default),
        Some(0) => Err(RevkError::config(format!("{name} must be at least 1 second"))),
        Some(secs) => Ok(Duration::from_secs(secs)),
    }
}

impl ReviewConfig {
    /// Resolve `global` and the pull request `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`RevkError::InvalidRef`] or [`RevkError::RepoNotFound`] for an
    /// unusable reference and [`RevkError::Config`] when no GitHub token is
    /// available or a numeric setting is out of range.
    pub fn from_args(global: &GlobalArgs, reference: Option<&str>) -> Result<Self, RevkError> {
        let reference = reference.ok_or(RevkError::InvalidRef)?;
        let pull_request = parse_pr_reference(reference, global.repo.as_deref())?;
        let github_token = resolve_github_token(global);
        if github_token.is_empty() {
            return Err(RevkError::config(
                "GitHub token not set; use --github-token, REVK_GITHUB_TOKEN or GITHUB_TOKEN",
            ));
        }
        let defaults = HttpSettings::default();
        let attempts = global.retry_attempts.unwrap_or(defaults.retry.attempts);
        if attempts == 0 {
            return Err(RevkError::config("retry_attempts must be at least 1"));
        }
        let http = HttpSettings {
            timeout: positive_secs(global.http_timeout, defaults.timeout, "http_timeout")?,
            connect_timeout: positive_secs(
                global.connect_timeout,
                defaults.connect_timeout,
                "connect_timeout",
            )?,
            retry: RetryConfig {
                attempts,
                ..defaults.retry
            },
        };
        let llm = resolve_llm_api_key(global).map(|api_key| LlmSettings {
            api_key,
            endpoint: global.llm_endpoint.clone(),
            model: global.llm_model.clone(),
        });
        Ok(Self {
            pull_request,
            github_token,
            github_api_url: global.github_api_url.clone(),
            llm,
            workspace: global.workspace.clone().unwrap_or_else(|| PathBuf::from(".")),
            http,
        })
    }

    /// LLM settings, required by commands that annotate diffs.
    ///
    /// # Errors
    ///
    /// Returns [`RevkError::Config`] when no API key was configured.
    pub fn llm(&self) -> Result<&LlmSettings, RevkError> {
        self.llm.as_ref().ok_or_else(|| {
            RevkError::config("LLM API key not set; use --llm-api-key, REVK_LLM_API_KEY or OPENAI_API_KEY")
        })
    }
}
