//! Credential resolution.
//!
//! GitHub tokens come from explicit configuration (CLI/config file), then
//! `REVK_GITHUB_TOKEN`, and finally `GITHUB_TOKEN`. LLM keys come from
//! explicit configuration, then `REVK_LLM_API_KEY`, then `OPENAI_API_KEY`.
//! Empty values are ignored.

use crate::cli_args::GlobalArgs;
use crate::environment;

fn first_non_empty(explicit: Option<&str>, vars: &[&str]) -> Option<String> {
    explicit
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .or_else(|| {
            vars.iter()
                .find_map(|name| environment::var(name).ok().filter(|v| !v.is_empty()))
        })
}

/// GitHub token, or an empty string when none is configured.
#[must_use]
pub fn resolve_github_token(global: &GlobalArgs) -> String {
    first_non_empty(
        global.github_token.as_deref(),
        &["REVK_GITHUB_TOKEN", "GITHUB_TOKEN"],
    )
    .unwrap_or_default()
}

/// API key for the chat-completions endpoint, if any.
#[must_use]
pub fn resolve_llm_api_key(global: &GlobalArgs) -> Option<String> {
    first_non_empty(
        global.llm_api_key.as_deref(),
        &["REVK_LLM_API_KEY", "OPENAI_API_KEY"],
    )
}
