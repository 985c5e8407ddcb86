//! Incremental pull request review engine.
//!
//! A run fetches the pull request diff, asks a language model for inline
//! annotations, anchors them to added lines and submits a review. Per-PR
//! state remembers the last reviewed commit so later runs only look at
//! new commits.

pub mod annotations;
pub mod artifact;
pub mod auth;
pub mod banners;
pub mod cli_args;
pub mod config;
pub mod diff;
pub mod environment;
pub mod error;
pub mod github;
pub mod http;
pub mod llm;
pub mod matcher;
pub mod phrase;
pub mod printer;
pub mod ref_parser;
pub mod review;
pub mod state;
#[path = "test_utils_env.rs"]
pub mod test_utils;

pub use cli_args::{ApproveArgs, CollectArgs, GlobalArgs, ReviewArgs, SubmitArgs};
pub use error::RevkError;
pub use review::{Reviewer, RunOutcome};
