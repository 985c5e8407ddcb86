//! Tests for command helper utilities.

use super::{Session, caused_by_broken_pipe};
use revk::GlobalArgs;
use revk::RevkError;
use rstest::rstest;
use std::path::PathBuf;

fn global(workspace: &str) -> GlobalArgs {
    GlobalArgs {
        repo: Some("octocat/hello-world".into()),
        github_token: Some("gh-token".into()),
        llm_api_key: Some("sk-test".into()),
        workspace: Some(PathBuf::from(workspace)),
        ..GlobalArgs::default()
    }
}

#[test]
fn broken_pipe_is_detected_through_context() {
    let err = anyhow::Error::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        .context("printing review");
    assert!(caused_by_broken_pipe(&err));
}

#[test]
fn other_io_errors_are_not_broken_pipes() {
    let err = anyhow::Error::from(std::io::Error::other("boom"));
    assert!(!caused_by_broken_pipe(&err));
}

#[rstest]
#[case::default_location(None, "/srv/ws/.revk/artifacts/octocat/hello-world/7.json")]
#[case::explicit(Some("/tmp/review.json"), "/tmp/review.json")]
fn artifact_path_defaults_to_workspace(#[case] explicit: Option<&str>, #[case] expected: &str) {
    let session = Session::new(&global("/srv/ws"), Some("7")).expect("session");
    assert_eq!(
        session.artifact_path(explicit.map(PathBuf::from)),
        PathBuf::from(expected)
    );
}

#[test]
fn session_requires_a_reference() {
    let result = Session::new(&global("."), None);
    assert!(matches!(result, Err(RevkError::InvalidRef)));
}

#[test]
fn session_builds_the_annotator() {
    let session = Session::new(&global("."), Some("7")).expect("session");
    assert!(session.annotator().is_ok());
}
