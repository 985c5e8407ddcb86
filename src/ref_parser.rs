//! Parse pull request references into repository and number pairs.

use crate::RevkError;
use crate::state::StateKey;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use std::{fs, path::Path};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub owner: String,
    pub name: String,
}

/// A pull request on the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub repo: RepoInfo,
    pub number: u64,
}

impl PullRequestRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>, number: u64) -> Self {
        Self {
            repo: RepoInfo {
                owner: owner.into(),
                name: name.into(),
            },
            number,
        }
    }

    /// Key under which review state for this pull request is stored.
    #[must_use]
    pub fn state_key(&self) -> StateKey {
        StateKey::new(&self.repo.owner, &self.repo.name, self.number)
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.repo.owner, self.repo.name, self.number)
    }
}

const PULL_SEGMENTS: &[&str] = &["pull", "pulls"];

static GITHUB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com[/:](?P<owner>[^/]+)/(?P<repo>[^/.]+)").expect("valid regex")
});

fn strip_git_suffix(name: &str) -> &str {
    name.strip_suffix(".git").unwrap_or(name)
}

fn parse_github_url(input: &str) -> Option<Result<PullRequestRef, RevkError>> {
    let url = Url::parse(input).ok()?;
    if url.host_str()? != "github.com" {
        return None;
    }
    let parts: Vec<_> = url.path_segments()?.collect();
    let [owner, repo_part, segment, number_str, ..] = parts.as_slice() else {
        return Some(Err(RevkError::InvalidRef));
    };
    if !PULL_SEGMENTS.contains(segment) {
        return Some(Err(RevkError::InvalidRef));
    }
    let Ok(number) = number_str.parse() else {
        return Some(Err(RevkError::InvalidRef));
    };
    Some(Ok(PullRequestRef::new(
        *owner,
        strip_git_suffix(repo_part),
        number,
    )))
}

/// Parse a repository string into owner and name components.
///
/// Accepts GitHub URLs (`github.com[/:]owner/repo[.git]`) or short format
/// (`owner/repo`).
///
/// # Examples
///
/// ```
/// # use revk::ref_parser::parse_repo_str;
/// let repo = parse_repo_str("owner/repo").expect("repo");
/// assert_eq!(repo.owner, "owner");
/// assert_eq!(repo.name, "repo");
/// ```
#[must_use]
pub fn parse_repo_str(repo: &str) -> Option<RepoInfo> {
    if let Some(caps) = GITHUB_RE.captures(repo) {
        let owner = caps.name("owner")?.as_str().to_owned();
        let name = strip_git_suffix(caps.name("repo")?.as_str()).to_owned();
        Some(RepoInfo { owner, name })
    } else {
        let (owner, name_part) = repo.split_once('/')?;
        Some(RepoInfo {
            owner: owner.to_owned(),
            name: strip_git_suffix(name_part).to_owned(),
        })
    }
}

/// Extract repository information from `.git/FETCH_HEAD`.
///
/// Parses the first matching GitHub URL from the `FETCH_HEAD` file, which is
/// written after `git fetch` operations.
#[must_use]
pub fn repo_from_fetch_head() -> Option<RepoInfo> {
    let path = Path::new(".git/FETCH_HEAD");
    let content = fs::read_to_string(path).ok()?;
    content.lines().find_map(parse_repo_str)
}

/// Parse a pull request URL or bare number.
///
/// A bare number takes its repository from `default_repo`, falling back to
/// `.git/FETCH_HEAD`.
///
/// # Examples
///
/// ```
/// # use revk::ref_parser::parse_pr_reference;
/// let pr = parse_pr_reference("https://github.com/o/r/pull/1", None).expect("valid");
/// assert_eq!(pr.to_string(), "o/r#1");
/// ```
///
/// # Errors
///
/// Returns [`RevkError::InvalidRef`] for anything that is neither a pull
/// request URL nor a number, and [`RevkError::RepoNotFound`] when a bare
/// number has no repository to attach to.
pub fn parse_pr_reference(
    input: &str,
    default_repo: Option<&str>,
) -> Result<PullRequestRef, RevkError> {
    if let Some(res) = parse_github_url(input) {
        return res;
    }
    if let Ok(number) = input.parse::<u64>() {
        let repo = default_repo
            .and_then(parse_repo_str)
            .or_else(repo_from_fetch_head)
            .ok_or(RevkError::RepoNotFound)?;
        return Ok(PullRequestRef { repo, number });
    }
    Err(RevkError::InvalidRef)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    #[rstest]
    #[case("https://github.com/owner/repo/pull/42", 42)]
    #[case("https://github.com/owner/repo.git/pull/7", 7)]
    #[case("https://github.com/owner/repo/pulls/13", 13)]
    #[case("https://github.com/owner/repo/pull/5/files", 5)]
    fn parse_url(#[case] input: &str, #[case] number: u64) {
        let pr = parse_pr_reference(input, None).expect("valid reference");
        assert_eq!(pr.repo.owner, "owner");
        assert_eq!(pr.repo.name, "repo");
        assert_eq!(pr.number, number);
    }

    #[rstest]
    #[case("https://github.com/owner/repo/issues/3")]
    #[case("https://github.com/owner/repo/pull/abc")]
    #[case("https://github.com/owner/repo")]
    #[case("not a reference")]
    fn rejects_invalid_references(#[case] input: &str) {
        let err = parse_pr_reference(input, Some("a/b")).expect_err("invalid ref");
        assert!(matches!(err, RevkError::InvalidRef));
    }

    #[test]
    fn parse_number_with_repo() {
        let pr = parse_pr_reference("5", Some("foo/bar")).expect("valid ref");
        assert_eq!(pr, PullRequestRef::new("foo", "bar", 5));
        assert_eq!(pr.state_key(), StateKey::new("foo", "bar", 5));
    }

    #[test]
    fn parse_repo_str_git_suffix() {
        let repo = parse_repo_str("a/b.git").expect("parse repo");
        assert_eq!(repo.owner, "a");
        assert_eq!(repo.name, "b");
    }

    #[test]
    fn parse_repo_str_from_ssh_remote() {
        let repo = parse_repo_str("git@github.com:foo/bar.git").expect("parse repo");
        assert_eq!(repo.owner, "foo");
        assert_eq!(repo.name, "bar");
    }

    #[test]
    #[serial]
    fn repo_from_fetch_head_git_suffix() {
        let dir = tempdir().expect("tempdir");
        let git_dir = dir.path().join(".git");
        fs::create_dir(&git_dir).expect("create git dir");
        fs::write(
            git_dir.join("FETCH_HEAD"),
            "deadbeef\tnot-for-merge\tbranch 'main' of https://github.com/foo/bar.git",
        )
        .expect("write FETCH_HEAD");
        let cwd = std::env::current_dir().expect("cwd");
        std::env::set_current_dir(dir.path()).expect("chdir temp");
        let repo = repo_from_fetch_head();
        std::env::set_current_dir(cwd).expect("restore cwd");
        let repo = repo.expect("repo from fetch head");
        assert_eq!(repo.owner, "foo");
        assert_eq!(repo.name, "bar");
    }

    #[test]
    #[serial]
    fn bare_number_without_repo_fails() {
        let dir = tempdir().expect("tempdir");
        let cwd = std::env::current_dir().expect("cwd");
        std::env::set_current_dir(dir.path()).expect("chdir temp");
        let result = parse_pr_reference("9", None);
        std::env::set_current_dir(cwd).expect("restore cwd");
        assert!(matches!(result, Err(RevkError::RepoNotFound)));
    }
}
