//! Persisted review state, one record per pull request.
//!
//! A record holds the last reviewed commit and the comments still open after
//! that review. Records are replaced wholesale at the end of each successful
//! run; there are no partial updates.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::RevkError;
use crate::matcher::MappedComment;

/// Directory under the workspace root holding review state.
pub const STATE_DIR: &str = ".revk/state";

/// Identifies the reviewed pull request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl StateKey {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            number,
        }
    }

    /// Relative `owner/repo/number.json` path for this key.
    ///
    /// Segments are percent-escaped, so distinct keys never share a path and
    /// a key can never escape the directory it is joined onto.
    #[must_use]
    pub fn relative_path(&self) -> PathBuf {
        [
            path_segment(&self.owner),
            path_segment(&self.repo),
            format!("{}.json", self.number),
        ]
        .iter()
        .collect()
    }
}

/// Escape every byte outside `[A-Za-z0-9._-]` as `%XX`.
///
/// Dot-only names are escaped whole and the empty name becomes a lone `%`,
/// which no escaped name can produce.
fn path_segment(raw: &str) -> String {
    if raw.is_empty() {
        return "%".to_owned();
    }
    let dots_only = raw.bytes().all(|b| b == b'.');
    let mut out = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        let safe = byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-');
        if safe && !dots_only {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Outcome of the most recent completed review.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewState {
    #[serde(rename = "last_commit")]
    pub last_reviewed_commit: String,
    #[serde(rename = "previous_comments", default)]
    pub open_comments: Vec<MappedComment>,
}

/// Durable key-value storage for [`ReviewState`].
///
/// Implementations assume at most one run per key at a time.
pub trait StateStore {
    /// Read the state for `key`.
    ///
    /// Missing, empty or undecodable records all read as `None` so the caller
    /// falls back to a first review.
    fn load(&self, key: &StateKey) -> Option<ReviewState>;

    /// Replace the state for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RevkError::Io`] when the record cannot be written.
    fn save(&self, key: &StateKey, state: &ReviewState) -> Result<(), RevkError>;
}

/// JSON files under `<workspace>/.revk/state`.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    root: PathBuf,
}

impl FileStateStore {
    /// Store rooted at `<workspace>/.revk/state`.
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            root: workspace.as_ref().join(STATE_DIR),
        }
    }

    #[must_use]
    pub fn path_for(&self, key: &StateKey) -> PathBuf {
        self.root.join(key.relative_path())
    }
}

impl StateStore for FileStateStore {
    fn load(&self, key: &StateKey) -> Option<ReviewState> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no review state at {}", path.display());
                return None;
            }
            Err(e) => {
                warn!("ignoring unreadable review state {}: {e}", path.display());
                return None;
            }
        };
        if content.trim().is_empty() {
            warn!("ignoring empty review state {}", path.display());
            return None;
        }
        match serde_json::from_str::<ReviewState>(&content) {
            Ok(state) if state.last_reviewed_commit.is_empty() => {
                warn!("ignoring review state without a commit {}", path.display());
                None
            }
            Ok(state) => Some(state),
            Err(e) => {
                warn!("ignoring corrupt review state {}: {e}", path.display());
                None
            }
        }
    }

    fn save(&self, key: &StateKey, state: &ReviewState) -> Result<(), RevkError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| RevkError::Io(std::io::Error::other(e)))?;
        // Write beside the record and rename so readers never see a torn file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        debug!("saved review state to {}", path.display());
        Ok(())
    }
}
