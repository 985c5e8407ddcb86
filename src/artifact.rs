//! Collected-review artifacts.
//!
//! `collect` runs the pipeline without submitting and writes the mapped
//! comments to disk; `submit` later reads the file back and finishes the run.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::RevkError;
use crate::matcher::MappedComment;
use crate::state::StateKey;

/// Directory under the workspace root holding collected reviews.
pub const ARTIFACT_DIR: &str = ".revk/artifacts";

/// Mapped comments for one head commit, not yet reconciled or submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedReview {
    pub head_commit: String,
    /// Commit the reviewed diff started from.
    pub base_commit: String,
    pub collected_at: DateTime<Utc>,
    #[serde(default)]
    pub comments: Vec<MappedComment>,
}

impl CollectedReview {
    #[must_use]
    pub fn new(
        head_commit: impl Into<String>,
        base_commit: impl Into<String>,
        comments: Vec<MappedComment>,
    ) -> Self {
        Self {
            head_commit: head_commit.into(),
            base_commit: base_commit.into(),
            collected_at: Utc::now(),
            comments,
        }
    }
}

/// Default artifact location for `key` under `workspace`.
#[must_use]
pub fn default_path(workspace: &Path, key: &StateKey) -> PathBuf {
    workspace.join(ARTIFACT_DIR).join(key.relative_path())
}

/// Write `review` as pretty-printed JSON, creating parent directories.
///
/// # Errors
///
/// Returns [`RevkError::Io`] when the file cannot be written.
pub fn write(path: &Path, review: &CollectedReview) -> Result<(), RevkError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(review)
        .map_err(|e| RevkError::Io(std::io::Error::other(e)))?;
    fs::write(path, json)?;
    info!("wrote collected review to {}", path.display());
    Ok(())
}

/// Read an artifact written by [`write`].
///
/// # Errors
///
/// Returns [`RevkError::Io`] when the file cannot be read and
/// [`RevkError::Artifact`] when it does not decode or names no head commit.
pub fn read(path: &Path) -> Result<CollectedReview, RevkError> {
    let content = fs::read_to_string(path)?;
    let artifact_error = |message: String| RevkError::Artifact {
        path: path.display().to_string().into(),
        message: message.into(),
    };
    let mut de = serde_json::Deserializer::from_str(&content);
    let review: CollectedReview = serde_path_to_error::deserialize(&mut de).map_err(|e| {
        let at = e.path().to_string();
        artifact_error(format!("{} at {at}", e.into_inner()))
    })?;
    if review.head_commit.trim().is_empty() {
        return Err(artifact_error("head_commit is empty".into()));
    }
    Ok(review)
}
