//! Review payloads sent to the hosting platform.

use log::warn;
use serde::{Deserialize, Serialize};

use super::machine::{ApprovalReason, ReviewAction};
use crate::matcher::MappedComment;

pub const CHANGES_REQUESTED_BODY: &str =
    "Automated review found issues that need attention. See the inline comments.";
pub const NO_ISSUES_BODY: &str = "Automated review found no issues.";
pub const RESOLVED_BODY: &str = "Previously flagged issues appear to be resolved.";
pub const MANUAL_APPROVAL_BODY: &str = "Approved.";

/// Verdict attached to a submitted review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewEvent {
    RequestChanges,
    Approve,
    Comment,
}

/// A complete review submission.
///
/// Construct through [`ReviewSubmission::new`], which never lets an approval
/// carry inline comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewSubmission {
    pub event: ReviewEvent,
    pub body: String,
    pub commit_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<MappedComment>,
}

impl ReviewSubmission {
    /// Build a submission for `commit_id`.
    ///
    /// Comments passed alongside [`ReviewEvent::Approve`] are discarded.
    #[must_use]
    pub fn new(
        event: ReviewEvent,
        body: impl Into<String>,
        commit_id: impl Into<String>,
        comments: Vec<MappedComment>,
    ) -> Self {
        let comments = if event == ReviewEvent::Approve && !comments.is_empty() {
            warn!("dropping {} comment(s) from approval", comments.len());
            Vec::new()
        } else {
            comments
        };
        Self {
            event,
            body: body.into(),
            commit_id: commit_id.into(),
            comments,
        }
    }

    /// Submission carrying out `action` against `head`.
    ///
    /// `body` replaces the default text for the outcome when given.
    #[must_use]
    pub fn for_action(action: &ReviewAction, head: &str, body: Option<&str>) -> Self {
        let (event, default_body, comments) = match action {
            ReviewAction::RequestChanges(open) => (
                ReviewEvent::RequestChanges,
                CHANGES_REQUESTED_BODY,
                open.clone(),
            ),
            ReviewAction::Approve(reason) => {
                let text = match reason {
                    ApprovalReason::NoIssues => NO_ISSUES_BODY,
                    ApprovalReason::Resolved => RESOLVED_BODY,
                    ApprovalReason::Manual => MANUAL_APPROVAL_BODY,
                };
                (ReviewEvent::Approve, text, Vec::new())
            }
        };
        Self::new(event, body.unwrap_or(default_body), head, comments)
    }
}
