//! Pure transition logic for incremental reviews.
//!
//! Nothing here performs I/O: [`ReviewPhase::classify`] picks the phase from
//! the stored state and the current head, [`ReviewPhase::diff_base`] names
//! the commit to diff from, and [`ReviewPhase::conclude`] turns the mapped
//! comments into an action and the state to persist.

use log::info;
use std::collections::HashSet;

use crate::matcher::MappedComment;
use crate::state::ReviewState;

/// Where a pull request stands relative to the last review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewPhase<'a> {
    /// No usable state: review the whole change set.
    NoPriorReview,
    /// The head was already reviewed: do nothing.
    UpToDate,
    /// New commits since `prior`: review only those.
    Reviewing { prior: &'a ReviewState },
}

/// What to tell the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAction {
    RequestChanges(Vec<MappedComment>),
    Approve(ApprovalReason),
}

/// Why an approval is being sent; selects the review body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalReason {
    /// First review found nothing.
    NoIssues,
    /// Nothing flagged earlier was detected again.
    Resolved,
    /// Approved on request, without a review.
    Manual,
}

/// Action plus the state that replaces the stored record once the action
/// has been delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: ReviewAction,
    pub next_state: ReviewState,
}

impl<'a> ReviewPhase<'a> {
    /// Pick the phase for `head` given the stored state.
    #[must_use]
    pub fn classify(prior: Option<&'a ReviewState>, head: &str) -> Self {
        match prior {
            None => Self::NoPriorReview,
            Some(state) if state.last_reviewed_commit == head => Self::UpToDate,
            Some(state) => Self::Reviewing { prior: state },
        }
    }

    /// Commit the diff starts from, or `None` when no diff is needed.
    ///
    /// A first review covers the whole change set against `base_branch`;
    /// later reviews cover only commits after the last reviewed one.
    #[must_use]
    pub fn diff_base<'b>(&self, base_branch: &'b str) -> Option<&'b str>
    where
        'a: 'b,
    {
        match *self {
            Self::NoPriorReview => Some(base_branch),
            Self::UpToDate => None,
            Self::Reviewing { prior } => Some(prior.last_reviewed_commit.as_str()),
        }
    }

    /// Base this phase would diff from, when it differs from `collected_base`.
    ///
    /// Only an incremental review knows its base locally; a first review
    /// accepts whatever pull request base the artifact recorded.
    #[must_use]
    pub fn stale_base(&self, collected_base: &str) -> Option<&'a str> {
        match *self {
            Self::Reviewing { prior } if prior.last_reviewed_commit != collected_base => {
                Some(prior.last_reviewed_commit.as_str())
            }
            _ => None,
        }
    }

    /// Decide the action for the comments mapped from the diff.
    ///
    /// Returns `None` for [`ReviewPhase::UpToDate`].
    #[must_use]
    pub fn conclude(&self, head: &str, mapped: Vec<MappedComment>) -> Option<Decision> {
        let open = match self {
            Self::UpToDate => return None,
            Self::NoPriorReview => mapped,
            Self::Reviewing { prior } => relevant_fixes(prior, mapped),
        };
        let action = if open.is_empty() {
            let reason = match self {
                Self::Reviewing { .. } => ApprovalReason::Resolved,
                _ => ApprovalReason::NoIssues,
            };
            ReviewAction::Approve(reason)
        } else {
            ReviewAction::RequestChanges(open.clone())
        };
        info!(
            "review of {head}: {} open comment(s) after {self:?}",
            open.len()
        );
        Some(Decision {
            action,
            next_state: ReviewState {
                last_reviewed_commit: head.to_owned(),
                open_comments: open,
            },
        })
    }
}

/// Newly mapped comments that sit on an anchor already open in `prior`.
///
/// Keeps the order and bodies of `mapped`.
#[must_use]
pub fn relevant_fixes(prior: &ReviewState, mapped: Vec<MappedComment>) -> Vec<MappedComment> {
    let open: HashSet<_> = prior.open_comments.iter().map(MappedComment::anchor).collect();
    mapped
        .into_iter()
        .filter(|c| open.contains(&c.anchor()))
        .collect()
}

/// Decision for an unconditional approval of `head`.
#[must_use]
pub fn manual_approval(head: &str) -> Decision {
    Decision {
        action: ReviewAction::Approve(ApprovalReason::Manual),
        next_state: ReviewState {
            last_reviewed_commit: head.to_owned(),
            open_comments: Vec::new(),
        },
    }
}
