//! Review orchestration.
//!
//! [`Reviewer`] drives one run for one pull request: fetch metadata, load
//! state, pick the phase, fetch the diff, ask the model for annotations,
//! anchor them, decide, submit and persist. Every external call goes through
//! a collaborator trait so the run can be exercised without a network.
//!
//! Failures propagate immediately. State is written only after the
//! submission has been accepted, so a failed run leaves the previous record
//! untouched and the next run starts from the same baseline.

pub mod machine;
pub mod submission;

use log::{info, warn};

use crate::annotations::parse_annotations;
use crate::artifact::CollectedReview;
use crate::diff::parse_unified_diff;
use crate::error::RevkError;
use crate::matcher::{MappedComment, map_annotations};
use crate::phrase::PhraseStrategy;
use crate::ref_parser::PullRequestRef;
use crate::state::StateStore;

pub use machine::{ApprovalReason, Decision, ReviewAction, ReviewPhase};
pub use submission::{ReviewEvent, ReviewSubmission};

/// Commits bounding a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestMeta {
    pub head_commit: String,
    pub base_commit: String,
}

/// Read access to pull request metadata and diffs.
#[expect(
    async_fn_in_trait,
    reason = "runs are sequential on a current-thread runtime"
)]
pub trait PullRequestSource {
    /// Current head and base commits.
    async fn metadata(&self, pr: &PullRequestRef) -> Result<PullRequestMeta, RevkError>;

    /// Unified diff of the commits after `base` up to and including `head`.
    async fn diff(&self, pr: &PullRequestRef, base: &str, head: &str)
    -> Result<String, RevkError>;
}

/// Produces raw annotation text for a diff.
#[expect(
    async_fn_in_trait,
    reason = "runs are sequential on a current-thread runtime"
)]
pub trait Annotator {
    async fn annotate(&self, diff: &str) -> Result<String, RevkError>;
}

/// Accepts finished reviews.
#[expect(
    async_fn_in_trait,
    reason = "runs are sequential on a current-thread runtime"
)]
pub trait ReviewSink {
    async fn submit(&self, pr: &PullRequestRef, review: &ReviewSubmission)
    -> Result<(), RevkError>;
}

/// Result of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The head was already reviewed; nothing was fetched or submitted.
    UpToDate,
    Submitted(ReviewSubmission),
}

/// Drives review runs against a set of collaborators.
pub struct Reviewer<'a, S, K, T> {
    source: &'a S,
    sink: &'a K,
    store: &'a T,
    phrases: &'a dyn PhraseStrategy,
}

impl<'a, S, K, T> Reviewer<'a, S, K, T>
where
    S: PullRequestSource,
    K: ReviewSink,
    T: StateStore,
{
    pub fn new(source: &'a S, sink: &'a K, store: &'a T, phrases: &'a dyn PhraseStrategy) -> Self {
        Self {
            source,
            sink,
            store,
            phrases,
        }
    }

    /// Full cycle: review the new commits, submit and persist.
    ///
    /// # Errors
    ///
    /// Propagates the first collaborator, decoding or persistence failure.
    pub async fn run(
        &self,
        pr: &PullRequestRef,
        annotator: &impl Annotator,
    ) -> Result<RunOutcome, RevkError> {
        let meta = self.source.metadata(pr).await?;
        let prior = self.store.load(&pr.state_key());
        let phase = ReviewPhase::classify(prior.as_ref(), &meta.head_commit);
        let Some(base) = phase.diff_base(&meta.base_commit) else {
            info!("{pr} is up to date at {}", meta.head_commit);
            return Ok(RunOutcome::UpToDate);
        };
        let mapped = self
            .pipeline(pr, base, &meta.head_commit, annotator)
            .await?;
        match phase.conclude(&meta.head_commit, mapped) {
            Some(decision) => self.deliver(pr, &meta.head_commit, decision, None).await,
            None => Ok(RunOutcome::UpToDate),
        }
    }

    /// Run the pipeline and return the mapped comments without submitting.
    ///
    /// Returns `None` when the head was already reviewed. Stored state is
    /// read but never written.
    ///
    /// # Errors
    ///
    /// Propagates the first collaborator or decoding failure.
    pub async fn collect(
        &self,
        pr: &PullRequestRef,
        annotator: &impl Annotator,
    ) -> Result<Option<CollectedReview>, RevkError> {
        let meta = self.source.metadata(pr).await?;
        let prior = self.store.load(&pr.state_key());
        let phase = ReviewPhase::classify(prior.as_ref(), &meta.head_commit);
        let Some(base) = phase.diff_base(&meta.base_commit) else {
            info!("{pr} is up to date at {}", meta.head_commit);
            return Ok(None);
        };
        let mapped = self
            .pipeline(pr, base, &meta.head_commit, annotator)
            .await?;
        Ok(Some(CollectedReview::new(&meta.head_commit, base, mapped)))
    }

    /// Reconcile a collected review against stored state, then submit and
    /// persist it.
    ///
    /// An artifact for the already reviewed head is a no-op.
    ///
    /// # Errors
    ///
    /// Propagates submission or persistence failures.
    pub async fn submit_collected(
        &self,
        pr: &PullRequestRef,
        collected: CollectedReview,
    ) -> Result<RunOutcome, RevkError> {
        let prior = self.store.load(&pr.state_key());
        let phase = ReviewPhase::classify(prior.as_ref(), &collected.head_commit);
        if let Some(expected) = phase.stale_base(&collected.base_commit) {
            warn!(
                "{pr}: collected diff starts at {} but the last review covered {expected}",
                collected.base_commit
            );
        }
        match phase.conclude(&collected.head_commit, collected.comments) {
            Some(decision) => {
                self.deliver(pr, &collected.head_commit, decision, None)
                    .await
            }
            None => {
                info!("{pr} is up to date at {}", collected.head_commit);
                Ok(RunOutcome::UpToDate)
            }
        }
    }

    /// Approve the current head without reviewing it.
    ///
    /// # Errors
    ///
    /// Propagates metadata, submission or persistence failures.
    pub async fn approve(
        &self,
        pr: &PullRequestRef,
        message: Option<&str>,
    ) -> Result<RunOutcome, RevkError> {
        let meta = self.source.metadata(pr).await?;
        let decision = machine::manual_approval(&meta.head_commit);
        self.deliver(pr, &meta.head_commit, decision, message).await
    }

    async fn pipeline(
        &self,
        pr: &PullRequestRef,
        base: &str,
        head: &str,
        annotator: &impl Annotator,
    ) -> Result<Vec<MappedComment>, RevkError> {
        let diff_text = self.source.diff(pr, base, head).await?;
        if diff_text.trim().is_empty() {
            info!("{pr}: no changes between {base} and {head}");
            return Ok(Vec::new());
        }
        let raw = annotator.annotate(&diff_text).await?;
        let candidates = parse_annotations(&raw)?;
        let diff = parse_unified_diff(&diff_text);
        let mapped = map_annotations(&diff, &candidates, self.phrases);
        info!(
            "{pr}: anchored {} of {} annotation(s)",
            mapped.len(),
            candidates.len()
        );
        Ok(mapped)
    }

    async fn deliver(
        &self,
        pr: &PullRequestRef,
        head: &str,
        decision: Decision,
        body: Option<&str>,
    ) -> Result<RunOutcome, RevkError> {
        let review = ReviewSubmission::for_action(&decision.action, head, body);
        self.sink.submit(pr, &review).await?;
        self.store.save(&pr.state_key(), &decision.next_state)?;
        info!("{pr}: submitted {:?} for {head}", review.event);
        Ok(RunOutcome::Submitted(review))
    }
}
