//! Terminal rendering of review outcomes.
//!
//! Writers are generic so output can be unit tested without capturing
//! stdout. Comment bodies are Markdown and go through `termimad`.

use std::collections::BTreeMap;
use std::io::Write;
use termimad::MadSkin;

use crate::artifact::CollectedReview;
use crate::banners::{COMMENTS_BANNER, END_BANNER, START_BANNER};
use crate::matcher::MappedComment;
use crate::review::{ReviewEvent, ReviewSubmission, RunOutcome};

/// Message printed when the head commit was already reviewed.
pub const UP_TO_DATE_MESSAGE: &str = "Already reviewed at this commit; nothing to do.";

/// Count comments per file path, busiest files first.
///
/// # Examples
///
/// ```
/// use revk::matcher::{MappedComment, Side};
/// use revk::printer::summarize_files;
///
/// let c = MappedComment { path: "a.rs".into(), line: 1, side: Side::Right, body: "x".into() };
/// assert_eq!(summarize_files(&[c]), vec![("a.rs".to_owned(), 1)]);
/// ```
#[must_use]
pub fn summarize_files(comments: &[MappedComment]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for c in comments {
        *counts.entry(c.path.as_str()).or_default() += 1;
    }
    let mut v: Vec<_> = counts
        .into_iter()
        .map(|(path, count)| (path.to_owned(), count))
        .collect();
    // Ties fall back to path order for stable output.
    v.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    v
}

/// Write a per-file comment count.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_summary<W: Write>(mut out: W, summary: &[(String, usize)]) -> std::io::Result<()> {
    if summary.is_empty() {
        return Ok(());
    }
    writeln!(out, "Summary:")?;
    for (path, count) in summary {
        let label = if *count == 1 { "comment" } else { "comments" };
        writeln!(out, "{path}: {count} {label}")?;
    }
    writeln!(out)?;
    Ok(())
}

fn event_label(event: ReviewEvent) -> &'static str {
    match event {
        ReviewEvent::RequestChanges => "REQUEST_CHANGES",
        ReviewEvent::Approve => "APPROVE",
        ReviewEvent::Comment => "COMMENT",
    }
}

fn write_comments<W: Write>(
    mut out: W,
    skin: &MadSkin,
    comments: &[MappedComment],
) -> anyhow::Result<()> {
    if comments.is_empty() {
        return Ok(());
    }
    write_summary(&mut out, &summarize_files(comments))?;
    writeln!(out, "{COMMENTS_BANNER}")?;
    for c in comments {
        writeln!(out, "\x1b[1m{}:{}\x1b[0m", c.path, c.line)?;
        skin.write_text_on(&mut out, &c.body)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Write a submitted review: verdict, body, then inline comments.
///
/// # Errors
///
/// Returns an error if writing or Markdown rendering fails.
pub fn write_submission<W: Write>(
    mut out: W,
    skin: &MadSkin,
    review: &ReviewSubmission,
) -> anyhow::Result<()> {
    writeln!(out, "{START_BANNER}")?;
    writeln!(
        out,
        "{} at {}",
        event_label(review.event),
        review.commit_id
    )?;
    skin.write_text_on(&mut out, &review.body)?;
    writeln!(out)?;
    write_comments(&mut out, skin, &review.comments)?;
    writeln!(out, "{END_BANNER}")?;
    Ok(())
}

/// Write a preview of a collected, not yet submitted, review.
///
/// # Errors
///
/// Returns an error if writing or Markdown rendering fails.
pub fn write_collected<W: Write>(
    mut out: W,
    skin: &MadSkin,
    review: &CollectedReview,
) -> anyhow::Result<()> {
    writeln!(out, "{START_BANNER}")?;
    writeln!(
        out,
        "Collected {} comment(s) for {}...{}",
        review.comments.len(),
        review.base_commit,
        review.head_commit
    )?;
    write_comments(&mut out, skin, &review.comments)?;
    writeln!(out, "{END_BANNER}")?;
    Ok(())
}

/// Write the result of a run.
///
/// # Errors
///
/// Returns an error if writing or Markdown rendering fails.
pub fn write_outcome<W: Write>(
    mut out: W,
    skin: &MadSkin,
    outcome: &RunOutcome,
) -> anyhow::Result<()> {
    match outcome {
        RunOutcome::UpToDate => {
            writeln!(out, "{UP_TO_DATE_MESSAGE}")?;
            Ok(())
        }
        RunOutcome::Submitted(review) => write_submission(out, skin, review),
    }
}
