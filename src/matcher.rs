//! Anchoring annotations to added lines of a diff.
//!
//! The scan is deterministic: files, hunks and lines are visited in document
//! order and the first added line containing any candidate phrase wins, with
//! more specific phrases tried first on each line. When identical code
//! appears in several files the comment lands on the first one.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::annotations::AnnotationCandidate;
use crate::diff::UnifiedDiff;
use crate::phrase::{PhraseStrategy, normalize};

/// Diff side a comment is attached to. Only additions are annotated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    #[default]
    Right,
}

/// Identity of an issue across runs: the file and new-side line it sits on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Anchor<'a> {
    pub path: &'a str,
    pub line: u32,
}

/// An annotation resolved to a concrete location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedComment {
    pub path: String,
    pub line: u32,
    #[serde(default)]
    pub side: Side,
    pub body: String,
}

impl MappedComment {
    /// `(path, line)` identity; the body takes no part in comparisons.
    #[must_use]
    pub fn anchor(&self) -> Anchor<'_> {
        Anchor {
            path: &self.path,
            line: self.line,
        }
    }
}

/// Resolve one annotation to the first added line containing one of its
/// phrases.
///
/// Returns `None` when no phrase occurs on any added line.
#[must_use]
pub fn map_annotation(
    diff: &UnifiedDiff,
    candidate: &AnnotationCandidate,
    strategy: &dyn PhraseStrategy,
) -> Option<MappedComment> {
    let phrases = strategy.phrases(&candidate.context);
    if phrases.is_empty() {
        return None;
    }
    for file in &diff.files {
        for line in file.added_lines() {
            let Some(number) = line.new_line else {
                continue;
            };
            let text = normalize(&line.text);
            if let Some(phrase) = phrases.iter().find(|p| text.contains(p.as_str())) {
                debug!("anchored {phrase:?} to {}:{number}", file.path);
                return Some(MappedComment {
                    path: file.path.clone(),
                    line: number,
                    side: Side::Right,
                    body: candidate.body(),
                });
            }
        }
    }
    None
}

/// Resolve every annotation, dropping those that match no added line.
///
/// The output keeps the order of `candidates`.
#[must_use]
pub fn map_annotations(
    diff: &UnifiedDiff,
    candidates: &[AnnotationCandidate],
    strategy: &dyn PhraseStrategy,
) -> Vec<MappedComment> {
    candidates
        .iter()
        .filter_map(|candidate| {
            let mapped = map_annotation(diff, candidate, strategy);
            if mapped.is_none() {
                warn!(
                    "dropping annotation with no matching added line: {:?}",
                    candidate.context
                );
            }
            mapped
        })
        .collect()
}
