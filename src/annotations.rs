//! Decoding of the model's annotation payload.
//!
//! The model is asked for `{"comments":[{"context","comment","suggestion"}]}`
//! but often wraps the JSON in a Markdown fence. Fences are removed before
//! decoding; anything that still fails to decode is a
//! [`RevkError::MalformedResponse`].

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::RevkError;
use crate::http::snippet;

/// Maximum number of annotations accepted from one model response.
pub const MAX_ANNOTATIONS: usize = 3;

const SNIPPET_LEN: usize = 200;

/// One candidate issue reported by the model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnnotationCandidate {
    /// Code the issue refers to, as quoted by the model.
    pub context: String,
    pub comment: String,
    #[serde(default)]
    pub suggestion: String,
}

impl AnnotationCandidate {
    /// Compose the comment and suggestion into a single review comment body.
    ///
    /// # Examples
    /// ```
    /// use revk::annotations::AnnotationCandidate;
    ///
    /// let c = AnnotationCandidate {
    ///     context: "foo()".into(),
    ///     comment: "missing null check".into(),
    ///     suggestion: "add a guard".into(),
    /// };
    /// assert_eq!(c.body(), "missing null check\n\n**Suggestion:** add a guard");
    /// ```
    #[must_use]
    pub fn body(&self) -> String {
        let comment = self.comment.trim();
        let suggestion = self.suggestion.trim();
        if suggestion.is_empty() {
            comment.to_owned()
        } else {
            format!("{comment}\n\n**Suggestion:** {suggestion}")
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnnotationPayload {
    comments: Vec<AnnotationCandidate>,
}

/// Remove a surrounding Markdown code fence, if present.
///
/// # Examples
/// ```
/// use revk::annotations::strip_fences;
///
/// assert_eq!(strip_fences("```json\n{}\n```"), "{}");
/// assert_eq!(strip_fences("  {}  "), "{}");
/// ```
#[must_use]
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`, `JSON`, ...) on the opening line.
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Decode the model's raw answer into annotation candidates.
///
/// At most [`MAX_ANNOTATIONS`] candidates are returned; extra entries are
/// dropped with a warning.
///
/// # Errors
///
/// Returns [`RevkError::MalformedResponse`] when the text, once fences are
/// stripped, is not JSON of the expected shape. The message names the JSON
/// path that failed.
pub fn parse_annotations(raw: &str) -> Result<Vec<AnnotationCandidate>, RevkError> {
    let json = strip_fences(raw);
    let mut de = serde_json::Deserializer::from_str(json);
    let payload: AnnotationPayload =
        serde_path_to_error::deserialize(&mut de).map_err(|e| {
            let path = e.path().to_string();
            let inner = e.into_inner();
            RevkError::MalformedResponse {
                message: format!("{inner} at {path}").into(),
                snippet: snippet(json, SNIPPET_LEN).into(),
            }
        })?;
    de.end().map_err(|e| RevkError::MalformedResponse {
        message: e.to_string().into(),
        snippet: snippet(json, SNIPPET_LEN).into(),
    })?;
    let mut comments = payload.comments;
    if comments.len() > MAX_ANNOTATIONS {
        warn!(
            "model returned {} annotations; keeping the first {MAX_ANNOTATIONS}",
            comments.len()
        );
        comments.truncate(MAX_ANNOTATIONS);
    }
    Ok(comments)
}
