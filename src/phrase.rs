//! Candidate phrase extraction for anchoring annotations.
//!
//! An annotation's `context` is free text written by the model. Matching it
//! against diff lines goes through a [`PhraseStrategy`], which turns the
//! context into normalised phrases ordered from most to least specific.
//! [`PatternPhrases`] is the default, regex-driven strategy.

use regex::Regex;
use std::sync::LazyLock;

/// Length above which a context is mined for sub-phrases.
pub const LONG_CONTEXT_THRESHOLD: usize = 30;
/// Length of the catch-all prefix phrase appended for long contexts.
pub const FALLBACK_PREFIX_LEN: usize = 30;

/// Elided-code markers: a braced ellipsis, or an ellipsis standing alone
/// between whitespace or the ends of the text. Spread syntax and dots inside
/// string literals are code, not markers.
static ELLIPSIS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\s*(?:\.\.\.|…)\s*\}|(?:^|\s)(?:\.\.\.|…)(?:\s|$)")
        .expect("valid regex")
});

static CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z_$][\w$]*\s*\([^()]*\)").expect("valid regex"));

static MEMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z_$][\w$]*\.[a-z_$][\w$]*").expect("valid regex"));

static EQUALITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-z_$][\w$.]*\s*===?\s*[^\s;,)]+").expect("valid regex")
});

/// Turns an annotation context into ordered matching phrases.
///
/// Implementations must be deterministic and return phrases already
/// normalised (trimmed, lowercased), most specific first.
pub trait PhraseStrategy {
    fn phrases(&self, context: &str) -> Vec<String>;
}

/// Normalise text for case-insensitive comparison.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Pattern-based phrase extraction.
///
/// 1. A context containing an elided-code marker (`{ ... }`, or a `...`/`…`
///    surrounded by whitespace) is a structural skeleton: the marker is
///    removed and the remainder is tried first, then the whole context.
/// 2. A long context (or a skeleton with nothing left) is mined for call
///    expressions, member accesses and equality comparisons, plus its first
///    [`FALLBACK_PREFIX_LEN`] characters, longest first.
/// 3. Anything else is used whole.
#[derive(Debug, Clone, Copy)]
pub struct PatternPhrases {
    pub long_context_threshold: usize,
    pub fallback_prefix_len: usize,
}

impl Default for PatternPhrases {
    fn default() -> Self {
        Self {
            long_context_threshold: LONG_CONTEXT_THRESHOLD,
            fallback_prefix_len: FALLBACK_PREFIX_LEN,
        }
    }
}

impl PatternPhrases {
    fn skeleton(normalized: &str) -> Option<String> {
        if !ELLIPSIS_RE.is_match(normalized) {
            return None;
        }
        let stripped = ELLIPSIS_RE.replace_all(normalized, " ");
        let remainder = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
        Some(remainder)
    }

    fn mine(&self, normalized: &str) -> Vec<String> {
        let mut found: Vec<String> = [&*CALL_RE, &*MEMBER_RE, &*EQUALITY_RE]
            .into_iter()
            .flat_map(|re| re.find_iter(normalized).map(|m| m.as_str().trim().to_owned()))
            .collect();
        let prefix: String = normalized.chars().take(self.fallback_prefix_len).collect();
        found.push(prefix.trim().to_owned());
        // Stable: equal lengths keep discovery order.
        found.sort_by_key(|p| std::cmp::Reverse(p.chars().count()));
        found
    }
}

impl PhraseStrategy for PatternPhrases {
    fn phrases(&self, context: &str) -> Vec<String> {
        let normalized = normalize(context);
        let mut phrases = match Self::skeleton(&normalized) {
            Some(rest) if !rest.is_empty() => vec![rest, normalized],
            Some(_) => self.mine(&normalized),
            None if normalized.chars().count() > self.long_context_threshold => {
                self.mine(&normalized)
            }
            None => vec![normalized],
        };
        phrases.retain(|p| !p.is_empty());
        let mut seen = std::collections::HashSet::new();
        phrases.retain(|p| seen.insert(p.clone()));
        phrases
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn phrases(context: &str) -> Vec<String> {
        PatternPhrases::default().phrases(context)
    }

    #[rstest]
    #[case::short("foo.bar(x)", &["foo.bar(x)"])]
    #[case::case_and_space("  Foo.Bar(X)  ", &["foo.bar(x)"])]
    #[case::skeleton("if (user) { ... }", &["if (user)", "if (user) { ... }"])]
    #[case::unicode_ellipsis(
        "return cache.get(key) …",
        &["return cache.get(key)", "return cache.get(key) …"]
    )]
    #[case::standalone_dots(
        "... finally { close() }",
        &["finally { close() }", "... finally { close() }"]
    )]
    #[case::spread_argument("merge(...args)", &["merge(...args)"])]
    #[case::dots_in_string("console.log('Loading...')", &["console.log('loading...')"])]
    #[case::unicode_in_string("label = 'Wait…'", &["label = 'wait…'"])]
    fn short_context_cases(#[case] context: &str, #[case] expected: &[&str]) {
        assert_eq!(phrases(context), expected);
    }

    #[test]
    fn long_context_is_mined() {
        let out = phrases("const result = fetchUser(id).then(r => r.json())");
        assert!(out.contains(&"fetchuser(id)".to_owned()));
        assert!(out.contains(&"r.json".to_owned()));
        assert!(out.contains(&"const result = fetchuser(id).t".to_owned()));
    }

    #[test]
    fn equality_comparisons_are_extracted() {
        let out = phrases("if (response.status === 200 && ok) { handle(response) }");
        assert!(out.contains(&"response.status === 200".to_owned()));
        assert!(out.contains(&"handle(response)".to_owned()));
    }

    #[test]
    fn spread_in_long_context_is_mined_verbatim() {
        let out = phrases("const merged = merge(...defaults, ...overrides);");
        assert!(out.contains(&"merge(...defaults, ...overrides)".to_owned()));
    }

    #[test]
    fn empty_skeleton_falls_back_to_mining() {
        let out = phrases("{ ... }");
        assert_eq!(out, ["{ ... }"]);
    }

    #[test]
    fn phrases_are_sorted_longest_first() {
        let out = phrases("let total = items.reduce((a, b) => a + b, 0) + offset.value");
        let lengths: Vec<_> = out.iter().map(|p| p.chars().count()).collect();
        let mut sorted = lengths.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(lengths, sorted);
    }

    #[test]
    fn duplicates_are_removed() {
        let out = phrases("value.check() and value.check() again and again");
        let count = out.iter().filter(|p| p.as_str() == "value.check()").count();
        assert_eq!(count, 1);
    }

    #[test]
    fn blank_context_yields_nothing() {
        assert!(phrases("   ").is_empty());
    }

    #[test]
    fn extraction_is_deterministic() {
        let ctx = "const x = a.b(c) === d.e && f(g)";
        assert_eq!(phrases(ctx), phrases(ctx));
    }
}
