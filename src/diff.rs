//! Unified diff model and a tolerant parser.
//!
//! The parser walks the diff once, tracking the old- and new-side line
//! counters of each hunk. Malformed sections are skipped with a debug
//! diagnostic rather than failing the whole parse, so a partially broken
//! diff still yields every hunk that could be read.

use log::debug;
use regex::Regex;
use std::sync::LazyLock;

static HUNK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^@@ -(?P<old>\d+)(?:,(?P<old_count>\d+))? \+(?P<new>\d+)(?:,(?P<new_count>\d+))? @@",
    )
    .expect("valid regex")
});

static GIT_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^diff --git a/(?P<old>.+?) b/(?P<new>.+)$").expect("valid regex"));

const DEV_NULL: &str = "/dev/null";

/// Kind of a single diff line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Added,
    Removed,
    Context,
}

/// One line of a hunk body, without its `+`/`-`/space prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    pub text: String,
    /// Line number on the old side; absent for added lines.
    pub old_line: Option<u32>,
    /// Line number on the new side; absent for removed lines.
    pub new_line: Option<u32>,
}

impl DiffLine {
    #[must_use]
    pub fn is_added(&self) -> bool {
        self.kind == LineKind::Added
    }
}

/// A contiguous block of changes introduced by an `@@` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: u32,
    pub new_start: u32,
    pub lines: Vec<DiffLine>,
}

/// All hunks touching one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Current path of the file; the old path for deletions.
    pub path: String,
    pub hunks: Vec<Hunk>,
}

impl FileDiff {
    fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hunks: Vec::new(),
        }
    }

    /// Added lines of this file in document order.
    pub fn added_lines(&self) -> impl Iterator<Item = &DiffLine> {
        self.hunks
            .iter()
            .flat_map(|h| h.lines.iter())
            .filter(|l| l.is_added())
    }
}

/// Parsed diff, files kept in order of appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnifiedDiff {
    pub files: Vec<FileDiff>,
}

impl UnifiedDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// `(path, new line number)` of every added line, in document order.
    pub fn added_lines(&self) -> impl Iterator<Item = (&str, u32)> {
        self.files.iter().flat_map(|f| {
            f.added_lines()
                .filter_map(move |l| l.new_line.map(|n| (f.path.as_str(), n)))
        })
    }

    /// Whether `line` is an added line of `path`.
    #[must_use]
    pub fn is_added_line(&self, path: &str, line: u32) -> bool {
        self.added_lines().any(|(p, n)| p == path && n == line)
    }
}

/// Remaining body lines of the hunk being read.
struct OpenHunk {
    hunk: Hunk,
    old_line: u32,
    new_line: u32,
    old_left: u32,
    new_left: u32,
}

impl OpenHunk {
    fn from_header(header: &str) -> Option<Self> {
        let caps = HUNK_RE.captures(header)?;
        let number = |name: &str, default: u32| {
            caps.name(name)
                .map_or(Some(default), |m| m.as_str().parse().ok())
        };
        let old_start = number("old", 0)?;
        let new_start = number("new", 0)?;
        let old_left = number("old_count", 1)?;
        let new_left = number("new_count", 1)?;
        // The line counters advance at most `count` times past `start`.
        old_start.checked_add(old_left)?;
        new_start.checked_add(new_left)?;
        Some(Self {
            hunk: Hunk {
                old_start,
                new_start,
                lines: Vec::new(),
            },
            old_line: old_start,
            new_line: new_start,
            old_left,
            new_left,
        })
    }

    fn is_complete(&self) -> bool {
        self.old_left == 0 && self.new_left == 0
    }

    /// Consume one body line. Returns `false` when the line does not belong
    /// to a hunk body.
    fn push(&mut self, raw: &str) -> bool {
        let (kind, text) = if let Some(t) = raw.strip_prefix('+') {
            (LineKind::Added, t)
        } else if let Some(t) = raw.strip_prefix('-') {
            (LineKind::Removed, t)
        } else if let Some(t) = raw.strip_prefix(' ') {
            (LineKind::Context, t)
        } else if raw.is_empty() {
            // Some tools strip the trailing space of blank context lines.
            (LineKind::Context, raw)
        } else {
            return false;
        };
        let (old_line, new_line) = match kind {
            LineKind::Added => {
                if self.new_left == 0 {
                    return false;
                }
                let n = self.new_line;
                self.new_line += 1;
                self.new_left -= 1;
                (None, Some(n))
            }
            LineKind::Removed => {
                if self.old_left == 0 {
                    return false;
                }
                let o = self.old_line;
                self.old_line += 1;
                self.old_left -= 1;
                (Some(o), None)
            }
            LineKind::Context => {
                if self.old_left == 0 || self.new_left == 0 {
                    return false;
                }
                let pair = (Some(self.old_line), Some(self.new_line));
                self.old_line += 1;
                self.new_line += 1;
                self.old_left -= 1;
                self.new_left -= 1;
                pair
            }
        };
        self.hunk.lines.push(DiffLine {
            kind,
            text: text.to_owned(),
            old_line,
            new_line,
        });
        true
    }
}

fn strip_side_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    // Headers may carry a trailing tab followed by a timestamp.
    let path = path.split('\t').next().unwrap_or(path).trim_end();
    path.strip_prefix(prefix).unwrap_or(path)
}

#[derive(Default)]
struct Parser {
    files: Vec<FileDiff>,
    current: Option<FileDiff>,
    hunk: Option<OpenHunk>,
    /// Path from a `--- a/...` header, used when the new side is `/dev/null`.
    old_path: Option<String>,
}

impl Parser {
    fn close_hunk(&mut self) {
        if let Some(open) = self.hunk.take() {
            if !open.is_complete() {
                debug!(
                    "hunk at +{} ended early ({} old / {} new lines missing)",
                    open.hunk.new_start, open.old_left, open.new_left
                );
            }
            match self.current.as_mut() {
                Some(file) if !open.hunk.lines.is_empty() => file.hunks.push(open.hunk),
                Some(_) => {}
                None => debug!("dropping hunk without a file header"),
            }
        }
    }

    fn close_file(&mut self) {
        self.close_hunk();
        if let Some(file) = self.current.take() {
            self.files.push(file);
        }
        self.old_path = None;
    }

    fn line(&mut self, raw: &str) {
        if let Some(open) = self.hunk.as_mut() {
            if open.push(raw) {
                if open.is_complete() {
                    self.close_hunk();
                }
                return;
            }
            if raw.starts_with('\\') {
                // "\ No newline at end of file"
                return;
            }
            self.close_hunk();
        }
        self.header(raw);
    }

    fn header(&mut self, raw: &str) {
        if let Some(caps) = GIT_HEADER_RE.captures(raw) {
            self.close_file();
            let path = caps.name("new").map_or("", |m| m.as_str());
            self.current = Some(FileDiff::new(path));
        } else if let Some(rest) = raw.strip_prefix("rename to ") {
            if let Some(file) = self.current.as_mut() {
                rest.trim().clone_into(&mut file.path);
            }
        } else if let Some(rest) = raw.strip_prefix("--- ") {
            let old = strip_side_prefix(rest, "a/");
            // Plain diffs without a `diff --git` line start a file here.
            if self.current.as_ref().is_none_or(|f| !f.hunks.is_empty()) {
                self.close_file();
                self.current = Some(FileDiff::new(old));
            }
            self.old_path = (old != DEV_NULL).then(|| old.to_owned());
        } else if let Some(rest) = raw.strip_prefix("+++ ") {
            let new = strip_side_prefix(rest, "b/");
            let path = if new == DEV_NULL {
                self.old_path.clone()
            } else {
                Some(new.to_owned())
            };
            match (self.current.as_mut(), path) {
                (Some(file), Some(p)) => file.path = p,
                (None, Some(p)) => self.current = Some(FileDiff::new(p)),
                (_, None) => {}
            }
        } else if raw.starts_with("@@") {
            match OpenHunk::from_header(raw) {
                Some(open) if self.current.is_some() => self.hunk = Some(open),
                Some(_) => debug!("skipping hunk before any file header: {raw}"),
                None => debug!("skipping malformed hunk header: {raw}"),
            }
        }
        // Index lines, mode changes and anything unrecognised are ignored.
    }

    fn finish(mut self) -> UnifiedDiff {
        self.close_file();
        let files = self
            .files
            .into_iter()
            .filter(|f| !f.path.is_empty() && f.path != DEV_NULL)
            .collect();
        UnifiedDiff { files }
    }
}

/// Parse unified diff text into a [`UnifiedDiff`].
///
/// Never fails: sections that cannot be understood are skipped, yielding a
/// partial model.
///
/// # Examples
/// ```
/// use revk::diff::parse_unified_diff;
///
/// let text = "diff --git a/a.rs b/a.rs\n--- a/a.rs\n+++ b/a.rs\n@@ -1,2 +1,2 @@\n keep\n-old\n+new\n";
/// let diff = parse_unified_diff(text);
/// assert!(diff.is_added_line("a.rs", 2));
/// ```
#[must_use]
pub fn parse_unified_diff(text: &str) -> UnifiedDiff {
    let mut parser = Parser::default();
    for raw in text.lines() {
        parser.line(raw.trim_end_matches('\r'));
    }
    parser.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const TWO_FILES: &str = "\
diff --git a/src/utils.js b/src/utils.js
index 1111111..2222222 100644
--- a/src/utils.js
+++ b/src/utils.js
@@ -10,4 +10,5 @@ function helper() {
 const a = 1;
-const b = 2;
+const b = 3;
+const c = foo.bar(x);
 const d = 4;
 module.exports = a;
@@ -40,2 +41,3 @@
 last();
+added();
 end();
diff --git a/README.md b/README.md
--- a/README.md
+++ b/README.md
@@ -1 +1 @@
-old title
+new title
";

    #[test]
    fn parses_files_and_hunks_in_order() {
        let diff = parse_unified_diff(TWO_FILES);
        let paths: Vec<_> = diff.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, ["src/utils.js", "README.md"]);
        let utils = diff.files.first().expect("utils");
        assert_eq!(utils.hunks.len(), 2);
    }

    #[test]
    fn tracks_new_side_line_numbers() {
        let diff = parse_unified_diff(TWO_FILES);
        let added: Vec<_> = diff.added_lines().collect();
        assert_eq!(
            added,
            [
                ("src/utils.js", 11),
                ("src/utils.js", 12),
                ("src/utils.js", 42),
                ("README.md", 1),
            ]
        );
    }

    #[test]
    fn context_lines_carry_both_numbers() {
        let diff = parse_unified_diff(TWO_FILES);
        let hunk = diff
            .files
            .first()
            .and_then(|f| f.hunks.first())
            .expect("hunk");
        let last = hunk.lines.last().expect("line");
        assert_eq!(last.kind, LineKind::Context);
        assert_eq!(last.old_line, Some(13));
        assert_eq!(last.new_line, Some(14));
        let removed = hunk
            .lines
            .iter()
            .find(|l| l.kind == LineKind::Removed)
            .expect("removed");
        assert_eq!(removed.new_line, None);
        assert_eq!(removed.old_line, Some(11));
    }

    #[test]
    fn strips_line_prefixes() {
        let diff = parse_unified_diff(TWO_FILES);
        let utils = diff.files.first().expect("utils");
        let texts: Vec<_> = utils.added_lines().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["const b = 3;", "const c = foo.bar(x);", "added();"]);
    }

    #[test]
    fn removed_line_resembling_header_stays_in_hunk() {
        let text = "\
--- a/q.sql
+++ b/q.sql
@@ -1,2 +1,2 @@
--- old comment
+-- new comment
 select 1;
";
        let diff = parse_unified_diff(text);
        assert_eq!(diff.files.len(), 1);
        let file = diff.files.first().expect("file");
        assert_eq!(file.path, "q.sql");
        let hunk = file.hunks.first().expect("hunk");
        assert_eq!(hunk.lines.len(), 3);
        assert!(diff.is_added_line("q.sql", 1));
    }

    #[test]
    fn rename_uses_new_path() {
        let text = "\
diff --git a/old/name.rs b/new/name.rs
similarity index 90%
rename from old/name.rs
rename to new/name.rs
--- a/old/name.rs
+++ b/new/name.rs
@@ -3 +3 @@
-fn a() {}
+fn b() {}
";
        let diff = parse_unified_diff(text);
        assert!(diff.is_added_line("new/name.rs", 3));
    }

    #[rstest]
    #[case::created("--- /dev/null\n+++ b/new.txt\n@@ -0,0 +1,2 @@\n+one\n+two\n", "new.txt", 2)]
    #[case::deleted("--- a/gone.txt\n+++ /dev/null\n@@ -1,2 +0,0 @@\n-one\n-two\n", "gone.txt", 0)]
    fn creations_and_deletions(
        #[case] text: &str,
        #[case] path: &str,
        #[case] added: usize,
    ) {
        let diff = parse_unified_diff(text);
        let file = diff.files.first().expect("file");
        assert_eq!(file.path, path);
        assert_eq!(file.added_lines().count(), added);
    }

    #[test]
    fn malformed_hunk_is_skipped_but_rest_survives() {
        let text = "\
diff --git a/a.rs b/a.rs
--- a/a.rs
+++ b/a.rs
@@ -x,1 +y,1 @@
+lost
diff --git a/b.rs b/b.rs
--- a/b.rs
+++ b/b.rs
@@ -1 +1,2 @@
 kept
+found
";
        let diff = parse_unified_diff(text);
        assert!(!diff.is_added_line("a.rs", 1));
        assert!(diff.is_added_line("b.rs", 2));
    }

    #[rstest]
    #[case::new_side("@@ -1,1 +4294967295,2 @@")]
    #[case::old_side("@@ -4294967295,2 +1,1 @@")]
    #[case::out_of_range("@@ -1,1 +99999999999,1 @@")]
    fn overflowing_hunk_is_skipped_but_rest_survives(#[case] header: &str) {
        let text = format!(
            "\
diff --git a/a.rs b/a.rs
--- a/a.rs
+++ b/a.rs
{header}
 same
+one
+two
diff --git a/b.rs b/b.rs
--- a/b.rs
+++ b/b.rs
@@ -1 +1,2 @@
 kept
+found
"
        );
        let diff = parse_unified_diff(&text);
        let a = diff.files.iter().find(|f| f.path == "a.rs").expect("a.rs");
        assert!(a.hunks.is_empty());
        assert!(diff.is_added_line("b.rs", 2));
    }

    #[test]
    fn hunk_at_the_top_of_the_line_range_is_kept() {
        let text = "--- a/x\n+++ b/x\n@@ -4294967294,1 +4294967294,1 @@\n-a\n+b\n";
        let diff = parse_unified_diff(text);
        assert!(diff.is_added_line("x", 4_294_967_294));
    }

    #[test]
    fn hunk_without_file_header_is_dropped() {
        let diff = parse_unified_diff("@@ -1 +1 @@\n-a\n+b\n");
        assert!(diff.is_empty());
    }

    #[test]
    fn no_newline_marker_is_ignored() {
        let text = "\
--- a/x
+++ b/x
@@ -1 +1 @@
-a
\\ No newline at end of file
+b
\\ No newline at end of file
";
        let diff = parse_unified_diff(text);
        assert!(diff.is_added_line("x", 1));
    }

    #[test]
    fn omitted_counts_default_to_one() {
        let diff = parse_unified_diff("--- a/x\n+++ b/x\n@@ -7 +9 @@\n-a\n+b\n");
        assert!(diff.is_added_line("x", 9));
    }

    #[test]
    fn blank_context_line_without_space_counts() {
        let text = "--- a/x\n+++ b/x\n@@ -1,3 +1,4 @@\n a\n\n+c\n d\n";
        let diff = parse_unified_diff(text);
        assert!(diff.is_added_line("x", 3));
    }

    #[test]
    fn hunk_re_variants() {
        let caps = HUNK_RE.captures("@@ -3,4 +5 @@").expect("regex");
        assert_eq!(&caps["old"], "3");
        assert_eq!(caps.name("old_count").expect("old count").as_str(), "4");
        assert_eq!(&caps["new"], "5");
        assert!(caps.name("new_count").is_none());
    }

    #[test]
    fn binary_file_has_no_hunks() {
        let text = "diff --git a/img.png b/img.png\nBinary files a/img.png and b/img.png differ\n";
        let diff = parse_unified_diff(text);
        let file = diff.files.first().expect("file");
        assert_eq!(file.path, "img.png");
        assert!(file.hunks.is_empty());
    }
}
