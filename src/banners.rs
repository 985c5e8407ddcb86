//! Banner strings framing review output.

/// Banner printed before a review verdict.
pub const START_BANNER: &str = "========== revk review ==========";

/// Banner printed before inline comments.
pub const COMMENTS_BANNER: &str = "========== inline comments ==========";

/// Banner printed after the last comment.
pub const END_BANNER: &str = "========== end of review ==========";
