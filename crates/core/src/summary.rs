//! Summary lines and the acceptance rules every extraction path shares.
//!
//! A [`Summary`] is what the caller displays: one or more chat lines, the
//! first of which is always the title/description composite. The
//! [`Assembler`] decides whether a title/description pair is good enough to
//! become that first line.
//!
//! # Example
//!
//! ```rust
//! use glimpse_core::{Outcome, Rejection, accept};
//!
//! assert_eq!(accept("Just a moment...", "anything"), Outcome::Rejected(Rejection::RejectedTitle));
//! assert_eq!(accept("Hi", ""), Outcome::Rejected(Rejection::TooShort));
//! assert!(accept("Rust 2024 edition released", "").is_summary());
//! ```

use std::fmt;

use url::Url;

use crate::outcome::{Outcome, Rejection};

/// Line-protocol bold toggle.
pub const BOLD: char = '\u{2}';

/// Separator between facets of a summary line.
pub const SEPARATOR: &str = " • ";

/// Minimum combined title + description length, in characters.
pub const MIN_SUMMARY_LEN: usize = 16;

/// Default maximum description length before truncation, in characters.
pub const DEFAULT_MAX_DESCRIPTION: usize = 300;

const ELLIPSIS: &str = "...";

/// Lowercase title prefixes served by challenge pages, WAFs and error pages.
const BLOCKED_TITLE_PREFIXES: &[&str] = &[
    "just a moment",
    "attention required",
    "access denied",
    "you are being blocked",
    "you have been blocked",
    "verify you are human",
    "are you a robot",
    "security check",
    "403 forbidden",
    "404 not found",
    "page not found",
    "error 404",
    "not found",
    "captcha",
    "pardon our interruption",
    "one more step",
];

/// An ordered, non-empty list of display lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    lines: Vec<String>,
}

impl Summary {
    /// Starts a summary with its primary line.
    pub fn new(first: impl Into<String>) -> Self {
        Self { lines: vec![first.into()] }
    }

    /// Appends a secondary line (canonical URL, attribution, credibility).
    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.push_line(line);
        self
    }

    pub(crate) fn push_line(&mut self, line: impl Into<String>) {
        let line = line.into();
        if !line.trim().is_empty() {
            self.lines.push(line);
        }
    }

    pub fn first_line(&self) -> &str {
        &self.lines[0]
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

impl IntoIterator for Summary {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.into_iter()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

/// Validation and composition rules for a title/description pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assembler {
    /// Minimum combined length (default: 16).
    pub min_len: usize,
    /// Maximum description length before truncation (default: 300).
    pub max_description: usize,
}

impl Default for Assembler {
    fn default() -> Self {
        Self { min_len: MIN_SUMMARY_LEN, max_description: DEFAULT_MAX_DESCRIPTION }
    }
}

impl Assembler {
    /// Creates an assembler with a strategy-specific description limit.
    pub fn new(max_description: usize) -> Self {
        Self { max_description, ..Self::default() }
    }

    /// Accepts or rejects a title/description pair.
    ///
    /// Checks run in order: blocked title prefix, combined length, then
    /// composition of `"<bold description> • <title>"` (or the bare title when
    /// there is no description) with the description truncated to
    /// `max_description` characters plus an ellipsis.
    pub fn accept(&self, title: &str, description: &str) -> Outcome {
        let title = collapse_whitespace(title);
        let description = collapse_whitespace(description);

        if is_blocked_title(&title) {
            return Outcome::Rejected(Rejection::RejectedTitle);
        }

        if title.chars().count() + description.chars().count() < self.min_len {
            return Outcome::Rejected(Rejection::TooShort);
        }

        let line = match (title.is_empty(), description.is_empty()) {
            (_, true) => title,
            (true, false) => bold(&truncate(&description, self.max_description)),
            (false, false) => format!(
                "{}{}{}",
                bold(&truncate(&description, self.max_description)),
                SEPARATOR,
                title
            ),
        };

        Outcome::Summary(Summary::new(line))
    }
}

/// Accepts a title/description pair with the default limits.
pub fn accept(title: &str, description: &str) -> Outcome {
    Assembler::default().accept(title, description)
}

/// Wraps text in bold toggles.
pub fn bold(text: &str) -> String {
    format!("{BOLD}{text}{BOLD}")
}

/// Joins the non-empty facets of a line with [`SEPARATOR`].
pub fn join_facets<I, S>(facets: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    facets
        .into_iter()
        .filter(|facet| !facet.as_ref().trim().is_empty())
        .map(|facet| facet.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Cuts text to `max` characters and appends `...` when it was longer.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
        None => text.to_string(),
    }
}

/// Collapses runs of whitespace (including newlines) into single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether a title looks like a challenge, block or error page.
pub fn is_blocked_title(title: &str) -> bool {
    let lowered = title.trim().to_lowercase();
    BLOCKED_TITLE_PREFIXES.iter().any(|prefix| lowered.starts_with(prefix))
}

/// Whether a candidate title or heading is stylesheet debris.
pub fn looks_like_css(text: &str) -> bool {
    let punctuation = text.chars().filter(|c| matches!(c, '{' | '}' | ';')).count();
    punctuation >= 2 && text.contains(':')
}

/// Whether a title does nothing but repeat the link it describes.
pub fn echoes_url(title: &str, url: &Url) -> bool {
    let title = title.trim().to_lowercase();
    if title.starts_with("http://") || title.starts_with("https://") {
        return true;
    }

    let host = url.host_str().unwrap_or_default().trim_start_matches("www.").to_lowercase();
    let bare = url.as_str().to_lowercase();
    let bare = bare
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.")
        .trim_end_matches('/');

    title == host || (!bare.is_empty() && title.contains(bare))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn strip_bold(line: &str) -> String {
        line.chars().filter(|c| *c != BOLD).collect()
    }

    #[rstest]
    #[case("Just a moment...")]
    #[case("Attention Required! | Cloudflare")]
    #[case("ACCESS DENIED")]
    #[case("Verify you are human")]
    #[case("  404 Not Found")]
    #[case("Page not found – Example")]
    fn test_blocked_titles(#[case] title: &str) {
        assert!(is_blocked_title(title));
        assert_eq!(accept(title, &"x".repeat(400)), Outcome::Rejected(Rejection::RejectedTitle));
    }

    #[test]
    fn test_normal_title_is_not_blocked() {
        assert!(!is_blocked_title("How we found the missing moment"));
    }

    #[test]
    fn test_too_short() {
        assert_eq!(accept("Hi", ""), Outcome::Rejected(Rejection::TooShort));
        assert_eq!(accept("", ""), Outcome::Rejected(Rejection::TooShort));
        assert_eq!(accept("fifteen chars!!", ""), Outcome::Rejected(Rejection::TooShort));
    }

    #[test]
    fn test_exactly_minimum_is_accepted() {
        let outcome = accept("sixteen chars!!!", "");
        assert_eq!(outcome.into_summary().unwrap().first_line(), "sixteen chars!!!");
    }

    #[test]
    fn test_compose_description_and_title() {
        let summary = accept("Big News Today", "Something happened").into_summary().unwrap();
        assert_eq!(summary.first_line(), "\u{2}Something happened\u{2} • Big News Today");
        assert_eq!(summary.len(), 1);
    }

    #[test]
    fn test_description_only() {
        let summary = accept("", "A description without any title").into_summary().unwrap();
        assert_eq!(summary.first_line(), "\u{2}A description without any title\u{2}");
    }

    #[test]
    fn test_whitespace_is_collapsed() {
        let summary = accept("  Big\n  News\tToday  ", "").into_summary().unwrap();
        assert_eq!(summary.first_line(), "Big News Today");
    }

    #[rstest]
    #[case(10)]
    #[case(200)]
    #[case(300)]
    fn test_truncation_law(#[case] max: usize) {
        let description = "é".repeat(max + 57);
        let line = Assembler::new(max)
            .accept("Some title", &description)
            .into_summary()
            .unwrap()
            .first_line()
            .to_string();
        let plain = strip_bold(&line);
        let segment = plain.split(SEPARATOR).next().unwrap();
        assert_eq!(segment.chars().count(), max + 3);
        assert!(segment.ends_with("..."));
    }

    #[test]
    fn test_truncate_leaves_short_text_alone() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("eleven chars", 6), "eleven...");
    }

    #[test]
    fn test_looks_like_css() {
        assert!(looks_like_css("body{margin:0;padding:0}"));
        assert!(looks_like_css(".a{color:red} .b{color:blue}"));
        assert!(!looks_like_css("Rust: the book"));
        assert!(!looks_like_css("Hello; world"));
    }

    #[test]
    fn test_echoes_url() {
        let url = Url::parse("https://www.example.com/some/article").unwrap();
        assert!(echoes_url("example.com", &url));
        assert!(echoes_url("https://www.example.com/some/article", &url));
        assert!(echoes_url("example.com/some/article - Search", &url));
        assert!(!echoes_url("A real article headline", &url));
    }

    #[test]
    fn test_join_facets_skips_empty() {
        assert_eq!(join_facets(["a", "", "b", "  "]), "a • b");
        assert_eq!(join_facets(Vec::<String>::new()), "");
    }

    #[test]
    fn test_summary_lines() {
        let summary = Summary::new("first").with_line("second").with_line("   ");
        assert_eq!(summary.lines(), &["first".to_string(), "second".to_string()]);
        assert!(!summary.is_empty());
        assert_eq!(summary.to_string(), "first\nsecond");
        assert_eq!(summary.into_iter().count(), 2);
    }
}
