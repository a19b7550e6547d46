//! Marker comments and the policy deciding where they may be emitted.
//!
//! A marker pair `<!--BEGIN_n-->` / `<!--END_n-->` wraps the text produced by
//! the node holding token `n`. Markers must never land inside attribute
//! values, tag names or structural wrappers; nodes whose object type is in
//! the suppression set disable emission for themselves and every descendant
//! until their own `end` fires.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::MarkerConfig;
use crate::types::{Configuration, Token};

pub const BEGIN_PREFIX: &str = "BEGIN_";
pub const END_PREFIX: &str = "END_";

fn marker_comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<!--(BEGIN|END)_[A-Z0-9_]*-->").expect("static regex"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Comment text of the begin marker, without the comment delimiters.
pub fn begin_marker(token: Token) -> String {
    format!("{BEGIN_PREFIX}{token}")
}

/// Comment text of the end marker, without the comment delimiters.
pub fn end_marker(token: Token) -> String {
    format!("{END_PREFIX}{token}")
}

/// Wrap `text` in the marker comments for `token`.
pub fn wrap(token: Token, text: &str) -> String {
    format!(
        "<!--{}-->{text}<!--{}-->",
        begin_marker(token),
        end_marker(token)
    )
}

/// Collapse every whitespace run to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    whitespace_regex().replace_all(text, " ").into_owned()
}

/// Remove every marker comment from `text`.
pub fn strip_markers(text: &str) -> String {
    marker_comment_regex().replace_all(text, "").into_owned()
}

/// Text stored in a node's `output` field.
pub fn normalize_output(text: &str) -> String {
    strip_markers(&collapse_whitespace(text))
}

fn parse_token(digits: &str) -> Option<Token> {
    let canonical = !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'));
    if canonical {
        digits.parse().ok()
    } else {
        None
    }
}

/// A marker comment recognized in a rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Begin(Token),
    End(Token),
}

impl Marker {
    /// Parse comment text such as `BEGIN_12`. Only the exact form [`wrap`]
    /// emits is accepted: plain decimal digits without sign or leading zero.
    pub fn parse(comment: &str) -> Option<Marker> {
        if let Some(rest) = comment.strip_prefix(BEGIN_PREFIX) {
            parse_token(rest).map(Marker::Begin)
        } else if let Some(rest) = comment.strip_prefix(END_PREFIX) {
            parse_token(rest).map(Marker::End)
        } else {
            None
        }
    }

    pub fn token(&self) -> Token {
        match self {
            Marker::Begin(t) | Marker::End(t) => *t,
        }
    }
}

/// Decides whether a configuration suppresses marker emission.
#[derive(Debug, Clone)]
pub struct MarkerPolicy {
    suppressed: BTreeSet<String>,
    collapse_wrapped_output: bool,
}

impl MarkerPolicy {
    pub fn new(config: &MarkerConfig) -> Self {
        Self {
            suppressed: config.suppressed_object_types.clone(),
            collapse_wrapped_output: config.collapse_wrapped_output,
        }
    }

    pub fn suppresses(&self, configuration: &Configuration) -> bool {
        configuration
            .object_type()
            .is_some_and(|object_type| self.suppressed.contains(object_type))
    }

    pub fn collapse_wrapped_output(&self) -> bool {
        self.collapse_wrapped_output
    }
}

impl Default for MarkerPolicy {
    fn default() -> Self {
        Self::new(&MarkerConfig::default())
    }
}
