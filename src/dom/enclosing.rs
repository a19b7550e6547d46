//! "Which token produced this node?"
//!
//! The document is flattened into a stream of marker items in document order,
//! with a [`MarkerStreamItem::Current`] sentinel where the target sits:
//!
//! ```text
//! BEGIN_1  BEGIN_2  END_2  CURRENT  END_1     →  token 1
//! ```
//!
//! Scanning backward from the sentinel, the first `BEGIN_n` that has an
//! `END_n` somewhere after the sentinel is the innermost enclosing span,
//! provided markers are properly nested. Spans that cross another span are
//! reported as a violation rather than answered.

use serde_json::json;

use super::{DomId, Document};
use crate::console::Console;
use crate::trace::Marker;
use crate::types::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerStreamItem {
    Begin(Token),
    End(Token),
    Current,
}

/// Result of resolving the sentinel's enclosing span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnclosingToken {
    Found(Token),
    /// Not inside any instrumented region.
    Outside,
    /// The candidate span for `token` crosses another span.
    NestingViolation { token: Token },
}

/// Marker comments in document order, plus the sentinel at `target`.
/// A target that is itself a marker comment contributes its marker, not the sentinel.
pub fn build_marker_stream(document: &Document, target: DomId) -> Vec<MarkerStreamItem> {
    document
        .preorder()
        .into_iter()
        .filter_map(|id| {
            match document.comment_data(id).and_then(Marker::parse) {
                Some(Marker::Begin(token)) => Some(MarkerStreamItem::Begin(token)),
                Some(Marker::End(token)) => Some(MarkerStreamItem::End(token)),
                None if id == target => Some(MarkerStreamItem::Current),
                None => None,
            }
        })
        .collect()
}

pub fn enclosing_token(stream: &[MarkerStreamItem]) -> EnclosingToken {
    let Some(current) = stream.iter().position(|&item| item == MarkerStreamItem::Current) else {
        return EnclosingToken::Outside;
    };

    for begin in (0..current).rev() {
        let MarkerStreamItem::Begin(token) = stream[begin] else {
            continue;
        };
        let Some(end) = stream[current + 1..]
            .iter()
            .position(|&item| item == MarkerStreamItem::End(token))
            .map(|offset| current + 1 + offset)
        else {
            continue;
        };

        return if is_properly_nested(stream, begin, end) {
            EnclosingToken::Found(token)
        } else {
            EnclosingToken::NestingViolation { token }
        };
    }
    EnclosingToken::Outside
}

/// True if no span crosses the boundaries of `stream[begin..=end]`.
/// Markers whose partner is absent from the stream entirely are ignored.
fn is_properly_nested(stream: &[MarkerStreamItem], begin: usize, end: usize) -> bool {
    let mut open: Vec<Token> = Vec::new();
    for &item in &stream[begin + 1..end] {
        match item {
            MarkerStreamItem::Begin(token) => open.push(token),
            MarkerStreamItem::End(token) => {
                if open.last() == Some(&token) {
                    open.pop();
                } else if open.contains(&token)
                    || stream[..begin].contains(&MarkerStreamItem::Begin(token))
                {
                    return false;
                }
            }
            MarkerStreamItem::Current => {}
        }
    }
    // Spans opened inside must not close outside.
    !open
        .iter()
        .any(|&token| stream[end + 1..].contains(&MarkerStreamItem::End(token)))
}

/// Innermost token whose span encloses `target`. Nesting violations are
/// written to the console and yield `None`.
pub fn find_enclosing_token(document: &Document, target: DomId, console: &Console) -> Option<Token> {
    match enclosing_token(&build_marker_stream(document, target)) {
        EnclosingToken::Found(token) => Some(token),
        EnclosingToken::Outside => None,
        EnclosingToken::NestingViolation { token } => {
            console.warn(
                "inspect",
                "Markers are not properly nested around the inspected node",
                json!({ "token": token, "target": target }),
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::{LogLevel, MemorySink};
    use crate::dom::parse_html;
    use std::sync::Arc;
    use super::MarkerStreamItem::{Begin, Current, End};

    #[test]
    fn nested_pair_before_target() {
        let stream = [Begin(1), Begin(2), End(2), Current, End(1)];
        assert_eq!(enclosing_token(&stream), EnclosingToken::Found(1));
    }

    #[test]
    fn single_pair_and_outside() {
        assert_eq!(
            enclosing_token(&[Begin(1), Current, End(1)]),
            EnclosingToken::Found(1)
        );
        assert_eq!(
            enclosing_token(&[Begin(1), End(1), Current]),
            EnclosingToken::Outside
        );
        assert_eq!(enclosing_token(&[Current]), EnclosingToken::Outside);
        assert_eq!(enclosing_token(&[Begin(1), End(1)]), EnclosingToken::Outside);
    }

    #[test]
    fn innermost_wins() {
        let stream = [Begin(3), Begin(1), Begin(0), End(0), Current, End(1), End(3)];
        assert_eq!(enclosing_token(&stream), EnclosingToken::Found(1));
    }

    #[test]
    fn unclosed_begin_is_skipped() {
        let stream = [Begin(1), Begin(7), Current, End(1)];
        assert_eq!(enclosing_token(&stream), EnclosingToken::Found(1));
    }

    #[test]
    fn crossing_spans_are_violations() {
        let stream = [Begin(1), Begin(2), Current, End(1), End(2)];
        assert_eq!(
            enclosing_token(&stream),
            EnclosingToken::NestingViolation { token: 2 }
        );
        let stream = [Begin(1), Current, Begin(2), End(1), End(2)];
        assert_eq!(
            enclosing_token(&stream),
            EnclosingToken::NestingViolation { token: 1 }
        );
    }

    #[test]
    fn stream_from_document() {
        let doc = parse_html(
            "<html><body><!--BEGIN_1--><div><!--BEGIN_0--><b>x</b><!--END_0--><p id=\"t\">y</p></div>\
             <!--END_1--><!-- unrelated --></body></html>",
        )
        .unwrap();
        let target = doc.element_by_id("t").unwrap();
        assert_eq!(
            build_marker_stream(&doc, target),
            vec![Begin(1), Begin(0), End(0), Current, End(1)]
        );
        assert_eq!(find_enclosing_token(&doc, target, &Console::new()), Some(1));

        let bold_text = doc.children(doc.find_element("b").unwrap())[0];
        assert_eq!(find_enclosing_token(&doc, bold_text, &Console::new()), Some(0));
    }

    #[test]
    fn look_alike_comments_are_not_markers() {
        let doc = parse_html(
            "<html><body><!--BEGIN_1--><!--BEGIN_01--><p id=\"t\">y</p><!--END_+1--><!--END_1--></body></html>",
        )
        .unwrap();
        let target = doc.element_by_id("t").unwrap();
        assert_eq!(build_marker_stream(&doc, target), vec![Begin(1), Current, End(1)]);
    }

    #[test]
    fn marker_target_has_no_sentinel() {
        let doc = parse_html("<html><body><!--BEGIN_1--><b>x</b><!--END_1--></body></html>").unwrap();
        let body = doc.find_element("body").unwrap();
        let begin = doc.children(body)[0];
        assert_eq!(find_enclosing_token(&doc, begin, &Console::new()), None);
    }

    #[test]
    fn violation_is_logged() {
        let doc = parse_html(
            "<html><body><!--BEGIN_1--><!--BEGIN_2--><i id=\"t\">x</i><!--END_1--><!--END_2--></body></html>",
        )
        .unwrap();
        let sink = Arc::new(MemorySink::new());
        let console = Console::new().with_sink(sink.clone());
        let target = doc.element_by_id("t").unwrap();
        assert_eq!(find_enclosing_token(&doc, target, &console), None);
        assert_eq!(sink.at_level(LogLevel::Warn).len(), 1);
    }
}
