//! Token → element span lookup and the hover/selected highlight lists.

use serde_json::json;

use super::{DomId, Document};
use crate::config::HighlightConfig;
use crate::console::Console;
use crate::trace::marker;
use crate::types::{HighlightKind, Token};

/// Outcome of locating a token's span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanLookup {
    /// Markers share a parent; the element siblings strictly between them.
    Elements(Vec<DomId>),
    /// Markers found under different parents. Nothing can be marked.
    NotSiblings,
    /// One or both markers are absent from the document.
    MissingMarker {
        begin: Option<DomId>,
        end: Option<DomId>,
    },
}

pub struct SpanResolver;

impl SpanResolver {
    /// Comments whose text is exactly `BEGIN_<token>` / `END_<token>`.
    pub fn find_markers(document: &Document, token: Token) -> (Option<DomId>, Option<DomId>) {
        let begin_text = marker::begin_marker(token);
        let end_text = marker::end_marker(token);
        let mut begin = None;
        let mut end = None;
        for id in document.preorder() {
            match document.comment_data(id) {
                Some(data) if begin.is_none() && data == begin_text => begin = Some(id),
                Some(data) if end.is_none() && data == end_text => end = Some(id),
                _ => {}
            }
        }
        (begin, end)
    }

    pub fn resolve(document: &Document, token: Token) -> SpanLookup {
        let (begin, end) = Self::find_markers(document, token);
        let (Some(start), Some(stop)) = (begin, end) else {
            return SpanLookup::MissingMarker { begin, end };
        };
        if document.parent(start) != document.parent(stop) {
            return SpanLookup::NotSiblings;
        }

        let mut elements = Vec::new();
        let mut current = document.next_sibling(start);
        while let Some(id) = current {
            if id == stop {
                break;
            }
            if document.is_element(id) {
                elements.push(id);
            }
            current = document.next_sibling(id);
        }
        SpanLookup::Elements(elements)
    }
}

/// Elements currently carrying the hover or the selected class. Each list is
/// owned by one context and cleared before every new request of its kind.
#[derive(Debug, Clone)]
pub struct HighlightState {
    classes: HighlightConfig,
    hovered: Vec<DomId>,
    selected: Vec<DomId>,
}

impl HighlightState {
    pub fn new(classes: HighlightConfig) -> Self {
        Self {
            classes,
            hovered: Vec::new(),
            selected: Vec::new(),
        }
    }

    pub fn class(&self, kind: HighlightKind) -> &str {
        match kind {
            HighlightKind::Hover => &self.classes.hover_class,
            HighlightKind::Selected => &self.classes.selected_class,
        }
    }

    pub fn marked(&self, kind: HighlightKind) -> &[DomId] {
        match kind {
            HighlightKind::Hover => &self.hovered,
            HighlightKind::Selected => &self.selected,
        }
    }

    /// Clear `kind`, then mark every element of `token`'s span.
    /// Returns the number of elements marked.
    pub fn apply(
        &mut self,
        document: &mut Document,
        token: Token,
        kind: HighlightKind,
        console: &Console,
    ) -> usize {
        self.clear(document, kind);

        let elements = match SpanResolver::resolve(document, token) {
            SpanLookup::Elements(elements) => elements,
            SpanLookup::NotSiblings => return 0,
            SpanLookup::MissingMarker { begin, end } => {
                console.warn(
                    "span",
                    "Start and end node could not be found",
                    json!({ "token": token, "begin": begin, "end": end }),
                );
                return 0;
            }
        };

        let class = self.class(kind).to_string();
        for &id in &elements {
            document.add_class(id, &class);
        }
        let count = elements.len();
        match kind {
            HighlightKind::Hover => self.hovered = elements,
            HighlightKind::Selected => self.selected = elements,
        }
        count
    }

    pub fn clear(&mut self, document: &mut Document, kind: HighlightKind) {
        let class = self.class(kind).to_string();
        let marked = match kind {
            HighlightKind::Hover => std::mem::take(&mut self.hovered),
            HighlightKind::Selected => std::mem::take(&mut self.selected),
        };
        for id in marked {
            document.remove_class(id, &class);
        }
    }

    pub fn clear_all(&mut self, document: &mut Document) {
        self.clear(document, HighlightKind::Hover);
        self.clear(document, HighlightKind::Selected);
    }
}

impl Default for HighlightState {
    fn default() -> Self {
        Self::new(HighlightConfig::default())
    }
}
