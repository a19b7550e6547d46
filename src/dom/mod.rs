//! Client-side document model and the marker resolvers that run on it.
//!
//! A rendered page is parsed (see [`parse`]) into an arena [`Document`] that
//! keeps comment nodes, so the `BEGIN_n` / `END_n` markers stay addressable.
//! [`span`] finds the sibling elements a token spans and manages highlight
//! classes; [`enclosing`] answers "which token produced this node".

pub mod enclosing;
pub mod parse;
pub mod span;

pub use enclosing::{
    build_marker_stream, enclosing_token, find_enclosing_token, EnclosingToken, MarkerStreamItem,
};
pub use parse::parse_html;
pub use span::{HighlightState, SpanLookup, SpanResolver};

/// Index of a node in a [`Document`].
pub type DomId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element {
        tag_name: String,
        attributes: Vec<(String, String)>,
    },
    Text {
        content: String,
    },
    Comment {
        data: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomNode {
    pub kind: NodeKind,
    pub parent: Option<DomId>,
    pub children: Vec<DomId>,
}

/// Arena-backed document tree. Node 0 is always the document node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<DomNode>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![DomNode {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> DomId {
        0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }

    pub fn node(&self, id: DomId) -> &DomNode {
        &self.nodes[id]
    }

    pub fn kind(&self, id: DomId) -> &NodeKind {
        &self.nodes[id].kind
    }

    pub fn parent(&self, id: DomId) -> Option<DomId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: DomId) -> &[DomId] {
        &self.nodes[id].children
    }

    /// Append a new last child of `parent`.
    pub fn append(&mut self, parent: DomId, kind: NodeKind) -> DomId {
        let id = self.nodes.len();
        self.nodes.push(DomNode {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn append_element(&mut self, parent: DomId, tag_name: &str) -> DomId {
        self.append_element_with(parent, tag_name, Vec::new())
    }

    pub fn append_element_with(
        &mut self,
        parent: DomId,
        tag_name: &str,
        attributes: Vec<(String, String)>,
    ) -> DomId {
        self.append(
            parent,
            NodeKind::Element {
                tag_name: tag_name.to_string(),
                attributes,
            },
        )
    }

    pub fn append_text(&mut self, parent: DomId, content: &str) -> DomId {
        self.append(
            parent,
            NodeKind::Text {
                content: content.to_string(),
            },
        )
    }

    pub fn append_comment(&mut self, parent: DomId, data: &str) -> DomId {
        self.append(
            parent,
            NodeKind::Comment {
                data: data.to_string(),
            },
        )
    }

    /// Next node under the same parent.
    pub fn next_sibling(&self, id: DomId) -> Option<DomId> {
        let siblings = self.children(self.parent(id)?);
        let position = siblings.iter().position(|&s| s == id)?;
        siblings.get(position + 1).copied()
    }

    /// All nodes in document order, the document node first.
    pub fn preorder(&self) -> Vec<DomId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        order
    }

    pub fn is_element(&self, id: DomId) -> bool {
        matches!(self.kind(id), NodeKind::Element { .. })
    }

    pub fn comment_data(&self, id: DomId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Comment { data } => Some(data),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: DomId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { tag_name, .. } => Some(tag_name),
            _ => None,
        }
    }

    pub fn attribute(&self, id: DomId, name: &str) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    /// Set (or replace) an attribute. Non-elements are left alone.
    pub fn set_attribute(&mut self, id: DomId, name: &str, value: String) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id].kind {
            match attributes.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => *existing = value,
                None => attributes.push((name.to_string(), value)),
            }
        }
    }

    pub fn has_class(&self, id: DomId, class: &str) -> bool {
        self.attribute(id, "class")
            .is_some_and(|value| value.split_ascii_whitespace().any(|c| c == class))
    }

    /// Append `" " + class` to the class attribute.
    pub fn add_class(&mut self, id: DomId, class: &str) {
        let current = self.attribute(id, "class").unwrap_or_default();
        let updated = format!("{current} {class}");
        self.set_attribute(id, "class", updated);
    }

    /// Remove the first `" " + class` occurrence added by [`add_class`](Self::add_class).
    pub fn remove_class(&mut self, id: DomId, class: &str) {
        let Some(current) = self.attribute(id, "class") else {
            return;
        };
        let updated = current.replacen(&format!(" {class}"), "", 1);
        self.set_attribute(id, "class", updated);
    }

    /// Concatenated text of `id` and its descendants.
    pub fn text_content(&self, id: DomId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let NodeKind::Text { content } = self.kind(current) {
                out.push_str(content);
            }
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// First element with the given tag name, in document order.
    pub fn find_element(&self, tag_name: &str) -> Option<DomId> {
        self.preorder()
            .into_iter()
            .find(|&id| self.tag_name(id) == Some(tag_name))
    }

    /// First element whose `id` attribute equals `element_id`.
    pub fn element_by_id(&self, element_id: &str) -> Option<DomId> {
        self.preorder()
            .into_iter()
            .find(|&id| self.attribute(id, "id") == Some(element_id))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Document, DomId, DomId, DomId) {
        let mut doc = Document::new();
        let body = doc.append_element(doc.root(), "body");
        doc.append_comment(body, "BEGIN_0");
        let p = doc.append_element_with(body, "p", vec![("class".into(), "intro".into())]);
        doc.append_text(p, "hello");
        let end = doc.append_comment(body, "END_0");
        (doc, body, p, end)
    }

    #[test]
    fn structure_and_siblings() {
        let (doc, body, p, end) = sample();
        assert_eq!(doc.parent(p), Some(body));
        assert_eq!(doc.next_sibling(p), Some(end));
        assert_eq!(doc.next_sibling(end), None);
        assert_eq!(doc.next_sibling(doc.root()), None);
        assert_eq!(doc.children(body).len(), 3);
        assert_eq!(doc.text_content(body), "hello");
    }

    #[test]
    fn preorder_is_document_order() {
        let (doc, _, _, _) = sample();
        let kinds: Vec<String> = doc
            .preorder()
            .into_iter()
            .map(|id| match doc.kind(id) {
                NodeKind::Document => "#document".to_string(),
                NodeKind::Element { tag_name, .. } => tag_name.clone(),
                NodeKind::Text { content } => format!("#text:{content}"),
                NodeKind::Comment { data } => format!("#comment:{data}"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["#document", "body", "#comment:BEGIN_0", "p", "#text:hello", "#comment:END_0"]
        );
    }

    #[test]
    fn class_add_and_remove() {
        let (mut doc, _, p, _) = sample();
        doc.add_class(p, "hover");
        assert_eq!(doc.attribute(p, "class"), Some("intro hover"));
        assert!(doc.has_class(p, "hover"));
        doc.remove_class(p, "hover");
        assert_eq!(doc.attribute(p, "class"), Some("intro"));
        assert!(!doc.has_class(p, "hover"));
    }

    #[test]
    fn class_on_element_without_class() {
        let mut doc = Document::new();
        let div = doc.append_element(doc.root(), "div");
        doc.add_class(div, "x");
        assert_eq!(doc.attribute(div, "class"), Some(" x"));
        doc.remove_class(div, "x");
        assert_eq!(doc.attribute(div, "class"), Some(""));
    }

    #[test]
    fn lookups() {
        let mut doc = Document::new();
        let body = doc.append_element(doc.root(), "body");
        let button = doc.append_element_with(body, "button", vec![("id".into(), "toggle".into())]);
        assert_eq!(doc.find_element("button"), Some(button));
        assert_eq!(doc.element_by_id("toggle"), Some(button));
        assert_eq!(doc.comment_data(button), None);
        assert!(doc.is_element(button));
    }
}
