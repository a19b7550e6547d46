//! HTML → [`Document`] conversion via html5ever.
//!
//! Comments are kept: they carry the trace markers. Doctypes and processing
//! instructions are dropped.

use std::io;

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use tracing::debug;

use super::{DomId, Document, NodeKind};
use crate::error::{DebuggerError, DebuggerResult};

pub fn parse_html(html: &str) -> DebuggerResult<Document> {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };

    let mut reader = io::Cursor::new(html.as_bytes());
    let dom = parse_document(RcDom::default(), opts)
        .from_utf8()
        .read_from(&mut reader)
        .map_err(|e| DebuggerError::HtmlParse(format!("Failed to parse HTML: {e}")))?;

    let mut document = Document::new();
    let root = document.root();
    append_children(&mut document, root, &dom.document);
    debug!(nodes = document.len(), "parsed rendered document");
    Ok(document)
}

/// Depth-first copy of `handle`'s children below `parent`, without recursion.
fn append_children(document: &mut Document, parent: DomId, handle: &Handle) {
    let mut work: Vec<(Handle, DomId)> = child_handles(handle)
        .into_iter()
        .rev()
        .map(|child| (child, parent))
        .collect();

    while let Some((handle, parent)) = work.pop() {
        let Some(kind) = convert(&handle) else {
            continue;
        };
        let id = document.append(parent, kind);
        for child in child_handles(&handle).into_iter().rev() {
            work.push((child, id));
        }
    }
}

fn child_handles(handle: &Handle) -> Vec<Handle> {
    if let NodeData::Element {
        name,
        template_contents,
        ..
    } = &handle.data
    {
        if name.local.as_ref().eq_ignore_ascii_case("template") {
            return match &*template_contents.borrow() {
                Some(content) => content.children.borrow().clone(),
                None => Vec::new(),
            };
        }
    }
    handle.children.borrow().clone()
}

fn convert(handle: &Handle) -> Option<NodeKind> {
    match &handle.data {
        NodeData::Element { name, attrs, .. } => Some(NodeKind::Element {
            tag_name: name.local.to_string(),
            attributes: attrs
                .borrow()
                .iter()
                .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                .collect(),
        }),
        NodeData::Text { contents } => Some(NodeKind::Text {
            content: contents.borrow().to_string(),
        }),
        NodeData::Comment { contents } => Some(NodeKind::Comment {
            data: contents.to_string(),
        }),
        _ => None,
    }
}
