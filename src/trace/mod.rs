//! Execution trace of one rendering pass.
//!
//! The host renderer drives a [`TraceRecorder`] through begin/configure/
//! evaluate/end calls. The recorder builds an arena-backed [`Trace`] whose
//! shape mirrors the nesting of those calls and wraps rendered text in marker
//! comments. After the pass, [`compute_paths`] derives navigation paths and
//! [`SerializedNode::from_trace`] produces the transfer-safe projection.

pub mod array_path;
pub mod marker;
pub mod node;
pub mod paths;
pub mod recorder;
pub mod serialize;

pub use array_path::ArrayPath;
pub use marker::{Marker, MarkerPolicy};
pub use node::{ComputedProperties, NodeId, TraceNode};
pub use paths::compute_paths;
pub use recorder::TraceRecorder;
pub use serialize::SerializedNode;

use crate::error::{DebuggerError, DebuggerResult};
use crate::types::Token;

/// Arena of trace nodes addressed by index.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    nodes: Vec<TraceNode>,
    root: Option<NodeId>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, node: TraceNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &TraceNode {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut TraceNode {
        &mut self.nodes[id]
    }

    pub fn get(&self, id: NodeId) -> Option<&TraceNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in pre-order (document order of the rendered output).
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().rev());
        }
        order
    }

    /// Node that was assigned `token`.
    pub fn find_by_token(&self, token: Token) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.token == Some(token))
    }

    /// Resolve an array path (e.g. `.children[2].children[0]`) from the root.
    pub fn resolve(&self, path: &ArrayPath) -> DebuggerResult<NodeId> {
        let mut current = self.root.ok_or_else(|| DebuggerError::NodeNotFound {
            path: path.to_string(),
        })?;
        for &index in path.indices() {
            current = *self.nodes[current]
                .children
                .get(index)
                .ok_or_else(|| DebuggerError::NodeNotFound {
                    path: path.to_string(),
                })?;
        }
        Ok(current)
    }
}
