//! The observer view: an interactive copy of the serialized trace.
//!
//! Holds no channel itself. Operations that talk to the page return the
//! [`ChannelRequest`] to send; requests from the page go through
//! [`dispatch`](ObserverView::dispatch).

use serde_json::Value;
use tracing::debug;

use crate::channel::{methods, Channel, ChannelRequest};
use crate::config::RequestConfig;
use crate::error::{DebuggerError, DebuggerResult};
use crate::hook::RequestParams;
use crate::trace::{ArrayPath, SerializedNode};
use crate::types::Token;

/// Field compared when hovering the details pane's context section.
pub const CONTEXT_AS_STRING: &str = "contextAsString";

#[derive(Debug, Clone, Default)]
pub struct ObserverView {
    tree: Option<SerializedNode>,
    hovered: Option<ArrayPath>,
    selected: Option<ArrayPath>,
    /// Node shown in the details pane.
    details: Option<ArrayPath>,
    /// Nodes highlighted for sharing a value with the details node.
    same_value: Vec<ArrayPath>,
    inspecting: bool,
}

impl ObserverView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the methods the page calls on the observer.
    pub fn bind(channel: &Channel) {
        for method in methods::OBSERVER {
            channel.bind(method);
        }
    }

    /// Replace the tree with a freshly received trace (single-encoded JSON).
    /// All highlight state is reset.
    pub fn update_trace(&mut self, json: &str) -> DebuggerResult<()> {
        let tree = SerializedNode::from_json(json)?;
        debug!(root = %tree.full_path, "evaluation trace updated");
        *self = Self {
            tree: Some(tree),
            inspecting: self.inspecting,
            ..Self::default()
        };
        Ok(())
    }

    /// Load the trace literal embedded in the debugger page (double-encoded).
    pub fn load_embedded(&mut self, literal: &str) -> DebuggerResult<()> {
        let json: String = serde_json::from_str(literal)?;
        self.update_trace(&json)
    }

    pub fn tree(&self) -> Option<&SerializedNode> {
        self.tree.as_ref()
    }

    pub fn hovered(&self) -> Option<&ArrayPath> {
        self.hovered.as_ref()
    }

    pub fn selected(&self) -> Option<&ArrayPath> {
        self.selected.as_ref()
    }

    pub fn details_path(&self) -> Option<&ArrayPath> {
        self.details.as_ref()
    }

    pub fn details(&self) -> Option<&SerializedNode> {
        let path = self.details.as_ref()?;
        self.tree.as_ref()?.resolve(path).ok()
    }

    pub fn same_value(&self) -> &[ArrayPath] {
        &self.same_value
    }

    pub fn is_inspecting(&self) -> bool {
        self.inspecting
    }

    fn loaded(&self) -> DebuggerResult<&SerializedNode> {
        self.tree.as_ref().ok_or_else(|| DebuggerError::NodeNotFound {
            path: String::new(),
        })
    }

    fn path_of_token(&self, token: Token) -> DebuggerResult<ArrayPath> {
        let node = self
            .loaded()?
            .find_by_token(token)
            .ok_or_else(|| DebuggerError::NodeNotFound {
                path: format!("token {token}"),
            })?;
        ArrayPath::parse(&node.array_path)
    }

    /// The page hovered `token`'s span: mirror it in the tree.
    pub fn highlight_token(&mut self, token: Token) -> DebuggerResult<ArrayPath> {
        let path = self.path_of_token(token)?;
        self.show(path.clone(), false);
        Ok(path)
    }

    /// The page selected `token`'s span: mirror it in the tree.
    pub fn select_token(&mut self, token: Token) -> DebuggerResult<ArrayPath> {
        let path = self.path_of_token(token)?;
        self.show(path.clone(), true);
        Ok(path)
    }

    fn show(&mut self, path: ArrayPath, select: bool) {
        if select {
            self.selected = Some(path.clone());
        } else {
            self.hovered = Some(path.clone());
        }
        self.details = Some(path);
    }

    fn show_node(&mut self, path: &ArrayPath, select: bool) -> DebuggerResult<Option<Token>> {
        let token = self.loaded()?.resolve(path)?.token;
        self.show(path.clone(), select);
        Ok(token)
    }

    /// Pointer entered a tree node. Returns the call for the page, if the
    /// node produced marked output.
    pub fn hover_node(&mut self, path: &ArrayPath) -> DebuggerResult<Option<ChannelRequest>> {
        Ok(self
            .show_node(path, false)?
            .map(ChannelRequest::HighlightElement))
    }

    /// Tree node clicked.
    pub fn select_node(&mut self, path: &ArrayPath) -> DebuggerResult<Option<ChannelRequest>> {
        Ok(self
            .show_node(path, true)?
            .map(ChannelRequest::SelectElement))
    }

    /// Pointer left a tree node: drop hover highlights, show the selection
    /// again and ask the page to clear its hover highlight.
    pub fn leave_node(&mut self) -> ChannelRequest {
        self.hovered = None;
        self.same_value.clear();
        if let Some(selected) = self.selected.clone() {
            self.details = Some(selected);
        }
        ChannelRequest::UnhighlightElements
    }

    /// Array paths of every node whose `key` field equals the details node's.
    /// Nodes without the field, or with a null/false/empty-string value, never match.
    pub fn nodes_with_same_value(&self, key: &str) -> DebuggerResult<Vec<ArrayPath>> {
        let tree = self.loaded()?;
        let Some(current) = self.details() else {
            return Ok(Vec::new());
        };
        let wanted = field(current, key)?;
        if !is_truthy(&wanted) {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for node in tree.walk() {
            if field(node, key)? == wanted {
                paths.push(ArrayPath::parse(&node.array_path)?);
            }
        }
        Ok(paths)
    }

    /// Highlight every node sharing the details node's context.
    pub fn highlight_same_context(&mut self) -> DebuggerResult<&[ArrayPath]> {
        self.same_value = self.nodes_with_same_value(CONTEXT_AS_STRING)?;
        Ok(&self.same_value)
    }

    pub fn clear_same_context(&mut self) {
        self.same_value.clear();
    }

    /// The inspect button. Returns the call for the page.
    pub fn toggle_inspect(&mut self) -> ChannelRequest {
        self.inspecting = !self.inspecting;
        if self.inspecting {
            ChannelRequest::ActivateInspectMode
        } else {
            ChannelRequest::DeactivateInspectMode
        }
    }

    /// Request arguments that evaluate `expression` against the details node.
    pub fn expression_request(&self, expression: &str, request: &RequestConfig) -> RequestParams {
        let path = self.details.clone().unwrap_or_default();
        RequestParams::new()
            .with(&request.expression_argument, expression)
            .with(&request.array_path_argument, path.to_string())
    }

    /// Apply a request received from the page.
    pub fn dispatch(&mut self, request: &ChannelRequest) -> DebuggerResult<()> {
        match request {
            ChannelRequest::UpdateEvaluationTrace(json) => self.update_trace(json),
            ChannelRequest::HighlightElement(token) => self.highlight_token(*token).map(drop),
            ChannelRequest::SelectElement(token) => self.select_token(*token).map(drop),
            other => Err(DebuggerError::MethodNotFound(other.method().to_string())),
        }
    }
}

/// One serialized field of `node`, by its wire name. Subtrees are never
/// compared, so `children` and unknown keys read as null.
fn field(node: &SerializedNode, key: &str) -> DebuggerResult<Value> {
    let value = match key {
        CONTEXT_AS_STRING => serde_json::to_value(&node.context_as_string)?,
        "fullPath" => Value::from(node.full_path.as_str()),
        "output" => serde_json::to_value(&node.output)?,
        "token" => serde_json::to_value(node.token)?,
        "context" => serde_json::to_value(&node.context)?,
        "configuration" => serde_json::to_value(&node.configuration)?,
        "markerSuppressionSaved" => serde_json::to_value(node.marker_suppression_saved)?,
        "condensedPath" => Value::from(node.condensed_path.as_str()),
        "relativePath" => Value::from(node.relative_path.as_str()),
        "arrayPath" => Value::from(node.array_path.as_str()),
        "objectType" => Value::from(node.object_type.as_str()),
        "implementationClassName" => Value::from(node.implementation_class_name.as_str()),
        "metaConfiguration" => Value::Object(node.meta_configuration.clone()),
        _ => Value::Null,
    };
    Ok(value)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64() != Some(0.0),
        _ => true,
    }
}
