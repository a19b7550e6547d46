use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Configuration, Context, ObjectHandle, Token};

/// Index of a node inside a [`Trace`](super::Trace) arena.
pub type NodeId = usize;

/// One recorded rendering invocation.
#[derive(Debug, Clone)]
pub struct TraceNode {
    /// Fully qualified path as known to the renderer, type annotations included.
    pub full_path: String,
    pub configuration: Option<Configuration>,
    /// Snapshot taken when evaluation began.
    pub context: Context,
    /// Whitespace-collapsed rendered text with marker comments stripped.
    pub output: Option<String>,
    /// Present only if the output was marker-wrapped.
    pub token: Option<Token>,
    pub object: Option<ObjectHandle>,
    pub children: Vec<NodeId>,
    /// Marker flag saved by a node that suppressed marker emission.
    pub marker_suppression_saved: Option<bool>,
    /// Filled in by the path computer after recording finished.
    pub computed: Option<ComputedProperties>,
}

impl TraceNode {
    pub fn new(full_path: impl Into<String>) -> Self {
        Self {
            full_path: full_path.into(),
            configuration: None,
            context: Context::new(),
            output: None,
            token: None,
            object: None,
            children: Vec::new(),
            marker_suppression_saved: None,
            computed: None,
        }
    }
}

/// Properties derived from the finished tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedProperties {
    pub condensed_path: String,
    pub relative_path: String,
    pub array_path: String,
    pub object_type: String,
    pub implementation_class_name: String,
    pub context_as_string: BTreeMap<String, String>,
    pub meta_configuration: serde_json::Map<String, serde_json::Value>,
}
