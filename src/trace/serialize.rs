//! Transfer-safe projection of a trace.
//!
//! Drops object handles, `configuration.__meta`, `configuration.__objectType`
//! and `metaConfiguration.class` at every depth. Built from a shared borrow,
//! so the canonical trace is never touched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::array_path::ArrayPath;
use super::node::NodeId;
use super::Trace;
use crate::error::{DebuggerError, DebuggerResult};
use crate::types::{
    Configuration, Context, Token, META_CLASS_KEY, META_KEY, OBJECT_TYPE_KEY,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedNode {
    pub full_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Configuration>,
    pub output: Option<String>,
    #[serde(default)]
    pub context: Context,
    pub token: Option<Token>,
    #[serde(default)]
    pub children: Vec<SerializedNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker_suppression_saved: Option<bool>,
    #[serde(default)]
    pub condensed_path: String,
    #[serde(default)]
    pub relative_path: String,
    #[serde(default)]
    pub array_path: String,
    #[serde(default)]
    pub object_type: String,
    #[serde(default)]
    pub implementation_class_name: String,
    #[serde(default)]
    pub context_as_string: BTreeMap<String, String>,
    #[serde(default)]
    pub meta_configuration: serde_json::Map<String, serde_json::Value>,
}

impl SerializedNode {
    /// Project the whole trace. `None` for an empty trace.
    pub fn from_trace(trace: &Trace) -> Option<Self> {
        trace.root().map(|root| Self::project(trace, root))
    }

    fn project(trace: &Trace, id: NodeId) -> Self {
        let node = trace.node(id);
        let computed = node.computed.clone().unwrap_or_default();

        let configuration = node.configuration.as_ref().map(|config| {
            let mut config = config.clone();
            config.0.remove(META_KEY);
            config.0.remove(OBJECT_TYPE_KEY);
            config
        });
        let mut meta_configuration = computed.meta_configuration;
        meta_configuration.remove(META_CLASS_KEY);

        Self {
            full_path: node.full_path.clone(),
            configuration,
            output: node.output.clone(),
            context: node.context.clone(),
            token: node.token,
            children: node
                .children
                .iter()
                .map(|&child| Self::project(trace, child))
                .collect(),
            marker_suppression_saved: node.marker_suppression_saved,
            condensed_path: computed.condensed_path,
            relative_path: computed.relative_path,
            array_path: computed.array_path,
            object_type: computed.object_type,
            implementation_class_name: computed.implementation_class_name,
            context_as_string: computed.context_as_string,
            meta_configuration,
        }
    }

    /// JSON encoding of the tree.
    pub fn to_json(&self) -> DebuggerResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// JSON string literal holding the JSON encoding, for embedding in a
    /// generated page.
    pub fn to_double_encoded_json(&self) -> DebuggerResult<String> {
        Ok(serde_json::to_string(&self.to_json()?)?)
    }

    /// Decode the single-encoded form (the payload of `updateEvaluationTrace`).
    pub fn from_json(json: &str) -> DebuggerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Nodes in pre-order.
    pub fn walk(&self) -> Vec<&SerializedNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    pub fn resolve(&self, path: &ArrayPath) -> DebuggerResult<&SerializedNode> {
        path.indices().iter().try_fold(self, |node, &index| {
            node.children.get(index).ok_or_else(|| DebuggerError::NodeNotFound {
                path: path.to_string(),
            })
        })
    }

    pub fn find_by_token(&self, token: Token) -> Option<&SerializedNode> {
        self.walk().into_iter().find(|node| node.token == Some(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::RenderOutput;
    use crate::trace::{compute_paths, TraceRecorder};
    use crate::types::{ContextValue, ObjectHandle};
    use serde_json::json;

    fn config_with_meta(object_type: &str) -> Configuration {
        let mut meta = serde_json::Map::new();
        meta.insert("class".into(), json!("Impl"));
        meta.insert("position".into(), json!("end"));
        Configuration::new()
            .with_object_type(object_type)
            .with_meta(meta)
            .with("value", json!("v"))
    }

    fn trace() -> Trace {
        let mut recorder = TraceRecorder::default();
        recorder.begin("page<Neos.Neos:Page>");
        recorder.set_configuration(config_with_meta("Neos.Neos:Page"));
        let mut context = Context::new();
        context.insert("site".into(), ContextValue::object("Site"));
        recorder.before_evaluate(context, ObjectHandle::new("Page", ()));
        recorder.begin("page<Neos.Neos:Page>/body");
        recorder.set_configuration(config_with_meta("Neos.Fusion:Value"));
        recorder.begin("page<Neos.Neos:Page>/body/deep");
        recorder.set_configuration(config_with_meta("Neos.Fusion:Value"));
        recorder.end(&mut RenderOutput::Text("d".into()), true);
        recorder.end(&mut RenderOutput::Text("b".into()), true);
        recorder.end(&mut RenderOutput::Text("p".into()), true);
        let mut trace = recorder.into_trace();
        compute_paths(&mut trace);
        trace
    }

    #[test]
    fn reserved_keys_removed_at_every_depth() {
        let serialized = SerializedNode::from_trace(&trace()).unwrap();
        for node in serialized.walk() {
            let config = node.configuration.as_ref().unwrap();
            assert!(config.get("__meta").is_none());
            assert!(config.get("__objectType").is_none());
            assert_eq!(config.get("value"), Some(&json!("v")));
            assert!(node.meta_configuration.get("class").is_none());
            assert_eq!(node.meta_configuration.get("position"), Some(&json!("end")));
            assert_eq!(node.implementation_class_name, "Impl");
        }
        assert_eq!(serialized.walk().len(), 3);
    }

    #[test]
    fn canonical_trace_untouched() {
        let trace = trace();
        let _ = SerializedNode::from_trace(&trace).unwrap();
        assert!(trace.node(0).object.is_some());
        for id in trace.preorder() {
            let node = trace.node(id);
            let config = node.configuration.as_ref().unwrap();
            assert!(config.get("__meta").is_some());
            assert!(config.get("__objectType").is_some());
            let computed = node.computed.as_ref().unwrap();
            assert_eq!(computed.meta_configuration.get("class"), Some(&json!("Impl")));
        }
    }

    #[test]
    fn wire_shape_keys() {
        let serialized = SerializedNode::from_trace(&trace()).unwrap();
        let value = serde_json::to_value(&serialized).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "fullPath",
            "output",
            "context",
            "token",
            "children",
            "condensedPath",
            "relativePath",
            "arrayPath",
            "objectType",
            "implementationClassName",
            "contextAsString",
            "metaConfiguration",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
        assert!(!object.contains_key("object"));
        assert_eq!(value["children"][0]["arrayPath"], json!(".children[0]"));
        assert_eq!(value["contextAsString"]["site"], json!("(object)Site"));
    }

    #[test]
    fn double_encoding_decodes_twice() {
        let serialized = SerializedNode::from_trace(&trace()).unwrap();
        let double = serialized.to_double_encoded_json().unwrap();
        assert!(double.starts_with('"'));
        let inner: String = serde_json::from_str(&double).unwrap();
        let back = SerializedNode::from_json(&inner).unwrap();
        assert_eq!(back, serialized);
    }

    #[test]
    fn lookup_by_path_and_token() {
        let serialized = SerializedNode::from_trace(&trace()).unwrap();
        let deep = serialized
            .resolve(&ArrayPath::parse(".children[0].children[0]").unwrap())
            .unwrap();
        assert_eq!(deep.relative_path, "deep");
        assert_eq!(deep.token, Some(0));
        assert_eq!(serialized.find_by_token(2).unwrap().full_path, "page<Neos.Neos:Page>");
        assert!(serialized
            .resolve(&ArrayPath::parse(".children[3]").unwrap())
            .is_err());
    }

    #[test]
    fn empty_trace_serializes_to_none() {
        assert!(SerializedNode::from_trace(&Trace::new()).is_none());
    }
}
