use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ─── Tokens ─────────────────────────────────────────────────────────────────

/// Integer identifying one marker-wrapped output span.
pub type Token = u64;

/// Which of the two independent highlight categories an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightKind {
    /// Transient, follows the pointer
    Hover,
    /// Persistent, set by a click
    Selected,
}

// ─── Context Values ─────────────────────────────────────────────────────────

/// Scalar context value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    /// String form used for display. Booleans follow the host convention of
    /// `"1"` for true and the empty string for false.
    pub fn display_string(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(true) => "1".to_string(),
            Scalar::Bool(false) => String::new(),
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::String(s) => s.clone(),
        }
    }
}

/// Reference to a runtime object captured in a context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpaqueRef {
    pub type_name: String,
    /// String form, if the object has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// A variable binding visible at evaluation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Scalar(Scalar),
    Collection(Vec<ContextValue>),
    Opaque(OpaqueRef),
}

impl ContextValue {
    pub fn string(s: impl Into<String>) -> Self {
        ContextValue::Scalar(Scalar::String(s.into()))
    }

    pub fn int(n: i64) -> Self {
        ContextValue::Scalar(Scalar::Int(n))
    }

    pub fn bool(b: bool) -> Self {
        ContextValue::Scalar(Scalar::Bool(b))
    }

    pub fn null() -> Self {
        ContextValue::Scalar(Scalar::Null)
    }

    pub fn collection(items: Vec<ContextValue>) -> Self {
        ContextValue::Collection(items)
    }

    /// Object without a string form.
    pub fn object(type_name: impl Into<String>) -> Self {
        ContextValue::Opaque(OpaqueRef {
            type_name: type_name.into(),
            display: None,
        })
    }

    /// Object that can render itself as a string.
    pub fn displayable(type_name: impl Into<String>, display: impl Into<String>) -> Self {
        ContextValue::Opaque(OpaqueRef {
            type_name: type_name.into(),
            display: Some(display.into()),
        })
    }

    /// Total display formatting used for `contextAsString`.
    pub fn display_string(&self) -> String {
        match self {
            ContextValue::Opaque(OpaqueRef {
                display: Some(display),
                ..
            }) => display.clone(),
            ContextValue::Opaque(OpaqueRef { type_name, .. }) => format!("(object){type_name}"),
            ContextValue::Collection(_) => "(array)".to_string(),
            ContextValue::Scalar(scalar) => scalar.display_string(),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::string(s)
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::string(s)
    }
}

impl From<i64> for ContextValue {
    fn from(n: i64) -> Self {
        ContextValue::int(n)
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        ContextValue::bool(b)
    }
}

/// Variable bindings captured when evaluation begins.
pub type Context = BTreeMap<String, ContextValue>;

// ─── Configuration ──────────────────────────────────────────────────────────

/// Reserved configuration key holding node metadata.
pub const META_KEY: &str = "__meta";
/// Reserved configuration key holding the node's object type.
pub const OBJECT_TYPE_KEY: &str = "__objectType";
/// Key inside the metadata holding the implementation class name.
pub const META_CLASS_KEY: &str = "class";

/// Effective configuration resolved for one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration(pub serde_json::Map<String, serde_json::Value>);

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn with_object_type(self, object_type: impl Into<String>) -> Self {
        self.with(OBJECT_TYPE_KEY, serde_json::Value::String(object_type.into()))
    }

    pub fn with_meta(self, meta: serde_json::Map<String, serde_json::Value>) -> Self {
        self.with(META_KEY, serde_json::Value::Object(meta))
    }

    pub fn object_type(&self) -> Option<&str> {
        self.0.get(OBJECT_TYPE_KEY).and_then(|v| v.as_str())
    }

    pub fn meta(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        self.0.get(META_KEY).and_then(|v| v.as_object())
    }

    pub fn implementation_class(&self) -> Option<&str> {
        self.meta()
            .and_then(|meta| meta.get(META_CLASS_KEY))
            .and_then(|v| v.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Configuration {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Configuration(map)
    }
}

// ─── Object Handles ─────────────────────────────────────────────────────────

/// Reference to the runtime object being evaluated.
///
/// Never serialized; the serializer drops it.
#[derive(Clone)]
pub struct ObjectHandle {
    type_name: String,
    object: Arc<dyn Any + Send + Sync>,
}

impl ObjectHandle {
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<String>, object: T) -> Self {
        Self {
            type_name: type_name.into(),
            object: Arc::new(object),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.object.downcast_ref::<T>()
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_display() {
        assert_eq!(Scalar::Null.display_string(), "");
        assert_eq!(Scalar::Bool(true).display_string(), "1");
        assert_eq!(Scalar::Bool(false).display_string(), "");
        assert_eq!(Scalar::Int(-3).display_string(), "-3");
        assert_eq!(Scalar::String("abc".into()).display_string(), "abc");
    }

    #[test]
    fn context_value_display() {
        assert_eq!(ContextValue::object("Neos\\ContentRepository\\Node").display_string(),
            "(object)Neos\\ContentRepository\\Node");
        assert_eq!(ContextValue::displayable("Uri", "https://example.com").display_string(),
            "https://example.com");
        assert_eq!(
            ContextValue::collection(vec![ContextValue::int(1)]).display_string(),
            "(array)"
        );
        assert_eq!(ContextValue::from("site").display_string(), "site");
    }

    #[test]
    fn context_value_untagged_serde() {
        let value = ContextValue::collection(vec![
            ContextValue::int(1),
            ContextValue::string("two"),
            ContextValue::null(),
            ContextValue::object("Node"),
        ]);
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json, json!([1, "two", null, {"typeName": "Node"}]));

        let back: ContextValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn configuration_accessors() {
        let mut meta = serde_json::Map::new();
        meta.insert("class".into(), json!("Neos\\Fusion\\TagImplementation"));
        let config = Configuration::new()
            .with_object_type("Neos.Fusion:Tag")
            .with_meta(meta)
            .with("tagName", json!("div"));

        assert_eq!(config.object_type(), Some("Neos.Fusion:Tag"));
        assert_eq!(
            config.implementation_class(),
            Some("Neos\\Fusion\\TagImplementation")
        );
        assert_eq!(config.get("tagName"), Some(&json!("div")));
    }

    #[test]
    fn object_handle_downcasts() {
        #[derive(Debug, PartialEq)]
        struct Menu {
            items: usize,
        }

        let handle = ObjectHandle::new("Neos.Neos:Menu", Menu { items: 3 });
        assert_eq!(handle.type_name(), "Neos.Neos:Menu");
        assert_eq!(handle.downcast_ref::<Menu>(), Some(&Menu { items: 3 }));
        assert!(handle.downcast_ref::<String>().is_none());
        assert!(format!("{handle:?}").contains("Neos.Neos:Menu"));
    }
}
