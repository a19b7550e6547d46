//! Capability interface the host renderer drives during a rendering pass.
//!
//! The renderer calls the hooks in lifecycle order for every evaluation:
//! `begin_cycle` → `set_configuration` → `before_evaluate` → `end_cycle`,
//! and `post_process` once at the end of its top-level render call.

use std::collections::HashMap;

use crate::error::DebuggerResult;
use crate::types::{Configuration, Context, ObjectHandle};

/// Result of one evaluation as seen by the hooks.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutput {
    /// Rendered text; the only variant that is recorded and marker-wrapped.
    Text(String),
    /// The "no case matched" sentinel.
    NoMatch,
    /// Any non-string result.
    Value(serde_json::Value),
}

impl RenderOutput {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RenderOutput::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            RenderOutput::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<String> for RenderOutput {
    fn from(text: String) -> Self {
        RenderOutput::Text(text)
    }
}

impl From<&str> for RenderOutput {
    fn from(text: &str) -> Self {
        RenderOutput::Text(text.to_string())
    }
}

/// Request arguments visible to `post_process`. How the host reads them is
/// its own business; only the name → value view matters here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    arguments: HashMap<String, String>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    /// Non-empty argument value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.arguments
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

impl From<HashMap<String, String>> for RequestParams {
    fn from(arguments: HashMap<String, String>) -> Self {
        Self { arguments }
    }
}

/// Lifecycle hooks implemented by the debugger (or anything else that wants
/// to observe a rendering pass). Synchronous: the renderer is a single call stack.
pub trait RenderHooks {
    fn begin_cycle(&mut self, path: &str);

    fn set_configuration(&mut self, configuration: Configuration);

    fn before_evaluate(&mut self, context: Context, object: ObjectHandle);

    /// May rewrite `output` in place; the renderer returns the rewritten value.
    fn end_cycle(&mut self, output: &mut RenderOutput, should_render: bool);

    /// Called at the end of every render call; returns the final page output.
    fn post_process(&mut self, output: String, request: &RequestParams) -> DebuggerResult<String> {
        let _ = request;
        Ok(output)
    }
}
