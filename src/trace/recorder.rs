//! Stack-based trace builder.
//!
//! Lifecycle per node, in this order: [`begin`](TraceRecorder::begin),
//! [`set_configuration`](TraceRecorder::set_configuration),
//! [`before_evaluate`](TraceRecorder::before_evaluate) (only when setup did
//! not fail), [`end`](TraceRecorder::end). Calls out of order are a caller
//! contract violation; the resulting shape is unspecified but nothing panics
//! on an empty stack.

use tracing::debug;

use super::marker::{self, MarkerPolicy};
use super::node::{NodeId, TraceNode};
use super::Trace;
use crate::hook::RenderOutput;
use crate::types::{Configuration, Context, ObjectHandle, Token};

/// Records one rendering pass. Never reused across passes.
#[derive(Debug)]
pub struct TraceRecorder {
    trace: Trace,
    stack: Vec<NodeId>,
    next_token: Token,
    markers_enabled: bool,
    policy: MarkerPolicy,
}

impl TraceRecorder {
    pub fn new(policy: MarkerPolicy) -> Self {
        Self {
            trace: Trace::new(),
            stack: Vec::new(),
            next_token: 0,
            markers_enabled: true,
            policy,
        }
    }

    /// Number of invocations currently running.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// True once the outermost invocation has ended.
    pub fn is_complete(&self) -> bool {
        self.stack.is_empty() && self.trace.root().is_some()
    }

    pub fn markers_enabled(&self) -> bool {
        self.markers_enabled
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn trace_mut(&mut self) -> &mut Trace {
        &mut self.trace
    }

    pub fn into_trace(self) -> Trace {
        self.trace
    }

    fn top(&self) -> Option<NodeId> {
        self.stack.last().copied()
    }

    /// Start a node and make it the current one.
    pub fn begin(&mut self, path: impl Into<String>) {
        let parent = self.top().or_else(|| self.trace.root());
        let id = self.trace.push(TraceNode::new(path));
        // A second top-level pass would have no parent; hang it under the root.
        if let Some(parent) = parent {
            self.trace.node_mut(parent).children.push(id);
        }
        self.stack.push(id);
    }

    /// Attach the effective configuration to the current node.
    pub fn set_configuration(&mut self, configuration: Configuration) {
        let Some(id) = self.top() else { return };
        let suppress = self.policy.suppresses(&configuration);
        let node = self.trace.node_mut(id);
        if suppress {
            node.marker_suppression_saved = Some(self.markers_enabled);
            self.markers_enabled = false;
            debug!(path = %node.full_path, "marker emission suppressed");
        }
        node.configuration = Some(configuration);
    }

    /// Attach the final context snapshot and evaluated object.
    pub fn before_evaluate(&mut self, context: Context, object: ObjectHandle) {
        let Some(id) = self.top() else { return };
        let node = self.trace.node_mut(id);
        node.context = context;
        node.object = Some(object);
    }

    /// Finish the current node, wrapping `output` in markers when enabled.
    pub fn end(&mut self, output: &mut RenderOutput, should_render: bool) {
        let Some(id) = self.stack.pop() else { return };

        if should_render {
            if let RenderOutput::Text(text) = output {
                let normalized = marker::normalize_output(text);
                let token = self.markers_enabled.then(|| {
                    let token = self.next_token;
                    self.next_token += 1;
                    token
                });
                if let Some(token) = token {
                    let inner = if self.policy.collapse_wrapped_output() {
                        marker::collapse_whitespace(text)
                    } else {
                        std::mem::take(text)
                    };
                    *text = marker::wrap(token, &inner);
                }

                let node = self.trace.node_mut(id);
                node.output = Some(normalized);
                node.token = token;
            }
        }

        if let Some(saved) = self.trace.node(id).marker_suppression_saved {
            self.markers_enabled = saved;
        }
    }
}

impl Default for TraceRecorder {
    fn default() -> Self {
        Self::new(MarkerPolicy::default())
    }
}
