//! Debugger façade: the [`RenderHooks`] implementation a host renderer drives.
//!
//! Owns one [`TraceRecorder`] per rendering pass. When the outermost pass
//! ends, [`post_process`](RenderHooks::post_process) computes the derived
//! paths and dispatches on the request:
//!
//! | Request argument        | Response                                          |
//! |-------------------------|---------------------------------------------------|
//! | expression argument     | JSON result of evaluating it against one node     |
//! | debugger argument       | full debugger page replacing the rendered page    |
//! | (none)                  | rendered page with the debugging snippet appended |

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{
    DebuggerConfig, RequestConfig, BASE_URL_PLACEHOLDER, EVALUATION_TRACE_PLACEHOLDER,
};
use crate::error::{DebuggerError, DebuggerResult};
use crate::hook::{RenderHooks, RenderOutput, RequestParams};
use crate::trace::{compute_paths, ArrayPath, MarkerPolicy, SerializedNode, Trace, TraceRecorder};
use crate::types::{Configuration, Context, ObjectHandle};

// ─── Expression Evaluation ──────────────────────────────────────────────────

/// Variables visible to an ad-hoc expression: the node's captured context
/// plus `this`, the evaluated object.
#[derive(Debug, Clone, Default)]
pub struct EvaluationScope {
    pub variables: Context,
    pub this: Option<ObjectHandle>,
}

/// External expression language used by the observer's "evaluate" box.
///
/// Failures surface as [`DebuggerError::Other`] with the evaluator's context
/// chain intact.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str, scope: &EvaluationScope) -> anyhow::Result<serde_json::Value>;
}

// ─── Response Mode ──────────────────────────────────────────────────────────

/// What `post_process` produces for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseMode {
    /// Rendered page plus the debugging snippet.
    Augment,
    /// Debugger page instead of the rendered page.
    DebuggerPage,
    /// Evaluate `expression` against the node at `array_path`.
    Expression {
        expression: String,
        array_path: ArrayPath,
    },
}

impl ResponseMode {
    /// Expression mode wins over debugger mode. A missing array path means
    /// the root node.
    pub fn from_request(request: &RequestParams, names: &RequestConfig) -> DebuggerResult<Self> {
        if let Some(expression) = request.get(&names.expression_argument) {
            let array_path = match request.get(&names.array_path_argument) {
                Some(path) => ArrayPath::parse(path)?,
                None => ArrayPath::root(),
            };
            return Ok(ResponseMode::Expression {
                expression: expression.to_string(),
                array_path,
            });
        }
        if request.get(&names.debugger_argument).is_some() {
            return Ok(ResponseMode::DebuggerPage);
        }
        Ok(ResponseMode::Augment)
    }
}

// ─── Templates ──────────────────────────────────────────────────────────────

/// Substitute both placeholders. The trace placeholder is mandatory.
pub fn render_template(template: &str, base_url: &str, trace_json: &str) -> DebuggerResult<String> {
    if !template.contains(EVALUATION_TRACE_PLACEHOLDER) {
        return Err(DebuggerError::Template(format!(
            "template has no {EVALUATION_TRACE_PLACEHOLDER} placeholder"
        )));
    }
    Ok(template
        .replace(BASE_URL_PLACEHOLDER, base_url)
        .replace(EVALUATION_TRACE_PLACEHOLDER, trace_json))
}

// ─── Debugger ───────────────────────────────────────────────────────────────

pub struct Debugger {
    config: Arc<DebuggerConfig>,
    recorder: TraceRecorder,
    evaluator: Option<Arc<dyn ExpressionEvaluator>>,
}

impl Debugger {
    pub fn new(config: Arc<DebuggerConfig>) -> Self {
        let recorder = TraceRecorder::new(MarkerPolicy::new(&config.markers));
        Self {
            config,
            recorder,
            evaluator: None,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn config(&self) -> &DebuggerConfig {
        &self.config
    }

    /// Recorder of the pass currently in progress.
    pub fn recorder(&self) -> &TraceRecorder {
        &self.recorder
    }

    /// Swap in a fresh recorder and hand back the finished pass.
    fn take_trace(&mut self) -> Trace {
        let fresh = TraceRecorder::new(MarkerPolicy::new(&self.config.markers));
        std::mem::replace(&mut self.recorder, fresh).into_trace()
    }

    fn serialized_trace(&self, trace: &Trace) -> DebuggerResult<String> {
        let serialized = SerializedNode::from_trace(trace).ok_or_else(|| {
            DebuggerError::Template("nothing was recorded for this pass".into())
        })?;
        serialized.to_double_encoded_json()
    }

    fn evaluate_expression(
        &self,
        trace: &Trace,
        expression: &str,
        array_path: &ArrayPath,
    ) -> DebuggerResult<String> {
        let evaluator = self
            .evaluator
            .as_ref()
            .ok_or_else(|| DebuggerError::Expression("no expression evaluator configured".into()))?;
        let node = trace.node(trace.resolve(array_path)?);
        let scope = EvaluationScope {
            variables: node.context.clone(),
            this: node.object.clone(),
        };
        let result = evaluator.evaluate(expression, &scope)?;
        Ok(serde_json::to_string(&result)?)
    }

    /// Produce the final response for a finished trace.
    pub fn dispatch(
        &self,
        trace: &Trace,
        output: String,
        mode: &ResponseMode,
    ) -> DebuggerResult<String> {
        let snippet = &self.config.snippet;
        match mode {
            ResponseMode::Expression {
                expression,
                array_path,
            } => self.evaluate_expression(trace, expression, array_path),
            ResponseMode::DebuggerPage => render_template(
                &snippet.page_template,
                &snippet.base_url,
                &self.serialized_trace(trace)?,
            ),
            ResponseMode::Augment => {
                let appended = render_template(
                    &snippet.snippet_template,
                    &snippet.base_url,
                    &self.serialized_trace(trace)?,
                )?;
                Ok(output + &appended)
            }
        }
    }
}

impl RenderHooks for Debugger {
    fn begin_cycle(&mut self, path: &str) {
        self.recorder.begin(path);
    }

    fn set_configuration(&mut self, configuration: Configuration) {
        self.recorder.set_configuration(configuration);
    }

    fn before_evaluate(&mut self, context: Context, object: ObjectHandle) {
        self.recorder.before_evaluate(context, object);
    }

    fn end_cycle(&mut self, output: &mut RenderOutput, should_render: bool) {
        self.recorder.end(output, should_render);
    }

    fn post_process(&mut self, output: String, request: &RequestParams) -> DebuggerResult<String> {
        if !self.recorder.is_complete() {
            debug!(depth = self.recorder.depth(), "nested render call, post-processing deferred");
            return Ok(output);
        }

        // The pass is over whatever the request asks for.
        let mut trace = self.take_trace();
        compute_paths(&mut trace);
        let mode = ResponseMode::from_request(request, &self.config.request)?;
        let summary = TraceSummary::of(&trace);
        info!(nodes = summary.nodes, tokens = summary.tokens, mode = ?mode, "dispatching recorded trace");
        self.dispatch(&trace, output, &mode)
    }
}

/// Summary of a finished pass, handy for host-side logging.
#[derive(Debug, Clone, Serialize)]
pub struct TraceSummary {
    pub nodes: usize,
    pub tokens: usize,
}

impl TraceSummary {
    pub fn of(trace: &Trace) -> Self {
        let tokens = trace
            .preorder()
            .into_iter()
            .filter(|&id| trace.node(id).token.is_some())
            .count();
        Self {
            nodes: trace.len(),
            tokens,
        }
    }
}
