//! # render-debugger
//!
//! Interactive debugger for server-side template rendering. A host renderer
//! drives the [`debugger::Debugger`] through the [`hook::RenderHooks`]
//! lifecycle; every evaluated path is recorded into a trace, its rendered text
//! is wrapped in `<!--BEGIN_n-->` / `<!--END_n-->` marker comments, and the
//! finished trace ships to the browser alongside the page. There, the marked
//! page and an observer view stay in sync over a JSON-RPC channel: hovering a
//! trace node highlights the elements it produced, clicking an element
//! selects the node that produced it.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use render_debugger::config::DebuggerConfig;
//! use render_debugger::debugger::Debugger;
//! use render_debugger::hook::{RenderHooks, RenderOutput, RequestParams};
//! use render_debugger::types::{Configuration, Context, ObjectHandle};
//!
//! let mut debugger = Debugger::new(Arc::new(DebuggerConfig::default()));
//!
//! debugger.begin_cycle("page<Neos.Neos:Page>");
//! debugger.set_configuration(Configuration::new().with_object_type("Neos.Neos:Page"));
//! debugger.before_evaluate(Context::new(), ObjectHandle::new("Neos.Neos:Page", ()));
//! let mut output = RenderOutput::from("<p>Hello</p>");
//! debugger.end_cycle(&mut output, true);
//!
//! let html = output.into_text().unwrap();
//! assert_eq!(html, "<!--BEGIN_0--><p>Hello</p><!--END_0-->");
//!
//! // Outermost pass finished: append the debugging snippet.
//! let page = debugger.post_process(html, &RequestParams::new()).unwrap();
//! assert!(page.contains("fusion_debugger_evaluation_trace"));
//! ```
//!
//! ## Architecture
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`trace`] | Trace arena, recorder, marker policy, path computer, serializer, `ArrayPath` |
//! | [`hook`] | `RenderHooks` lifecycle trait, `RenderOutput`, request parameters |
//! | [`debugger`] | Post-process dispatch: snippet, debugger page or expression evaluation |
//! | [`dom`] | Comment-preserving HTML document, span resolver, enclosing-token resolver |
//! | [`channel`] | Scoped JSON-RPC 2.0 channel between page and observer over a transport |
//! | [`page`] | Instrumented page: toggle, inspect mode with debounce, highlight sync |
//! | [`observer`] | Observer view over the serialized trace |
//! | [`session`] | Session storage for the "debugger active" flag |
//! | [`console`] | Structured per-context console (warnings for missing markers) |
//! | [`config`] | `DebuggerConfig` with defaults for every name and template |
//! | [`error`] | Error types with thiserror |
//! | [`types`] | Tokens, context values, configurations, object handles |

pub mod channel;
pub mod config;
pub mod console;
pub mod debugger;
pub mod dom;
pub mod error;
pub mod hook;
pub mod observer;
pub mod page;
pub mod session;
pub mod trace;
pub mod types;

pub use error::{DebuggerError, DebuggerResult};
