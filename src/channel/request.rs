//! Typed view of the channel's RPC surface.

use serde_json::Value;

use crate::error::{DebuggerError, DebuggerResult};
use crate::types::Token;

pub mod methods {
    pub const UPDATE_EVALUATION_TRACE: &str = "updateEvaluationTrace";
    pub const HIGHLIGHT_ELEMENT: &str = "highlightElement";
    pub const SELECT_ELEMENT: &str = "selectElement";
    pub const UNHIGHLIGHT_ELEMENTS: &str = "unhighlightElements";
    pub const ACTIVATE_INSPECT_MODE: &str = "activateInspectMode";
    pub const DEACTIVATE_INSPECT_MODE: &str = "deactivateInspectMode";

    /// Methods the instrumented page answers.
    pub const PAGE: [&str; 5] = [
        HIGHLIGHT_ELEMENT,
        SELECT_ELEMENT,
        UNHIGHLIGHT_ELEMENTS,
        ACTIVATE_INSPECT_MODE,
        DEACTIVATE_INSPECT_MODE,
    ];

    /// Methods the observer view answers.
    pub const OBSERVER: [&str; 3] = [UPDATE_EVALUATION_TRACE, HIGHLIGHT_ELEMENT, SELECT_ELEMENT];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRequest {
    /// Replace the observer's tree. Carries the trace's JSON text; on the
    /// wire that text is itself a JSON string, i.e. the trace is double-encoded.
    UpdateEvaluationTrace(String),
    HighlightElement(Token),
    SelectElement(Token),
    UnhighlightElements,
    ActivateInspectMode,
    DeactivateInspectMode,
}

impl ChannelRequest {
    pub fn method(&self) -> &'static str {
        match self {
            ChannelRequest::UpdateEvaluationTrace(_) => methods::UPDATE_EVALUATION_TRACE,
            ChannelRequest::HighlightElement(_) => methods::HIGHLIGHT_ELEMENT,
            ChannelRequest::SelectElement(_) => methods::SELECT_ELEMENT,
            ChannelRequest::UnhighlightElements => methods::UNHIGHLIGHT_ELEMENTS,
            ChannelRequest::ActivateInspectMode => methods::ACTIVATE_INSPECT_MODE,
            ChannelRequest::DeactivateInspectMode => methods::DEACTIVATE_INSPECT_MODE,
        }
    }

    pub fn params(&self) -> Option<Value> {
        match self {
            ChannelRequest::UpdateEvaluationTrace(trace) => Some(Value::String(trace.clone())),
            ChannelRequest::HighlightElement(token) | ChannelRequest::SelectElement(token) => {
                Some(Value::from(*token))
            }
            _ => None,
        }
    }

    pub fn parse(method: &str, params: Option<&Value>) -> DebuggerResult<Self> {
        match method {
            methods::UPDATE_EVALUATION_TRACE => match params {
                Some(Value::String(trace)) => Ok(ChannelRequest::UpdateEvaluationTrace(trace.clone())),
                // An undecoded trace object is accepted too.
                Some(other @ Value::Object(_)) => {
                    Ok(ChannelRequest::UpdateEvaluationTrace(other.to_string()))
                }
                _ => Err(invalid(method, "expected the serialized trace")),
            },
            methods::HIGHLIGHT_ELEMENT => token_param(method, params).map(ChannelRequest::HighlightElement),
            methods::SELECT_ELEMENT => token_param(method, params).map(ChannelRequest::SelectElement),
            methods::UNHIGHLIGHT_ELEMENTS => Ok(ChannelRequest::UnhighlightElements),
            methods::ACTIVATE_INSPECT_MODE => Ok(ChannelRequest::ActivateInspectMode),
            methods::DEACTIVATE_INSPECT_MODE => Ok(ChannelRequest::DeactivateInspectMode),
            other => Err(DebuggerError::MethodNotFound(other.to_string())),
        }
    }
}

fn invalid(method: &str, message: &str) -> DebuggerError {
    DebuggerError::InvalidParams {
        method: method.to_string(),
        message: message.to_string(),
    }
}

/// Tokens arrive as numbers, or as numeric strings when read back out of
/// marker comment text.
fn token_param(method: &str, params: Option<&Value>) -> DebuggerResult<Token> {
    let token = match params {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    token.ok_or_else(|| invalid(method, "expected a single integer token"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_names() {
        assert_eq!(ChannelRequest::HighlightElement(1).method(), "highlightElement");
        assert_eq!(ChannelRequest::DeactivateInspectMode.method(), "deactivateInspectMode");
        assert_eq!(
            ChannelRequest::UpdateEvaluationTrace(String::new()).method(),
            "updateEvaluationTrace"
        );
    }

    #[test]
    fn params_roundtrip_through_parse() {
        for request in [
            ChannelRequest::UpdateEvaluationTrace("{\"fullPath\":\"page\"}".into()),
            ChannelRequest::HighlightElement(7),
            ChannelRequest::SelectElement(0),
            ChannelRequest::UnhighlightElements,
            ChannelRequest::ActivateInspectMode,
        ] {
            let params = request.params();
            assert_eq!(
                ChannelRequest::parse(request.method(), params.as_ref()).unwrap(),
                request
            );
        }
    }

    #[test]
    fn token_as_string_is_accepted() {
        assert_eq!(
            ChannelRequest::parse("highlightElement", Some(&json!("12"))).unwrap(),
            ChannelRequest::HighlightElement(12)
        );
    }

    #[test]
    fn invalid_token_params() {
        for params in [None, Some(json!(-1)), Some(json!("abc")), Some(json!([1]))] {
            assert!(matches!(
                ChannelRequest::parse("selectElement", params.as_ref()),
                Err(DebuggerError::InvalidParams { .. })
            ));
        }
    }

    #[test]
    fn trace_object_is_reencoded() {
        let request =
            ChannelRequest::parse("updateEvaluationTrace", Some(&json!({"fullPath": "p"}))).unwrap();
        assert_eq!(
            request,
            ChannelRequest::UpdateEvaluationTrace("{\"fullPath\":\"p\"}".into())
        );
    }

    #[test]
    fn unknown_method() {
        assert!(matches!(
            ChannelRequest::parse("reload", None),
            Err(DebuggerError::MethodNotFound(m)) if m == "reload"
        ));
    }
}
