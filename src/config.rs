//! Debugger configuration.
//!
//! Every field has a default so a host can supply a partial JSON document and
//! get the conventional names (scope, storage key, CSS classes, request
//! arguments) for the rest.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DebuggerResult;

/// Placeholder replaced by the public base URL in snippet templates.
pub const BASE_URL_PLACEHOLDER: &str = "###BASE_URL###";
/// Placeholder replaced by the double-encoded trace in snippet templates.
pub const EVALUATION_TRACE_PLACEHOLDER: &str = "###EVALUATION_TRACE###";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebuggerConfig {
    pub markers: MarkerConfig,
    pub highlight: HighlightConfig,
    pub channel: ChannelConfig,
    pub request: RequestConfig,
    pub snippet: SnippetConfig,
}

impl DebuggerConfig {
    /// Load a (partial) JSON configuration over the defaults.
    pub fn from_json_str(json: &str) -> DebuggerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Marker emission policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Object types whose raw text must never contain markers (attribute,
    /// tag and content-wrapping emitters). Suppression covers descendants.
    pub suppressed_object_types: BTreeSet<String>,
    /// Wrap the whitespace-collapsed text instead of the raw text.
    pub collapse_wrapped_output: bool,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            suppressed_object_types: [
                "Neos.Fusion:Attributes",
                "Neos.Fusion:Tag",
                "Neos.Neos:ContentElementWrapping",
                "TYPO3.TypoScript:Attributes",
                "TYPO3.TypoScript:Tag",
                "TYPO3.Neos:ContentElementWrapping",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            collapse_wrapped_output: true,
        }
    }
}

/// CSS classes applied by the span resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub hover_class: String,
    pub selected_class: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            hover_class: "neos-fusion-debugger-highlighted".into(),
            selected_class: "neos-fusion-debugger-selected".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub scope: String,
    /// Session storage key of the "debugger active" flag.
    pub session_key: String,
    /// Pointer must rest this long on one target before a lookup runs.
    #[serde(with = "duration_ms")]
    pub inspect_debounce: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            scope: "neos-fusion-debugger".into(),
            session_key: "neos-fusion-debugger-active".into(),
            inspect_debounce: Duration::from_millis(20),
        }
    }
}

/// Names of the request arguments that select the response mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub debugger_argument: String,
    pub expression_argument: String,
    pub array_path_argument: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            debugger_argument: "__neos-fusion-debugger".into(),
            expression_argument: "__neos-fusion-debugger-eelExpression".into(),
            array_path_argument: "__neos-fusion-debugger-currentArrayPath".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnippetConfig {
    pub base_url: String,
    /// Appended to the page in augmentation mode.
    pub snippet_template: String,
    /// Replaces the page in debugger mode.
    pub page_template: String,
}

impl Default for SnippetConfig {
    fn default() -> Self {
        Self {
            base_url: "/_Resources/Static/Packages/Sandstorm.FusionDebugger/".into(),
            snippet_template: format!(
                "<script>var fusion_debugger_evaluation_trace = {EVALUATION_TRACE_PLACEHOLDER};\
                 var fusion_debugger_remote_url = window.location.href + \
                 (window.location.search ? '&' : '?') + '__neos-fusion-debugger=1';</script>\
                 <script src=\"{BASE_URL_PLACEHOLDER}JavaScript/DebuggingSnippet.js\"></script>"
            ),
            page_template: format!(
                "<!DOCTYPE html><html><head><title>Fusion Debugger</title>\
                 <script src=\"{BASE_URL_PLACEHOLDER}JavaScript/Debugger.js\"></script></head>\
                 <body><script>var fusion_debugger_evaluation_trace = {EVALUATION_TRACE_PLACEHOLDER};</script>\
                 <ul class=\"typoScriptEvaluationTree\"></ul><div class=\"details\"></div></body></html>"
            ),
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DebuggerConfig::default();
        assert!(config
            .markers
            .suppressed_object_types
            .contains("Neos.Fusion:Tag"));
        assert!(config
            .markers
            .suppressed_object_types
            .contains("TYPO3.TypoScript:Attributes"));
        assert_eq!(config.channel.inspect_debounce, Duration::from_millis(20));
        assert_eq!(config.highlight.hover_class, "neos-fusion-debugger-highlighted");
        assert!(config.snippet.snippet_template.contains(EVALUATION_TRACE_PLACEHOLDER));
        assert!(config.snippet.page_template.contains(BASE_URL_PLACEHOLDER));
    }

    #[test]
    fn partial_json_overrides() {
        let config = DebuggerConfig::from_json_str(
            r#"{
                "channel": {"scope": "typo3-typoscript-debugger", "inspect_debounce": 50},
                "highlight": {"selected_class": "picked"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.channel.scope, "typo3-typoscript-debugger");
        assert_eq!(config.channel.inspect_debounce, Duration::from_millis(50));
        assert_eq!(config.channel.session_key, "neos-fusion-debugger-active");
        assert_eq!(config.highlight.selected_class, "picked");
        assert_eq!(config.highlight.hover_class, "neos-fusion-debugger-highlighted");
        assert_eq!(config.markers, MarkerConfig::default());
    }

    #[test]
    fn invalid_json_is_error() {
        assert!(DebuggerConfig::from_json_str("{").is_err());
    }

    #[test]
    fn roundtrip() {
        let config = DebuggerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back = DebuggerConfig::from_json_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
