//! Post-pass derivation of display and navigation paths.

use std::sync::OnceLock;

use regex::Regex;

use super::array_path::ArrayPath;
use super::node::{ComputedProperties, NodeId};
use super::Trace;

fn type_annotation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("static regex"))
}

/// Path with bracketed type annotations removed:
/// `page<Neos.Neos:Page>/body<Neos.Fusion:Template>` → `page/body`.
pub fn condense_path(full_path: &str) -> String {
    type_annotation_regex().replace_all(full_path, "").into_owned()
}

/// Path relative to the parent's condensed path, or `/`-prefixed absolute
/// when the parent is not a prefix.
pub fn relative_path(condensed: &str, parent_condensed: &str) -> String {
    if !parent_condensed.is_empty() {
        if let Some(rest) = condensed
            .strip_prefix(parent_condensed)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            return rest.to_string();
        }
    }
    format!("/{condensed}")
}

/// Fill [`ComputedProperties`] for every node of a finished trace.
pub fn compute_paths(trace: &mut Trace) {
    let Some(root) = trace.root() else { return };
    // (node, parent condensed path, array path)
    let mut work: Vec<(NodeId, String, ArrayPath)> = vec![(root, String::new(), ArrayPath::root())];

    while let Some((id, parent_condensed, array_path)) = work.pop() {
        let node = trace.node(id);
        let configuration = node.configuration.as_ref();

        let meta_configuration = configuration
            .and_then(|c| c.meta())
            .cloned()
            .unwrap_or_default();
        let implementation_class_name = configuration
            .and_then(|c| c.implementation_class())
            .unwrap_or_default()
            .to_string();
        let object_type = configuration
            .and_then(|c| c.object_type())
            .unwrap_or_default()
            .to_string();
        let context_as_string = node
            .context
            .iter()
            .map(|(key, value)| (key.clone(), value.display_string()))
            .collect();

        let condensed_path = condense_path(&node.full_path);
        let relative_path = relative_path(&condensed_path, &parent_condensed);

        for (index, &child) in node.children.iter().enumerate().rev() {
            work.push((child, condensed_path.clone(), array_path.child(index)));
        }

        trace.node_mut(id).computed = Some(ComputedProperties {
            condensed_path,
            relative_path,
            array_path: array_path.to_string(),
            object_type,
            implementation_class_name,
            context_as_string,
            meta_configuration,
        });
    }
}
