//! Index addresses into a trace tree.
//!
//! Canonical form is `.children[2].children[0]`; the root is the empty string.
//! The dotted form `children.2.children.0` (as sent back by the observer in
//! request arguments) is accepted too.

use std::fmt;

use crate::error::{DebuggerError, DebuggerResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ArrayPath {
    indices: Vec<usize>,
}

impl ArrayPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn parse(input: &str) -> DebuggerResult<Self> {
        let invalid = || DebuggerError::InvalidArrayPath(input.to_string());

        // `.children[2]` and `children.2` normalize to the same segment list.
        let normalized = input.replace('[', ".").replace(']', "");
        let trimmed = normalized.trim_matches('.');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let segments: Vec<&str> = trimmed.split('.').collect();
        if segments.len() % 2 != 0 {
            return Err(invalid());
        }

        let mut indices = Vec::with_capacity(segments.len() / 2);
        for pair in segments.chunks(2) {
            if pair[0] != "children" {
                return Err(invalid());
            }
            indices.push(pair[1].parse().map_err(|_| invalid())?);
        }
        Ok(Self { indices })
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn is_root(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.indices.clone();
        indices.push(index);
        Self { indices }
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.indices.split_last()?;
        Some(Self {
            indices: rest.to_vec(),
        })
    }
}

impl fmt::Display for ArrayPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for index in &self.indices {
            write!(f, ".children[{index}]")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ArrayPath {
    type Err = DebuggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
