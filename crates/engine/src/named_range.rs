//! Defined names.
//!
//! A defined name maps an identifier to reference text (e.g. `Freq` ->
//! `data!$C$4`). Targets are kept as text and resolved lazily, because a
//! name may point at a single cell or a range and the resolver already
//! knows how to handle both.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::cell_id::parse_a1;

/// A defined name and the reference text it stands for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedRange {
    /// The name (case-insensitive for lookups, but preserves original case)
    pub name: String,
    /// Target reference text without a leading `=`
    pub target: String,
}

impl NamedRange {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        let target = target.into();
        let target = target.strip_prefix('=').map(str::to_string).unwrap_or(target);
        Self { name: name.into(), target }
    }
}

/// Validate a defined-name identifier
/// Rules:
/// - Must start with letter or underscore
/// - Can contain letters, numbers, underscores, and dots (for `_xlnm.` builtins)
/// - Cannot be a cell reference (A1, BC23)
pub fn is_valid_name(name: &str) -> Result<(), String> {
    let name = name.trim();

    let Some(first) = name.chars().next() else {
        return Err("Name cannot be empty".into());
    };

    if !first.is_alphabetic() && first != '_' && first != '\\' {
        return Err(format!("'{}' must start with a letter or underscore", name));
    }

    if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '\\') {
        return Err(format!("'{}' can only contain letters, numbers, underscores, and dots", name));
    }

    if parse_a1(name).is_some() {
        return Err(format!("'{}' looks like a cell reference", name));
    }

    Ok(())
}

/// Storage for defined names in a workbook
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamedRangeStore {
    /// Keyed by lowercase name for case-insensitive lookup
    ranges: HashMap<String, NamedRange>,
}

impl NamedRangeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or update a defined name
    pub fn set(&mut self, range: NamedRange) -> Result<(), String> {
        is_valid_name(&range.name)?;
        self.ranges.insert(range.name.trim().to_lowercase(), range);
        Ok(())
    }

    /// Get a defined name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&NamedRange> {
        self.ranges.get(&name.trim().to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All defined names, sorted by name for stable output
    pub fn list(&self) -> Vec<&NamedRange> {
        let mut list: Vec<&NamedRange> = self.ranges.values().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
