//! Bidirectional label ↔ class-index mapping.
//!
//! Built once (from a class-map file or from observed labels) and passed by
//! reference wherever labels need a dense index.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::errors::FoldError;
use crate::types::{ClassIndex, LabelValue};

/// Finite label set with stable class indices.
///
/// Indices normally run densely from zero. A class-map file with blank lines
/// leaves the indices of those lines unassigned.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    forward: IndexMap<LabelValue, ClassIndex>,
    inverse: Vec<Option<LabelValue>>,
}

impl LabelMap {
    /// Map labels to indices in the given order; duplicates are rejected.
    pub fn from_labels<I, S>(labels: I) -> Result<Self, FoldError>
    where
        I: IntoIterator<Item = S>,
        S: Into<LabelValue>,
    {
        Self::from_slots(labels.into_iter().map(|label| Some(label.into())))
    }

    /// Map the distinct observed labels, in sorted order.
    pub fn from_observed<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: BTreeSet<&str> = labels.into_iter().collect();
        let inverse: Vec<Option<LabelValue>> =
            distinct.into_iter().map(|label| Some(label.to_string())).collect();
        let forward = inverse
            .iter()
            .enumerate()
            .filter_map(|(idx, label)| label.clone().map(|label| (label, idx)))
            .collect();
        Self { forward, inverse }
    }

    /// Read a class-map file with one label per line.
    ///
    /// The line number is the class index, so an interior blank line skips an
    /// index. Trailing blank lines are ignored.
    pub fn from_class_map_file(path: &Path) -> Result<Self, FoldError> {
        let text = fs::read_to_string(path)?;
        let mut slots: Vec<Option<LabelValue>> = text
            .lines()
            .map(str::trim)
            .map(|line| (!line.is_empty()).then(|| line.to_string()))
            .collect();
        while slots.last().is_some_and(Option::is_none) {
            slots.pop();
        }
        Self::from_slots(slots)
    }

    fn from_slots<I>(slots: I) -> Result<Self, FoldError>
    where
        I: IntoIterator<Item = Option<LabelValue>>,
    {
        let mut forward = IndexMap::new();
        let mut inverse = Vec::new();
        for (idx, slot) in slots.into_iter().enumerate() {
            if let Some(label) = &slot
                && forward.insert(label.clone(), idx).is_some()
            {
                return Err(FoldError::Configuration(format!(
                    "label '{label}' appears more than once in the class map"
                )));
            }
            inverse.push(slot);
        }
        Ok(Self { forward, inverse })
    }

    /// Number of class indices, including unassigned ones.
    pub fn len(&self) -> usize {
        self.inverse.len()
    }

    /// True when no labels are mapped.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Class index of `label`.
    pub fn index_of(&self, label: &str) -> Option<ClassIndex> {
        self.forward.get(label).copied()
    }

    /// Label at class index `idx`.
    pub fn label_of(&self, idx: ClassIndex) -> Option<&LabelValue> {
        self.inverse.get(idx)?.as_ref()
    }

    /// Labels in class-index order.
    pub fn labels(&self) -> impl Iterator<Item = &LabelValue> {
        self.forward.keys()
    }
}
