use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::constants::folds::ALL_ROLES;
use crate::data::Record;
use crate::metrics::{LabelDistribution, label_distribution};
use crate::splits::{FoldAssignment, SplitRole};
use crate::types::{ColumnName, FoldIndex, LabelValue};

/// Per-fold, per-role label counts of an assignment.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FoldReport {
    /// Column the labels were read from.
    pub label_column: ColumnName,
    /// Fingerprint of the assignment being reported.
    pub fingerprint: u64,
    /// One summary per fold, in fold order.
    pub folds: Vec<FoldSummary>,
}

/// Role breakdown of one fold.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FoldSummary {
    /// Fold index.
    pub fold: FoldIndex,
    /// One summary per role.
    pub roles: Vec<RoleSummary>,
}

/// Records of one role within one fold.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoleSummary {
    /// Role being summarized.
    pub role: SplitRole,
    /// Groups holding the role.
    pub groups: usize,
    /// Records of those groups.
    pub records: usize,
    /// Record count per label, sorted by label.
    pub label_counts: BTreeMap<LabelValue, usize>,
    /// `None` when the role holds no records.
    pub distribution: Option<LabelDistribution>,
}

impl FoldReport {
    /// Tally `records` under every fold and role of `assignment`.
    pub fn build(assignment: &FoldAssignment, records: &[Record], label_column: &str) -> Self {
        let folds = (0..assignment.fold_count())
            .map(|fold| FoldSummary {
                fold,
                roles: ALL_ROLES
                    .iter()
                    .map(|role| role_summary(assignment, records, fold, *role))
                    .collect(),
            })
            .collect();
        Self {
            label_column: label_column.to_string(),
            fingerprint: assignment.fingerprint(),
            folds,
        }
    }

    /// Summary of `role` under `fold`.
    pub fn role(&self, fold: FoldIndex, role: SplitRole) -> Option<&RoleSummary> {
        self.folds
            .get(fold)?
            .roles
            .iter()
            .find(|summary| summary.role == role)
    }
}

fn role_summary(
    assignment: &FoldAssignment,
    records: &[Record],
    fold: FoldIndex,
    role: SplitRole,
) -> RoleSummary {
    let groups: HashSet<&str> = assignment
        .groups_with_role(fold, role)
        .into_iter()
        .map(String::as_str)
        .collect();
    let mut label_counts: BTreeMap<LabelValue, usize> = BTreeMap::new();
    let mut total = 0;
    for record in records
        .iter()
        .filter(|record| groups.contains(record.group.as_str()))
    {
        *label_counts.entry(record.label.clone()).or_default() += 1;
        total += 1;
    }
    RoleSummary {
        role,
        groups: groups.len(),
        records: total,
        distribution: label_distribution(&label_counts),
        label_counts,
    }
}

impl fmt::Display for FoldReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "label column '{}', {} folds, fingerprint {:016x}",
            self.label_column,
            self.folds.len(),
            self.fingerprint
        )?;
        for summary in &self.folds {
            writeln!(f, "fold {}", summary.fold)?;
            for role in &summary.roles {
                writeln!(
                    f,
                    "  {:<5} groups={:<6} records={}",
                    role.role.as_str(),
                    role.groups,
                    role.records
                )?;
                for (label, count) in &role.label_counts {
                    let share = if role.records == 0 {
                        0.0
                    } else {
                        *count as f64 / role.records as f64
                    };
                    writeln!(f, "    {label:<24} {count:>7} {:>6.1}%", share * 100.0)?;
                }
            }
        }
        Ok(())
    }
}
