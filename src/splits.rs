use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use crate::constants::folds::{ROLE_TEST, ROLE_TRAIN, ROLE_VALIDATION};
use crate::data::{Dataset, Record};
use crate::errors::FoldError;
use crate::hash::stable_hash_with;
use crate::types::{Cell, ColumnName, FoldIndex, GroupId, RowIndex};

/// Role a group plays within one fold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SplitRole {
    /// Training partition.
    #[serde(rename = "train")]
    Train,
    /// Validation partition.
    #[serde(rename = "val")]
    Validation,
    /// Held-out test partition.
    #[serde(rename = "test")]
    Test,
}

impl SplitRole {
    /// On-disk spelling of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            SplitRole::Train => ROLE_TRAIN,
            SplitRole::Validation => ROLE_VALIDATION,
            SplitRole::Test => ROLE_TEST,
        }
    }
}

impl fmt::Display for SplitRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitRole {
    type Err = FoldError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            ROLE_TRAIN => Ok(SplitRole::Train),
            ROLE_VALIDATION => Ok(SplitRole::Validation),
            ROLE_TEST => Ok(SplitRole::Test),
            other => Err(FoldError::Configuration(format!(
                "unknown split role '{other}' (expected train, val, or test)"
            ))),
        }
    }
}

/// Column name holding the roles of fold `fold` in an augmented dataset.
pub fn fold_column_name(fold: FoldIndex) -> ColumnName {
    fold.to_string()
}

/// Per-fold group → role mapping.
///
/// Every fold covers the same group universe and each group has exactly one
/// role per fold. Groups are kept in sorted order so iteration, serialization,
/// and [`FoldAssignment::fingerprint`] are deterministic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldAssignment {
    folds: Vec<IndexMap<GroupId, SplitRole>>,
}

impl FoldAssignment {
    /// Build an assignment, checking that every fold covers the same groups.
    pub fn from_folds(mut folds: Vec<IndexMap<GroupId, SplitRole>>) -> Result<Self, FoldError> {
        let Some(first) = folds.first() else {
            return Err(FoldError::Configuration(
                "fold assignment needs at least one fold".to_string(),
            ));
        };
        let universe_len = first.len();
        for (fold, roles) in folds.iter().enumerate().skip(1) {
            let same_universe =
                roles.len() == universe_len && roles.keys().all(|group| first.contains_key(group));
            if !same_universe {
                return Err(FoldError::Configuration(format!(
                    "fold {fold} does not cover the same groups as fold 0"
                )));
            }
        }
        for roles in &mut folds {
            roles.sort_keys();
        }
        Ok(Self { folds })
    }

    /// Number of folds.
    pub fn fold_count(&self) -> usize {
        self.folds.len()
    }

    /// Number of distinct groups.
    pub fn group_count(&self) -> usize {
        self.folds.first().map_or(0, IndexMap::len)
    }

    /// All groups, sorted.
    pub fn groups(&self) -> impl Iterator<Item = &GroupId> {
        self.folds.first().into_iter().flat_map(IndexMap::keys)
    }

    /// Role of `group` under `fold`.
    pub fn role(&self, fold: FoldIndex, group: &str) -> Option<SplitRole> {
        self.folds.get(fold)?.get(group).copied()
    }

    /// Sorted groups holding `role` under `fold`.
    pub fn groups_with_role(&self, fold: FoldIndex, role: SplitRole) -> Vec<&GroupId> {
        self.folds
            .get(fold)
            .map(|roles| {
                roles
                    .iter()
                    .filter(|(_, assigned)| **assigned == role)
                    .map(|(group, _)| group)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Folds in which `group` is held out for testing.
    pub fn test_folds_for(&self, group: &str) -> Vec<FoldIndex> {
        self.folds
            .iter()
            .enumerate()
            .filter(|(_, roles)| roles.get(group) == Some(&SplitRole::Test))
            .map(|(fold, _)| fold)
            .collect()
    }

    /// Stable summary hash of every (fold, group, role) triple.
    pub fn fingerprint(&self) -> u64 {
        stable_hash_with(|hasher| {
            for (fold, roles) in self.folds.iter().enumerate() {
                fold.hash(hasher);
                for (group, role) in roles {
                    group.hash(hasher);
                    role.hash(hasher);
                }
            }
        })
    }

    /// One role column per fold, with a cell per record.
    pub fn role_columns(
        &self,
        records: &[Record],
    ) -> Result<Vec<(ColumnName, Vec<Cell>)>, FoldError> {
        self.folds
            .iter()
            .enumerate()
            .map(|(fold, roles)| {
                let cells = records
                    .iter()
                    .map(|record| {
                        roles
                            .get(&record.group)
                            .map(|role| role.as_str().to_string())
                            .ok_or_else(|| {
                                FoldError::Configuration(format!(
                                    "row {}: group '{}' is not part of the fold assignment",
                                    record.index, record.group
                                ))
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((fold_column_name(fold), cells))
            })
            .collect()
    }

    /// Append one role column per fold to `dataset`.
    pub fn augment(&self, dataset: &Dataset, group_column: &str) -> Result<Dataset, FoldError> {
        let group_idx = dataset.column_index(group_column)?;
        let records: Vec<Record> = dataset
            .rows()
            .iter()
            .enumerate()
            .map(|(index, row)| Record {
                index,
                group: row[group_idx].clone(),
                label: Cell::new(),
            })
            .collect();
        dataset.with_appended_columns(self.role_columns(&records)?)
    }

    /// Recover an assignment from the role columns of an augmented dataset.
    ///
    /// Fails when a group carries two different roles within one fold.
    pub fn from_augmented(
        dataset: &Dataset,
        group_column: &str,
        fold_count: usize,
    ) -> Result<Self, FoldError> {
        let groups = dataset.column(group_column)?;
        let mut folds = Vec::with_capacity(fold_count);
        for fold in 0..fold_count {
            let roles = parse_role_column(dataset, fold)?;
            let mut by_group: IndexMap<GroupId, SplitRole> = IndexMap::new();
            for (row, (group, role)) in groups.iter().zip(roles).enumerate() {
                match by_group.get(*group) {
                    Some(existing) if *existing != role => {
                        return Err(FoldError::Configuration(format!(
                            "fold {fold}: group '{group}' is both {existing} and {role} (row {row})"
                        )));
                    }
                    Some(_) => {}
                    None => {
                        by_group.insert((*group).to_string(), role);
                    }
                }
            }
            folds.push(by_group);
        }
        Self::from_folds(folds)
    }
}

/// Source of per-fold test row indices for the recombiner.
pub trait FoldRoles {
    /// Number of folds described.
    fn fold_count(&self) -> usize;
    /// Ascending row indices whose role under `fold` is test.
    fn test_rows(&self, fold: FoldIndex) -> Result<Vec<RowIndex>, FoldError>;
}

/// Augmented dataset read through its per-fold role columns.
#[derive(Clone, Copy, Debug)]
pub struct RoleColumns<'a> {
    dataset: &'a Dataset,
    fold_count: usize,
}

impl<'a> RoleColumns<'a> {
    /// View `fold_count` role columns of `dataset`; every column must exist.
    pub fn new(dataset: &'a Dataset, fold_count: usize) -> Result<Self, FoldError> {
        for fold in 0..fold_count {
            dataset.column_index(&fold_column_name(fold))?;
        }
        Ok(Self {
            dataset,
            fold_count,
        })
    }
}

impl FoldRoles for RoleColumns<'_> {
    fn fold_count(&self) -> usize {
        self.fold_count
    }

    fn test_rows(&self, fold: FoldIndex) -> Result<Vec<RowIndex>, FoldError> {
        Ok(parse_role_column(self.dataset, fold)?
            .into_iter()
            .enumerate()
            .filter(|(_, role)| *role == SplitRole::Test)
            .map(|(row, _)| row)
            .collect())
    }
}

/// In-memory assignment joined with the records it was computed from.
#[derive(Clone, Copy, Debug)]
pub struct AssignedRecords<'a> {
    assignment: &'a FoldAssignment,
    records: &'a [Record],
}

impl<'a> AssignedRecords<'a> {
    /// Join `assignment` with `records`.
    pub fn new(assignment: &'a FoldAssignment, records: &'a [Record]) -> Self {
        Self {
            assignment,
            records,
        }
    }
}

impl FoldRoles for AssignedRecords<'_> {
    fn fold_count(&self) -> usize {
        self.assignment.fold_count()
    }

    fn test_rows(&self, fold: FoldIndex) -> Result<Vec<RowIndex>, FoldError> {
        let mut rows = Vec::new();
        for record in self.records {
            match self.assignment.role(fold, &record.group) {
                Some(SplitRole::Test) => rows.push(record.index),
                Some(_) => {}
                None => {
                    return Err(FoldError::Configuration(format!(
                        "fold {fold}: group '{}' of row {} has no role",
                        record.group, record.index
                    )));
                }
            }
        }
        rows.sort_unstable();
        Ok(rows)
    }
}

fn parse_role_column(dataset: &Dataset, fold: FoldIndex) -> Result<Vec<SplitRole>, FoldError> {
    let name = fold_column_name(fold);
    dataset
        .column(&name)?
        .into_iter()
        .enumerate()
        .map(|(row, raw)| {
            raw.parse::<SplitRole>().map_err(|err| match err {
                FoldError::Configuration(msg) => {
                    FoldError::Configuration(format!("fold {fold}, row {row}: {msg}"))
                }
                other => other,
            })
        })
        .collect()
}
