use indexmap::IndexMap;
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::config::{DegeneratePolicy, FoldConfig};
use crate::data::{Dataset, Record};
use crate::errors::FoldError;
use crate::labels::LabelMap;
use crate::splits::{FoldAssignment, SplitRole};
use crate::stratified::StratifiedGroupKFold;
use crate::types::{FoldIndex, GroupId};

/// Computes train/val/test group partitions for every fold of a dataset.
///
/// For fold `k`, the test set is fold `k` of a stratified grouped K-fold split
/// of all groups. The remaining groups are split again with the same fold
/// count and seed; the first inner fold becomes the validation set and the
/// rest is train. Validation balance is therefore only as good as the inner
/// split allows on the complement; classes that thin out there are tolerated
/// with a warning.
///
/// The inner split may leave folds empty. Validation is never empty while any
/// group remains outside the test set, but with as many folds as groups the
/// train set of a fold can be.
#[derive(Clone, Debug)]
pub struct FoldAssigner {
    config: FoldConfig,
}

impl FoldAssigner {
    /// Create an assigner after validating `config`.
    pub fn new(config: FoldConfig) -> Result<Self, FoldError> {
        Ok(Self {
            config: config.validated()?,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &FoldConfig {
        &self.config
    }

    /// Compute the fold assignment for `dataset` without modifying it.
    pub fn assign(&self, dataset: &Dataset) -> Result<FoldAssignment, FoldError> {
        let records = dataset.records(&self.config.label_column, &self.config.group_column)?;
        let labels = LabelMap::from_observed(records.iter().map(|record| record.label.as_str()));
        if labels.len() < 2 {
            return Err(FoldError::Configuration(format!(
                "label column '{}' needs at least 2 distinct labels, found {}",
                self.config.label_column,
                labels.len()
            )));
        }

        let outer = StratifiedGroupKFold::new(self.config.fold_count, self.config.seed, &labels)
            .with_policy(self.config.degenerate)
            .split(&records)?;

        let folds: Vec<IndexMap<GroupId, SplitRole>> = if self.config.parallel {
            (0..self.config.fold_count)
                .into_par_iter()
                .map(|fold| self.fold_roles(fold, &outer, &records, &labels))
                .collect::<Result<Vec<_>, FoldError>>()?
        } else {
            (0..self.config.fold_count)
                .map(|fold| self.fold_roles(fold, &outer, &records, &labels))
                .collect::<Result<Vec<_>, FoldError>>()?
        };

        let assignment = FoldAssignment::from_folds(folds)?;
        info!(
            folds = assignment.fold_count(),
            groups = assignment.group_count(),
            records = records.len(),
            classes = labels.len(),
            fingerprint = assignment.fingerprint(),
            "fold assignment complete"
        );
        Ok(assignment)
    }

    /// Compute the assignment and return it with the augmented dataset.
    pub fn assign_and_augment(
        &self,
        dataset: &Dataset,
    ) -> Result<(FoldAssignment, Dataset), FoldError> {
        let assignment = self.assign(dataset)?;
        let augmented = assignment.augment(dataset, &self.config.group_column)?;
        Ok((assignment, augmented))
    }

    fn fold_roles(
        &self,
        fold: FoldIndex,
        outer: &[Vec<GroupId>],
        records: &[Record],
        labels: &LabelMap,
    ) -> Result<IndexMap<GroupId, SplitRole>, FoldError> {
        let test: HashSet<&GroupId> = outer[fold].iter().collect();
        let remaining = records.iter().filter(|record| !test.contains(&record.group));
        let inner = StratifiedGroupKFold::new(self.config.fold_count, self.config.seed, labels)
            .with_policy(DegeneratePolicy::Warn)
            .allowing_empty_folds()
            .split(remaining)
            .map_err(|err| match err {
                FoldError::Configuration(msg) => {
                    FoldError::Configuration(format!("fold {fold}: validation split failed: {msg}"))
                }
                other => other,
            })?;
        let validation: HashSet<&GroupId> = inner[0].iter().collect();

        let mut roles = IndexMap::new();
        for group in outer.iter().flatten() {
            let role = if test.contains(group) {
                SplitRole::Test
            } else if validation.contains(group) {
                SplitRole::Validation
            } else {
                SplitRole::Train
            };
            roles.insert(group.clone(), role);
        }
        debug!(
            fold,
            test = test.len(),
            val = validation.len(),
            train = roles.len() - test.len() - validation.len(),
            "fold roles assigned"
        );
        Ok(roles)
    }
}
