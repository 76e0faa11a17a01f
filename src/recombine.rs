use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::RecombineConfig;
use crate::data::Dataset;
use crate::errors::FoldError;
use crate::predictions::{FoldPredictionTable, IndexedPrediction, UnifiedPredictionTable};
use crate::splits::{FoldRoles, RoleColumns};
use crate::transport::fs::{find_fold_prediction_file, read_dataset, unified_output_path};
use crate::types::{FoldIndex, RowIndex};

/// Merges per-fold prediction tables back into original row order.
///
/// Fold `k`'s table is matched positionally against the ascending row indices
/// whose fold-`k` role is test, so producers must emit predictions in input
/// order. Only the length check can catch a producer that reorders rows.
#[derive(Clone, Debug)]
pub struct PredictionRecombiner {
    config: RecombineConfig,
}

impl PredictionRecombiner {
    /// Create a recombiner after validating `config`.
    pub fn new(config: RecombineConfig) -> Result<Self, FoldError> {
        Ok(Self {
            config: config.validated()?,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &RecombineConfig {
        &self.config
    }

    /// Zip each fold's table with its test rows and sort the union by row index.
    pub fn recombine<R>(
        &self,
        roles: &R,
        tables: Vec<FoldPredictionTable>,
    ) -> Result<UnifiedPredictionTable, FoldError>
    where
        R: FoldRoles + ?Sized,
    {
        let fold_count = self.config.fold_count;
        if roles.fold_count() != fold_count {
            return Err(FoldError::Configuration(format!(
                "fold roles describe {} folds, expected {fold_count}",
                roles.fold_count()
            )));
        }
        if tables.len() != fold_count {
            return Err(FoldError::Configuration(format!(
                "expected {fold_count} prediction tables, got {}",
                tables.len()
            )));
        }
        let classes = tables
            .first()
            .map(|table| table.classes().to_vec())
            .unwrap_or_default();
        for (fold, table) in tables.iter().enumerate().skip(1) {
            if table.classes() != classes.as_slice() {
                return Err(FoldError::Configuration(format!(
                    "fold {fold}: probability columns {:?} differ from fold 0 {:?}",
                    table.classes(),
                    classes
                )));
            }
        }

        let mut owner: HashMap<RowIndex, FoldIndex> = HashMap::new();
        let mut rows = Vec::new();
        for (fold, table) in tables.into_iter().enumerate() {
            let indices = roles.test_rows(fold)?;
            if indices.len() != table.len() {
                return Err(FoldError::Alignment {
                    fold,
                    expected: indices.len(),
                    actual: table.len(),
                });
            }
            for &index in &indices {
                if let Some(first_fold) = owner.insert(index, fold) {
                    return Err(FoldError::DuplicateIndex {
                        index,
                        first_fold,
                        second_fold: fold,
                    });
                }
            }
            debug!(fold, rows = indices.len(), "fold predictions aligned");
            let (_, entries) = table.into_parts();
            rows.extend(
                indices
                    .into_iter()
                    .zip(entries)
                    .map(|(index, entry)| IndexedPrediction { index, entry }),
            );
        }

        let unified = UnifiedPredictionTable::new(classes, rows);
        info!(
            folds = fold_count,
            rows = unified.len(),
            classes = unified.classes().len(),
            "predictions recombined"
        );
        Ok(unified)
    }

    /// Discover and parse one prediction table per fold under `model_folder`.
    pub fn load_fold_tables(
        &self,
        model_folder: &Path,
    ) -> Result<Vec<FoldPredictionTable>, FoldError> {
        (0..self.config.fold_count)
            .map(|fold| {
                let path =
                    find_fold_prediction_file(model_folder, fold, self.config.file_filter.as_deref())?;
                let table = FoldPredictionTable::from_table(&read_dataset(&path)?, &path)?;
                info!(fold, path = %path.display(), rows = table.len(), "loaded fold predictions");
                Ok(table)
            })
            .collect()
    }

    /// Load every fold under `model_folder` and recombine against the role
    /// columns of `reference`.
    pub fn recombine_folder(
        &self,
        model_folder: &Path,
        reference: &Dataset,
    ) -> Result<UnifiedPredictionTable, FoldError> {
        let roles = RoleColumns::new(reference, self.config.fold_count)?;
        let tables = self.load_fold_tables(model_folder)?;
        self.recombine(&roles, tables)
    }

    /// Output path used when the caller does not name one.
    pub fn default_output_path(&self, model_folder: &Path) -> PathBuf {
        unified_output_path(model_folder, &self.config.tag)
    }
}
