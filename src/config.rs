use serde::{Deserialize, Serialize};

use crate::constants::folds::{DEFAULT_FOLD_COUNT, DEFAULT_SEED, MIN_FOLD_COUNT};
use crate::constants::predictions::DEFAULT_TAG;
use crate::errors::FoldError;
use crate::types::ColumnName;

/// What to do when a label class has fewer records than there are folds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegeneratePolicy {
    /// Fail with a configuration error.
    #[default]
    Reject,
    /// Log a warning and continue; folds for that class will be skewed.
    Warn,
}

/// Inputs controlling fold assignment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldConfig {
    /// Column holding the class label used for stratification.
    pub label_column: ColumnName,
    /// Column holding the group identifier; groups never straddle roles.
    pub group_column: ColumnName,
    /// Number of folds (and of inner folds used to carve validation sets).
    pub fold_count: usize,
    /// Seed for the group shuffle preceding the greedy fold allocation.
    pub seed: u64,
    /// Handling of label classes too small to appear in every fold.
    pub degenerate: DegeneratePolicy,
    /// Compute the validation split of each fold on the rayon pool.
    pub parallel: bool,
}

impl Default for FoldConfig {
    fn default() -> Self {
        Self {
            label_column: "label".to_string(),
            group_column: "group".to_string(),
            fold_count: DEFAULT_FOLD_COUNT,
            seed: DEFAULT_SEED,
            degenerate: DegeneratePolicy::Reject,
            parallel: false,
        }
    }
}

impl FoldConfig {
    /// Check fold count and column names.
    pub fn validated(self) -> Result<Self, FoldError> {
        if self.fold_count < MIN_FOLD_COUNT {
            return Err(FoldError::Configuration(format!(
                "fold count must be at least {MIN_FOLD_COUNT}, got {}",
                self.fold_count
            )));
        }
        if self.label_column.is_empty() || self.group_column.is_empty() {
            return Err(FoldError::Configuration(
                "label and group column names must be non-empty".to_string(),
            ));
        }
        if self.label_column == self.group_column {
            return Err(FoldError::Configuration(format!(
                "label and group columns must differ (both are '{}')",
                self.label_column
            )));
        }
        Ok(self)
    }
}

/// Inputs controlling prediction recombination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecombineConfig {
    /// Number of folds whose predictions are merged.
    pub fold_count: usize,
    /// Only prediction files whose name contains this substring are considered.
    pub file_filter: Option<String>,
    /// Tag used in the default output file name.
    pub tag: String,
}

impl Default for RecombineConfig {
    fn default() -> Self {
        Self {
            fold_count: DEFAULT_FOLD_COUNT,
            file_filter: None,
            tag: DEFAULT_TAG.to_string(),
        }
    }
}

impl RecombineConfig {
    /// Check the fold count.
    pub fn validated(self) -> Result<Self, FoldError> {
        if self.fold_count == 0 {
            return Err(FoldError::Configuration(
                "fold count must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }
}
