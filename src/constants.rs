use crate::splits::SplitRole;

/// Constants used by fold assignment.
pub mod folds {
    use super::SplitRole;

    /// Seed used when the caller does not provide one.
    pub const DEFAULT_SEED: u64 = 42;
    /// Fold count used when the caller does not provide one.
    pub const DEFAULT_FOLD_COUNT: usize = 5;
    /// Smallest fold count that still yields a held-out partition.
    pub const MIN_FOLD_COUNT: usize = 2;
    /// Two fold evaluations closer than this are treated as equal.
    pub const FOLD_EVAL_TOLERANCE: f64 = 1e-8;
    /// Canonical role iteration order used by reports and persistence.
    pub const ALL_ROLES: [SplitRole; 3] = [SplitRole::Train, SplitRole::Validation, SplitRole::Test];
    /// On-disk spelling of the train role.
    pub const ROLE_TRAIN: &str = "train";
    /// On-disk spelling of the validation role.
    pub const ROLE_VALIDATION: &str = "val";
    /// On-disk spelling of the test role.
    pub const ROLE_TEST: &str = "test";
}

/// Constants used by prediction tables and the recombiner.
pub mod predictions {
    /// Ground-truth label column in prediction tables.
    pub const Y_TRUE_COLUMN: &str = "y_true";
    /// Predicted label column in prediction tables.
    pub const Y_PRED_COLUMN: &str = "y_pred";
    /// Maximum allowed deviation of a probability row sum from 1.0.
    pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-3;
    /// Prefix of per-fold model directories (`f0`, `f1`, ...).
    pub const FOLD_DIR_PREFIX: &str = "f";
    /// Directory created under the model folder for unified output.
    pub const PREDICTIONS_DIR: &str = "predictions";
    /// Extension of prediction files discovered under fold directories.
    pub const PREDICTION_FILE_EXTENSION: &str = "csv";
    /// Tag used in the unified output file name when none is given.
    pub const DEFAULT_TAG: &str = "combined";
}

/// Constants used by tabular persistence.
pub mod tables {
    /// Extension used for augmented dataset files.
    pub const TABLE_EXTENSION: &str = "csv";
    /// Suffix joining stem, fold count, and label column in augmented file names.
    pub const SPLITS_SUFFIX: &str = "splits";
}
