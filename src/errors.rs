use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{FoldIndex, RowIndex};

/// Error type for fold assignment, prediction recombination, and table IO failures.
#[derive(Debug, Error)]
pub enum FoldError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(
        "fold {fold}: prediction table has {actual} rows but the reference marks {expected} rows as test"
    )]
    Alignment {
        fold: FoldIndex,
        expected: usize,
        actual: usize,
    },
    #[error("row {index} is assigned to test in both fold {first_fold} and fold {second_fold}")]
    DuplicateIndex {
        index: RowIndex,
        first_fold: FoldIndex,
        second_fold: FoldIndex,
    },
    #[error("fold {fold}: no prediction file found under '{}'", .path.display())]
    MissingFile { fold: FoldIndex, path: PathBuf },
    #[error("malformed table '{}': {details}", .path.display())]
    MalformedTable { path: PathBuf, details: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
