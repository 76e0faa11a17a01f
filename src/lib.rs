#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Fold-assignment entry point.
pub mod assigner;
/// Command-line runners shared by the binaries.
pub mod cli;
/// Assignment and recombination configuration types.
pub mod config;
/// Centralized constants used across folds, predictions, and tables.
pub mod constants;
/// Dataset and record types.
pub mod data;
mod hash;
/// Label to class-index mapping.
pub mod labels;
/// Label balance and classification metrics.
pub mod metrics;
/// Prediction table types.
pub mod predictions;
/// Reassembly of per-fold predictions.
pub mod recombine;
/// Per-fold label reports.
pub mod report;
mod rng;
/// Fold roles, assignments, and role-column views.
pub mod splits;
/// Stratified grouped K-fold splitter.
pub mod stratified;
/// Filesystem transport for tables and prediction files.
pub mod transport;
/// Test-time-augmentation vote collapsing.
pub mod tta;
/// Shared type aliases.
pub mod types;

mod errors;

pub use assigner::FoldAssigner;
pub use config::{DegeneratePolicy, FoldConfig, RecombineConfig};
pub use data::{Dataset, Record};
pub use errors::FoldError;
pub use labels::LabelMap;
pub use metrics::{ClassificationSummary, LabelDistribution, label_distribution};
pub use predictions::{
    FoldPredictionTable, IndexedPrediction, PredictionEntry, UnifiedPredictionTable,
};
pub use recombine::PredictionRecombiner;
pub use report::FoldReport;
pub use splits::{AssignedRecords, FoldAssignment, FoldRoles, RoleColumns, SplitRole};
pub use stratified::StratifiedGroupKFold;
pub use types::{Cell, ClassIndex, ColumnName, FoldIndex, GroupId, LabelValue, RowIndex};
