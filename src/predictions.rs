use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::predictions::{PROBABILITY_SUM_TOLERANCE, Y_PRED_COLUMN, Y_TRUE_COLUMN};
use crate::data::Dataset;
use crate::errors::FoldError;
use crate::labels::LabelMap;
use crate::types::{Cell, LabelValue, RowIndex};

/// One inference result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionEntry {
    /// Ground-truth label.
    pub y_true: LabelValue,
    /// Predicted label.
    pub y_pred: LabelValue,
    /// Per-class probabilities, aligned with the owning table's classes.
    /// Empty when the producer only wrote labels.
    pub probabilities: Vec<f64>,
}

/// Predictions for the test rows of one fold, in producer order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FoldPredictionTable {
    classes: Vec<LabelValue>,
    entries: Vec<PredictionEntry>,
}

/// Prediction paired with the dataset row it belongs to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexedPrediction {
    /// Row in the original dataset.
    pub index: RowIndex,
    /// The prediction for that row.
    pub entry: PredictionEntry,
}

/// Predictions of all folds, ordered by original row index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedPredictionTable {
    classes: Vec<LabelValue>,
    rows: Vec<IndexedPrediction>,
}

impl FoldPredictionTable {
    /// Build a table, validating every entry against `classes`.
    pub fn new(classes: Vec<LabelValue>, entries: Vec<PredictionEntry>) -> Result<Self, FoldError> {
        for (row, entry) in entries.iter().enumerate() {
            check_entry(entry, classes.len())
                .map_err(|details| FoldError::Configuration(format!("row {row}: {details}")))?;
        }
        Ok(Self { classes, entries })
    }

    /// Parse a table with `y_true`, `y_pred`, and one probability column per class.
    ///
    /// `source` names the file in error messages.
    pub fn from_table(table: &Dataset, source: &Path) -> Result<Self, FoldError> {
        let malformed = |details: String| FoldError::MalformedTable {
            path: source.to_path_buf(),
            details,
        };
        let true_idx = table
            .column_index(Y_TRUE_COLUMN)
            .map_err(|err| malformed(err.to_string()))?;
        let pred_idx = table
            .column_index(Y_PRED_COLUMN)
            .map_err(|err| malformed(err.to_string()))?;
        let class_columns: Vec<(usize, &String)> = table
            .headers()
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != true_idx && *idx != pred_idx)
            .collect();
        let classes: Vec<LabelValue> = class_columns.iter().map(|(_, name)| (*name).clone()).collect();

        let mut entries = Vec::with_capacity(table.len());
        for (row, cells) in table.rows().iter().enumerate() {
            let probabilities = class_columns
                .iter()
                .map(|(idx, class)| {
                    cells[*idx].trim().parse::<f64>().map_err(|_| {
                        malformed(format!(
                            "row {row}: probability '{}' for class '{class}' is not a number",
                            cells[*idx]
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let entry = PredictionEntry {
                y_true: cells[true_idx].clone(),
                y_pred: cells[pred_idx].clone(),
                probabilities,
            };
            check_entry(&entry, classes.len()).map_err(|details| malformed(format!("row {row}: {details}")))?;
            entries.push(entry);
        }
        Ok(Self { classes, entries })
    }

    /// Class names of the probability columns.
    pub fn classes(&self) -> &[LabelValue] {
        &self.classes
    }

    /// Entries in producer order.
    pub fn entries(&self) -> &[PredictionEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the table, returning classes and entries.
    pub fn into_parts(self) -> (Vec<LabelValue>, Vec<PredictionEntry>) {
        (self.classes, self.entries)
    }

    /// Check probability columns and labels against a class map.
    pub fn check_classes(&self, labels: &LabelMap) -> Result<(), FoldError> {
        if !self.classes.is_empty() && !self.classes.iter().eq(labels.labels()) {
            return Err(FoldError::Configuration(format!(
                "probability columns {:?} do not match the class map {:?}",
                self.classes,
                labels.labels().collect::<Vec<_>>()
            )));
        }
        for (row, entry) in self.entries.iter().enumerate() {
            for label in [&entry.y_true, &entry.y_pred] {
                if labels.index_of(label).is_none() {
                    return Err(FoldError::Configuration(format!(
                        "row {row}: label '{label}' is not in the class map"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Render with the on-disk prediction schema.
    pub fn to_table(&self) -> Result<Dataset, FoldError> {
        render_table(&self.classes, self.entries.iter())
    }
}

impl UnifiedPredictionTable {
    /// Build from rows; they are sorted by index here.
    pub fn new(classes: Vec<LabelValue>, mut rows: Vec<IndexedPrediction>) -> Self {
        rows.sort_by_key(|row| row.index);
        Self { classes, rows }
    }

    /// Class names of the probability columns.
    pub fn classes(&self) -> &[LabelValue] {
        &self.classes
    }

    /// Rows in ascending original index order.
    pub fn rows(&self) -> &[IndexedPrediction] {
        &self.rows
    }

    /// Original row indices, ascending.
    pub fn indices(&self) -> Vec<RowIndex> {
        self.rows.iter().map(|row| row.index).collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render with the same schema as the per-fold tables.
    pub fn to_table(&self) -> Result<Dataset, FoldError> {
        render_table(&self.classes, self.rows.iter().map(|row| &row.entry))
    }
}

fn render_table<'a, I>(classes: &[LabelValue], entries: I) -> Result<Dataset, FoldError>
where
    I: Iterator<Item = &'a PredictionEntry>,
{
    let mut headers = vec![Y_TRUE_COLUMN.to_string(), Y_PRED_COLUMN.to_string()];
    headers.extend(classes.iter().cloned());
    let rows = entries
        .map(|entry| {
            let mut cells: Vec<Cell> = Vec::with_capacity(2 + entry.probabilities.len());
            cells.push(entry.y_true.clone());
            cells.push(entry.y_pred.clone());
            cells.extend(entry.probabilities.iter().map(|p| p.to_string()));
            cells
        })
        .collect();
    Dataset::new(headers, rows)
}

fn check_entry(entry: &PredictionEntry, class_count: usize) -> Result<(), String> {
    if entry.probabilities.len() != class_count {
        return Err(format!(
            "expected {class_count} probabilities, found {}",
            entry.probabilities.len()
        ));
    }
    if entry.probabilities.is_empty() {
        return Ok(());
    }
    if let Some(p) = entry
        .probabilities
        .iter()
        .find(|p| !p.is_finite() || **p < 0.0)
    {
        return Err(format!("probability {p} is negative or not finite"));
    }
    let sum: f64 = entry.probabilities.iter().sum();
    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        return Err(format!("probabilities sum to {sum:.6}, expected 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(y_true: &str, y_pred: &str, probabilities: &[f64]) -> PredictionEntry {
        PredictionEntry {
            y_true: y_true.to_string(),
            y_pred: y_pred.to_string(),
            probabilities: probabilities.to_vec(),
        }
    }

    fn table(headers: &[&str], rows: &[&[&str]]) -> Dataset {
        Dataset::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn parses_labels_and_probability_columns() {
        let raw = table(
            &["y_true", "y_pred", "baetis", "simulium"],
            &[&["baetis", "baetis", "0.9", "0.1"], &["simulium", "baetis", "0.6", "0.4"]],
        );
        let parsed = FoldPredictionTable::from_table(&raw, Path::new("f0.csv")).unwrap();
        assert_eq!(parsed.classes(), ["baetis", "simulium"]);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.entries()[1], entry("simulium", "baetis", &[0.6, 0.4]));
    }

    #[test]
    fn label_only_tables_are_accepted() {
        let raw = table(&["y_true", "y_pred"], &[&["a", "b"]]);
        let parsed = FoldPredictionTable::from_table(&raw, Path::new("tta.csv")).unwrap();
        assert!(parsed.classes().is_empty());
        assert!(parsed.entries()[0].probabilities.is_empty());
    }

    #[test]
    fn missing_label_column_is_malformed() {
        let raw = table(&["y_pred", "a"], &[&["a", "1.0"]]);
        let err = FoldPredictionTable::from_table(&raw, Path::new("bad.csv")).unwrap_err();
        assert!(matches!(err, FoldError::MalformedTable { ref details, .. } if details.contains("y_true")));
    }

    #[test]
    fn bad_probabilities_are_malformed() {
        let not_number = table(&["y_true", "y_pred", "a"], &[&["a", "a", "high"]]);
        let err = FoldPredictionTable::from_table(&not_number, Path::new("p.csv")).unwrap_err();
        assert!(matches!(err, FoldError::MalformedTable { ref details, .. } if details.contains("not a number")));

        let bad_sum = table(&["y_true", "y_pred", "a", "b"], &[&["a", "a", "0.7", "0.7"]]);
        let err = FoldPredictionTable::from_table(&bad_sum, Path::new("p.csv")).unwrap_err();
        assert!(matches!(err, FoldError::MalformedTable { ref details, .. } if details.contains("sum to")));

        let negative = table(&["y_true", "y_pred", "a", "b"], &[&["a", "a", "-0.5", "1.5"]]);
        let err = FoldPredictionTable::from_table(&negative, Path::new("p.csv")).unwrap_err();
        assert!(matches!(err, FoldError::MalformedTable { ref details, .. } if details.contains("negative")));
    }

    #[test]
    fn new_rejects_width_mismatch() {
        let err = FoldPredictionTable::new(vec!["a".into(), "b".into()], vec![entry("a", "a", &[1.0])])
            .unwrap_err();
        assert!(matches!(err, FoldError::Configuration(msg) if msg.contains("expected 2 probabilities")));
    }

    #[test]
    fn to_table_uses_prediction_schema() {
        let fold = FoldPredictionTable::new(
            vec!["a".into(), "b".into()],
            vec![entry("a", "b", &[0.25, 0.75])],
        )
        .unwrap();
        let rendered = fold.to_table().unwrap();
        assert_eq!(rendered.headers(), ["y_true", "y_pred", "a", "b"]);
        assert_eq!(rendered.rows()[0], vec!["a", "b", "0.25", "0.75"]);
        let reparsed = FoldPredictionTable::from_table(&rendered, Path::new("x.csv")).unwrap();
        assert_eq!(reparsed, fold);
    }

    #[test]
    fn class_map_check_covers_columns_and_labels() {
        let labels = LabelMap::from_labels(["a", "b"]).unwrap();
        let ok = FoldPredictionTable::new(
            vec!["a".into(), "b".into()],
            vec![entry("a", "b", &[0.5, 0.5])],
        )
        .unwrap();
        assert!(ok.check_classes(&labels).is_ok());

        let reordered = FoldPredictionTable::new(
            vec!["b".into(), "a".into()],
            vec![entry("a", "b", &[0.5, 0.5])],
        )
        .unwrap();
        assert!(reordered.check_classes(&labels).is_err());

        let unknown = FoldPredictionTable::new(Vec::new(), vec![entry("a", "z", &[])]).unwrap();
        assert!(matches!(
            unknown.check_classes(&labels),
            Err(FoldError::Configuration(msg)) if msg.contains("'z'")
        ));
    }

    #[test]
    fn unified_rows_are_sorted_by_index() {
        let unified = UnifiedPredictionTable::new(
            Vec::new(),
            vec![
                IndexedPrediction { index: 4, entry: entry("b", "b", &[]) },
                IndexedPrediction { index: 1, entry: entry("a", "a", &[]) },
            ],
        );
        assert_eq!(unified.indices(), vec![1, 4]);
        assert_eq!(unified.to_table().unwrap().column("y_true").unwrap(), vec!["a", "b"]);
    }
}
