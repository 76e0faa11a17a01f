use serde::{Deserialize, Serialize};

use crate::errors::FoldError;
use crate::types::{Cell, ColumnName, GroupId, LabelValue, RowIndex};

/// Ordered tabular dataset: a header plus rows of raw cells.
///
/// Row order defines the `RowIndex` used when predictions are re-assembled, so
/// no operation in this crate reorders rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    headers: Vec<ColumnName>,
    rows: Vec<Vec<Cell>>,
}

/// Columns of one dataset row relevant to fold assignment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Position of the row in the original dataset.
    pub index: RowIndex,
    /// Group the row belongs to.
    pub group: GroupId,
    /// Class label of the row.
    pub label: LabelValue,
}

impl Dataset {
    /// Build a dataset, rejecting rows whose width differs from the header.
    pub fn new(headers: Vec<ColumnName>, rows: Vec<Vec<Cell>>) -> Result<Self, FoldError> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(FoldError::Configuration(format!(
                "row {idx} has {} cells but the header has {} columns",
                row.len(),
                headers.len()
            )));
        }
        Ok(Self { headers, rows })
    }

    /// Column names in file order.
    pub fn headers(&self) -> &[ColumnName] {
        &self.headers
    }

    /// Rows in original order.
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the column named `name`.
    pub fn column_index(&self, name: &str) -> Result<usize, FoldError> {
        self.headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| FoldError::Configuration(format!("column '{name}' does not exist")))
    }

    /// Cells of the column named `name`, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&str>, FoldError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Extract `(index, group, label)` for every row.
    pub fn records(&self, label_column: &str, group_column: &str) -> Result<Vec<Record>, FoldError> {
        if self.is_empty() {
            return Err(FoldError::Configuration("dataset is empty".to_string()));
        }
        let label_idx = self.column_index(label_column)?;
        let group_idx = self.column_index(group_column)?;
        Ok(self
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| Record {
                index,
                group: row[group_idx].clone(),
                label: row[label_idx].clone(),
            })
            .collect())
    }

    /// Return a copy with `columns` appended after the existing ones.
    ///
    /// Fails when a new column name already exists or a column length differs
    /// from the row count.
    pub fn with_appended_columns(
        &self,
        columns: Vec<(ColumnName, Vec<Cell>)>,
    ) -> Result<Self, FoldError> {
        let mut headers = self.headers.clone();
        for (name, cells) in &columns {
            if headers.contains(name) {
                return Err(FoldError::Configuration(format!(
                    "column '{name}' already exists"
                )));
            }
            if cells.len() != self.rows.len() {
                return Err(FoldError::Configuration(format!(
                    "column '{name}' has {} cells but the dataset has {} rows",
                    cells.len(),
                    self.rows.len()
                )));
            }
            headers.push(name.clone());
        }
        let mut rows = self.rows.clone();
        for (_, cells) in columns {
            for (row, cell) in rows.iter_mut().zip(cells) {
                row.push(cell);
            }
        }
        Ok(Self { headers, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(
            vec!["image".into(), "taxon".into(), "individual".into()],
            vec![
                vec!["a.png".into(), "baetis".into(), "s1".into()],
                vec!["b.png".into(), "hydropsyche".into(), "s2".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_ragged_rows() {
        let err = Dataset::new(vec!["a".into(), "b".into()], vec![vec!["1".into()]]).unwrap_err();
        assert!(matches!(err, FoldError::Configuration(msg) if msg.contains("row 0")));
    }

    #[test]
    fn records_follow_row_order() {
        let records = sample().records("taxon", "individual").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].index, 0);
        assert_eq!(records[1].group, "s2");
        assert_eq!(records[1].label, "hydropsyche");
    }

    #[test]
    fn missing_column_is_a_configuration_error() {
        let err = sample().records("order", "individual").unwrap_err();
        assert!(matches!(err, FoldError::Configuration(msg) if msg.contains("'order'")));
    }

    #[test]
    fn empty_dataset_has_no_records() {
        let empty = Dataset::new(vec!["taxon".into(), "individual".into()], Vec::new()).unwrap();
        assert!(empty.is_empty());
        assert!(empty.records("taxon", "individual").is_err());
    }

    #[test]
    fn appended_columns_keep_existing_cells() {
        let augmented = sample()
            .with_appended_columns(vec![("0".into(), vec!["train".into(), "test".into()])])
            .unwrap();
        assert_eq!(augmented.headers().last().map(String::as_str), Some("0"));
        assert_eq!(augmented.rows()[1], vec!["b.png", "hydropsyche", "s2", "test"]);
        assert_eq!(augmented.column("0").unwrap(), vec!["train", "test"]);
    }

    #[test]
    fn appended_columns_reject_duplicates_and_bad_lengths() {
        let dup = sample()
            .with_appended_columns(vec![("taxon".into(), vec!["x".into(), "y".into()])])
            .unwrap_err();
        assert!(matches!(dup, FoldError::Configuration(msg) if msg.contains("already exists")));

        let short = sample()
            .with_appended_columns(vec![("0".into(), vec!["train".into()])])
            .unwrap_err();
        assert!(matches!(short, FoldError::Configuration(msg) if msg.contains("1 cells")));
    }
}
