use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::constants::predictions::{
    FOLD_DIR_PREFIX, PREDICTION_FILE_EXTENSION, PREDICTIONS_DIR,
};
use crate::constants::tables::{SPLITS_SUFFIX, TABLE_EXTENSION};
use crate::data::Dataset;
use crate::errors::FoldError;
use crate::types::FoldIndex;

/// Read a CSV file with a header row into a [`Dataset`].
pub fn read_dataset(path: &Path) -> Result<Dataset, FoldError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect::<Vec<_>>());
    }
    debug!(path = %path.display(), rows = rows.len(), "read table");
    Dataset::new(headers, rows).map_err(|err| FoldError::MalformedTable {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

/// Write `dataset` as CSV, creating parent directories as needed.
pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<(), FoldError> {
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(dataset.headers())?;
    for row in dataset.rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = dataset.len(), "wrote table");
    Ok(())
}

/// Write `value` as pretty-printed JSON, creating parent directories as needed.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), FoldError> {
    ensure_parent_dir(path)?;
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    debug!(path = %path.display(), "wrote json");
    Ok(())
}

/// `<out_folder>/<stem>_<N>splits_<label>.csv` for an input table `csv_path`.
pub fn augmented_output_path(
    csv_path: &Path,
    out_folder: &Path,
    fold_count: usize,
    label_column: &str,
) -> PathBuf {
    let stem = csv_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("dataset");
    out_folder.join(format!(
        "{stem}_{fold_count}{SPLITS_SUFFIX}_{label_column}.{TABLE_EXTENSION}"
    ))
}

/// Directory holding the outputs of fold `fold` under `model_folder`.
pub fn fold_dir(model_folder: &Path, fold: FoldIndex) -> PathBuf {
    model_folder.join(format!("{FOLD_DIR_PREFIX}{fold}"))
}

/// First prediction CSV (sorted path order) below the directory of `fold`.
///
/// With `filter`, only files whose name contains it are considered.
pub fn find_fold_prediction_file(
    model_folder: &Path,
    fold: FoldIndex,
    filter: Option<&str>,
) -> Result<PathBuf, FoldError> {
    let root = fold_dir(model_folder, fold);
    let mut candidates: Vec<PathBuf> = WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_prediction_file(path, filter))
        .collect();
    candidates.sort();
    match candidates.into_iter().next() {
        Some(path) => {
            debug!(fold, path = %path.display(), "found prediction file");
            Ok(path)
        }
        None => Err(FoldError::MissingFile { fold, path: root }),
    }
}

/// `<model_folder>/predictions/<model_folder_name>_<tag>.csv`.
pub fn unified_output_path(model_folder: &Path, tag: &str) -> PathBuf {
    let name = model_folder
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("model");
    model_folder
        .join(PREDICTIONS_DIR)
        .join(format!("{name}_{tag}.{PREDICTION_FILE_EXTENSION}"))
}

fn is_prediction_file(path: &Path, filter: Option<&str>) -> bool {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(PREDICTION_FILE_EXTENSION))
        .unwrap_or(false);
    let matches_filter = match filter {
        Some(needle) => path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.contains(needle))
            .unwrap_or(false),
        None => true,
    };
    is_csv && matches_filter
}

fn ensure_parent_dir(path: &Path) -> Result<(), FoldError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn dataset_round_trips_through_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("table.csv");
        let dataset = Dataset::new(
            vec!["image".into(), "taxon".into()],
            vec![
                vec!["a, b.png".into(), "baetis".into()],
                vec!["c.png".into(), "\"quoted\"".into()],
            ],
        )
        .unwrap();
        write_dataset(&path, &dataset).unwrap();
        assert_eq!(read_dataset(&path).unwrap(), dataset);
    }

    #[test]
    fn ragged_csv_is_reported_as_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ragged.csv");
        fs::write(&path, "a,b\n1,2\n3\n").unwrap();
        assert!(matches!(read_dataset(&path), Err(FoldError::Csv(_))));
    }

    #[test]
    fn json_sidecar_lands_in_new_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reports").join("folds.json");
        write_json(&path, &vec![1, 2, 3]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let parsed: Vec<u32> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, vec![1, 2, 3]);
    }

    #[test]
    fn augmented_path_follows_naming_convention() {
        let path = augmented_output_path(Path::new("/data/rodi.csv"), Path::new("out"), 5, "taxon");
        assert_eq!(path, PathBuf::from("out/rodi_5splits_taxon.csv"));
    }

    #[test]
    fn unified_path_uses_model_folder_name() {
        let path = unified_output_path(Path::new("/models/resnet50"), "aug-02");
        assert_eq!(
            path,
            PathBuf::from("/models/resnet50/predictions/resnet50_aug-02.csv")
        );
    }

    #[test]
    fn prediction_discovery_is_recursive_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        let nested = fold_dir(dir.path(), 1).join("predictions").join("aug");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("b_model.csv"), "y_true,y_pred\n").unwrap();
        fs::write(nested.join("a_tta_model.csv"), "y_true,y_pred\n").unwrap();
        fs::write(nested.join("notes.txt"), "ignored").unwrap();

        let first = find_fold_prediction_file(dir.path(), 1, None).unwrap();
        assert!(first.ends_with("a_tta_model.csv"));

        let filtered = find_fold_prediction_file(dir.path(), 1, Some("b_")).unwrap();
        assert!(filtered.ends_with("b_model.csv"));
    }

    #[test]
    fn missing_prediction_file_names_fold() {
        let dir = tempdir().unwrap();
        let err = find_fold_prediction_file(dir.path(), 3, None).unwrap_err();
        assert!(matches!(err, FoldError::MissingFile { fold: 3, ref path } if path.ends_with("f3")));
        assert!(err.to_string().contains("fold 3"));
    }
}
