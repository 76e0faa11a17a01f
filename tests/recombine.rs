use indexmap::IndexMap;
use tempfile::tempdir;

use crossfold::transport::fs::{fold_dir, write_dataset};
use crossfold::{
    AssignedRecords, Dataset, FoldAssigner, FoldAssignment, FoldConfig, FoldError,
    FoldPredictionTable, FoldRoles, PredictionEntry, PredictionRecombiner, RecombineConfig,
    RoleColumns, SplitRole,
};

/// Ten records: rows 0-4 are specimen A, rows 5-9 specimen B.
/// Fold 0 tests A, fold 1 tests B.
fn two_specimen_reference() -> Dataset {
    let rows = (0..10)
        .map(|row| {
            let (group, label, fold0, fold1) = if row < 5 {
                ("A", "mayfly", "test", "train")
            } else {
                ("B", "stonefly", "train", "test")
            };
            vec![
                format!("img_{row}.png"),
                label.to_string(),
                group.to_string(),
                fold0.to_string(),
                fold1.to_string(),
            ]
        })
        .collect();
    Dataset::new(
        vec![
            "image".into(),
            "taxon".into(),
            "individual".into(),
            "0".into(),
            "1".into(),
        ],
        rows,
    )
    .unwrap()
}

fn predictions(rows: impl IntoIterator<Item = usize>) -> FoldPredictionTable {
    FoldPredictionTable::new(
        vec!["mayfly".into(), "stonefly".into()],
        rows.into_iter()
            .map(|row| {
                let label = if row < 5 { "mayfly" } else { "stonefly" };
                PredictionEntry {
                    y_true: label.to_string(),
                    y_pred: format!("pred_{row}"),
                    probabilities: vec![0.5, 0.5],
                }
            })
            .collect(),
    )
    .unwrap()
}

fn recombiner(fold_count: usize) -> PredictionRecombiner {
    PredictionRecombiner::new(RecombineConfig {
        fold_count,
        ..RecombineConfig::default()
    })
    .unwrap()
}

fn check_original_order<R: FoldRoles>(roles: &R) {
    let unified = recombiner(2)
        .recombine(roles, vec![predictions(0..5), predictions(5..10)])
        .unwrap();
    assert_eq!(unified.indices(), (0..10).collect::<Vec<_>>());
    for row in unified.rows() {
        assert_eq!(row.entry.y_pred, format!("pred_{}", row.index));
    }
}

#[test]
fn role_columns_restore_original_order() {
    let reference = two_specimen_reference();
    check_original_order(&RoleColumns::new(&reference, 2).unwrap());
}

#[test]
fn in_memory_assignment_restores_original_order() {
    let reference = two_specimen_reference();
    let records = reference.records("taxon", "individual").unwrap();
    let folds: Vec<IndexMap<String, SplitRole>> = vec![
        [("A".to_string(), SplitRole::Test), ("B".to_string(), SplitRole::Train)]
            .into_iter()
            .collect(),
        [("A".to_string(), SplitRole::Train), ("B".to_string(), SplitRole::Test)]
            .into_iter()
            .collect(),
    ];
    let assignment = FoldAssignment::from_folds(folds).unwrap();
    check_original_order(&AssignedRecords::new(&assignment, &records));
}

#[test]
fn short_fold_table_is_an_alignment_error() {
    let reference = two_specimen_reference();
    let roles = RoleColumns::new(&reference, 2).unwrap();
    let err = recombiner(2)
        .recombine(&roles, vec![predictions(0..4), predictions(5..10)])
        .unwrap_err();
    assert!(matches!(
        err,
        FoldError::Alignment {
            fold: 0,
            expected: 5,
            actual: 4
        }
    ));
    assert!(err.to_string().contains("fold 0"));
}

#[test]
fn record_tested_twice_is_a_duplicate_index() {
    let mut rows: Vec<Vec<String>> = two_specimen_reference().rows().to_vec();
    rows[7][3] = "test".into();
    let reference = Dataset::new(two_specimen_reference().headers().to_vec(), rows).unwrap();
    let roles = RoleColumns::new(&reference, 2).unwrap();
    let fold0 = predictions([0, 1, 2, 3, 4, 7]);
    let err = recombiner(2)
        .recombine(&roles, vec![fold0, predictions(5..10)])
        .unwrap_err();
    assert!(matches!(
        err,
        FoldError::DuplicateIndex {
            index: 7,
            first_fold: 0,
            second_fold: 1
        }
    ));
}

#[test]
fn records_never_tested_are_absent() {
    let mut rows: Vec<Vec<String>> = two_specimen_reference().rows().to_vec();
    rows[9][4] = "val".into();
    let reference = Dataset::new(two_specimen_reference().headers().to_vec(), rows).unwrap();
    let roles = RoleColumns::new(&reference, 2).unwrap();
    let unified = recombiner(2)
        .recombine(&roles, vec![predictions(0..5), predictions(5..9)])
        .unwrap();
    assert_eq!(unified.indices(), (0..9).collect::<Vec<_>>());
}

#[test]
fn missing_fold_file_names_the_fold() {
    let dir = tempdir().unwrap();
    let model = dir.path().join("model");
    write_dataset(
        &fold_dir(&model, 0).join("predictions.csv"),
        &predictions(0..5).to_table().unwrap(),
    )
    .unwrap();
    let err = recombiner(2)
        .recombine_folder(&model, &two_specimen_reference())
        .unwrap_err();
    assert!(matches!(err, FoldError::MissingFile { fold: 1, .. }));
}

#[test]
fn assign_predict_and_recombine_through_the_filesystem() {
    let rows = (0..90)
        .map(|row| {
            let group = row / 3;
            let label = match group % 3 {
                0 => "baetis",
                1 => "hydropsyche",
                _ => "simulium",
            };
            vec![
                format!("img_{row}.png"),
                label.to_string(),
                format!("s{group:02}"),
            ]
        })
        .collect();
    let dataset = Dataset::new(
        vec!["image".into(), "taxon".into(), "individual".into()],
        rows,
    )
    .unwrap();
    let (_, augmented) = FoldAssigner::new(FoldConfig {
        label_column: "taxon".into(),
        group_column: "individual".into(),
        fold_count: 3,
        ..FoldConfig::default()
    })
    .unwrap()
    .assign_and_augment(&dataset)
    .unwrap();

    // Simulated inference: one prediction per test row, in input order.
    let dir = tempdir().unwrap();
    let model = dir.path().join("cnn");
    let roles = RoleColumns::new(&augmented, 3).unwrap();
    let taxa = augmented.column("taxon").unwrap();
    for fold in 0..3 {
        let entries = roles
            .test_rows(fold)
            .unwrap()
            .into_iter()
            .map(|row| PredictionEntry {
                y_true: taxa[row].to_string(),
                y_pred: taxa[row].to_string(),
                probabilities: Vec::new(),
            })
            .collect();
        let table = FoldPredictionTable::new(Vec::new(), entries).unwrap();
        write_dataset(
            &fold_dir(&model, fold).join("test_predictions.csv"),
            &table.to_table().unwrap(),
        )
        .unwrap();
    }

    let unified = recombiner(3).recombine_folder(&model, &augmented).unwrap();
    assert_eq!(unified.indices(), (0..90).collect::<Vec<_>>());
    for row in unified.rows() {
        assert_eq!(row.entry.y_true, taxa[row.index]);
    }
}
