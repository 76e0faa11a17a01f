//! Majority-vote collapsing of test-time-augmentation passes.
//!
//! A TTA run emits `passes × samples` predictions, pass-major: all samples of
//! pass 0, then all samples of pass 1, and so on.

use std::collections::BTreeMap;
use tracing::debug;

use crate::errors::FoldError;
use crate::predictions::{FoldPredictionTable, PredictionEntry};
use crate::types::LabelValue;

/// Per-sample mode of a pass-major label stream.
///
/// Ties go to the lexicographically smallest label.
pub fn collapse_votes<S>(labels: &[S], passes: usize) -> Result<Vec<LabelValue>, FoldError>
where
    S: AsRef<str>,
{
    let samples = samples_per_pass(labels.len(), passes)?;
    let mut collapsed = Vec::with_capacity(samples);
    for sample in 0..samples {
        let mut votes: BTreeMap<&str, usize> = BTreeMap::new();
        for pass in 0..passes {
            *votes.entry(labels[pass * samples + sample].as_ref()).or_default() += 1;
        }
        // BTreeMap iterates labels ascending; keep the first maximum.
        let mut winner: Option<(&str, usize)> = None;
        for (label, count) in votes {
            if winner.is_none_or(|(_, best)| count > best) {
                winner = Some((label, count));
            }
        }
        if let Some((label, _)) = winner {
            collapsed.push(label.to_string());
        }
    }
    Ok(collapsed)
}

/// Collapse a TTA prediction table to one label-only entry per sample.
///
/// The ground truth of a sample must be identical in every pass.
pub fn collapse_tta_table(
    table: &FoldPredictionTable,
    passes: usize,
) -> Result<FoldPredictionTable, FoldError> {
    let entries = table.entries();
    let samples = samples_per_pass(entries.len(), passes)?;
    for (idx, entry) in entries.iter().enumerate().skip(samples) {
        let first = &entries[idx % samples];
        if entry.y_true != first.y_true {
            return Err(FoldError::Configuration(format!(
                "sample {}: ground truth '{}' in pass {} differs from '{}' in pass 0",
                idx % samples,
                entry.y_true,
                idx / samples,
                first.y_true
            )));
        }
    }
    let predicted: Vec<&str> = entries.iter().map(|entry| entry.y_pred.as_str()).collect();
    let votes = collapse_votes(&predicted, passes)?;
    let collapsed = entries[..samples]
        .iter()
        .zip(votes)
        .map(|(entry, y_pred)| PredictionEntry {
            y_true: entry.y_true.clone(),
            y_pred,
            probabilities: Vec::new(),
        })
        .collect();
    debug!(passes, samples, "collapsed tta predictions");
    FoldPredictionTable::new(Vec::new(), collapsed)
}

fn samples_per_pass(len: usize, passes: usize) -> Result<usize, FoldError> {
    if passes == 0 {
        return Err(FoldError::Configuration(
            "tta pass count must be greater than zero".to_string(),
        ));
    }
    if len % passes != 0 {
        return Err(FoldError::Configuration(format!(
            "{len} predictions cannot be split into {passes} equal passes"
        )));
    }
    Ok(len / passes)
}
