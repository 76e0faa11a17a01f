use serde::Serialize;
use std::collections::BTreeMap;

use crate::predictions::{PredictionEntry, UnifiedPredictionTable};
use crate::types::LabelValue;

/// Label balance of a set of records.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelDistribution {
    /// Records across all labels.
    pub total: usize,
    /// Distinct labels counted.
    pub labels: usize,
    /// Share of the least frequent label.
    pub min_share: f64,
    /// Share of the most frequent label.
    pub max_share: f64,
    /// Largest over smallest label count; infinite when a label has no records.
    pub ratio: f64,
    /// Per-label breakdown, most frequent first.
    pub per_label: Vec<LabelShare>,
}

/// Count and share of one label.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelShare {
    /// Label value.
    pub label: LabelValue,
    /// Records carrying the label.
    pub count: usize,
    /// `count` over the distribution total.
    pub share: f64,
}

/// Compute label shares from per-label counts.
///
/// Entries are ordered by count, descending, then by label.
pub fn label_distribution<'a, I>(counts: I) -> Option<LabelDistribution>
where
    I: IntoIterator<Item = (&'a LabelValue, &'a usize)>,
{
    let counts: Vec<(&LabelValue, usize)> = counts
        .into_iter()
        .map(|(label, count)| (label, *count))
        .collect();
    let min = counts.iter().map(|(_, count)| *count).min()?;
    let max = counts.iter().map(|(_, count)| *count).max()?;
    let total: usize = counts.iter().map(|(_, count)| *count).sum();
    let share = |count: usize| {
        if total == 0 {
            0.0
        } else {
            count as f64 / total as f64
        }
    };
    let ratio = if min == 0 {
        f64::INFINITY
    } else {
        max as f64 / min as f64
    };
    let mut per_label: Vec<LabelShare> = counts
        .iter()
        .map(|(label, count)| LabelShare {
            label: (*label).clone(),
            count: *count,
            share: share(*count),
        })
        .collect();
    per_label.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    Some(LabelDistribution {
        total,
        labels: counts.len(),
        min_share: share(min),
        max_share: share(max),
        ratio,
        per_label,
    })
}

/// Precision, recall, and F1 of one label.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassScore {
    /// Label value.
    pub label: LabelValue,
    /// Number of samples whose ground truth is this label.
    pub support: usize,
    /// Correct predictions of the label over all predictions of it.
    pub precision: f64,
    /// Correct predictions of the label over its support.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
}

/// Headline scores of a prediction table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationSummary {
    /// Rows scored.
    pub samples: usize,
    /// Fraction of rows with `y_pred == y_true`.
    pub accuracy: f64,
    /// F1 averaged over labels, weighted by support.
    pub weighted_f1: f64,
    /// One entry per label seen as ground truth or prediction, sorted by label.
    pub per_class: Vec<ClassScore>,
}

#[derive(Default)]
struct Tally {
    true_positive: usize,
    false_positive: usize,
    false_negative: usize,
}

impl ClassificationSummary {
    /// Score `entries`; `None` when there are none.
    pub fn from_entries<'a, I>(entries: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a PredictionEntry>,
    {
        let mut tallies: BTreeMap<&str, Tally> = BTreeMap::new();
        let mut samples = 0usize;
        let mut correct = 0usize;
        for entry in entries {
            samples += 1;
            if entry.y_true == entry.y_pred {
                correct += 1;
                tallies.entry(entry.y_true.as_str()).or_default().true_positive += 1;
            } else {
                tallies.entry(entry.y_true.as_str()).or_default().false_negative += 1;
                tallies.entry(entry.y_pred.as_str()).or_default().false_positive += 1;
            }
        }
        if samples == 0 {
            return None;
        }

        let per_class: Vec<ClassScore> = tallies
            .into_iter()
            .map(|(label, tally)| {
                let support = tally.true_positive + tally.false_negative;
                let precision = ratio(tally.true_positive, tally.true_positive + tally.false_positive);
                let recall = ratio(tally.true_positive, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassScore {
                    label: label.to_string(),
                    support,
                    precision,
                    recall,
                    f1,
                }
            })
            .collect();
        let weighted_f1 = per_class
            .iter()
            .map(|score| score.f1 * score.support as f64)
            .sum::<f64>()
            / samples as f64;
        Some(Self {
            samples,
            accuracy: correct as f64 / samples as f64,
            weighted_f1,
            per_class,
        })
    }

    /// Score every row of a unified table.
    pub fn from_table(table: &UnifiedPredictionTable) -> Option<Self> {
        Self::from_entries(table.rows().iter().map(|row| &row.entry))
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
