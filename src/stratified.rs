//! Stratified, grouped K-fold allocation.
//!
//! Groups are allocated greedily to folds so that, for every class, the share
//! of that class landing in each fold is as even as possible:
//!
//! 1) Count records per (group, class); groups start in sorted order.
//! 2) Shuffle the groups with the seeded RNG, then stable-sort them by the
//!    standard deviation of their class-count vector, most skewed first.
//! 3) Put each group in the fold minimizing the mean (over classes) of the
//!    standard deviation (over folds) of `fold_class_count / class_total`.
//!    Near-ties go to the fold holding fewer records, then the lower index.
//!
//! The result is approximate by nature: proportions are balanced as well as
//! whole groups allow, never exactly.

use indexmap::IndexMap;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::config::DegeneratePolicy;
use crate::constants::folds::{FOLD_EVAL_TOLERANCE, MIN_FOLD_COUNT};
use crate::data::Record;
use crate::errors::FoldError;
use crate::labels::LabelMap;
use crate::rng::DeterministicRng;
use crate::types::GroupId;

/// Grouped K-fold splitter that balances label proportions across folds.
#[derive(Clone, Debug)]
pub struct StratifiedGroupKFold<'a> {
    fold_count: usize,
    seed: u64,
    policy: DegeneratePolicy,
    allow_empty_folds: bool,
    labels: &'a LabelMap,
}

impl<'a> StratifiedGroupKFold<'a> {
    /// Create a splitter over the classes of `labels`.
    pub fn new(fold_count: usize, seed: u64, labels: &'a LabelMap) -> Self {
        Self {
            fold_count,
            seed,
            policy: DegeneratePolicy::Reject,
            allow_empty_folds: false,
            labels,
        }
    }

    /// Set how classes smaller than the fold count are handled.
    pub fn with_policy(mut self, policy: DegeneratePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Accept fewer groups than folds; the surplus folds stay empty.
    pub fn allowing_empty_folds(mut self) -> Self {
        self.allow_empty_folds = true;
        self
    }

    /// Allocate the groups of `records` to folds.
    ///
    /// Returns one sorted group list per fold. Every group appears in exactly
    /// one list. Fold 0 receives the first allocated group, so it is empty
    /// only when there are no groups at all.
    pub fn split<'r, I>(&self, records: I) -> Result<Vec<Vec<GroupId>>, FoldError>
    where
        I: IntoIterator<Item = &'r Record>,
    {
        if self.fold_count < MIN_FOLD_COUNT {
            return Err(FoldError::Configuration(format!(
                "fold count must be at least {MIN_FOLD_COUNT}, got {}",
                self.fold_count
            )));
        }

        let class_count = self.labels.len();
        let mut group_counts: IndexMap<GroupId, Vec<usize>> = IndexMap::new();
        let mut class_totals = vec![0usize; class_count];
        for record in records {
            let class = self.labels.index_of(&record.label).ok_or_else(|| {
                FoldError::Configuration(format!(
                    "row {}: label '{}' is not in the class map",
                    record.index, record.label
                ))
            })?;
            group_counts
                .entry(record.group.clone())
                .or_insert_with(|| vec![0; class_count])[class] += 1;
            class_totals[class] += 1;
        }
        group_counts.sort_keys();

        if !self.allow_empty_folds && group_counts.len() < self.fold_count {
            return Err(FoldError::Configuration(format!(
                "fold count {} is greater than the number of groups ({})",
                self.fold_count,
                group_counts.len()
            )));
        }
        self.check_class_sizes(&class_totals)?;

        let order = self.allocation_order(&group_counts);
        let mut fold_class_counts = vec![vec![0usize; class_count]; self.fold_count];
        let mut fold_sizes = vec![0usize; self.fold_count];
        let mut folds: Vec<Vec<GroupId>> = vec![Vec::new(); self.fold_count];

        for group_idx in order {
            let Some((group, counts)) = group_counts.get_index(group_idx) else {
                continue;
            };
            let best = best_fold(counts, &class_totals, &mut fold_class_counts, &fold_sizes);
            for (class, count) in counts.iter().enumerate() {
                fold_class_counts[best][class] += count;
            }
            fold_sizes[best] += counts.iter().sum::<usize>();
            folds[best].push(group.clone());
        }

        for (fold, groups) in folds.iter_mut().enumerate() {
            groups.sort();
            if groups.is_empty() && !self.allow_empty_folds {
                warn!(fold, "fold received no groups");
            }
            debug!(fold, groups = groups.len(), records = fold_sizes[fold], "fold allocated");
        }
        Ok(folds)
    }

    fn check_class_sizes(&self, class_totals: &[usize]) -> Result<(), FoldError> {
        for (class, total) in class_totals.iter().enumerate() {
            if *total == 0 || *total >= self.fold_count {
                continue;
            }
            let label = self
                .labels
                .label_of(class)
                .map(String::as_str)
                .unwrap_or("?");
            match self.policy {
                DegeneratePolicy::Reject => {
                    return Err(FoldError::Configuration(format!(
                        "label '{label}' has only {total} records, fewer than the fold count {}",
                        self.fold_count
                    )));
                }
                DegeneratePolicy::Warn => {
                    warn!(
                        label,
                        records = total,
                        folds = self.fold_count,
                        "label has fewer records than folds; its proportions will be skewed"
                    );
                }
            }
        }
        Ok(())
    }

    fn allocation_order(&self, group_counts: &IndexMap<GroupId, Vec<usize>>) -> Vec<usize> {
        let spreads: Vec<f64> = group_counts
            .values()
            .map(|counts| {
                let values: Vec<f64> = counts.iter().map(|count| *count as f64).collect();
                population_std(&values)
            })
            .collect();
        let mut order: Vec<usize> = (0..group_counts.len()).collect();
        order.shuffle(&mut DeterministicRng::new(self.seed));
        order.sort_by(|a, b| spreads[*b].total_cmp(&spreads[*a]));
        order
    }
}

fn best_fold(
    group: &[usize],
    class_totals: &[usize],
    fold_class_counts: &mut [Vec<usize>],
    fold_sizes: &[usize],
) -> usize {
    let mut best = 0;
    let mut best_eval = f64::INFINITY;
    let mut best_size = usize::MAX;
    for fold in 0..fold_class_counts.len() {
        add_counts(&mut fold_class_counts[fold], group);
        let eval = allocation_spread(fold_class_counts, class_totals);
        sub_counts(&mut fold_class_counts[fold], group);

        let size = fold_sizes[fold];
        // Scores within the tolerance tie even when marginally lower; only a
        // smaller fold size moves the choice to a later fold.
        let tied = (eval - best_eval).abs() <= FOLD_EVAL_TOLERANCE;
        if (!tied && eval < best_eval) || (tied && size < best_size) {
            best = fold;
            best_eval = eval;
            best_size = size;
        }
    }
    best
}

/// Mean over present classes of the std (over folds) of per-fold class shares.
fn allocation_spread(fold_class_counts: &[Vec<usize>], class_totals: &[usize]) -> f64 {
    let mut total = 0.0;
    let mut present = 0usize;
    let mut shares = Vec::with_capacity(fold_class_counts.len());
    for (class, class_total) in class_totals.iter().enumerate() {
        if *class_total == 0 {
            continue;
        }
        shares.clear();
        shares.extend(
            fold_class_counts
                .iter()
                .map(|counts| counts[class] as f64 / *class_total as f64),
        );
        total += population_std(&shares);
        present += 1;
    }
    if present == 0 { 0.0 } else { total / present as f64 }
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

fn add_counts(target: &mut [usize], delta: &[usize]) {
    for (slot, value) in target.iter_mut().zip(delta) {
        *slot += value;
    }
}

fn sub_counts(target: &mut [usize], delta: &[usize]) {
    for (slot, value) in target.iter_mut().zip(delta) {
        *slot -= value;
    }
}
