use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{PipelineError, Result};
use crate::record::{Feature, Record};
use crate::{Matrix, Vector};

/// Records as they were loaded, targets possibly missing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn n_samples(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn n_missing_targets(&self) -> usize {
        self.records.iter().filter(|r| !has_target(r)).count()
    }

    /// Drops every record without a target. A NaN target counts as missing.
    /// Feature values are left as they are.
    pub fn clean(self) -> CleanDataset {
        let before = self.records.len();
        let mut records = Vec::with_capacity(before);
        let mut targets = Vec::with_capacity(before);

        for record in self.records {
            match record.soil_pct {
                Some(target) if !target.is_nan() => {
                    targets.push(target);
                    records.push(record);
                }
                _ => {}
            }
        }

        let dropped = before - records.len();
        if dropped > 0 {
            info!("dropped {dropped} of {before} rows with no SOIL_PCT");
        }

        CleanDataset {
            records,
            targets: Vector::from(targets),
        }
    }
}

fn has_target(record: &Record) -> bool {
    record.soil_pct.is_some_and(|t| !t.is_nan())
}

impl FromIterator<Record> for Dataset {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Records that all carry a target value. Only produced by [`Dataset::clean`]
/// or by splitting another clean dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct CleanDataset {
    records: Vec<Record>,
    targets: Vector,
}

impl CleanDataset {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn targets(&self) -> &Vector {
        &self.targets
    }

    pub fn n_samples(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Row-major matrix of the selected features, one row per record.
    pub fn feature_matrix(&self, features: &[Feature]) -> Matrix {
        Matrix::from_shape_fn((self.records.len(), features.len()), |(i, j)| {
            self.records[i].value(features[j])
        })
    }

    /// Deterministic shuffled partition. `ceil(n * test_fraction)` rows go to
    /// the test side and the rest to training; the same seed always yields
    /// the same partition for the same input.
    pub fn split(&self, test_fraction: f64, seed: u64) -> Result<Split> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(PipelineError::InvalidFraction(test_fraction));
        }

        let n_samples = self.n_samples();
        let n_test = (n_samples as f64 * test_fraction).ceil() as usize;
        let n_train = n_samples.saturating_sub(n_test);

        if n_test == 0 || n_train == 0 {
            return Err(PipelineError::InsufficientData(format!(
                "cannot split {n_samples} rows with test fraction {test_fraction} into two non-empty sets"
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let (test_indices, train_indices) = indices.split_at(n_test);
        debug!("split {n_samples} rows into {n_train} train / {n_test} test (seed {seed})");

        Ok(Split {
            train: self.select(train_indices),
            test: self.select(test_indices),
        })
    }

    fn select(&self, indices: &[usize]) -> CleanDataset {
        CleanDataset {
            records: indices.iter().map(|&i| self.records[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }
}

impl From<CleanDataset> for Dataset {
    fn from(clean: CleanDataset) -> Self {
        Dataset::new(clean.records)
    }
}

/// Disjoint training and evaluation subsets of one clean dataset.
#[derive(Clone, Debug, PartialEq)]
pub struct Split {
    pub train: CleanDataset,
    pub test: CleanDataset,
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_dataset() -> impl Strategy<Value = Dataset> {
        prop::collection::vec(
            (5.0_f64..8.0, 200.0_f64..300.0, prop::option::of(0.0_f64..100.0)),
            0..60,
        )
        .prop_map(|rows| {
            // NPK_K carries the row index so every record is distinct
            rows.into_iter()
                .enumerate()
                .map(|(i, (ph, npk_n, target))| Record::new(ph, npk_n, 180.0, i as f64, 600.0, target))
                .collect()
        })
    }

    proptest! {
        /// Cleaning keeps exactly the labelled rows, targets aligned.
        #[test]
        fn prop_clean_keeps_only_labelled_rows(dataset in arb_dataset()) {
            let before = dataset.n_samples();
            let missing = dataset.n_missing_targets();
            let clean = dataset.clean();

            prop_assert!(clean.n_samples() <= before);
            prop_assert_eq!(clean.n_samples(), before - missing);
            prop_assert_eq!(clean.targets().len(), clean.n_samples());
            for (record, &target) in clean.records().iter().zip(clean.targets().iter()) {
                prop_assert_eq!(record.soil_pct, Some(target));
            }
        }

        /// A split is a deterministic partition sized by `ceil(n * fraction)`.
        #[test]
        fn prop_split_partitions_deterministically(
            dataset in arb_dataset(),
            fraction in 0.05_f64..0.95,
            seed in any::<u64>()
        ) {
            let clean = dataset.clean();
            let n = clean.n_samples();
            let n_test = (n as f64 * fraction).ceil() as usize;

            match clean.split(fraction, seed) {
                Ok(split) => {
                    prop_assert_eq!(split.test.n_samples(), n_test);
                    prop_assert_eq!(split.train.n_samples() + split.test.n_samples(), n);
                    prop_assert_eq!(&split, &clean.split(fraction, seed).unwrap());

                    let mut seen: Vec<f64> = split
                        .train
                        .records()
                        .iter()
                        .chain(split.test.records())
                        .map(|r| r.npk_k)
                        .collect();
                    seen.sort_by(f64::total_cmp);
                    let expected: Vec<f64> = clean.records().iter().map(|r| r.npk_k).collect();
                    prop_assert_eq!(seen, expected);
                }
                Err(err) => {
                    prop_assert!(n_test == 0 || n_test >= n);
                    prop_assert!(matches!(err, PipelineError::InsufficientData(_)));
                }
            }
        }
    }
}
