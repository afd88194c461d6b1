use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::error::ShapeMismatch;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaling {
    pub feature: String,
    pub mean: f64,
    pub std_dev: f64,
}

/// Per-column standardisation fitted on the training split.
///
/// Columns with zero variance keep a unit divisor, so they transform to
/// `x - mean` instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    stats: Vec<FeatureScaling>,
}

impl StandardScaler {
    pub fn fit(data: &[Vec<f64>], feature_names: &[String]) -> Result<Self> {
        let row_count = data.len();
        ensure!(row_count > 0, "no feature rows to analyze");

        let feature_count = feature_names.len();
        for (idx, row) in data.iter().enumerate() {
            ensure!(
                row.len() == feature_count,
                "row {} has {} features, expected {}",
                idx,
                row.len(),
                feature_count
            );
        }

        let mut stats = Vec::with_capacity(feature_count);
        for (j, feature) in feature_names.iter().enumerate() {
            let mut sum = 0.0;
            for row in data {
                sum += row[j];
            }
            let mean = sum / row_count as f64;

            let mut variance_sum = 0.0;
            for row in data {
                let diff = row[j] - mean;
                variance_sum += diff * diff;
            }

            let std_dev = (variance_sum / row_count as f64).sqrt();
            let std_dev = if std_dev.is_finite() && std_dev > 0.0 {
                std_dev
            } else {
                1.0
            };

            stats.push(FeatureScaling {
                feature: feature.clone(),
                mean,
                std_dev,
            });
        }

        Ok(Self { stats })
    }

    pub fn stats(&self) -> &[FeatureScaling] {
        &self.stats
    }

    pub fn width(&self) -> usize {
        self.stats.len()
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ShapeMismatch> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(&self.stats)
            .map(|(value, stat)| (value - stat.mean) / stat.std_dev)
            .collect())
    }

    pub fn transform_rows(&self, data: &mut [Vec<f64>]) -> Result<(), ShapeMismatch> {
        for row in data.iter() {
            self.check_width(row.len())?;
        }
        for row in data.iter_mut() {
            for (value, stat) in row.iter_mut().zip(&self.stats) {
                *value = (*value - stat.mean) / stat.std_dev;
            }
        }
        Ok(())
    }

    fn check_width(&self, got: usize) -> Result<(), ShapeMismatch> {
        if got == self.stats.len() {
            Ok(())
        } else {
            Err(ShapeMismatch {
                expected: self.stats.len(),
                got,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("x{i}")).collect()
    }

    #[test]
    fn fit_uses_population_statistics() {
        let data = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
        let scaler = StandardScaler::fit(&data, &names(2)).expect("fit");

        assert_abs_diff_eq!(scaler.stats()[0].mean, 2.0);
        assert_abs_diff_eq!(scaler.stats()[0].std_dev, 1.0);
        // constant column keeps a unit divisor
        assert_abs_diff_eq!(scaler.stats()[1].std_dev, 1.0);

        let scaled = scaler.transform(&[3.0, 12.0]).expect("transform");
        assert_abs_diff_eq!(scaled[0], 1.0);
        assert_abs_diff_eq!(scaled[1], 2.0);
    }

    #[test]
    fn transform_rejects_wrong_width() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0]], &names(2)).expect("fit");
        let err = scaler.transform(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err, ShapeMismatch { expected: 2, got: 3 });
    }

    #[test]
    fn transform_rows_matches_single_transform() {
        let mut data = vec![vec![1.0, 4.0], vec![5.0, 8.0], vec![9.0, 0.0]];
        let scaler = StandardScaler::fit(&data, &names(2)).expect("fit");
        let expected = scaler.transform(&data[1]).expect("transform");

        scaler.transform_rows(&mut data).expect("transform rows");
        assert_eq!(data[1], expected);
    }

    #[test]
    fn fit_rejects_empty_and_ragged_input() {
        assert!(StandardScaler::fit(&[], &names(1)).is_err());
        assert!(StandardScaler::fit(&[vec![1.0]], &names(2)).is_err());
    }
}
