use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of a reproducible train / hold-out partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldoutSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..rows` with `seed` and hold out `ceil(rows * test_fraction)`
/// rows, always leaving at least one row for training.
pub fn holdout_split(rows: usize, test_fraction: f64, seed: u64) -> HoldoutSplit {
    let mut indices: Vec<usize> = (0..rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let wanted = (rows as f64 * test_fraction.clamp(0.0, 1.0)).ceil() as usize;
    let test_len = wanted.min(rows.saturating_sub(1));

    let train = indices.split_off(test_len);
    HoldoutSplit {
        train,
        test: indices,
    }
}

pub(crate) fn select<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&idx| items[idx].clone()).collect()
}

pub(crate) fn build_design_matrix(features: &[Vec<f64>], width: usize) -> DMatrix<f64> {
    let rows = features.len();
    let mut buffer = Vec::with_capacity(rows * (width + 1));

    for row in features {
        buffer.push(1.0); // intercept
        buffer.extend(row.iter().copied());
    }

    DMatrix::from_row_slice(rows, width + 1, &buffer)
}
