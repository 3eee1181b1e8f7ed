//! Stratified train/test splitting

use crate::error::{FraudError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Row indices of a train/test partition
#[derive(Debug, Clone, PartialEq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Features and labels of a train/test partition
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<i64>,
    pub y_test: Array1<i64>,
    pub indices: SplitIndices,
}

/// Partition `y` into train/test indices preserving class proportions
///
/// The test side gets `ceil(test_size * n)` rows. Per-class test counts are
/// allocated proportionally with largest-remainder rounding; a class with
/// at least two rows always keeps one row on each side.
pub fn stratified_split(y: &Array1<i64>, test_size: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(FraudError::invalid_parameter(
            "test_size",
            test_size,
            "must be in (0, 1)",
        ));
    }

    let n = y.len();
    if n < 2 {
        return Err(FraudError::ValidationError(format!(
            "need at least 2 rows to split, got {}",
            n
        )));
    }

    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(FraudError::ValidationError(format!(
            "test_size {} leaves an empty partition for {} rows",
            test_size, n
        )));
    }

    let mut by_class: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let counts: Vec<usize> = by_class.values().map(Vec::len).collect();
    let allocation = allocate_test_counts(&counts, n_test);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);

    for (indices, &n_class_test) in by_class.values_mut().zip(allocation.iter()) {
        indices.shuffle(&mut rng);
        test.extend_from_slice(&indices[..n_class_test]);
        train.extend_from_slice(&indices[n_class_test..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    if train.is_empty() || test.is_empty() {
        return Err(FraudError::ValidationError(
            "stratified split produced an empty partition".to_string(),
        ));
    }

    Ok(SplitIndices { train, test })
}

/// Per-class test counts summing to `n_test` where feasible
fn allocate_test_counts(counts: &[usize], n_test: usize) -> Vec<usize> {
    let n: usize = counts.iter().sum();
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * n_test as f64 / n as f64)
        .collect();

    let mut alloc: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();

    // Largest remainder first; ties go to the larger class
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - exact[a].floor();
        let rb = exact[b] - exact[b].floor();
        rb.total_cmp(&ra).then(counts[b].cmp(&counts[a]))
    });
    let mut remaining = n_test.saturating_sub(alloc.iter().sum());
    for &i in order.iter().cycle().take(order.len() * 2) {
        if remaining == 0 {
            break;
        }
        if alloc[i] < counts[i] {
            alloc[i] += 1;
            remaining -= 1;
        }
    }

    let bounds: Vec<(usize, usize)> = counts
        .iter()
        .map(|&c| if c >= 2 { (1, c - 1) } else { (0, c) })
        .collect();
    for (a, &(lo, hi)) in alloc.iter_mut().zip(bounds.iter()) {
        *a = (*a).clamp(lo, hi);
    }

    // Clamping may have moved the total; nudge the classes furthest from their share
    loop {
        let total: usize = alloc.iter().sum();
        if total == n_test {
            break;
        }
        let candidate = if total > n_test {
            (0..alloc.len())
                .filter(|&i| alloc[i] > bounds[i].0)
                .max_by(|&a, &b| (alloc[a] as f64 - exact[a]).total_cmp(&(alloc[b] as f64 - exact[b])))
        } else {
            (0..alloc.len())
                .filter(|&i| alloc[i] < bounds[i].1)
                .max_by(|&a, &b| (exact[a] - alloc[a] as f64).total_cmp(&(exact[b] - alloc[b] as f64)))
        };
        match candidate {
            Some(i) if total > n_test => alloc[i] -= 1,
            Some(i) => alloc[i] += 1,
            None => break,
        }
    }

    alloc
}

/// Stratified split of a feature matrix and its labels
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<i64>,
    test_size: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    if x.nrows() != y.len() {
        return Err(FraudError::ShapeError {
            expected: format!("{} label rows", x.nrows()),
            actual: y.len().to_string(),
        });
    }

    let indices = stratified_split(y, test_size, seed)?;

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), &indices.train),
        x_test: x.select(Axis(0), &indices.test),
        y_train: y.select(Axis(0), &indices.train),
        y_test: y.select(Axis(0), &indices.test),
        indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n_neg: usize, n_pos: usize) -> Array1<i64> {
        Array1::from_iter(
            std::iter::repeat(0).take(n_neg).chain(std::iter::repeat(1).take(n_pos)),
        )
    }

    fn count(y: &Array1<i64>, idx: &[usize], class: i64) -> usize {
        idx.iter().filter(|&&i| y[i] == class).count()
    }

    #[test]
    fn test_split_sizes_and_proportions() {
        let y = labels(90, 10);
        let split = stratified_split(&y, 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        assert_eq!(count(&y, &split.test, 1), 2);
        assert_eq!(count(&y, &split.test, 0), 18);
    }

    #[test]
    fn test_split_is_a_partition() {
        let y = labels(37, 13);
        let split = stratified_split(&y, 0.3, 7).unwrap();

        let mut all: Vec<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_deterministic() {
        let y = labels(40, 10);
        let a = stratified_split(&y, 0.2, 42).unwrap();
        let b = stratified_split(&y, 0.2, 42).unwrap();
        let c = stratified_split(&y, 0.2, 43).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_rare_class_kept_on_both_sides() {
        let y = labels(48, 2);
        let split = stratified_split(&y, 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 10);
        assert_eq!(count(&y, &split.test, 1), 1);
        assert_eq!(count(&y, &split.train, 1), 1);
    }

    #[test]
    fn test_invalid_test_size() {
        let y = labels(5, 5);
        assert!(stratified_split(&y, 0.0, 42).is_err());
        assert!(stratified_split(&y, 1.0, 42).is_err());
        assert!(stratified_split(&y, f64::NAN, 42).is_err());
    }

    #[test]
    fn test_train_test_split_rows_follow_indices() {
        let x = Array2::from_shape_fn((10, 2), |(i, j)| (i * 10 + j) as f64);
        let y = labels(5, 5);
        let split = train_test_split(&x, &y, 0.2, 42).unwrap();

        assert_eq!(split.x_train.nrows(), 8);
        assert_eq!(split.x_test.nrows(), 2);
        for (row, &idx) in split.indices.test.iter().enumerate() {
            assert_eq!(split.x_test[[row, 0]], (idx * 10) as f64);
            assert_eq!(split.y_test[row], y[idx]);
        }
    }

    #[test]
    fn test_allocation_matches_total() {
        assert_eq!(allocate_test_counts(&[5, 5], 2), vec![1, 1]);
        assert_eq!(allocate_test_counts(&[7, 3], 8), vec![6, 2]);
        assert_eq!(allocate_test_counts(&[1, 9], 2), vec![0, 2]);
    }
}
