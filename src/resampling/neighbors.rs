//! Brute-force k-nearest-neighbour search shared by the samplers

use ndarray::{Array2, ArrayView1};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Squared distance paired with a row index; ordered by distance, then index
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

pub(crate) fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).powi(2)).sum()
}

/// The `k` rows among `candidates` closest to row `query`, nearest first
///
/// `query` itself is skipped. Uses a bounded max-heap, O(n log k).
pub(crate) fn k_nearest(x: &Array2<f64>, query: usize, candidates: &[usize], k: usize) -> Vec<usize> {
    if k == 0 {
        return Vec::new();
    }
    let point = x.row(query);
    let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);

    for &i in candidates {
        if i == query {
            continue;
        }
        let d = DistIdx(squared_distance(point, x.row(i)), i);
        if heap.len() < k {
            heap.push(d);
        } else if let Some(top) = heap.peek() {
            if d < *top {
                heap.pop();
                heap.push(d);
            }
        }
    }

    heap.into_sorted_vec().into_iter().map(|DistIdx(_, i)| i).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_k_nearest_order_and_self_exclusion() {
        let x = Array2::from_shape_vec((5, 1), vec![0.0, 1.0, 3.0, 6.0, 10.0]).unwrap();
        let all: Vec<usize> = (0..5).collect();

        assert_eq!(k_nearest(&x, 1, &all, 2), vec![0, 2]);
        assert_eq!(k_nearest(&x, 4, &all, 3), vec![3, 2, 1]);
    }

    #[test]
    fn test_duplicates_are_neighbours() {
        let x = Array2::from_shape_vec((3, 1), vec![1.0, 1.0, 5.0]).unwrap();
        assert_eq!(k_nearest(&x, 0, &[0, 1, 2], 1), vec![1]);
    }

    #[test]
    fn test_k_larger_than_candidates() {
        let x = Array2::from_shape_vec((2, 1), vec![0.0, 1.0]).unwrap();
        assert_eq!(k_nearest(&x, 0, &[0, 1], 5), vec![1]);
    }
}
