// src/score.rs

// Segment Scorer: one stratified shuffle split plus one forest
// fit/score per random state. Both the split and the forest take
// explicit seeds, so a (split seed, forest seed) pair pins the result.

use std::io;

use ndarray::{ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::forest::{RandomForest, ENSEMBLE_SIZE};

/// Split row indices into (train, test), drawing a `test_size` fraction
/// of each class so group proportions survive the split. Every class
/// keeps at least one row on each side, which requires at least two rows
/// per class.
pub fn stratified_split(
    y: &[usize],
    test_size: f64,
    rng: &mut ChaCha8Rng,
) -> io::Result<(Vec<usize>, Vec<usize>)> {
    let mut train = Vec::new();
    let mut test = Vec::new();
    for class in 0..2 {
        let mut members: Vec<usize> = y
            .iter()
            .enumerate()
            .filter(|(_, &label)| label == class)
            .map(|(index, _)| index)
            .collect();
        if members.len() < 2 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "stratified split needs at least 2 samples per group, group {} has {}",
                    class,
                    members.len()
                ),
            ));
        }
        members.shuffle(rng);
        let n_test = ((members.len() as f64 * test_size).round() as usize)
            .clamp(1, members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

/// Held-out accuracy of a fixed-size forest on one split of a segment's
/// bin columns. `y` holds 0/1 class codes aligned with the matrix rows.
pub fn segment_score(
    features: ArrayView2<u8>,
    y: &[usize],
    test_size: f64,
    split_seed: u64,
    forest_seed: u64,
) -> io::Result<f64> {
    let mut split_rng = ChaCha8Rng::seed_from_u64(split_seed);
    let (train, test) = stratified_split(y, test_size, &mut split_rng)?;

    let x_train = features.select(Axis(0), &train);
    let y_train: Vec<usize> = train.iter().map(|&index| y[index]).collect();
    let x_test = features.select(Axis(0), &test);
    let y_test: Vec<usize> = test.iter().map(|&index| y[index]).collect();

    let forest = RandomForest::fit(x_train.view(), &y_train, ENSEMBLE_SIZE, forest_seed);
    Ok(forest.score(x_test.view(), &y_test))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_preserves_group_proportions() {
        let y = vec![0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let (train, test) = stratified_split(&y, 0.5, &mut rng).unwrap();
        assert_eq!(train.len(), 6);
        assert_eq!(test.len(), 6);
        assert_eq!(test.iter().filter(|&&i| y[i] == 0).count(), 3);
        assert_eq!(test.iter().filter(|&&i| y[i] == 1).count(), 3);
    }

    #[test]
    fn split_is_deterministic_per_seed() {
        let y = vec![0, 1, 0, 1, 0, 1, 0, 1];
        let mut a = ChaCha8Rng::seed_from_u64(9);
        let mut b = ChaCha8Rng::seed_from_u64(9);
        assert_eq!(
            stratified_split(&y, 0.3, &mut a).unwrap(),
            stratified_split(&y, 0.3, &mut b).unwrap()
        );
    }

    #[test]
    fn split_keeps_at_least_one_test_row_per_group() {
        let y = vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 1];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let (_, test) = stratified_split(&y, 0.1, &mut rng).unwrap();
        assert!(test.iter().any(|&i| y[i] == 1));
        assert!(test.iter().any(|&i| y[i] == 0));
    }

    #[test]
    fn undersized_groups_are_an_error() {
        let y = vec![0, 0, 0, 1];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(stratified_split(&y, 0.3, &mut rng).is_err());
    }
}
