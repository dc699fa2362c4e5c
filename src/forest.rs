// src/forest.rs

// The ensemble classifier behind the segment scorer: a random forest of
// Gini-split decision trees over binary call features, grown on
// bootstrap samples. Training is fully driven by the caller's seed, so
// identical inputs and seed give an identical forest.

use ndarray::{ArrayView1, ArrayView2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Number of trees in every forest.
pub const ENSEMBLE_SIZE: usize = 200;

// Minimum Gini gain for a split to be worth keeping.
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone)]
enum Node {
    Leaf { class: usize },
    Split { feature: usize, left: usize, right: usize },
}

/// One CART tree grown on a bootstrap sample. Features are binarized
/// calls, so every split sends value 0 left and value 1 right.
#[derive(Debug, Clone)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn fit(
        x: ArrayView2<u8>,
        y: &[usize],
        rows: &[usize],
        m_try: usize,
        rng: &mut ChaCha8Rng,
    ) -> DecisionTree {
        let mut tree = DecisionTree { nodes: Vec::new() };
        tree.grow(x, y, rows, m_try, rng);
        tree
    }

    fn grow(
        &mut self,
        x: ArrayView2<u8>,
        y: &[usize],
        rows: &[usize],
        m_try: usize,
        rng: &mut ChaCha8Rng,
    ) -> usize {
        let counts = class_counts(y, rows);
        let majority = usize::from(counts[1] > counts[0]);
        if counts[0] == 0 || counts[1] == 0 {
            return self.push(Node::Leaf { class: majority });
        }

        let n_features = x.ncols();
        let candidates = rand::seq::index::sample(rng, n_features, m_try.min(n_features));

        let total = rows.len() as f64;
        let parent_gini = gini(&counts);
        let mut best: Option<(usize, f64)> = None;
        for feature in candidates {
            let mut left = [0usize; 2];
            let mut right = [0usize; 2];
            for &row in rows {
                if x[[row, feature]] == 0 {
                    left[y[row]] += 1;
                } else {
                    right[y[row]] += 1;
                }
            }
            let n_left = (left[0] + left[1]) as f64;
            let n_right = (right[0] + right[1]) as f64;
            if n_left == 0.0 || n_right == 0.0 {
                continue;
            }
            let weighted = (n_left / total) * gini(&left) + (n_right / total) * gini(&right);
            let gain = parent_gini - weighted;
            if gain > MIN_GAIN && best.map_or(true, |(_, g)| gain > g) {
                best = Some((feature, gain));
            }
        }

        let Some((feature, _)) = best else {
            return self.push(Node::Leaf { class: majority });
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.iter().copied().partition(|&row| x[[row, feature]] == 0);

        // Reserve the split slot first so child indices land after it.
        let node = self.push(Node::Leaf { class: majority });
        let left = self.grow(x, y, &left_rows, m_try, rng);
        let right = self.grow(x, y, &right_rows, m_try, rng);
        self.nodes[node] = Node::Split { feature, left, right };
        node
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn predict_row(&self, row: ArrayView1<u8>) -> usize {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { class } => return *class,
                Node::Split { feature, left, right } => {
                    at = if row[*feature] == 0 { *left } else { *right };
                }
            }
        }
    }
}

fn class_counts(y: &[usize], rows: &[usize]) -> [usize; 2] {
    let mut counts = [0usize; 2];
    for &row in rows {
        counts[y[row]] += 1;
    }
    counts
}

fn gini(counts: &[usize; 2]) -> f64 {
    let total = (counts[0] + counts[1]) as f64;
    if total == 0.0 {
        return 0.0;
    }
    let p0 = counts[0] as f64 / total;
    let p1 = counts[1] as f64 / total;
    1.0 - p0 * p0 - p1 * p1
}

/// A majority-vote ensemble of [`ENSEMBLE_SIZE`]-style trees.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Grow `n_trees` trees, each on a bootstrap sample of the training
    /// rows, considering sqrt(n_features) candidate features per split.
    pub fn fit(x: ArrayView2<u8>, y: &[usize], n_trees: usize, seed: u64) -> RandomForest {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n = x.nrows();
        if n == 0 {
            return RandomForest { trees: Vec::new() };
        }
        let m_try = ((x.ncols() as f64).sqrt().round() as usize).max(1);
        let mut trees = Vec::with_capacity(n_trees);
        for _ in 0..n_trees {
            let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            trees.push(DecisionTree::fit(x, y, &rows, m_try, &mut rng));
        }
        RandomForest { trees }
    }

    /// Class receiving the most tree votes; ties go to class 0.
    pub fn predict(&self, row: ArrayView1<u8>) -> usize {
        let mut votes = [0usize; 2];
        for tree in &self.trees {
            votes[tree.predict_row(row)] += 1;
        }
        usize::from(votes[1] > votes[0])
    }

    /// Fraction of rows whose predicted class matches `y`.
    pub fn score(&self, x: ArrayView2<u8>, y: &[usize]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        let correct = x
            .outer_iter()
            .zip(y)
            .filter(|(row, &label)| self.predict(row.view()) == label)
            .count();
        correct as f64 / y.len() as f64
    }
}
