//! Weighted CART decision tree, the building block of both tree ensembles.

use crate::types::NUM_CLASSES;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Tree growth parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 8,
            min_samples_split: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        probs: [f64; NUM_CLASSES],
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A single gini-split decision tree over weighted samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Node,
    /// Gini-decrease importance per feature, normalized to sum 1.
    importance: Vec<f64>,
}

impl DecisionTree {
    /// Grow a tree on (optionally weighted) samples restricted to `indices`.
    ///
    /// When `feature_subsample` is set, each split considers only that many
    /// randomly chosen features (random-forest style decorrelation).
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        weights: &[f64],
        indices: &[usize],
        params: TreeParams,
        feature_subsample: Option<usize>,
        rng: &mut StdRng,
    ) -> Self {
        let num_features = x[0].len();
        let mut importance = vec![0.0; num_features];
        let root_weight: f64 = indices.iter().map(|&i| weights[i]).sum();
        let root = build_node(
            x,
            y,
            weights,
            indices,
            0,
            params,
            feature_subsample,
            rng,
            root_weight.max(f64::MIN_POSITIVE),
            &mut importance,
        );
        let total: f64 = importance.iter().sum();
        if total > 0.0 {
            for v in &mut importance {
                *v /= total;
            }
        }
        Self { root, importance }
    }

    /// Class probabilities at the leaf this sample falls into.
    pub fn predict_proba_one(&self, row: &[f64]) -> [f64; NUM_CLASSES] {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { probs } => return *probs,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row.get(*feature).copied().unwrap_or(0.0) <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Hard label at the leaf, ties toward the lowest class.
    pub fn predict_one(&self, row: &[f64]) -> usize {
        super::argmax(&self.predict_proba_one(row))
    }

    pub fn importance(&self) -> &[f64] {
        &self.importance
    }
}

/// Weighted class totals over a set of sample indices.
fn class_weights(y: &[usize], weights: &[f64], indices: &[usize]) -> [f64; NUM_CLASSES] {
    let mut totals = [0.0; NUM_CLASSES];
    for &i in indices {
        totals[y[i]] += weights[i];
    }
    totals
}

/// Gini impurity of a weighted class distribution.
fn gini(totals: &[f64; NUM_CLASSES]) -> f64 {
    let sum: f64 = totals.iter().sum();
    if sum <= 0.0 {
        return 0.0;
    }
    1.0 - totals.iter().map(|&w| (w / sum) * (w / sum)).sum::<f64>()
}

fn leaf_from(totals: [f64; NUM_CLASSES]) -> Node {
    let sum: f64 = totals.iter().sum();
    let probs = if sum > 0.0 {
        [totals[0] / sum, totals[1] / sum, totals[2] / sum]
    } else {
        [1.0 / NUM_CLASSES as f64; NUM_CLASSES]
    };
    Node::Leaf { probs }
}

#[allow(clippy::too_many_arguments)]
fn build_node(
    x: &[Vec<f64>],
    y: &[usize],
    weights: &[f64],
    indices: &[usize],
    depth: usize,
    params: TreeParams,
    feature_subsample: Option<usize>,
    rng: &mut StdRng,
    root_weight: f64,
    importance: &mut [f64],
) -> Node {
    let totals = class_weights(y, weights, indices);
    let node_gini = gini(&totals);
    let node_weight: f64 = totals.iter().sum();

    if depth >= params.max_depth
        || indices.len() < params.min_samples_split
        || node_gini == 0.0
    {
        return leaf_from(totals);
    }

    // Choose the feature set for this split.
    let num_features = x[0].len();
    let mut features: Vec<usize> = (0..num_features).collect();
    if let Some(k) = feature_subsample {
        features.shuffle(rng);
        features.truncate(k.clamp(1, num_features));
        // Deterministic sweep order within the chosen subset.
        features.sort_unstable();
    }

    let mut best: Option<(usize, f64, f64)> = None; // (feature, threshold, gain)
    for &feature in &features {
        let mut order: Vec<usize> = indices.to_vec();
        order.sort_by(|&a, &b| {
            x[a][feature]
                .partial_cmp(&x[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left = [0.0; NUM_CLASSES];
        let mut left_weight = 0.0;
        for k in 0..order.len() - 1 {
            let i = order[k];
            left[y[i]] += weights[i];
            left_weight += weights[i];

            let current = x[order[k]][feature];
            let next = x[order[k + 1]][feature];
            if current == next {
                continue;
            }

            let mut right = totals;
            for (r, l) in right.iter_mut().zip(&left) {
                *r -= l;
            }
            let right_weight = node_weight - left_weight;
            if left_weight <= 0.0 || right_weight <= 0.0 {
                continue;
            }

            let gain = node_gini
                - (left_weight / node_weight) * gini(&left)
                - (right_weight / node_weight) * gini(&right);
            if gain > best.map_or(1e-12, |(_, _, g)| g) {
                best = Some((feature, (current + next) / 2.0, gain));
            }
        }
    }

    let Some((feature, threshold, gain)) = best else {
        return leaf_from(totals);
    };

    importance[feature] += gain * (node_weight / root_weight);

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .partition(|&&i| x[i][feature] <= threshold);
    if left_idx.is_empty() || right_idx.is_empty() {
        return leaf_from(totals);
    }

    let left = build_node(
        x, y, weights, &left_idx, depth + 1, params, feature_subsample, rng, root_weight,
        importance,
    );
    let right = build_node(
        x, y, weights, &right_idx, depth + 1, params, feature_subsample, rng, root_weight,
        importance,
    );

    Node::Split {
        feature,
        threshold,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn separable_data() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..10 {
            x.push(vec![i as f64 * 0.1, 0.0]);
            y.push(0);
            x.push(vec![5.0 + i as f64 * 0.1, 0.0]);
            y.push(1);
            x.push(vec![10.0 + i as f64 * 0.1, 0.0]);
            y.push(2);
        }
        (x, y)
    }

    fn fit_plain(x: &[Vec<f64>], y: &[usize]) -> DecisionTree {
        let weights = vec![1.0; y.len()];
        let indices: Vec<usize> = (0..y.len()).collect();
        let mut rng = StdRng::seed_from_u64(7);
        DecisionTree::fit(x, y, &weights, &indices, TreeParams::default(), None, &mut rng)
    }

    #[test]
    fn test_fits_separable_data_perfectly() {
        let (x, y) = separable_data();
        let tree = fit_plain(&x, &y);
        for (row, &label) in x.iter().zip(&y) {
            assert_eq!(tree.predict_one(row), label);
        }
    }

    #[test]
    fn test_leaf_probs_sum_to_one() {
        let (x, y) = separable_data();
        let tree = fit_plain(&x, &y);
        for row in &x {
            let probs = tree.predict_proba_one(row);
            assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_importance_lands_on_informative_feature() {
        let (x, y) = separable_data();
        let tree = fit_plain(&x, &y);
        let importance = tree.importance();
        // Feature 0 carries all the signal; feature 1 is constant.
        assert!(importance[0] > 0.99);
        assert_eq!(importance[1], 0.0);
    }

    #[test]
    fn test_pure_node_becomes_leaf() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![1, 1, 1];
        let tree = fit_plain(&x, &y);
        assert_eq!(tree.predict_one(&[10.0]), 1);
    }
}
