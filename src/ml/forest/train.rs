use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::model::{DecisionTree, ForestModel, Node};

/// Training hyperparameters for the forest.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Number of bagged trees.
    pub n_trees: usize,
    /// Maximum depth of each tree.
    pub max_depth: usize,
    /// Minimum samples a node needs before it may split.
    pub min_samples_split: usize,
    /// Features tried per split (`None` = square root of the feature count).
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

/// In-memory dataset used for training and evaluation.
#[derive(Debug, Clone)]
pub struct TrainDataset {
    /// Number of `f32` values in each feature vector.
    pub feature_len_f32: usize,
    /// Ordered list of class identifiers.
    pub classes: Vec<String>,
    /// Feature matrix, row-major.
    pub x: Vec<Vec<f32>>,
    /// Class indices aligned with `x`.
    pub y: Vec<usize>,
}

/// Grow a random forest: one CART tree per bootstrap sample, gini splits.
pub fn train_forest(dataset: &TrainDataset, options: &TrainOptions) -> Result<ForestModel, String> {
    if dataset.x.len() != dataset.y.len() {
        return Err("Mismatched X/Y lengths".to_string());
    }
    if dataset.x.is_empty() {
        return Err("Empty dataset".to_string());
    }
    let n_classes = dataset.classes.len();
    if n_classes < 2 {
        return Err("Need at least 2 classes".to_string());
    }
    let d = dataset.feature_len_f32;
    if d == 0 || d > usize::from(u16::MAX) {
        return Err(format!("Unsupported feature length {d}"));
    }
    for (row_idx, row) in dataset.x.iter().enumerate() {
        if row.len() != d {
            return Err(format!("Row {row_idx} has {} features, expected {d}", row.len()));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(format!("Row {row_idx} contains a non-finite feature"));
        }
    }
    if let Some(&label) = dataset.y.iter().find(|&&label| label >= n_classes) {
        return Err(format!("Label {label} is outside the {n_classes} known classes"));
    }

    let n_trees = options.n_trees.max(1);
    let max_features = options
        .max_features
        .unwrap_or_else(|| (d as f64).sqrt() as usize)
        .clamp(1, d);
    let grower = TreeGrower {
        x: &dataset.x,
        y: &dataset.y,
        n_classes,
        feature_len: d,
        max_depth: options.max_depth,
        min_samples_split: options.min_samples_split.max(2),
        max_features,
    };

    let mut rng = StdRng::seed_from_u64(options.seed);
    let n = dataset.x.len();
    let mut trees = Vec::with_capacity(n_trees);
    for _ in 0..n_trees {
        let sample: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
        trees.push(grower.grow(sample, &mut rng));
    }

    Ok(ForestModel {
        model_version: 1,
        feature_len_f32: d,
        classes: dataset.classes.clone(),
        max_depth: options.max_depth,
        trees,
    })
}

struct TreeGrower<'a> {
    x: &'a [Vec<f32>],
    y: &'a [usize],
    n_classes: usize,
    feature_len: usize,
    max_depth: usize,
    min_samples_split: usize,
    max_features: usize,
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature_index: usize,
    threshold: f32,
    score: f64,
}

impl TreeGrower<'_> {
    fn grow(&self, sample: Vec<usize>, rng: &mut StdRng) -> DecisionTree {
        let mut nodes = Vec::new();
        self.build(&mut nodes, sample, 0, rng);
        DecisionTree { nodes }
    }

    fn build(&self, nodes: &mut Vec<Node>, sample: Vec<usize>, depth: usize, rng: &mut StdRng) -> u32 {
        let idx = nodes.len();
        let counts = self.class_counts(&sample);
        nodes.push(self.leaf(&counts, sample.len()));

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        if pure || depth >= self.max_depth || sample.len() < self.min_samples_split {
            return idx as u32;
        }
        let parent = gini(&counts, sample.len());
        let Some(split) = self.best_split(&sample, parent, rng) else {
            return idx as u32;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| self.x[i][split.feature_index] <= split.threshold);
        let left = self.build(nodes, left, depth + 1, rng);
        let right = self.build(nodes, right, depth + 1, rng);
        nodes[idx] = Node::Split {
            feature_index: split.feature_index as u16,
            threshold: split.threshold,
            left,
            right,
        };
        idx as u32
    }

    fn leaf(&self, counts: &[u32], total: usize) -> Node {
        let total = total.max(1) as f32;
        Node::Leaf {
            proba: counts.iter().map(|&c| c as f32 / total).collect(),
        }
    }

    fn class_counts(&self, sample: &[usize]) -> Vec<u32> {
        let mut counts = vec![0u32; self.n_classes];
        for &i in sample {
            counts[self.y[i]] += 1;
        }
        counts
    }

    /// Search a random feature subset first, then the rest, for the best gini split.
    fn best_split(&self, sample: &[usize], parent: f64, rng: &mut StdRng) -> Option<Split> {
        let chosen = rand::seq::index::sample(rng, self.feature_len, self.max_features).into_vec();
        let mut best = self.best_split_among(sample, &chosen, parent);
        if best.is_none() {
            let rest: Vec<usize> = (0..self.feature_len)
                .filter(|f| !chosen.contains(f))
                .collect();
            best = self.best_split_among(sample, &rest, parent);
        }
        best
    }

    fn best_split_among(&self, sample: &[usize], features: &[usize], parent: f64) -> Option<Split> {
        let mut best: Option<Split> = None;
        for &feature_index in features {
            if let Some(split) = self.best_split_for_feature(sample, feature_index)
                && split.score < parent - 1e-12
                && best.is_none_or(|b| split.score < b.score)
            {
                best = Some(split);
            }
        }
        best
    }

    fn best_split_for_feature(&self, sample: &[usize], feature_index: usize) -> Option<Split> {
        let mut order: Vec<(f32, usize)> = sample
            .iter()
            .map(|&i| (self.x[i][feature_index], self.y[i]))
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = order.len();
        let mut right = vec![0u32; self.n_classes];
        for &(_, label) in &order {
            right[label] += 1;
        }
        let mut left = vec![0u32; self.n_classes];
        let mut best: Option<Split> = None;
        for k in 0..n.saturating_sub(1) {
            let (value, label) = order[k];
            left[label] += 1;
            right[label] -= 1;
            let next = order[k + 1].0;
            if value >= next {
                continue;
            }
            let n_left = k + 1;
            let n_right = n - n_left;
            let score = (n_left as f64 * gini(&left, n_left) + n_right as f64 * gini(&right, n_right))
                / n as f64;
            if best.is_none_or(|b| score < b.score) {
                best = Some(Split {
                    feature_index,
                    threshold: midpoint(value, next),
                    score,
                });
            }
        }
        best
    }
}

fn midpoint(low: f32, high: f32) -> f32 {
    let mid = low + (high - low) / 2.0;
    if mid >= high { low } else { mid }
}

fn gini(counts: &[u32], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}
