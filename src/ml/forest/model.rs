use serde::{Deserialize, Serialize};

/// One node of a decision tree, stored in a flat arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Internal node routing `feature <= threshold` to `left`.
    Split {
        feature_index: u16,
        threshold: f32,
        left: u32,
        right: u32,
    },
    /// Terminal node holding class-membership probabilities.
    Leaf { proba: Vec<f32> },
}

/// Decision tree with its root at index 0.
///
/// Child indices always point past their parent, so traversal terminates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    /// Class probabilities of the leaf reached by `features`.
    pub fn leaf_proba(&self, features: &[f32]) -> &[f32] {
        let mut idx = 0usize;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { proba }) => return proba,
                Some(Node::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features
                        .get(*feature_index as usize)
                        .copied()
                        .unwrap_or(0.0);
                    idx = if value <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
                None => return &[],
            }
        }
    }

    /// Depth of the deepest leaf (a lone leaf has depth 0).
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        let mut max = 0;
        for (idx, node) in self.nodes.iter().enumerate() {
            if let Node::Split { left, right, .. } = node {
                let child_depth = depths[idx] + 1;
                for child in [*left as usize, *right as usize] {
                    if let Some(slot) = depths.get_mut(child) {
                        *slot = child_depth;
                    }
                }
                max = max.max(child_depth);
            }
        }
        max
    }

    fn validate(&self, n_classes: usize, feature_len: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { proba } => {
                    if proba.len() != n_classes {
                        return Err(format!(
                            "Leaf {idx} has {} probabilities but expected {n_classes}",
                            proba.len()
                        ));
                    }
                }
                Node::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature_index as usize >= feature_len {
                        return Err(format!("Node {idx} splits on unknown feature {feature_index}"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("Node {idx} has a non-finite threshold"));
                    }
                    for child in [*left as usize, *right as usize] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("Node {idx} has invalid child {child}"));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Bagged decision-tree ensemble for multi-class classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    /// Model format version.
    pub model_version: i64,
    /// Number of `f32` values per feature vector.
    pub feature_len_f32: usize,
    /// Ordered list of class identifiers.
    pub classes: Vec<String>,
    /// Depth bound used when growing the trees.
    pub max_depth: usize,
    pub trees: Vec<DecisionTree>,
}

impl ForestModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.len() < 2 {
            return Err("Model must contain at least 2 classes".to_string());
        }
        if self.trees.is_empty() {
            return Err("Model must contain at least 1 tree".to_string());
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.classes.len(), self.feature_len_f32)
                .map_err(|err| format!("Tree {tree_idx}: {err}"))?;
        }
        Ok(())
    }

    /// Mean of the per-tree leaf probabilities.
    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        let n_classes = self.classes.len();
        let mut sum = vec![0.0f32; n_classes];
        for tree in &self.trees {
            for (acc, &p) in sum.iter_mut().zip(tree.leaf_proba(features)) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len().max(1) as f32;
        for value in &mut sum {
            *value /= n_trees;
        }
        sum
    }

    /// Predict the best class index for a feature vector.
    pub fn predict_class_index(&self, features: &[f32]) -> usize {
        argmax(&self.predict_proba(features))
    }
}

/// Index of the largest value; ties resolve to the lowest index.
pub fn argmax(values: &[f32]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = f32::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = idx;
        }
    }
    best_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(proba: &[f32]) -> Node {
        Node::Leaf {
            proba: proba.to_vec(),
        }
    }

    fn stump(threshold: f32, left: &[f32], right: &[f32]) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                Node::Split {
                    feature_index: 0,
                    threshold,
                    left: 1,
                    right: 2,
                },
                leaf(left),
                leaf(right),
            ],
        }
    }

    fn model(trees: Vec<DecisionTree>) -> ForestModel {
        ForestModel {
            model_version: 1,
            feature_len_f32: 2,
            classes: vec!["a".into(), "b".into()],
            max_depth: 1,
            trees,
        }
    }

    #[test]
    fn split_routes_on_threshold() {
        let tree = stump(0.5, &[1.0, 0.0], &[0.0, 1.0]);
        assert_eq!(tree.leaf_proba(&[0.5, 0.0]), &[1.0, 0.0]);
        assert_eq!(tree.leaf_proba(&[0.6, 0.0]), &[0.0, 1.0]);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn forest_averages_tree_votes() {
        let forest = model(vec![
            stump(0.5, &[1.0, 0.0], &[0.0, 1.0]),
            stump(1.5, &[0.5, 0.5], &[0.0, 1.0]),
        ]);
        let proba = forest.predict_proba(&[1.0, 0.0]);
        assert_eq!(proba, vec![0.25, 0.75]);
        assert_eq!(forest.predict_class_index(&[1.0, 0.0]), 1);
        assert_eq!(forest.predict_class_index(&[0.0, 0.0]), 0);
    }

    #[test]
    fn validate_rejects_backward_children() {
        let mut tree = stump(0.5, &[1.0, 0.0], &[0.0, 1.0]);
        tree.nodes[0] = Node::Split {
            feature_index: 0,
            threshold: 0.5,
            left: 0,
            right: 2,
        };
        assert!(model(vec![tree]).validate().is_err());
    }

    #[test]
    fn validate_rejects_short_leaves() {
        let tree = stump(0.5, &[1.0], &[0.0, 1.0]);
        assert!(model(vec![tree]).validate().is_err());
        assert!(model(Vec::new()).validate().is_err());
    }

    #[test]
    fn argmax_prefers_lowest_index_on_ties() {
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), 0);
        assert_eq!(argmax(&[0.1, 0.2, 0.7]), 2);
    }
}
