//! Deterministic random-forest classifier.
//!
//! Bagged CART trees with gini splits and a per-split random feature subset:
//! - Multi-class probabilities averaged over the trees.
//! - A fixed seed makes the fitted forest reproducible for identical input.
//! - Serde-friendly flat node layout for JSON export.

mod model;
mod train;

pub use model::{DecisionTree, ForestModel, Node, argmax};
pub use train::{TrainDataset, TrainOptions, train_forest};
