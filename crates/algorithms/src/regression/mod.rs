//! Tree-ensemble regression
//!
//! A CART regression tree and a bagged random forest built from it, with
//! seeded per-tree RNG streams and impurity-based feature importances.

mod dataset;
mod forest;
mod tree;

pub use dataset::FeatureMatrix;
pub use forest::{ForestParams, MaxFeatures, RandomForest};
pub use tree::{RegressionTree, TreeParams};
