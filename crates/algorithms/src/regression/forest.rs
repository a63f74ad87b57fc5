//! Bagged random forest regressor
//!
//! Trees are grown independently on bootstrap draws with per-split feature
//! subsampling. Each tree owns an RNG stream seeded from the base seed and
//! its index, so parallel and sequential builds produce identical forests.

use super::tree::{RegressionTree, TreeParams};
use super::FeatureMatrix;
use crate::maybe_rayon::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thermanom_core::{Error, Result};

/// Features examined at each split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// Every feature
    All,
    /// `ceil(sqrt(n))`
    Sqrt,
    /// `ceil(log2(n))`
    Log2,
    /// A fixed count, capped at n
    Count(usize),
    /// A fraction of n in (0, 1]
    Fraction(f64),
}

impl MaxFeatures {
    /// Resolve to a count for `n` features, at least 1
    pub fn resolve(&self, n: usize) -> usize {
        let k = match *self {
            MaxFeatures::All => n,
            MaxFeatures::Sqrt => (n as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n as f64).log2().ceil() as usize,
            MaxFeatures::Count(k) => k,
            MaxFeatures::Fraction(f) => (f * n as f64).ceil() as usize,
        };
        k.clamp(1, n.max(1))
    }
}

/// Parameters for the random forest regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Number of trees (default: 200)
    pub n_estimators: usize,
    /// Maximum tree depth (default: 25)
    pub max_depth: usize,
    /// Minimum samples required to split a node (default: 8)
    pub min_samples_split: usize,
    /// Minimum samples in each leaf (default: 4)
    pub min_samples_leaf: usize,
    /// Features examined per split (default: sqrt)
    pub max_features: MaxFeatures,
    /// Bootstrap draw size per tree; `None` draws as many as there are samples
    pub max_samples: Option<usize>,
    /// Base seed; `None` draws one at random
    pub random_seed: Option<u64>,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 25,
            min_samples_split: 8,
            min_samples_leaf: 4,
            max_features: MaxFeatures::Sqrt,
            max_samples: Some(200_000),
            random_seed: Some(42),
        }
    }
}

impl ForestParams {
    pub fn validate(&self) -> Result<()> {
        let reject = |name: &'static str, value: String, reason: &str| {
            Err(Error::InvalidParameter {
                name,
                value,
                reason: reason.to_string(),
            })
        };
        if self.n_estimators == 0 {
            return reject("n_estimators", "0".into(), "at least one tree is required");
        }
        if self.max_depth == 0 {
            return reject("max_depth", "0".into(), "depth must be at least 1");
        }
        if self.min_samples_leaf == 0 {
            return reject("min_samples_leaf", "0".into(), "must be at least 1");
        }
        if self.min_samples_split < 2 {
            return reject(
                "min_samples_split",
                self.min_samples_split.to_string(),
                "must be at least 2",
            );
        }
        if self.max_samples == Some(0) {
            return reject("max_samples", "0".into(), "bootstrap draw must be non-empty");
        }
        match self.max_features {
            MaxFeatures::Count(0) => reject("max_features", "0".into(), "must be at least 1"),
            MaxFeatures::Fraction(f) if !(f > 0.0 && f <= 1.0) => {
                reject("max_features", f.to_string(), "fraction must lie in (0, 1]")
            }
            _ => Ok(()),
        }
    }
}

/// A fitted random forest
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    feature_names: Vec<String>,
    importances: Vec<f64>,
    seed: u64,
}

impl RandomForest {
    /// Fit a forest on every sample of `x`
    pub fn fit(x: &FeatureMatrix, y: &[f64], params: &ForestParams) -> Result<Self> {
        params.validate()?;
        let n = x.n_samples();
        if n == 0 || x.n_features() == 0 {
            return Err(Error::InsufficientData {
                valid: n,
                required: 1,
            });
        }
        if y.len() != n {
            return Err(Error::Algorithm(format!(
                "{} targets for {} samples",
                y.len(),
                n
            )));
        }

        let seed = match params.random_seed {
            Some(seed) => seed,
            None => {
                let seed: u64 = rand::thread_rng().gen();
                tracing::info!(seed, "no random seed configured, drew one");
                seed
            }
        };

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: params.max_features.resolve(x.n_features()),
        };
        let draw = params.max_samples.map_or(n, |m| m.min(n));

        tracing::debug!(
            trees = params.n_estimators,
            samples = n,
            draw,
            features = x.n_features(),
            max_features = tree_params.max_features,
            "fitting random forest"
        );

        let trees: Vec<RegressionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(t as u64));
                let mut samples: Vec<usize> = (0..draw).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, &mut samples, &tree_params, &mut rng)
            })
            .collect();

        let importances = aggregate_importances(&trees, x.n_features());

        Ok(Self {
            trees,
            feature_names: x.names().to_vec(),
            importances,
            seed,
        })
    }

    /// Mean prediction over all trees for one sample
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        sum / self.trees.len() as f64
    }

    /// Predict every sample of `x`
    pub fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        (0..x.n_samples())
            .into_par_iter()
            .map(|i| self.predict_row(x.row(i)))
            .collect()
    }

    /// Normalized impurity-decrease importances, summing to 1
    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Base seed the forest was grown with
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Average per-tree normalized importances over trees that split at least
/// once. A forest of stumps gets uniform weights.
fn aggregate_importances(trees: &[RegressionTree], n_features: usize) -> Vec<f64> {
    let mut total = vec![0.0; n_features];
    let mut contributing = 0usize;

    for tree in trees {
        let raw = tree.impurity_decrease();
        let sum: f64 = raw.iter().sum();
        if sum <= 0.0 {
            continue;
        }
        for (acc, v) in total.iter_mut().zip(raw) {
            *acc += v / sum;
        }
        contributing += 1;
    }

    let sum: f64 = total.iter().sum();
    if contributing == 0 || sum <= 0.0 {
        return vec![1.0 / n_features as f64; n_features];
    }
    total.iter().map(|v| v / sum).collect()
}
