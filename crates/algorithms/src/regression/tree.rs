//! CART regression tree
//!
//! Splits minimize the summed squared error of the two children. Candidate
//! thresholds are found with one sorted prefix-sum sweep per feature and sit
//! halfway between consecutive distinct values.

use super::FeatureMatrix;
use rand::seq::index::sample;
use rand::Rng;

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of features examined at each split
    pub max_features: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 25,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: usize::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted regression tree stored as a flat node arena
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    /// Total squared-error decrease contributed by each feature
    impurity_decrease: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Fit a tree on the samples listed in `samples` (duplicates allowed).
    ///
    /// `samples` is reordered in place during partitioning.
    pub fn fit<R: Rng + ?Sized>(
        x: &FeatureMatrix,
        y: &[f64],
        samples: &mut [usize],
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            impurity_decrease: vec![0.0; x.n_features()],
        };
        if samples.is_empty() {
            tree.nodes.push(Node::Leaf { value: 0.0 });
            return tree;
        }
        let mut scratch = Vec::with_capacity(samples.len());
        tree.grow(x, y, samples, 0, params, rng, &mut scratch);
        tree
    }

    #[allow(clippy::too_many_arguments)]
    fn grow<R: Rng + ?Sized>(
        &mut self,
        x: &FeatureMatrix,
        y: &[f64],
        samples: &mut [usize],
        depth: usize,
        params: &TreeParams,
        rng: &mut R,
        scratch: &mut Vec<(f64, f64)>,
    ) -> usize {
        let n = samples.len();
        let (sum, sum_sq) = samples.iter().fold((0.0, 0.0), |(s, sq), &i| {
            (s + y[i], sq + y[i] * y[i])
        });
        let mean = sum / n as f64;

        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        if depth >= params.max_depth
            || n < params.min_samples_split
            || n < 2 * params.min_samples_leaf
        {
            return node_id;
        }

        let sse = (sum_sq - sum * sum / n as f64).max(0.0);
        if sse <= f64::EPSILON * sum_sq.abs().max(1.0) {
            return node_id;
        }

        let Some(best) = self.best_split(x, y, samples, sse, params, rng, scratch) else {
            return node_id;
        };

        // Partition: values <= threshold go left
        let mut split_at = 0;
        for i in 0..n {
            if x.get(samples[i], best.feature) <= best.threshold {
                samples.swap(i, split_at);
                split_at += 1;
            }
        }
        if split_at == 0 || split_at == n {
            return node_id;
        }

        self.impurity_decrease[best.feature] += best.gain;

        let (left_samples, right_samples) = samples.split_at_mut(split_at);
        let left = self.grow(x, y, left_samples, depth + 1, params, rng, scratch);
        let right = self.grow(x, y, right_samples, depth + 1, params, rng, scratch);

        self.nodes[node_id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        node_id
    }

    #[allow(clippy::too_many_arguments)]
    fn best_split<R: Rng + ?Sized>(
        &self,
        x: &FeatureMatrix,
        y: &[f64],
        samples: &[usize],
        parent_sse: f64,
        params: &TreeParams,
        rng: &mut R,
        scratch: &mut Vec<(f64, f64)>,
    ) -> Option<BestSplit> {
        let n_features = x.n_features();
        let k = params.max_features.clamp(1, n_features);
        let mut features = sample(rng, n_features, k).into_vec();
        features.sort_unstable();

        let n = samples.len();
        let min_leaf = params.min_samples_leaf.max(1);
        let total: f64 = samples.iter().map(|&i| y[i]).sum();
        let mut best: Option<BestSplit> = None;

        for feature in features {
            scratch.clear();
            scratch.extend(samples.iter().map(|&i| (x.get(i, feature), y[i])));
            scratch.sort_by(|a, b| a.0.total_cmp(&b.0));

            if scratch[0].0 == scratch[n - 1].0 {
                continue;
            }

            // Maximizing sum_l^2/n_l + sum_r^2/n_r minimizes child SSE
            let mut left_sum = 0.0;
            let mut best_score = f64::NEG_INFINITY;
            let mut best_pos = 0;
            for pos in 1..n {
                left_sum += scratch[pos - 1].1;
                if pos < min_leaf || n - pos < min_leaf {
                    continue;
                }
                if scratch[pos - 1].0 == scratch[pos].0 {
                    continue;
                }
                let right_sum = total - left_sum;
                let score = left_sum * left_sum / pos as f64
                    + right_sum * right_sum / (n - pos) as f64;
                if score > best_score {
                    best_score = score;
                    best_pos = pos;
                }
            }
            if best_pos == 0 {
                continue;
            }

            let gain = best_score - total * total / n as f64;
            if gain <= 0.0 || gain > parent_sse * (1.0 + 1e-9) + 1e-12 {
                continue;
            }
            if best.as_ref().map_or(true, |b| gain > b.gain) {
                let lo = scratch[best_pos - 1].0;
                let hi = scratch[best_pos].0;
                let mut threshold = lo + (hi - lo) / 2.0;
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(BestSplit {
                    feature,
                    threshold,
                    gain,
                });
            }
        }

        best
    }

    /// Predict one sample
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    // NaN features follow the right branch
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Raw squared-error decrease per feature
    pub fn impurity_decrease(&self) -> &[f64] {
        &self.impurity_decrease
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn make_step_data() -> (FeatureMatrix, Vec<f64>) {
        // y = 10 where x0 > 0.5, else 0; x1 is noise-free and uninformative
        let mut x = FeatureMatrix::new(["x0", "x1"]);
        let mut y = Vec::new();
        for i in 0..40 {
            let v = i as f64 / 40.0;
            x.push_row(&[v, 1.0]).unwrap();
            y.push(if v > 0.5 { 10.0 } else { 0.0 });
        }
        (x, y)
    }

    fn fit_all(x: &FeatureMatrix, y: &[f64], params: &TreeParams) -> RegressionTree {
        let mut samples: Vec<usize> = (0..x.n_samples()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        RegressionTree::fit(x, y, &mut samples, params, &mut rng)
    }

    #[test]
    fn test_learns_step_function() {
        let (x, y) = make_step_data();
        let tree = fit_all(&x, &y, &TreeParams::default());

        assert_eq!(tree.depth(), 1, "One split should suffice");
        assert_eq!(tree.predict_row(&[0.1, 1.0]), 0.0);
        assert_eq!(tree.predict_row(&[0.9, 1.0]), 10.0);
        assert!(tree.impurity_decrease()[0] > 0.0);
        assert_eq!(tree.impurity_decrease()[1], 0.0);
    }

    #[test]
    fn test_threshold_between_distinct_values() {
        let (x, y) = make_step_data();
        let tree = fit_all(&x, &y, &TreeParams::default());
        // 0.5 belongs left (y = 0), 0.525 right
        assert_eq!(tree.predict_row(&[0.5, 1.0]), 0.0);
        assert_eq!(tree.predict_row(&[0.525, 1.0]), 10.0);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let (x, _) = make_step_data();
        let y = vec![3.5; x.n_samples()];
        let tree = fit_all(&x, &y, &TreeParams::default());
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict_row(&[0.3, 1.0]), 3.5);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let mut x = FeatureMatrix::new(["x"]);
        let mut y = Vec::new();
        for i in 0..64 {
            x.push_row(&[i as f64]).unwrap();
            y.push((i * i) as f64);
        }
        let params = TreeParams {
            max_depth: 3,
            ..TreeParams::default()
        };
        let tree = fit_all(&x, &y, &params);
        assert!(tree.depth() <= 3, "depth {}", tree.depth());
        assert!(tree.n_leaves() <= 8);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let (x, y) = make_step_data();
        let params = TreeParams {
            min_samples_leaf: 30,
            ..TreeParams::default()
        };
        // 40 samples cannot give two leaves of 30
        let tree = fit_all(&x, &y, &params);
        assert_eq!(tree.n_nodes(), 1);
    }
}
