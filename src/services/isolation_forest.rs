//! Isolation forest outlier detector.
//!
//! Each tree isolates a random sub-sample with random axis-aligned splits;
//! points that are isolated after few splits are unusual. The anomaly score is
//! `2^(-E[h(x)] / c(ψ))`, with `c(ψ)` the mean path length of an unsuccessful
//! BST search over `ψ` points. Scores above 0.5 mark outliers.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Score above which a point is an outlier when the contamination rate is not set.
pub const AUTO_THRESHOLD: f64 = 0.5;

/// Averaging many equal path lengths is not exact; scores this close to the
/// threshold count as normal.
const SCORE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsolationForestParams {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub seed: u64,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone)]
pub struct IsolationForest<const D: usize> {
    trees: Vec<Node>,
    sample_size: usize,
}

/// Average path length of an unsuccessful search in a BST of `n` nodes.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

impl<const D: usize> IsolationForest<D> {
    /// `None` on an empty data set.
    pub fn fit(data: &[[f64; D]], params: IsolationForestParams) -> Option<Self> {
        if data.is_empty() {
            return None;
        }
        let mut rng = StdRng::seed_from_u64(params.seed);
        let sample_size = params.max_samples.min(data.len()).max(1);
        let max_depth = (sample_size as f64).log2().ceil() as usize;

        let trees = (0..params.n_estimators)
            .map(|_| {
                let indices = sample(&mut rng, data.len(), sample_size).into_vec();
                build(data, indices, 0, max_depth, &mut rng)
            })
            .collect();

        Some(Self { trees, sample_size })
    }

    /// Anomaly score in (0, 1].
    pub fn score(&self, point: &[f64; D]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let mean_depth = self
            .trees
            .iter()
            .map(|tree| path_length(tree, point, 0))
            .sum::<f64>()
            / self.trees.len() as f64;
        let normaliser = average_path_length(self.sample_size);
        if normaliser == 0.0 {
            return AUTO_THRESHOLD;
        }
        2f64.powf(-mean_depth / normaliser)
    }

    pub fn is_outlier(&self, point: &[f64; D]) -> bool {
        self.score(point) > AUTO_THRESHOLD + SCORE_TOLERANCE
    }
}

fn build<const D: usize>(
    data: &[[f64; D]],
    indices: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= max_depth || indices.len() <= 1 {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    // only features that still vary inside this node can split it
    let mut splittable = Vec::with_capacity(D);
    for feature in 0..D {
        let (lo, hi) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
            (lo.min(data[i][feature]), hi.max(data[i][feature]))
        });
        if lo < hi {
            splittable.push((feature, lo, hi));
        }
    }
    if splittable.is_empty() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let (feature, lo, hi) = splittable[rng.gen_range(0..splittable.len())];
    let threshold = if (hi - lo).is_finite() {
        rng.gen_range(lo..hi)
    } else {
        // span overflows f64, interpolate between the ends instead
        let u = rng.gen_range(0.0..1.0);
        lo * (1.0 - u) + hi * u
    };
    let (left, right): (Vec<usize>, Vec<usize>) =
        indices.into_iter().partition(|&i| data[i][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build(data, left, depth + 1, max_depth, rng)),
        right: Box::new(build(data, right, depth + 1, max_depth, rng)),
    }
}

fn path_length<const D: usize>(node: &Node, point: &[f64; D], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            let next = if point[*feature] < *threshold { left } else { right };
            path_length(next, point, depth + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!((c256 - 10.2448).abs() < 1e-3);
    }

    #[test]
    fn test_isolated_point_scores_highest() {
        let mut data: Vec<[f64; 2]> = (0..40)
            .map(|i| [1.0 + 0.01 * f64::from(i % 7), 2.0 + 0.01 * f64::from(i % 5)])
            .collect();
        data.push([25.0, -30.0]);

        let forest = IsolationForest::fit(&data, IsolationForestParams::default()).unwrap();
        let scores: Vec<f64> = data.iter().map(|p| forest.score(p)).collect();
        let outlier = scores[40];
        assert!(outlier > AUTO_THRESHOLD);
        assert!(scores[..40].iter().all(|s| *s < outlier));
    }

    #[test]
    fn test_identical_points_are_not_outliers() {
        let data = vec![[3.0, 3.0, 3.0]; 10];
        let forest = IsolationForest::fit(&data, IsolationForestParams::default()).unwrap();
        assert!((forest.score(&data[0]) - 0.5).abs() < 1e-9);
        assert!(!forest.is_outlier(&data[0]));
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let data: Vec<[f64; 1]> = (0..30).map(|i| [f64::from(i * i % 17)]).collect();
        let a = IsolationForest::fit(&data, IsolationForestParams::default()).unwrap();
        let b = IsolationForest::fit(&data, IsolationForestParams::default()).unwrap();
        for p in &data {
            assert_eq!(a.score(p), b.score(p));
        }
    }

    #[test]
    fn test_extreme_feature_span_fits() {
        let data = vec![[1.0 - 1e308], [1.7e308], [0.0], [1.0]];
        let forest = IsolationForest::fit(&data, IsolationForestParams::default()).unwrap();
        for p in &data {
            let score = forest.score(p);
            assert!(score.is_finite() && score > 0.0 && score <= 1.0);
        }
    }

    #[test]
    fn test_empty_data_cannot_fit() {
        let data: Vec<[f64; 3]> = Vec::new();
        assert!(IsolationForest::fit(&data, IsolationForestParams::default()).is_none());
    }
}
