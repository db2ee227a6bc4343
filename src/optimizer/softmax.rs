use serde::{Deserialize, Serialize};

use super::weights::WeightVector;
use super::Instance;

/// Normalize scores into a probability distribution in place.
pub fn softmax(scores: &mut [f64]) {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for s in scores.iter_mut() {
        *s = (*s - max).exp();
        sum += *s;
    }
    for s in scores.iter_mut() {
        *s /= sum;
    }
}

/// Gradient of the log-likelihood of `gold` with respect to each label
/// score: `onehot(gold) - softmax(scores)`.
pub(crate) fn log_likelihood_gradient(mut scores: Vec<f64>, gold: u32) -> Vec<f64> {
    softmax(&mut scores);
    for (label, p) in scores.iter_mut().enumerate() {
        let target = if label == gold as usize { 1.0 } else { 0.0 };
        *p = target - *p;
    }
    scores
}

/// Multinomial logistic regression trained with plain SGD
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxRegression {
    weights: WeightVector,
    learning_rate: f64,
    bias: f64,
}

impl SoftmaxRegression {
    pub fn new(num_features: usize, num_labels: usize, learning_rate: f64, bias: f64) -> Self {
        Self {
            weights: WeightVector::new(num_features, num_labels),
            learning_rate,
            bias,
        }
    }

    pub fn weights(&self) -> &WeightVector {
        &self.weights
    }

    pub fn score(&self, features: &[u32]) -> Vec<f64> {
        self.weights.scores(features, self.bias)
    }

    pub fn update(&mut self, instance: &Instance) {
        let gradient = log_likelihood_gradient(self.score(&instance.features), instance.gold);
        for (row, x) in self.weights.active_rows(&instance.features, self.bias) {
            for (label, g) in gradient.iter().enumerate() {
                self.weights.add(row, label, self.learning_rate * g * x);
            }
        }
    }
}
