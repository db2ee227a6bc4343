use serde::{Deserialize, Serialize};

use super::weights::WeightVector;
use super::Instance;

/// Multiclass perceptron
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Perceptron {
    weights: WeightVector,
    learning_rate: f64,
    bias: f64,
}

impl Perceptron {
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

    /// Promote the gold label and demote the predicted one, only on a
    /// mistake.
    pub fn update(&mut self, instance: &Instance) {
        if instance.predicted == instance.gold {
            return;
        }
        let gold = instance.gold as usize;
        let predicted = instance.predicted as usize;
        for (row, x) in self.weights.active_rows(&instance.features, self.bias) {
            self.weights.add(row, gold, self.learning_rate * x);
            self.weights.add(row, predicted, -self.learning_rate * x);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_on_mistake() {
        let mut p = Perceptron::new(4, 3, 0.5, 1.0);
        p.update(&Instance::new(vec![1, 3], 2, 0));

        assert_eq!(p.weights().get(1, 2), 0.5);
        assert_eq!(p.weights().get(3, 0), -0.5);
        assert_eq!(p.weights().get(4, 2), 0.5);
        assert_eq!(p.weights().get(0, 2), 0.0);
        assert_eq!(p.score(&[1]), [-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_no_update_when_correct() {
        let mut p = Perceptron::new(4, 3, 0.5, 1.0);
        p.update(&Instance::new(vec![1, 3], 1, 1));
        assert!(p.weights().is_zero());
    }
}
