use std::collections::BTreeMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::softmax::log_likelihood_gradient;
use super::weights::WeightVector;
use super::{argmax, Instance};
use crate::error::{Error, Result};

/// Smoothing term added to the accumulator root
const EPSILON: f64 = 1e-6;

/// How squared gradients are accumulated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// Sum of all squared gradients
    AdaGrad,
    /// Exponentially decayed average of squared gradients
    AdaDelta { decay: f64 },
}

/// Loss whose gradient drives the update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    /// Cost-augmented multiclass hinge loss
    Hinge,
    /// Cross-entropy over softmax scores
    Softmax,
}

/// L1 regularization by regularized dual averaging.
///
/// The running gradient sum of each weight is kept and the weight is
/// recomputed from it only when that weight receives a gradient, so an
/// update costs as much as the number of active features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DualAveraging {
    l1: f64,
    dual: Array2<f64>,
    steps: usize,
}

impl DualAveraging {
    fn new(l1: f64, rows: usize, cols: usize) -> Self {
        Self {
            l1,
            dual: Array2::zeros((rows, cols)),
            steps: 0,
        }
    }

    /// Add a gradient to the running sum and return the regularized
    /// weight for the given adaptive step size.
    fn step(&mut self, row: usize, label: usize, gradient: f64, rate: f64) -> f64 {
        let u = &mut self.dual[[row, label]];
        *u += gradient;
        let shrunk = u.abs() - self.l1 * self.steps as f64;
        if shrunk <= 0.0 {
            0.0
        } else {
            u.signum() * rate * shrunk
        }
    }
}

/// Adaptive per-weight learning rates (AdaGrad / AdaDelta), online or
/// mini-batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveGradient {
    weights: WeightVector,
    /// Squared gradient statistics, same shape as the weights
    accumulator: Array2<f64>,
    rda: Option<DualAveraging>,
    learning_rate: f64,
    bias: f64,
    rule: Rule,
    loss: Loss,
    mini_batch: bool,
    #[serde(skip)]
    batch: Vec<Instance>,
}

impl AdaptiveGradient {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        num_features: usize,
        num_labels: usize,
        learning_rate: f64,
        bias: f64,
        l1: f64,
        rule: Rule,
        loss: Loss,
        mini_batch: bool,
    ) -> Self {
        let weights = WeightVector::new(num_features, num_labels);
        let shape = (num_features + 1, num_labels);
        let rda = if l1 > 0.0 {
            Some(DualAveraging::new(l1, shape.0, shape.1))
        } else {
            None
        };
        Self {
            weights,
            accumulator: Array2::zeros(shape),
            rda,
            learning_rate,
            bias,
            rule,
            loss,
            mini_batch,
            batch: Vec::new(),
        }
    }

    pub fn weights(&self) -> &WeightVector {
        &self.weights
    }

    pub fn is_mini_batch(&self) -> bool {
        self.mini_batch
    }

    pub fn score(&self, features: &[u32]) -> Vec<f64> {
        self.weights.scores(features, self.bias)
    }

    /// The weights, the accumulator and the dual averages must share one
    /// shape.
    pub fn check_shape(&self, num_features: usize, num_labels: usize) -> Result<()> {
        self.weights.check_shape(num_features, num_labels)?;
        let (rows, cols) = self.weights.shape();
        let mut others = vec![(
            ("accumulator row", "accumulator column"),
            self.accumulator.dim(),
        )];
        if let Some(rda) = &self.rda {
            others.push((("dual average row", "dual average column"), rda.dual.dim()));
        }
        for ((row_name, col_name), (r, c)) in others {
            if r != rows {
                return Err(Error::DimensionMismatch {
                    what: row_name,
                    expected: rows,
                    found: r,
                });
            }
            if c != cols {
                return Err(Error::DimensionMismatch {
                    what: col_name,
                    expected: cols,
                    found: c,
                });
            }
        }
        Ok(())
    }

    /// Apply the instance now, or buffer it until the next flush.
    pub fn update(&mut self, instance: &Instance) {
        if self.mini_batch {
            self.batch.push(instance.clone());
        } else {
            let mut gradient = BTreeMap::new();
            self.accumulate(instance, &mut gradient);
            self.apply(gradient);
        }
    }

    /// Sum the gradients of every buffered instance against the current
    /// weights and apply them in one step.
    pub fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.batch);
        let mut gradient = BTreeMap::new();
        for instance in &batch {
            self.accumulate(instance, &mut gradient);
        }
        self.apply(gradient);
    }

    /// Gradient of the loss with respect to each label score
    fn label_gradient(&self, instance: &Instance) -> Vec<f64> {
        let scores = self.score(&instance.features);
        match self.loss {
            Loss::Softmax => log_likelihood_gradient(scores, instance.gold),
            Loss::Hinge => {
                let gold = instance.gold as usize;
                let mut augmented = scores;
                augmented[gold] -= 1.0;
                let predicted = argmax(&augmented) as usize;

                let mut gradient = vec![0.0; augmented.len()];
                if predicted != gold {
                    gradient[gold] = 1.0;
                    gradient[predicted] = -1.0;
                }
                gradient
            }
        }
    }

    fn accumulate(&self, instance: &Instance, gradient: &mut BTreeMap<(usize, usize), f64>) {
        let label_gradient = self.label_gradient(instance);
        for (row, x) in self.weights.active_rows(&instance.features, self.bias) {
            for (label, &g) in label_gradient.iter().enumerate() {
                if g != 0.0 {
                    *gradient.entry((row, label)).or_insert(0.0) += g * x;
                }
            }
        }
    }

    fn apply(&mut self, gradient: BTreeMap<(usize, usize), f64>) {
        let Self {
            weights,
            accumulator,
            rda,
            learning_rate,
            rule,
            ..
        } = self;

        if let Some(rda) = rda.as_mut() {
            rda.steps += 1;
        }

        for ((row, label), g) in gradient {
            let acc = &mut accumulator[[row, label]];
            match *rule {
                Rule::AdaGrad => *acc += g * g,
                Rule::AdaDelta { decay } => *acc = decay * *acc + (1.0 - decay) * g * g,
            }
            let rate = *learning_rate / (EPSILON + acc.sqrt());

            match rda.as_mut() {
                Some(rda) => weights.set(row, label, rda.step(row, label, g, rate)),
                None => weights.add(row, label, rate * g),
            }
        }
    }
}
