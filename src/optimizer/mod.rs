//! Weight-update algorithms behind one scoring interface
//!
//! Every algorithm exposes the same three calls: [`Optimizer::score`] is a
//! pure read used while decoding, [`Optimizer::update`] learns from one
//! decision, and [`Optimizer::flush`] applies whatever a mini-batch
//! algorithm has buffered since the previous flush.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::train::HyperParameters;

mod adaptive;
mod neural;
mod perceptron;
mod softmax;
mod weights;

pub use self::adaptive::{AdaptiveGradient, Loss, Rule};
pub use self::neural::{Activation, FeedForwardSoftmax, Topology};
pub use self::perceptron::Perceptron;
pub use self::softmax::{softmax, SoftmaxRegression};
pub use self::weights::WeightVector;

/// One decision seen during training
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Active feature ids
    pub features: Vec<u32>,
    /// Oracle label id
    pub gold: u32,
    /// Highest scoring label id under the current weights
    pub predicted: u32,
}

impl Instance {
    pub fn new(features: Vec<u32>, gold: u32, predicted: u32) -> Self {
        Self {
            features,
            gold,
            predicted,
        }
    }
}

/// Index of the highest score, the lowest index wins a tie.
pub fn argmax(scores: &[f64]) -> u32 {
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate().skip(1) {
        if s > scores[best] {
            best = i;
        }
    }
    best as u32
}

/// Available training algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    #[serde(rename = "perceptron")]
    Perceptron,
    #[serde(rename = "softmax-regression")]
    SoftmaxRegression,
    #[serde(rename = "adagrad")]
    AdaGrad,
    #[serde(rename = "adagrad-regression")]
    AdaGradRegression,
    #[serde(rename = "adagrad-mini-batch")]
    AdaGradMiniBatch,
    #[serde(rename = "adadelta-mini-batch")]
    AdaDeltaMiniBatch,
    #[serde(rename = "ffnn-softmax")]
    FeedForwardSoftmax,
}

impl Algorithm {
    pub const ALL: [Algorithm; 7] = [
        Algorithm::Perceptron,
        Algorithm::SoftmaxRegression,
        Algorithm::AdaGrad,
        Algorithm::AdaGradRegression,
        Algorithm::AdaGradMiniBatch,
        Algorithm::AdaDeltaMiniBatch,
        Algorithm::FeedForwardSoftmax,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Perceptron => "perceptron",
            Algorithm::SoftmaxRegression => "softmax-regression",
            Algorithm::AdaGrad => "adagrad",
            Algorithm::AdaGradRegression => "adagrad-regression",
            Algorithm::AdaGradMiniBatch => "adagrad-mini-batch",
            Algorithm::AdaDeltaMiniBatch => "adadelta-mini-batch",
            Algorithm::FeedForwardSoftmax => "ffnn-softmax",
        }
    }

    /// Whether updates are buffered until a flush
    pub fn is_mini_batch(self) -> bool {
        matches!(
            self,
            Algorithm::AdaGradMiniBatch | Algorithm::AdaDeltaMiniBatch
        )
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        Algorithm::ALL
            .iter()
            .copied()
            .find(|algorithm| algorithm.name() == name)
            .ok_or_else(|| Error::UnknownAlgorithm(name.to_string()))
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A trainable scoring model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "algorithm", content = "state", rename_all = "snake_case")]
pub enum Optimizer {
    Perceptron(Perceptron),
    SoftmaxRegression(SoftmaxRegression),
    Adaptive(AdaptiveGradient),
    FeedForward(FeedForwardSoftmax),
}

impl Optimizer {
    /// Build the optimizer selected by the hyperparameters for the given
    /// feature and label spaces.
    pub fn new(params: &HyperParameters, num_features: usize, num_labels: usize) -> Result<Self> {
        params.validate()?;
        let lr = params.learning_rate();
        let bias = params.bias();
        let l1 = params.l1_regularization();

        let adaptive = |rule, loss, mini_batch| {
            Optimizer::Adaptive(AdaptiveGradient::new(
                num_features,
                num_labels,
                lr,
                bias,
                l1,
                rule,
                loss,
                mini_batch,
            ))
        };

        let optimizer = match params.algorithm() {
            Algorithm::Perceptron => {
                Optimizer::Perceptron(Perceptron::new(num_features, num_labels, lr, bias))
            }
            Algorithm::SoftmaxRegression => Optimizer::SoftmaxRegression(SoftmaxRegression::new(
                num_features,
                num_labels,
                lr,
                bias,
            )),
            Algorithm::AdaGrad => adaptive(Rule::AdaGrad, Loss::Hinge, false),
            Algorithm::AdaGradRegression => adaptive(Rule::AdaGrad, Loss::Softmax, false),
            Algorithm::AdaGradMiniBatch => adaptive(Rule::AdaGrad, Loss::Hinge, true),
            Algorithm::AdaDeltaMiniBatch => adaptive(
                Rule::AdaDelta {
                    decay: params.decaying_rate(),
                },
                Loss::Hinge,
                true,
            ),
            Algorithm::FeedForwardSoftmax => Optimizer::FeedForward(FeedForwardSoftmax::new(
                num_features,
                num_labels,
                &params.topology(),
                lr,
                bias,
                params.seed(),
            )),
        };
        Ok(optimizer)
    }

    /// Label scores for a feature vector; higher is better.
    pub fn score(&self, features: &[u32]) -> Vec<f64> {
        match self {
            Optimizer::Perceptron(o) => o.score(features),
            Optimizer::SoftmaxRegression(o) => o.score(features),
            Optimizer::Adaptive(o) => o.score(features),
            Optimizer::FeedForward(o) => o.score(features),
        }
    }

    /// Highest scoring label id
    pub fn predict(&self, features: &[u32]) -> u32 {
        argmax(&self.score(features))
    }

    pub fn update(&mut self, instance: &Instance) {
        match self {
            Optimizer::Perceptron(o) => o.update(instance),
            Optimizer::SoftmaxRegression(o) => o.update(instance),
            Optimizer::Adaptive(o) => o.update(instance),
            Optimizer::FeedForward(o) => o.update(instance),
        }
    }

    /// Apply buffered mini-batch updates; a no-op for online algorithms.
    pub fn flush(&mut self) {
        if let Optimizer::Adaptive(o) = self {
            o.flush();
        }
    }

    pub fn is_mini_batch(&self) -> bool {
        match self {
            Optimizer::Adaptive(o) => o.is_mini_batch(),
            _ => false,
        }
    }

    pub fn num_features(&self) -> usize {
        match self {
            Optimizer::Perceptron(o) => o.weights().num_features(),
            Optimizer::SoftmaxRegression(o) => o.weights().num_features(),
            Optimizer::Adaptive(o) => o.weights().num_features(),
            Optimizer::FeedForward(o) => o.input_rows(),
        }
    }

    pub fn num_labels(&self) -> usize {
        match self {
            Optimizer::Perceptron(o) => o.weights().num_labels(),
            Optimizer::SoftmaxRegression(o) => o.weights().num_labels(),
            Optimizer::Adaptive(o) => o.weights().num_labels(),
            Optimizer::FeedForward(o) => o.num_labels(),
        }
    }

    /// Fail when the stored weights do not cover the given spaces or are
    /// inconsistent among themselves.
    pub fn check_dimensions(&self, num_features: usize, num_labels: usize) -> Result<()> {
        match self {
            Optimizer::Perceptron(o) => o.weights().check_shape(num_features, num_labels),
            Optimizer::SoftmaxRegression(o) => o.weights().check_shape(num_features, num_labels),
            Optimizer::Adaptive(o) => o.check_shape(num_features, num_labels),
            Optimizer::FeedForward(o) => o.check_layers(num_features, num_labels),
        }
    }
}
