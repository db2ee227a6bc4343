use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::softmax::softmax;
use super::Instance;
use crate::error::{Error, Result};

/// Hidden layer activation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Identity,
    Sigmoid,
    Tanh,
    Relu,
    Softplus,
}

impl Activation {
    pub fn name(self) -> &'static str {
        match self {
            Activation::Identity => "identity",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::Relu => "relu",
            Activation::Softplus => "softplus",
        }
    }

    pub fn apply(self, z: f64) -> f64 {
        match self {
            Activation::Identity => z,
            Activation::Sigmoid => sigmoid(z),
            Activation::Tanh => z.tanh(),
            Activation::Relu => z.max(0.0),
            Activation::Softplus => z.exp().ln_1p(),
        }
    }

    /// Derivative at pre-activation `z`, where `a = apply(z)`
    pub fn derivative(self, z: f64, a: f64) -> f64 {
        match self {
            Activation::Identity => 1.0,
            Activation::Sigmoid => a * (1.0 - a),
            Activation::Tanh => 1.0 - a * a,
            Activation::Relu => {
                if z > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Softplus => sigmoid(z),
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "identity" => Ok(Activation::Identity),
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "relu" => Ok(Activation::Relu),
            "softplus" => Ok(Activation::Softplus),
            other => Err(Error::UnknownActivation(other.to_string())),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of a feed-forward network
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    pub hidden: Vec<usize>,
    pub activations: Vec<Activation>,
    pub dropout: Vec<f64>,
    /// Uniform initialization range
    pub init: (f64, f64),
}

/// A fully connected layer, `weights` is `[inputs][outputs]`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Layer {
    weights: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
    dropout: f64,
}

impl Layer {
    fn new(
        inputs: usize,
        outputs: usize,
        activation: Activation,
        dropout: f64,
        (lower, upper): (f64, f64),
        rng: &mut StdRng,
    ) -> Self {
        Self {
            weights: Array2::from_shape_fn((inputs, outputs), |_| rng.gen_range(lower..upper)),
            bias: Array1::zeros(outputs),
            activation,
            dropout,
        }
    }
}

/// Intermediate values of one forward pass
struct Pass {
    /// Pre-activations of every layer, the last one holds the output logits
    pre: Vec<Array1<f64>>,
    /// Activations of every hidden layer, before dropout
    post: Vec<Array1<f64>>,
    /// Dropout scale of every hidden unit (0 for dropped units)
    masks: Vec<Array1<f64>>,
}

fn default_rng() -> StdRng {
    StdRng::seed_from_u64(0)
}

/// Feed-forward network over sparse binary features with a softmax output
///
/// The first layer reads feature ids directly, so an update only touches
/// the rows of the active features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedForwardSoftmax {
    /// Hidden layers followed by the output layer
    layers: Vec<Layer>,
    num_features: usize,
    learning_rate: f64,
    bias: f64,
    #[serde(skip, default = "default_rng")]
    rng: StdRng,
}

impl FeedForwardSoftmax {
    pub fn new(
        num_features: usize,
        num_labels: usize,
        topology: &Topology,
        learning_rate: f64,
        bias: f64,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut layers = Vec::with_capacity(topology.hidden.len() + 1);
        let mut inputs = num_features;

        for (i, &outputs) in topology.hidden.iter().enumerate() {
            let activation = topology
                .activations
                .get(i)
                .copied()
                .unwrap_or(Activation::Relu);
            let dropout = topology.dropout.get(i).copied().unwrap_or(0.0);
            layers.push(Layer::new(
                inputs,
                outputs,
                activation,
                dropout,
                topology.init,
                &mut rng,
            ));
            inputs = outputs;
        }
        layers.push(Layer::new(
            inputs,
            num_labels,
            Activation::Identity,
            0.0,
            topology.init,
            &mut rng,
        ));

        Self {
            layers,
            num_features,
            learning_rate,
            bias,
            rng,
        }
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn num_labels(&self) -> usize {
        self.layers.last().map_or(0, |layer| layer.bias.len())
    }

    /// Rows of the sparse input layer
    pub fn input_rows(&self) -> usize {
        self.layers.first().map_or(0, |layer| layer.weights.nrows())
    }

    /// Walk the layers and fail at the first one that does not connect to
    /// its input, or whose bias does not match its outputs.
    pub fn check_layers(&self, num_features: usize, num_labels: usize) -> Result<()> {
        let mismatch = |what, expected, found| {
            Err(Error::DimensionMismatch {
                what,
                expected,
                found,
            })
        };
        if self.layers.is_empty() {
            return mismatch("output layer", 1, 0);
        }
        if self.num_features != num_features {
            return mismatch("feature", num_features, self.num_features);
        }

        let mut inputs = num_features;
        for (k, layer) in self.layers.iter().enumerate() {
            let (rows, outputs) = layer.weights.dim();
            if rows != inputs {
                let what = if k == 0 { "feature" } else { "layer input" };
                return mismatch(what, inputs, rows);
            }
            if layer.bias.len() != outputs {
                return mismatch("layer bias", outputs, layer.bias.len());
            }
            inputs = outputs;
        }
        if inputs != num_labels {
            return mismatch("label", num_labels, inputs);
        }
        Ok(())
    }

    /// Label distribution for the features
    pub fn score(&self, features: &[u32]) -> Vec<f64> {
        let pass = self.forward(features, None);
        let mut output = pass.pre.last().map(|z| z.to_vec()).unwrap_or_default();
        softmax(&mut output);
        output
    }

    /// Forward pass with dropout, then backpropagation of the
    /// cross-entropy gradient toward the gold label.
    pub fn update(&mut self, instance: &Instance) {
        let mut rng = std::mem::replace(&mut self.rng, default_rng());
        let pass = self.forward(&instance.features, Some(&mut rng));
        self.rng = rng;

        let mut delta = match pass.pre.last() {
            Some(logits) => {
                let mut p = logits.to_vec();
                softmax(&mut p);
                p[instance.gold as usize] -= 1.0;
                Array1::from(p)
            }
            None => return,
        };

        let features = self.known(&instance.features);
        let lr = self.learning_rate;
        for k in (0..self.layers.len()).rev() {
            // error of the layer below, taken before this layer moves
            let below = if k > 0 {
                let act = self.layers[k - 1].activation;
                let mut back = self.layers[k].weights.dot(&delta);
                for (i, b) in back.iter_mut().enumerate() {
                    let z = pass.pre[k - 1][i];
                    let a = pass.post[k - 1][i];
                    *b *= act.derivative(z, a) * pass.masks[k - 1][i];
                }
                Some(back)
            } else {
                None
            };

            let layer = &mut self.layers[k];
            if k == 0 {
                for &f in &features {
                    layer.weights.row_mut(f).scaled_add(-lr, &delta);
                }
            } else {
                let input = &pass.post[k - 1] * &pass.masks[k - 1];
                for (i, &x) in input.iter().enumerate() {
                    if x != 0.0 {
                        layer.weights.row_mut(i).scaled_add(-lr * x, &delta);
                    }
                }
            }
            if self.bias != 0.0 {
                layer.bias.scaled_add(-lr * self.bias, &delta);
            }

            match below {
                Some(below) => delta = below,
                None => break,
            }
        }
    }

    fn known(&self, features: &[u32]) -> Vec<usize> {
        let rows = self.input_rows();
        features
            .iter()
            .map(|&f| f as usize)
            .filter(|&f| f < rows)
            .collect()
    }

    fn forward(&self, features: &[u32], mut rng: Option<&mut StdRng>) -> Pass {
        let mut pass = Pass {
            pre: Vec::with_capacity(self.layers.len()),
            post: Vec::with_capacity(self.layers.len()),
            masks: Vec::with_capacity(self.layers.len()),
        };
        let last = self.layers.len() - 1;
        let mut input: Option<Array1<f64>> = None;

        for (k, layer) in self.layers.iter().enumerate() {
            let mut z = &layer.bias * self.bias;
            match &input {
                None => {
                    for f in self.known(features) {
                        z += &layer.weights.row(f);
                    }
                }
                Some(a) => z += &a.dot(&layer.weights),
            }

            if k == last {
                pass.pre.push(z);
                break;
            }

            let a = z.mapv(|v| layer.activation.apply(v));
            let mask = match rng.as_deref_mut() {
                Some(rng) if layer.dropout > 0.0 => {
                    let keep = 1.0 - layer.dropout;
                    Array1::from_shape_fn(a.len(), |_| {
                        if rng.gen::<f64>() < layer.dropout {
                            0.0
                        } else {
                            1.0 / keep
                        }
                    })
                }
                _ => Array1::ones(a.len()),
            };
            input = Some(&a * &mask);
            pass.pre.push(z);
            pass.post.push(a);
            pass.masks.push(mask);
        }
        pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology(hidden: Vec<usize>, activations: Vec<Activation>) -> Topology {
        let dropout = vec![0.0; hidden.len()];
        Topology {
            hidden,
            activations,
            dropout,
            init: (-0.1, 0.1),
        }
    }

    fn loss(net: &FeedForwardSoftmax, instance: &Instance) -> f64 {
        -net.score(&instance.features)[instance.gold as usize].ln()
    }

    #[test]
    fn test_activation_names() {
        for name in ["identity", "sigmoid", "tanh", "relu", "softplus"] {
            let act: Activation = name.parse().unwrap();
            assert_eq!(act.to_string(), name);
        }
        assert!("softmax".parse::<Activation>().is_err());
    }

    #[test]
    fn test_activation_derivatives() {
        for act in [
            Activation::Identity,
            Activation::Sigmoid,
            Activation::Tanh,
            Activation::Relu,
            Activation::Softplus,
        ] {
            let z = 0.3;
            let h = 1e-6;
            let numeric = (act.apply(z + h) - act.apply(z - h)) / (2.0 * h);
            let analytic = act.derivative(z, act.apply(z));
            assert!((numeric - analytic).abs() < 1e-6, "{}", act);
        }
    }

    #[test]
    fn test_score_is_distribution() {
        let net = FeedForwardSoftmax::new(
            10,
            4,
            &topology(vec![8, 6], vec![Activation::Tanh, Activation::Sigmoid]),
            0.05,
            1.0,
            7,
        );
        let scores = net.score(&[1, 4, 9]);
        assert_eq!(scores.len(), 4);
        assert!((scores.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_update_reduces_loss() {
        let mut net = FeedForwardSoftmax::new(
            6,
            3,
            &topology(vec![5], vec![Activation::Tanh]),
            0.1,
            1.0,
            3,
        );
        let instance = Instance::new(vec![0, 2, 5], 2, 0);

        let mut previous = loss(&net, &instance);
        for _ in 0..20 {
            net.update(&instance);
            let current = loss(&net, &instance);
            assert!(current < previous);
            previous = current;
        }
    }

    #[test]
    fn test_no_hidden_layer() {
        let mut net = FeedForwardSoftmax::new(3, 2, &topology(vec![], vec![]), 0.5, 0.0, 1);
        let instance = Instance::new(vec![1], 0, 1);
        let before = loss(&net, &instance);
        net.update(&instance);
        assert!(loss(&net, &instance) < before);
        assert_eq!(net.input_rows(), 3);
        assert_eq!(net.num_labels(), 2);
    }

    #[test]
    fn test_check_layers() {
        let net = FeedForwardSoftmax::new(
            5,
            3,
            &topology(vec![4, 2], vec![Activation::Relu, Activation::Tanh]),
            0.1,
            1.0,
            2,
        );
        assert!(net.check_layers(5, 3).is_ok());
        assert!(matches!(
            net.check_layers(6, 3),
            Err(Error::DimensionMismatch { what: "feature", expected: 6, found: 5 })
        ));
        assert!(matches!(
            net.check_layers(5, 4),
            Err(Error::DimensionMismatch { what: "label", expected: 4, found: 3 })
        ));

        let mut broken = net.clone();
        broken.layers[1].weights = Array2::zeros((3, 2));
        assert!(matches!(
            broken.check_layers(5, 3),
            Err(Error::DimensionMismatch { what: "layer input", expected: 4, found: 3 })
        ));

        let mut broken = net;
        broken.layers[0].bias = Array1::zeros(3);
        assert!(matches!(
            broken.check_layers(5, 3),
            Err(Error::DimensionMismatch { what: "layer bias", expected: 4, found: 3 })
        ));
    }

    #[test]
    fn test_dropout_keeps_inference_deterministic() {
        let mut topo = topology(vec![16], vec![Activation::Sigmoid]);
        topo.dropout = vec![0.5];
        let net = FeedForwardSoftmax::new(4, 3, &topo, 0.1, 1.0, 11);
        assert_eq!(net.score(&[0, 3]), net.score(&[0, 3]));
    }
}
