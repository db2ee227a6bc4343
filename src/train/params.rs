use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::lols::Lols;
use crate::error::{Error, Result};
use crate::optimizer::{Activation, Algorithm, Topology};

/// Uniform range the network weights are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightGenerator {
    pub lower: f64,
    pub upper: f64,
}

impl Default for WeightGenerator {
    fn default() -> Self {
        Self {
            lower: -0.01,
            upper: 0.01,
        }
    }
}

/// Training hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HyperParameters {
    algorithm: Algorithm,
    learning_rate: f64,
    decaying_rate: f64,
    bias: f64,
    l1_regularization: f64,
    batch_size: usize,
    max_epochs: usize,
    feature_cutoff: usize,
    lols: Lols,
    hidden_dimensions: Vec<usize>,
    activation_functions: Vec<Activation>,
    dropout_prob: Vec<f64>,
    weight_generator: WeightGenerator,
    seed: u64,
}

impl Default for HyperParameters {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::AdaGrad,
            learning_rate: 0.02,
            decaying_rate: 0.4,
            bias: 0.0,
            l1_regularization: 0.0,
            batch_size: 5,
            max_epochs: 10,
            feature_cutoff: 0,
            lols: Lols::default(),
            hidden_dimensions: Vec::new(),
            activation_functions: Vec::new(),
            dropout_prob: Vec::new(),
            weight_generator: WeightGenerator::default(),
            seed: 0,
        }
    }
}

fn invalid<T>(message: &str) -> Result<T> {
    Err(Error::InvalidParameter(message.to_string()))
}

fn parse<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| Error::ParseParameter {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Parse a comma separated list; an empty string is an empty list.
fn parse_list<T: FromStr>(name: &str, value: &str) -> Result<Vec<T>> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }
    value.split(',').map(|item| parse(name, item)).collect()
}

impl HyperParameters {
    /// Read hyperparameters from a JSON object; missing keys keep their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Set a parameter from its string form.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "algorithm" => self.set_algorithm(value.parse()?),
            "learning_rate" => self.set_learning_rate(parse(name, value)?)?,
            "decaying_rate" => self.set_decaying_rate(parse(name, value)?)?,
            "bias" => self.set_bias(parse(name, value)?)?,
            "l1_regularization" => self.set_l1_regularization(parse(name, value)?)?,
            "batch_size" => self.set_batch_size(parse(name, value)?)?,
            "max_epochs" => self.set_max_epochs(parse(name, value)?)?,
            "feature_cutoff" => self.set_feature_cutoff(parse(name, value)?),
            "lols.fixed" => {
                let lols = Lols::new(parse(name, value)?, self.lols.decaying);
                self.set_lols(lols)?
            }
            "lols.decaying" => {
                let lols = Lols::new(self.lols.fixed, parse(name, value)?);
                self.set_lols(lols)?
            }
            "hidden_dimensions" => self.set_hidden_dimensions(parse_list(name, value)?)?,
            "activation_functions" => {
                let functions = if value.trim().is_empty() {
                    Vec::new()
                } else {
                    value
                        .split(',')
                        .map(|item| item.parse::<Activation>())
                        .collect::<Result<Vec<_>>>()?
                };
                self.set_activation_functions(functions)
            }
            "dropout_prob" => self.set_dropout_prob(parse_list(name, value)?)?,
            "weight_generator" => {
                let bounds: Vec<f64> = parse_list(name, value)?;
                match bounds[..] {
                    [lower, upper] => self.set_weight_generator(lower, upper)?,
                    _ => return invalid("weight_generator takes a lower and an upper bound"),
                }
            }
            "seed" => self.set_seed(parse(name, value)?),
            _ => return Err(Error::UnknownParameter(name.to_string())),
        }
        Ok(())
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.algorithm = algorithm;
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) -> Result<()> {
        if !(learning_rate > 0.0 && learning_rate.is_finite()) {
            return invalid("learning_rate must be positive");
        }
        self.learning_rate = learning_rate;
        Ok(())
    }

    pub fn decaying_rate(&self) -> f64 {
        self.decaying_rate
    }

    pub fn set_decaying_rate(&mut self, decaying_rate: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&decaying_rate) {
            return invalid("decaying_rate must be between 0 and 1");
        }
        self.decaying_rate = decaying_rate;
        Ok(())
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn set_bias(&mut self, bias: f64) -> Result<()> {
        if !bias.is_finite() {
            return invalid("bias must be finite");
        }
        self.bias = bias;
        Ok(())
    }

    pub fn l1_regularization(&self) -> f64 {
        self.l1_regularization
    }

    pub fn set_l1_regularization(&mut self, l1: f64) -> Result<()> {
        if !(l1 >= 0.0 && l1.is_finite()) {
            return invalid("l1_regularization must be non-negative");
        }
        self.l1_regularization = l1;
        Ok(())
    }

    /// Sentences per mini-batch
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn set_batch_size(&mut self, batch_size: usize) -> Result<()> {
        if batch_size < 1 {
            return invalid("batch_size must be at least 1");
        }
        self.batch_size = batch_size;
        Ok(())
    }

    pub fn max_epochs(&self) -> usize {
        self.max_epochs
    }

    pub fn set_max_epochs(&mut self, max_epochs: usize) -> Result<()> {
        if max_epochs < 1 {
            return invalid("max_epochs must be at least 1");
        }
        self.max_epochs = max_epochs;
        Ok(())
    }

    /// Minimum number of occurrences for a feature to be kept
    pub fn feature_cutoff(&self) -> usize {
        self.feature_cutoff
    }

    pub fn set_feature_cutoff(&mut self, feature_cutoff: usize) {
        self.feature_cutoff = feature_cutoff;
    }

    pub fn lols(&self) -> Lols {
        self.lols
    }

    pub fn set_lols(&mut self, lols: Lols) -> Result<()> {
        if !(0.0..=1.0).contains(&lols.decaying) {
            return invalid("lols.decaying must be between 0 and 1");
        }
        self.lols = lols;
        Ok(())
    }

    pub fn hidden_dimensions(&self) -> &[usize] {
        &self.hidden_dimensions
    }

    pub fn set_hidden_dimensions(&mut self, hidden_dimensions: Vec<usize>) -> Result<()> {
        if hidden_dimensions.contains(&0) {
            return invalid("hidden_dimensions must be positive");
        }
        self.hidden_dimensions = hidden_dimensions;
        Ok(())
    }

    pub fn activation_functions(&self) -> &[Activation] {
        &self.activation_functions
    }

    pub fn set_activation_functions(&mut self, activation_functions: Vec<Activation>) {
        self.activation_functions = activation_functions;
    }

    /// Probability of dropping each unit of a hidden layer
    pub fn dropout_prob(&self) -> &[f64] {
        &self.dropout_prob
    }

    pub fn set_dropout_prob(&mut self, dropout_prob: Vec<f64>) -> Result<()> {
        if dropout_prob.iter().any(|p| !(0.0..1.0).contains(p)) {
            return invalid("dropout_prob must be in [0, 1)");
        }
        self.dropout_prob = dropout_prob;
        Ok(())
    }

    pub fn weight_generator(&self) -> WeightGenerator {
        self.weight_generator
    }

    pub fn set_weight_generator(&mut self, lower: f64, upper: f64) -> Result<()> {
        if !(lower < upper && lower.is_finite() && upper.is_finite()) {
            return invalid("weight_generator lower bound must be below the upper bound");
        }
        self.weight_generator = WeightGenerator { lower, upper };
        Ok(())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }

    /// Re-check every parameter and the agreement of the layer lists.
    pub fn validate(&self) -> Result<()> {
        let mut copy = self.clone();
        copy.set_learning_rate(self.learning_rate)?;
        copy.set_decaying_rate(self.decaying_rate)?;
        copy.set_bias(self.bias)?;
        copy.set_l1_regularization(self.l1_regularization)?;
        copy.set_batch_size(self.batch_size)?;
        copy.set_max_epochs(self.max_epochs)?;
        copy.set_lols(self.lols)?;
        copy.set_hidden_dimensions(self.hidden_dimensions.clone())?;
        copy.set_dropout_prob(self.dropout_prob.clone())?;
        copy.set_weight_generator(self.weight_generator.lower, self.weight_generator.upper)?;

        let layers = self.hidden_dimensions.len();
        if self.activation_functions.len() != layers {
            return invalid("activation_functions must name one function per hidden layer");
        }
        if !self.dropout_prob.is_empty() && self.dropout_prob.len() != layers {
            return invalid("dropout_prob must be empty or give one probability per hidden layer");
        }
        Ok(())
    }

    pub(crate) fn topology(&self) -> Topology {
        let layers = self.hidden_dimensions.len();
        let dropout = if self.dropout_prob.is_empty() {
            vec![0.0; layers]
        } else {
            self.dropout_prob.clone()
        };
        Topology {
            hidden: self.hidden_dimensions.clone(),
            activations: self.activation_functions.clone(),
            dropout,
            init: (self.weight_generator.lower, self.weight_generator.upper),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_by_name() {
        let mut params = HyperParameters::default();
        params.set("algorithm", "adadelta-mini-batch").unwrap();
        params.set("learning_rate", "0.05").unwrap();
        params.set("lols.fixed", "3").unwrap();
        params.set("lols.decaying", "0.9").unwrap();
        params.set("hidden_dimensions", "20,10").unwrap();
        params.set("activation_functions", "relu, tanh").unwrap();
        params.set("weight_generator", "-0.5,0.5").unwrap();

        assert_eq!(params.algorithm(), Algorithm::AdaDeltaMiniBatch);
        assert_eq!(params.learning_rate(), 0.05);
        assert_eq!(params.lols(), Lols::new(3, 0.9));
        assert_eq!(params.hidden_dimensions(), [20, 10]);
        assert_eq!(
            params.activation_functions(),
            [Activation::Relu, Activation::Tanh]
        );
        assert!(params.validate().is_ok());

        let topology = params.topology();
        assert_eq!(topology.dropout, [0.0, 0.0]);
        assert_eq!(topology.init, (-0.5, 0.5));
    }

    #[test]
    fn test_layer_lists_must_agree() {
        let mut params = HyperParameters::default();
        params.set("hidden_dimensions", "8").unwrap();
        assert!(params.validate().is_err());

        params.set("activation_functions", "sigmoid").unwrap();
        params.set("dropout_prob", "0.1,0.2").unwrap();
        assert!(params.validate().is_err());

        params.set("dropout_prob", "0.1").unwrap();
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let params = HyperParameters::from_json(
            r#"{"algorithm": "perceptron", "max_epochs": 3, "lols": {"fixed": 1, "decaying": 0.5}}"#,
        )
        .unwrap();
        assert_eq!(params.algorithm(), Algorithm::Perceptron);
        assert_eq!(params.max_epochs(), 3);
        assert_eq!(params.batch_size(), 5);
        assert_eq!(params.lols(), Lols::new(1, 0.5));

        assert!(HyperParameters::from_json(r#"{"max_epochs": 0}"#).is_err());
        assert!(HyperParameters::from_json(r#"{"epochs": 3}"#).is_err());
    }
}
