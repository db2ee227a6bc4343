use rand::Rng;
use serde::{Deserialize, Serialize};

/// Locally optimal learning to search schedule
///
/// For the first `fixed` epochs every decision follows the gold label.
/// Afterwards the gold label is followed with probability
/// `decaying^(epoch - fixed)` and the model's prediction otherwise, so later
/// epochs train on the states the model itself reaches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lols {
    pub fixed: usize,
    pub decaying: f64,
}

impl Default for Lols {
    fn default() -> Self {
        Self {
            fixed: 0,
            decaying: 1.0,
        }
    }
}

impl Lols {
    pub fn new(fixed: usize, decaying: f64) -> Self {
        Self { fixed, decaying }
    }

    /// Probability of following the gold label in a 0-based epoch
    pub fn gold_probability(&self, epoch: usize) -> f64 {
        if epoch < self.fixed {
            return 1.0;
        }
        let exponent = i32::try_from(epoch - self.fixed).unwrap_or(i32::MAX);
        self.decaying.powi(exponent)
    }

    /// Draw one decision: `true` follows the gold label.
    pub fn follow_gold<R: Rng + ?Sized>(&self, epoch: usize, rng: &mut R) -> bool {
        let p = self.gold_probability(epoch);
        if p >= 1.0 {
            return true;
        }
        rng.gen::<f64>() < p
    }
}
