//! Training module for greedy taggers
//!
//! This module contains the feature counting pass, the hyperparameters,
//! the exploration schedule and the epoch driver.

mod feature_gen;
mod lols;
mod params;
mod trainer;

pub use self::feature_gen::FeatureCounter;
pub use self::lols::Lols;
pub use self::params::{HyperParameters, WeightGenerator};
pub use self::trainer::{EpochReport, Trainer};
