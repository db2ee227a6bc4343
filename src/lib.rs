//! Greedy transition-based sequence labeling
//!
//! Sentences are labeled left to right, one token per decision. Every
//! decision sees the labels assigned before it through a windowed feature
//! template, and is scored by one of several online learners. Training
//! mixes gold and predicted trajectories with the LOLS schedule.
//!
//! # Examples
//!
//! ## Training
//!
//! ```no_run
//! use nlptag::node::Node;
//! use nlptag::train::Trainer;
//! use nlptag::{FeatureTemplate, Task};
//!
//! let mut trainer = Trainer::new(Task::PartOfSpeech, FeatureTemplate::part_of_speech());
//! trainer.set("algorithm", "adagrad")?;
//! trainer.set("max_epochs", "5")?;
//!
//! let sentence = vec![
//!     Node::root(),
//!     Node::new(1, "Dogs").with_part_of_speech_tag("NNS"),
//!     Node::new(2, "bark").with_part_of_speech_tag("VBP"),
//! ];
//! trainer.append(sentence)?;
//!
//! let (model, _reports) = trainer.train()?;
//! model.save("model.json")?;
//! # Ok::<(), nlptag::Error>(())
//! ```
//!
//! ## Tagging
//!
//! ```no_run
//! use nlptag::node::from_forms;
//! use nlptag::Model;
//!
//! let model = Model::load("model.json")?;
//! let mut nodes = from_forms(["Cats", "purr"]);
//! model.tagger().tag(&mut nodes)?;
//! let tags: Vec<_> = nodes[1..]
//!     .iter()
//!     .map(|n| n.part_of_speech_tag.as_deref())
//!     .collect();
//! # Ok::<(), nlptag::Error>(())
//! ```

mod dictionary;
mod error;
mod eval;
mod model;
mod state;
mod tagger;

pub mod feature;
pub mod lexicon;
pub mod node;
pub mod optimizer;

/// Training module containing the epoch driver and its configuration
pub mod train;

// Re-export main types
pub use self::dictionary::Dictionary;
pub use self::error::{Error, Result};
pub use self::eval::Accuracy;
pub use self::feature::{FeatureItem, FeatureTemplate, Field};
pub use self::model::Model;
pub use self::node::Node;
pub use self::state::{L2RState, Task};
pub use self::tagger::Tagger;

// Re-export training types for convenience
pub use self::optimizer::Algorithm;
pub use self::train::{HyperParameters, Trainer};
