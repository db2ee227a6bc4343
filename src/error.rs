use std::io;

use thiserror::Error;

/// Errors that can occur while configuring, training or loading a tagger.
#[derive(Debug, Error)]
pub enum Error {
    /// The optimizer name is not one of the known algorithms.
    #[error("{0} is not a valid algorithm name")]
    UnknownAlgorithm(String),

    /// The activation function name is not one of the known functions.
    #[error("{0} is not a valid activation function")]
    UnknownActivation(String),

    /// A hyperparameter was given a value outside of its domain.
    #[error("{0}")]
    InvalidParameter(String),

    /// A hyperparameter key is not recognized.
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// A hyperparameter value could not be parsed.
    #[error("invalid value for {name}: {value:?}")]
    ParseParameter {
        /// Parameter key.
        name: String,
        /// The raw value that failed to parse.
        value: String,
    },

    /// A feature template entry is malformed.
    #[error("invalid feature: {0}")]
    InvalidFeature(String),

    /// The trainer has no sentences to learn from.
    #[error("no training data")]
    NoTrainingData,

    /// A sentence has no token besides the root.
    #[error("empty sentences are not allowed")]
    EmptySentence,

    /// A training token carries no gold label for the task.
    #[error("missing gold label at position {position}")]
    MissingLabel {
        /// Index of the node inside its sentence.
        position: usize,
    },

    /// A transition was applied to a terminal state.
    #[error("cannot apply a transition at position {position}: the state is terminal")]
    TransitionPastEnd {
        /// Input pointer at the time of the call.
        position: usize,
    },

    /// A decision inside a sentence failed.
    #[error("sentence {index}: {source}")]
    Sentence {
        /// Index of the sentence in its corpus.
        index: usize,
        /// The underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// Stored weights do not agree with the feature or label space.
    #[error("{what} dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Which dimension disagrees.
        what: &'static str,
        /// Dimension implied by the feature/label maps.
        expected: usize,
        /// Dimension found in the stored weights.
        found: usize,
    },

    /// Reading or writing a model failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A model file is not valid JSON for the bundle.
    #[error("model format error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Attach the sentence index to an error raised while processing it.
    pub(crate) fn in_sentence(self, index: usize) -> Self {
        Error::Sentence {
            index,
            source: Box::new(self),
        }
    }
}

/// Result type alias for tagger operations.
pub type Result<T> = std::result::Result<T, Error>;
