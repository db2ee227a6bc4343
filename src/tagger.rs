use std::collections::HashSet;

use rayon::prelude::*;

use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::eval::Accuracy;
use crate::feature::FeatureTemplate;
use crate::node::{ensure_root, Node};
use crate::optimizer::Optimizer;
use crate::state::{L2RState, Task};

/// Greedy left-to-right decoder over a trained model
///
/// Scoring never mutates the weights, so one tagger can label many
/// sentences in parallel.
#[derive(Debug, Clone, Copy)]
pub struct Tagger<'a> {
    task: Task,
    template: &'a FeatureTemplate,
    labels: &'a Dictionary,
    features: &'a Dictionary,
    optimizer: &'a Optimizer,
}

impl<'a> Tagger<'a> {
    pub(crate) fn new(
        task: Task,
        template: &'a FeatureTemplate,
        labels: &'a Dictionary,
        features: &'a Dictionary,
        optimizer: &'a Optimizer,
    ) -> Self {
        Self {
            task,
            template,
            labels,
            features,
            optimizer,
        }
    }

    /// Label every non-root node of the sentence in place.
    ///
    /// A missing root is prepended. Labels already present for the task are
    /// discarded before decoding.
    pub fn tag(&self, nodes: &mut Vec<Node>) -> Result<()> {
        ensure_root(nodes);
        let mut state = L2RState::new(nodes, self.task);
        state.save_oracle();
        self.decode(&mut state)
    }

    /// Label the sentence and compare the result with the labels it carried.
    pub fn evaluate(
        &self,
        nodes: &mut Vec<Node>,
        excluded: Option<&HashSet<String>>,
    ) -> Result<Accuracy> {
        ensure_root(nodes);
        let mut state = L2RState::new(nodes, self.task);
        state.save_oracle();
        self.decode(&mut state)?;
        Ok(state.evaluate(excluded))
    }

    /// Label every sentence, in parallel.
    pub fn tag_all(&self, sentences: &mut [Vec<Node>]) -> Result<()> {
        sentences
            .par_iter_mut()
            .enumerate()
            .try_for_each(|(i, nodes)| self.tag(nodes).map_err(|e| e.in_sentence(i)))
    }

    /// Label every sentence in parallel and sum the accuracies.
    pub fn evaluate_all(
        &self,
        sentences: &mut [Vec<Node>],
        excluded: Option<&HashSet<String>>,
    ) -> Result<Accuracy> {
        let tallies: Vec<Accuracy> = sentences
            .par_iter_mut()
            .enumerate()
            .map(|(i, nodes)| self.evaluate(nodes, excluded).map_err(|e| e.in_sentence(i)))
            .collect::<Result<_>>()?;

        let mut total = Accuracy::default();
        for acc in tallies {
            total += acc;
        }
        Ok(total)
    }

    fn decode(&self, state: &mut L2RState<'_>) -> Result<()> {
        let labels = self.labels;
        while !state.is_terminal() {
            let features = self.template.vectorize(state, self.features);
            let id = self.optimizer.predict(&features);
            let label = labels.get_name(id).ok_or(Error::DimensionMismatch {
                what: "label",
                expected: labels.len(),
                found: id as usize + 1,
            })?;
            state.apply_transition(label)?;
        }
        Ok(())
    }
}
