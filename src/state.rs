use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::eval::Accuracy;
use crate::node::Node;

/// The label field a tagging task reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    PartOfSpeech,
    NamedEntity,
}

impl Task {
    /// Current label of the node for this task
    pub fn label(self, node: &Node) -> Option<&str> {
        match self {
            Task::PartOfSpeech => node.part_of_speech_tag.as_deref(),
            Task::NamedEntity => node.named_entity_tag.as_deref(),
        }
    }

    /// Replace the label of the node, returning the previous one
    pub fn set_label(self, node: &mut Node, label: Option<String>) -> Option<String> {
        let slot = match self {
            Task::PartOfSpeech => &mut node.part_of_speech_tag,
            Task::NamedEntity => &mut node.named_entity_tag,
        };
        std::mem::replace(slot, label)
    }
}

/// Left-to-right transition state over one sentence
///
/// Every non-root node is a decision point, visited in order. The only
/// way labels change while decoding is [`L2RState::apply_transition`].
#[derive(Debug)]
pub struct L2RState<'a> {
    nodes: &'a mut [Node],
    task: Task,
    /// Gold labels, indexed like `nodes`, empty until saved
    oracle: Vec<Option<String>>,
    /// Index of the node to label next
    input: usize,
}

impl<'a> L2RState<'a> {
    pub fn new(nodes: &'a mut [Node], task: Task) -> Self {
        Self {
            nodes,
            task,
            oracle: Vec::new(),
            input: 1,
        }
    }

    pub fn task(&self) -> Task {
        self.task
    }

    /// Move the task labels of every node into the oracle, leaving the
    /// label slots empty. The root keeps its label.
    ///
    /// # Panics
    ///
    /// Panics if the oracle was already saved or a transition was applied.
    pub fn save_oracle(&mut self) {
        assert!(
            self.oracle.is_empty() && self.input == 1,
            "the oracle must be saved once, before the first transition"
        );
        let task = self.task;
        self.oracle = self
            .nodes
            .iter_mut()
            .map(|node| {
                if node.is_root() {
                    task.label(node).map(str::to_string)
                } else {
                    task.set_label(node, None)
                }
            })
            .collect();
    }

    /// Gold label of the current decision point
    pub fn oracle(&self) -> Option<&str> {
        self.oracle.get(self.input).and_then(|label| label.as_deref())
    }

    /// Gold labels of the whole sentence
    pub fn oracle_labels(&self) -> &[Option<String>] {
        &self.oracle
    }

    /// Index of the current decision point
    pub fn input(&self) -> usize {
        self.input
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn is_terminal(&self) -> bool {
        self.input >= self.nodes.len()
    }

    /// Node at `window` positions away from the current decision point,
    /// `None` when that falls outside of the sentence.
    pub fn node(&self, window: isize) -> Option<&Node> {
        let index = self.input as isize + window;
        if index < 0 {
            return None;
        }
        self.nodes.get(index as usize)
    }

    /// Label the current node and move to the next one.
    pub fn apply_transition(&mut self, label: &str) -> Result<()> {
        if self.is_terminal() {
            return Err(Error::TransitionPastEnd {
                position: self.input,
            });
        }
        self.task
            .set_label(&mut self.nodes[self.input], Some(label.to_string()));
        self.input += 1;
        Ok(())
    }

    /// Compare the assigned labels with the oracle.
    ///
    /// Nodes whose word form is in `excluded` are skipped, which gives the
    /// accuracy on words unseen in training when `excluded` holds the
    /// training vocabulary.
    pub fn evaluate(&self, excluded: Option<&HashSet<String>>) -> Accuracy {
        let mut acc = Accuracy::default();

        for (i, node) in self.nodes.iter().enumerate().skip(1) {
            if excluded.map_or(false, |words| words.contains(&node.word_form)) {
                continue;
            }
            let gold = self.oracle.get(i).and_then(|label| label.as_deref());
            let correct = matches!((gold, self.task.label(node)), (Some(g), Some(l)) if g == l);
            acc.add(correct as usize, 1);
        }
        acc
    }
}
