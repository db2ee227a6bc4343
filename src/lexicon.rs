use std::collections::{BTreeSet, HashMap};

use crate::node::Node;

/// Set-membership lookups keyed by word form.
///
/// Gazetteers, word clusters and ambiguity classes are loaded elsewhere;
/// the feature template only sees them through the node fields filled in
/// by [`Lexicon::annotate`].
pub trait Lexicon {
    /// Cluster ids the word form belongs to
    fn word_clusters(&self, word_form: &str) -> Vec<String>;

    /// Gazetteer entries the word form belongs to
    fn gazetteers(&self, word_form: &str) -> Vec<String>;

    /// Ambiguity class of the word form
    fn ambiguity_class(&self, word_form: &str) -> Option<String>;

    /// Fill the lexicon fields of every non-root node.
    fn annotate(&self, nodes: &mut [Node]) {
        for node in nodes.iter_mut().filter(|n| !n.is_root()) {
            node.word_clusters
                .extend(self.word_clusters(&node.word_form));
            node.named_entity_gazetteers
                .extend(self.gazetteers(&node.word_form));
            if node.ambiguity_class.is_none() {
                node.ambiguity_class = self.ambiguity_class(&node.word_form);
            }
        }
    }
}

/// In-memory lexicon backed by hash maps
#[derive(Debug, Clone, Default)]
pub struct MapLexicon {
    clusters: HashMap<String, BTreeSet<String>>,
    gazetteers: HashMap<String, BTreeSet<String>>,
    ambiguity_classes: HashMap<String, String>,
}

impl MapLexicon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cluster<F: Into<String>, C: Into<String>>(&mut self, word_form: F, cluster: C) {
        self.clusters
            .entry(word_form.into())
            .or_default()
            .insert(cluster.into());
    }

    pub fn add_gazetteer<F: Into<String>, G: Into<String>>(&mut self, word_form: F, entry: G) {
        self.gazetteers
            .entry(word_form.into())
            .or_default()
            .insert(entry.into());
    }

    pub fn set_ambiguity_class<F: Into<String>, A: Into<String>>(&mut self, word_form: F, class: A) {
        self.ambiguity_classes
            .insert(word_form.into(), class.into());
    }
}

impl Lexicon for MapLexicon {
    fn word_clusters(&self, word_form: &str) -> Vec<String> {
        self.clusters
            .get(word_form)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn gazetteers(&self, word_form: &str) -> Vec<String> {
        self.gazetteers
            .get(word_form)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn ambiguity_class(&self, word_form: &str) -> Option<String> {
        self.ambiguity_classes.get(word_form).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::from_forms;

    #[test]
    fn test_annotate() {
        let mut lexicon = MapLexicon::new();
        lexicon.add_cluster("Paris", "0110");
        lexicon.add_cluster("Paris", "01");
        lexicon.add_gazetteer("Paris", "LOC");
        lexicon.set_ambiguity_class("visited", "VBD_VBN");

        let mut nodes = from_forms(["John", "visited", "Paris"]);
        lexicon.annotate(&mut nodes);

        assert!(nodes[0].word_clusters.is_empty());
        assert!(nodes[1].named_entity_gazetteers.is_empty());
        assert_eq!(nodes[2].ambiguity_class.as_deref(), Some("VBD_VBN"));

        let clusters: Vec<_> = nodes[3].word_clusters.iter().map(String::as_str).collect();
        assert_eq!(clusters, ["01", "0110"]);
        assert!(nodes[3].named_entity_gazetteers.contains("LOC"));
    }
}
