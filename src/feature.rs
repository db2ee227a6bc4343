use serde::{Deserialize, Serialize};

use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::state::L2RState;

/// Value of any descriptor that points outside of the sentence
pub const OUT_OF_BOUNDS: &str = "<oob>";
/// Value of a field that is absent on an existing node
pub const NONE: &str = "<none>";

/// Maximum number of descriptors joined into one feature
const MAX_NGRAM: usize = 3;

/// Node attribute a feature descriptor reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    WordForm,
    SimplifiedWordForm,
    UncapitalizedSimplifiedWordForm,
    Lemma,
    PartOfSpeechTag,
    NamedEntityTag,
    /// Shape signature, parameter is the maximum run length
    WordShape,
    /// Parameter is the affix length
    Prefix,
    /// Parameter is the affix length
    Suffix,
    AmbiguityClasses,
    // set-valued fields
    Orthographic,
    Positional,
    WordClusters,
    NamedEntityGazetteers,
}

impl Field {
    /// Whether the field resolves to zero or more values instead of one
    pub fn is_set(self) -> bool {
        matches!(
            self,
            Field::Orthographic
                | Field::Positional
                | Field::WordClusters
                | Field::NamedEntityGazetteers
        )
    }

    fn requires_param(self) -> bool {
        matches!(self, Field::WordShape | Field::Prefix | Field::Suffix)
    }
}

/// A feature descriptor: which field of which node, relative to the
/// current decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureItem {
    /// Offset from the current input
    pub window: isize,
    pub field: Field,
    /// Affix length or shape run length
    pub param: Option<usize>,
}

impl FeatureItem {
    pub fn new(window: isize, field: Field) -> Self {
        Self {
            window,
            field,
            param: None,
        }
    }

    pub fn with_param(window: isize, field: Field, param: usize) -> Self {
        Self {
            window,
            field,
            param: Some(param),
        }
    }

    fn value(&self, node: &Node) -> Option<String> {
        let param = self.param.unwrap_or(0);
        match self.field {
            Field::WordForm => Some(node.word_form.clone()),
            Field::SimplifiedWordForm => Some(node.simplified_word_form.clone()),
            Field::UncapitalizedSimplifiedWordForm => {
                Some(node.uncapitalized_simplified_word_form.clone())
            }
            Field::Lemma => node.lemma.clone(),
            Field::PartOfSpeechTag => node.part_of_speech_tag.clone(),
            Field::NamedEntityTag => node.named_entity_tag.clone(),
            Field::WordShape => Some(node.word_shape(param)),
            Field::Prefix => node.prefix(param),
            Field::Suffix => node.suffix(param),
            Field::AmbiguityClasses => node.ambiguity_class.clone(),
            Field::Orthographic
            | Field::Positional
            | Field::WordClusters
            | Field::NamedEntityGazetteers => None,
        }
    }

    fn values(&self, node: &Node, len: usize) -> Vec<String> {
        match self.field {
            Field::Orthographic => node.orthographic.names().map(str::to_lowercase).collect(),
            Field::Positional => {
                let mut values = Vec::new();
                if node.id == 1 {
                    values.push("first".to_string());
                }
                if !node.is_root() && node.id + 1 == len {
                    values.push("last".to_string());
                }
                values
            }
            Field::WordClusters => node.word_clusters.iter().cloned().collect(),
            Field::NamedEntityGazetteers => node.named_entity_gazetteers.iter().cloned().collect(),
            _ => self.value(node).into_iter().collect(),
        }
    }
}

/// One entry of a feature template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSpec {
    /// Conjunction of one to three single-valued descriptors
    Single(Vec<FeatureItem>),
    /// Every value of a set-valued descriptor is its own feature
    Set(FeatureItem),
}

/// Ordered list of feature specifications for a task
///
/// A template is assembled with [`FeatureTemplateBuilder`] and is immutable
/// afterwards; it fixes the meaning of every feature a task produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureTemplate {
    specs: Vec<FeatureSpec>,
}

impl FeatureTemplate {
    pub fn builder() -> FeatureTemplateBuilder {
        FeatureTemplateBuilder::default()
    }

    pub fn specs(&self) -> &[FeatureSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Feature strings active at the current decision point.
    ///
    /// Every string is prefixed with the index of its template entry, so
    /// equal values from different entries never collide.
    pub fn extract(&self, state: &L2RState<'_>) -> Vec<String> {
        let mut features = Vec::with_capacity(self.specs.len());

        for (slot, spec) in self.specs.iter().enumerate() {
            match spec {
                FeatureSpec::Single(items) => {
                    let value = items
                        .iter()
                        .map(|item| match state.node(item.window) {
                            Some(node) => item.value(node).unwrap_or_else(|| NONE.to_string()),
                            None => OUT_OF_BOUNDS.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join("_");
                    features.push(format!("{}:{}", slot, value));
                }
                FeatureSpec::Set(item) => match state.node(item.window) {
                    Some(node) => {
                        for value in item.values(node, state.len()) {
                            features.push(format!("{}:{}", slot, value));
                        }
                    }
                    None => features.push(format!("{}:{}", slot, OUT_OF_BOUNDS)),
                },
            }
        }
        features
    }

    /// Ids of the active features known to `features`; unknown ones are
    /// dropped.
    pub fn vectorize(&self, state: &L2RState<'_>, features: &Dictionary) -> Vec<u32> {
        self.extract(state)
            .iter()
            .filter_map(|f| features.get(f))
            .collect()
    }

    /// Default part-of-speech template.
    pub fn part_of_speech() -> Self {
        use Field::*;
        let single = |w, f| FeatureItem::new(w, f);
        let param = FeatureItem::with_param;

        let mut b = Self::builder();
        // 1-gram features
        for w in -2..=2 {
            b = b.single(single(w, SimplifiedWordForm));
        }
        for w in -1..=1 {
            b = b.single(param(w, WordShape, 2));
        }
        for w in -3..=-1 {
            b = b.single(single(w, PartOfSpeechTag));
        }
        for w in 0..=3 {
            b = b.single(single(w, AmbiguityClasses));
        }

        // 2-gram features
        let uncap = |w| single(w, UncapitalizedSimplifiedWordForm);
        b = b
            .pair(uncap(-2), uncap(-1))
            .pair(uncap(-1), uncap(0))
            .pair(uncap(0), uncap(1))
            .pair(uncap(1), uncap(2))
            .pair(uncap(-1), uncap(1))
            .pair(single(-2, PartOfSpeechTag), single(-1, PartOfSpeechTag))
            .pair(single(-1, PartOfSpeechTag), single(1, AmbiguityClasses))
            .pair(single(1, AmbiguityClasses), single(2, AmbiguityClasses));

        // 3-gram features
        let pos = |w| single(w, PartOfSpeechTag);
        let amb = |w| single(w, AmbiguityClasses);
        b = b
            .triple(pos(-2), pos(-1), amb(0))
            .triple(pos(-2), pos(-1), amb(1))
            .triple(pos(-1), amb(0), amb(1))
            .triple(pos(-1), amb(1), amb(2));

        // affix features
        b = b
            .single(param(0, Prefix, 2))
            .single(param(0, Prefix, 3))
            .single(param(0, Suffix, 1))
            .single(param(0, Suffix, 2))
            .single(param(0, Suffix, 3))
            .single(param(0, Suffix, 4));

        b.set(single(0, Orthographic))
            .set(single(0, Positional))
            .set(single(-1, WordClusters))
            .set(single(0, WordClusters))
            .set(single(1, WordClusters))
            .build()
            .expect("default part-of-speech template is well formed")
    }

    /// Default named-entity template.
    pub fn named_entity() -> Self {
        use Field::*;
        let single = |w, f| FeatureItem::new(w, f);
        let param = FeatureItem::with_param;

        let mut b = Self::builder();
        for w in -1..=1 {
            b = b.single(single(w, SimplifiedWordForm));
        }
        for w in -2..=2 {
            b = b.single(single(w, UncapitalizedSimplifiedWordForm));
        }
        for w in -1..=1 {
            b = b.single(param(w, WordShape, 2));
        }
        b = b.single(single(0, Lemma));
        for w in -2..=2 {
            b = b.single(single(w, PartOfSpeechTag));
        }
        for w in -3..=-1 {
            b = b.single(single(w, NamedEntityTag));
        }
        for w in -1..=3 {
            b = b.set(single(w, NamedEntityGazetteers));
        }
        b = b
            .single(param(-1, Suffix, 3))
            .single(param(0, Prefix, 1))
            .single(param(0, Suffix, 1))
            .single(param(0, Suffix, 3))
            .single(param(1, Prefix, 3));
        b = b.set(single(0, Orthographic)).set(single(1, Orthographic));
        for w in 0..=2 {
            b = b.set(single(w, WordClusters));
        }
        b.build()
            .expect("default named-entity template is well formed")
    }
}

/// Builder for [`FeatureTemplate`]
#[derive(Debug, Clone, Default)]
pub struct FeatureTemplateBuilder {
    specs: Vec<FeatureSpec>,
}

impl FeatureTemplateBuilder {
    /// Add a single-valued feature
    pub fn single(self, item: FeatureItem) -> Self {
        self.add(vec![item])
    }

    /// Add a conjunction of two single-valued descriptors
    pub fn pair(self, first: FeatureItem, second: FeatureItem) -> Self {
        self.add(vec![first, second])
    }

    /// Add a conjunction of three single-valued descriptors
    pub fn triple(self, first: FeatureItem, second: FeatureItem, third: FeatureItem) -> Self {
        self.add(vec![first, second, third])
    }

    /// Add a conjunction of descriptors
    pub fn add(mut self, items: Vec<FeatureItem>) -> Self {
        self.specs.push(FeatureSpec::Single(items));
        self
    }

    /// Add a set-valued feature
    pub fn set(mut self, item: FeatureItem) -> Self {
        self.specs.push(FeatureSpec::Set(item));
        self
    }

    /// Validate every entry and freeze the template.
    pub fn build(self) -> Result<FeatureTemplate> {
        for (slot, spec) in self.specs.iter().enumerate() {
            let items: &[FeatureItem] = match spec {
                FeatureSpec::Single(items) => {
                    if items.is_empty() || items.len() > MAX_NGRAM {
                        return Err(Error::InvalidFeature(format!(
                            "entry {} joins {} descriptors, expected 1 to {}",
                            slot,
                            items.len(),
                            MAX_NGRAM
                        )));
                    }
                    if let Some(item) = items.iter().find(|item| item.field.is_set()) {
                        return Err(Error::InvalidFeature(format!(
                            "entry {}: {:?} is set-valued and cannot be joined",
                            slot, item.field
                        )));
                    }
                    items
                }
                FeatureSpec::Set(item) => {
                    if !item.field.is_set() {
                        return Err(Error::InvalidFeature(format!(
                            "entry {}: {:?} is single-valued",
                            slot, item.field
                        )));
                    }
                    std::slice::from_ref(item)
                }
            };
            if let Some(item) = items
                .iter()
                .find(|item| item.field.requires_param() && item.param.is_none())
            {
                return Err(Error::InvalidFeature(format!(
                    "entry {}: {:?} needs a parameter",
                    slot, item.field
                )));
            }
        }
        Ok(FeatureTemplate { specs: self.specs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::from_forms;
    use crate::state::Task;

    fn template() -> FeatureTemplate {
        FeatureTemplate::builder()
            .single(FeatureItem::new(0, Field::WordForm))
            .single(FeatureItem::new(-1, Field::PartOfSpeechTag))
            .pair(
                FeatureItem::new(-1, Field::WordForm),
                FeatureItem::new(1, Field::WordForm),
            )
            .set(FeatureItem::new(0, Field::Orthographic))
            .set(FeatureItem::new(2, Field::WordClusters))
            .build()
            .unwrap()
    }

    #[test]
    fn test_extract_first_position() {
        let mut nodes = from_forms(["Dogs", "bark"]);
        let state = L2RState::new(&mut nodes, Task::PartOfSpeech);

        let features = template().extract(&state);
        assert_eq!(
            features,
            [
                "0:Dogs",
                "1:@#r$%",
                "2:@#r$%_bark",
                "3:init_upper",
                "4:<oob>",
            ]
        );
    }

    #[test]
    fn test_extract_reads_assigned_labels() {
        let mut nodes = from_forms(["Dogs", "bark"]);
        let mut state = L2RState::new(&mut nodes, Task::PartOfSpeech);
        state.save_oracle();
        state.apply_transition("NNS").unwrap();

        let features = template().extract(&state);
        assert_eq!(features[1], "1:NNS");
        assert_eq!(features[2], "2:Dogs_<oob>");
        assert_eq!(features[3], "3:all_lower");
    }

    #[test]
    fn test_missing_field_uses_placeholder() {
        let template = FeatureTemplate::builder()
            .single(FeatureItem::new(0, Field::Lemma))
            .single(FeatureItem::with_param(0, Field::Suffix, 5))
            .build()
            .unwrap();
        let mut nodes = from_forms(["cat"]);
        let state = L2RState::new(&mut nodes, Task::PartOfSpeech);
        assert_eq!(template.extract(&state), ["0:<none>", "1:<none>"]);
    }

    #[test]
    fn test_positional() {
        let template = FeatureTemplate::builder()
            .set(FeatureItem::new(0, Field::Positional))
            .build()
            .unwrap();
        let mut nodes = from_forms(["Stop"]);
        let state = L2RState::new(&mut nodes, Task::PartOfSpeech);
        assert_eq!(template.extract(&state), ["0:first", "0:last"]);
    }

    #[test]
    fn test_vectorize_drops_unknown() {
        let mut nodes = from_forms(["Dogs", "bark"]);
        let state = L2RState::new(&mut nodes, Task::PartOfSpeech);
        let known: Dictionary = ["3:init_upper", "0:Dogs"].iter().collect();

        assert_eq!(template().vectorize(&state, &known), [1, 0]);
    }

    #[test]
    fn test_build_rejects_malformed_entries() {
        let err = FeatureTemplate::builder()
            .add(vec![FeatureItem::new(0, Field::WordForm); 4])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("expected 1 to 3"));

        assert!(FeatureTemplate::builder()
            .single(FeatureItem::new(0, Field::WordClusters))
            .build()
            .is_err());
        assert!(FeatureTemplate::builder()
            .set(FeatureItem::new(0, Field::Lemma))
            .build()
            .is_err());
        assert!(FeatureTemplate::builder()
            .single(FeatureItem::new(0, Field::Prefix))
            .build()
            .is_err());
    }

    #[test]
    fn test_default_templates() {
        assert_eq!(FeatureTemplate::part_of_speech().len(), 38);
        assert_eq!(FeatureTemplate::named_entity().len(), 35);
    }
}
