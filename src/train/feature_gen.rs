use std::collections::HashMap;

use crate::dictionary::Dictionary;

/// Counts feature strings over the gold corpus before the feature space is
/// fixed.
#[derive(Debug, Default)]
pub struct FeatureCounter {
    counts: HashMap<String, usize>,
    /// Features in first-seen order, so finalized ids are reproducible
    order: Vec<String>,
}

impl FeatureCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<I, S>(&mut self, features: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for feature in features {
            let feature = feature.into();
            match self.counts.get_mut(&feature) {
                Some(count) => *count += 1,
                None => {
                    self.counts.insert(feature.clone(), 1);
                    self.order.push(feature);
                }
            }
        }
    }

    pub fn count(&self, feature: &str) -> usize {
        self.counts.get(feature).copied().unwrap_or(0)
    }

    /// Number of distinct features seen
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Build the feature dictionary from every feature seen at least
    /// `cutoff` times.
    pub fn finalize(&self, cutoff: usize) -> Dictionary {
        self.order
            .iter()
            .filter(|feature| self.count(feature) >= cutoff)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff_excludes_rare_features() {
        let mut counter = FeatureCounter::new();
        counter.add(["0:the", "1:DT"]);
        counter.add(["0:the", "1:NN"]);
        assert_eq!(counter.len(), 3);
        assert_eq!(counter.count("0:the"), 2);

        let all = counter.finalize(0);
        assert_eq!(all.len(), 3);
        assert_eq!(all.get("1:NN"), Some(2));

        let frequent = counter.finalize(2);
        assert_eq!(frequent.len(), 1);
        assert_eq!(frequent.get("0:the"), Some(0));
        assert_eq!(frequent.get("1:DT"), None);
    }
}
