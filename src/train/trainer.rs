use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::feature_gen::FeatureCounter;
use super::params::HyperParameters;
use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::eval::Accuracy;
use crate::feature::FeatureTemplate;
use crate::model::Model;
use crate::node::{ensure_root, Node};
use crate::optimizer::{argmax, Instance, Optimizer};
use crate::state::{L2RState, Task};
use crate::tagger::Tagger;

/// Accuracy tallies of one training epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// 0-based epoch index
    pub epoch: usize,
    /// Probability of following the gold label during the epoch
    pub gold_probability: f64,
    /// Agreement of the followed trajectory with the oracle
    pub train: Accuracy,
    /// Greedy decoding accuracy on the development set, when one is given
    pub development: Option<Accuracy>,
}

/// Where the decisions of a sentence go
enum Learner<'o> {
    /// Update right after every decision
    Online(&'o mut Optimizer),
    /// Score against frozen weights and keep the instances for a later flush
    Batch(&'o Optimizer, Vec<Instance>),
}

impl Learner<'_> {
    fn optimizer(&self) -> &Optimizer {
        match self {
            Learner::Online(optimizer) => &**optimizer,
            Learner::Batch(optimizer, _) => *optimizer,
        }
    }

    fn learn(&mut self, instance: Instance) {
        match self {
            Learner::Online(optimizer) => optimizer.update(&instance),
            Learner::Batch(_, instances) => instances.push(instance),
        }
    }
}

/// Exploration RNG for one sentence of one epoch, independent of the
/// order sentences are processed in.
fn sentence_rng(seed: u64, epoch: usize, index: usize) -> StdRng {
    let stream = ((epoch as u64) << 32) ^ index as u64;
    StdRng::seed_from_u64(seed ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Greedy transition-based tagger trainer
///
/// Sentences are node sequences whose first node is the root and whose
/// other nodes carry gold labels for the task.
#[derive(Debug)]
pub struct Trainer {
    task: Task,
    template: FeatureTemplate,
    params: HyperParameters,
    sentences: Vec<Vec<Node>>,
    development: Vec<Vec<Node>>,
    /// Word forms skipped when scoring the development set
    excluded: Option<HashSet<String>>,
}

impl Trainer {
    /// Create a trainer with default hyperparameters
    pub fn new(task: Task, template: FeatureTemplate) -> Self {
        Self {
            task,
            template,
            params: HyperParameters::default(),
            sentences: Vec::new(),
            development: Vec::new(),
            excluded: None,
        }
    }

    /// Replace the hyperparameters (builder pattern)
    pub fn with_params(mut self, params: HyperParameters) -> Result<Self> {
        params.validate()?;
        self.params = params;
        Ok(self)
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn template(&self) -> &FeatureTemplate {
        &self.template
    }

    pub fn params(&self) -> &HyperParameters {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut HyperParameters {
        &mut self.params
    }

    /// Set a hyperparameter from its string form
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.params.set(name, value)
    }

    /// Append a training sentence
    pub fn append(&mut self, nodes: Vec<Node>) -> Result<()> {
        let nodes = self.check_sentence(nodes, self.sentences.len())?;
        self.sentences.push(nodes);
        Ok(())
    }

    /// Append a development sentence, scored after every epoch
    pub fn append_development(&mut self, nodes: Vec<Node>) -> Result<()> {
        let nodes = self.check_sentence(nodes, self.development.len())?;
        self.development.push(nodes);
        Ok(())
    }

    /// Skip these word forms when scoring the development set
    pub fn set_excluded(&mut self, excluded: Option<HashSet<String>>) {
        self.excluded = excluded;
    }

    /// Word forms of the training sentences, for use with
    /// [`Trainer::set_excluded`].
    pub fn vocabulary(&self) -> HashSet<String> {
        self.sentences
            .iter()
            .flat_map(|nodes| nodes.iter().skip(1))
            .map(|node| node.word_form.clone())
            .collect()
    }

    pub fn num_sentences(&self) -> usize {
        self.sentences.len()
    }

    /// Clear all training and development data
    pub fn clear(&mut self) {
        self.sentences.clear();
        self.development.clear();
    }

    fn check_sentence(&self, mut nodes: Vec<Node>, index: usize) -> Result<Vec<Node>> {
        ensure_root(&mut nodes);
        if nodes.len() < 2 {
            return Err(Error::EmptySentence.in_sentence(index));
        }
        if let Some(position) = (1..nodes.len()).find(|&i| self.task.label(&nodes[i]).is_none()) {
            return Err(Error::MissingLabel { position }.in_sentence(index));
        }
        Ok(nodes)
    }

    /// Train a model, returning it with the tallies of every epoch.
    ///
    /// With a development set, the weights of the best scoring epoch are
    /// kept; ties go to the earlier epoch.
    pub fn train(&self) -> Result<(Model, Vec<EpochReport>)> {
        if self.sentences.is_empty() {
            return Err(Error::NoTrainingData);
        }
        self.params.validate()?;

        info!(
            algorithm = %self.params.algorithm(),
            sentences = self.sentences.len(),
            development = self.development.len(),
            "start training"
        );

        let (labels, features) = self.collect_features()?;
        info!(
            labels = labels.len(),
            features = features.len(),
            cutoff = self.params.feature_cutoff(),
            "feature space fixed"
        );

        let mut optimizer = Optimizer::new(&self.params, features.len(), labels.len())?;
        let mut best: Option<(f64, Optimizer)> = None;
        let mut reports = Vec::with_capacity(self.params.max_epochs());

        for epoch in 0..self.params.max_epochs() {
            let gold_probability = self.params.lols().gold_probability(epoch);
            debug!(epoch, gold_probability, "lols schedule");

            let train = if optimizer.is_mini_batch() {
                self.mini_batch_epoch(epoch, &labels, &features, &mut optimizer)?
            } else {
                self.online_epoch(epoch, &labels, &features, &mut optimizer)?
            };

            let development = if self.development.is_empty() {
                None
            } else {
                let tagger = Tagger::new(self.task, &self.template, &labels, &features, &optimizer);
                let mut sentences = self.development.clone();
                Some(tagger.evaluate_all(&mut sentences, self.excluded.as_ref())?)
            };

            match development {
                Some(acc) => {
                    info!(epoch, train = %train, development = %acc, "epoch finished");
                    let score = acc.score();
                    match best.as_ref().map(|(best_score, _)| *best_score) {
                        Some(best_score) if score <= best_score => {
                            warn!(epoch, score, best = best_score, "development score did not improve");
                        }
                        _ => best = Some((score, optimizer.clone())),
                    }
                }
                None => info!(epoch, train = %train, "epoch finished"),
            }

            reports.push(EpochReport {
                epoch,
                gold_probability,
                train,
                development,
            });
        }

        if let Some((score, weights)) = best {
            info!(score, "keeping the best development weights");
            optimizer = weights;
        }

        let model = Model::new(
            self.task,
            self.template.clone(),
            labels,
            features,
            optimizer,
        )?;
        Ok((model, reports))
    }

    /// Gold-forced pass over the training set collecting the labels and
    /// counting the features, then applying the cutoff.
    fn collect_features(&self) -> Result<(Dictionary, Dictionary)> {
        let mut labels = Dictionary::new();
        let mut counter = FeatureCounter::new();

        for (index, sentence) in self.sentences.iter().enumerate() {
            let mut nodes = sentence.clone();
            let mut state = L2RState::new(&mut nodes, self.task);
            state.save_oracle();

            while !state.is_terminal() {
                counter.add(self.template.extract(&state));
                let gold = state
                    .oracle()
                    .ok_or(Error::MissingLabel {
                        position: state.input(),
                    })
                    .map_err(|e| e.in_sentence(index))?
                    .to_string();
                labels.get_or_insert(&gold);
                state
                    .apply_transition(&gold)
                    .map_err(|e| e.in_sentence(index))?;
            }
        }

        let features = counter.finalize(self.params.feature_cutoff());
        debug!(
            seen = counter.len(),
            kept = features.len(),
            "feature cutoff applied"
        );
        debug!(
            labels = ?labels.iter().map(|(label, _)| label).collect::<Vec<_>>(),
            "label set"
        );
        Ok((labels, features))
    }

    fn online_epoch(
        &self,
        epoch: usize,
        labels: &Dictionary,
        features: &Dictionary,
        optimizer: &mut Optimizer,
    ) -> Result<Accuracy> {
        let mut total = Accuracy::default();
        let mut learner = Learner::Online(optimizer);
        for index in 0..self.sentences.len() {
            total += self
                .decode_sentence(index, epoch, labels, features, &mut learner)
                .map_err(|e| e.in_sentence(index))?;
        }
        Ok(total)
    }

    /// Decode `batch_size` sentences at a time in parallel against the
    /// current weights, then feed their instances in corpus order and flush.
    fn mini_batch_epoch(
        &self,
        epoch: usize,
        labels: &Dictionary,
        features: &Dictionary,
        optimizer: &mut Optimizer,
    ) -> Result<Accuracy> {
        let mut total = Accuracy::default();
        let indices: Vec<usize> = (0..self.sentences.len()).collect();

        for batch in indices.chunks(self.params.batch_size()) {
            let frozen: &Optimizer = optimizer;
            let decoded = batch
                .par_iter()
                .map(|&index| {
                    let mut learner = Learner::Batch(frozen, Vec::new());
                    let acc = self
                        .decode_sentence(index, epoch, labels, features, &mut learner)
                        .map_err(|e| e.in_sentence(index))?;
                    match learner {
                        Learner::Batch(_, instances) => Ok((acc, instances)),
                        Learner::Online(_) => Ok((acc, Vec::new())),
                    }
                })
                .collect::<Result<Vec<_>>>()?;

            let mut count = 0;
            for (acc, instances) in decoded {
                total += acc;
                count += instances.len();
                for instance in &instances {
                    optimizer.update(instance);
                }
            }
            optimizer.flush();
            debug!(epoch, sentences = batch.len(), instances = count, "mini-batch flushed");
        }
        Ok(total)
    }

    /// Run one sentence through the state machine, following the gold or
    /// the predicted label as the exploration schedule decides, and hand
    /// every decision to the learner.
    fn decode_sentence(
        &self,
        index: usize,
        epoch: usize,
        labels: &Dictionary,
        features: &Dictionary,
        learner: &mut Learner<'_>,
    ) -> Result<Accuracy> {
        let lols = self.params.lols();
        let mut rng = sentence_rng(self.params.seed(), epoch, index);
        let mut nodes = self.sentences[index].clone();
        let mut state = L2RState::new(&mut nodes, self.task);
        state.save_oracle();

        while !state.is_terminal() {
            let position = state.input();
            let gold = state
                .oracle()
                .and_then(|label| labels.get(label))
                .ok_or(Error::MissingLabel { position })?;

            let x = self.template.vectorize(&state, features);
            let predicted = argmax(&learner.optimizer().score(&x));
            let followed = if lols.follow_gold(epoch, &mut rng) {
                gold
            } else {
                predicted
            };
            let label = labels.get_name(followed).ok_or(Error::DimensionMismatch {
                what: "label",
                expected: labels.len(),
                found: followed as usize + 1,
            })?;

            state.apply_transition(label)?;
            learner.learn(Instance::new(x, gold, predicted));
        }
        Ok(state.evaluate(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{FeatureItem, Field};
    use crate::node::from_forms;

    fn sentence(words: &[&str], tags: &[&str]) -> Vec<Node> {
        let mut nodes = from_forms(words.iter().copied());
        for (node, tag) in nodes[1..].iter_mut().zip(tags) {
            node.part_of_speech_tag = Some(tag.to_string());
        }
        nodes
    }

    fn trainer() -> Trainer {
        let template = FeatureTemplate::builder()
            .single(FeatureItem::new(0, Field::WordForm))
            .build()
            .unwrap();
        Trainer::new(Task::PartOfSpeech, template)
    }

    #[test]
    fn test_trainer_basic() {
        let mut trainer = trainer();
        assert!(trainer
            .append(sentence(&["the", "dog"], &["DT", "NN"]))
            .is_ok());
        assert_eq!(trainer.num_sentences(), 1);
        assert_eq!(trainer.vocabulary().len(), 2);

        // a missing root is added
        let nodes = vec![Node::new(1, "cat").with_part_of_speech_tag("NN")];
        assert!(trainer.append(nodes).is_ok());
        assert!(trainer.sentences[1][0].is_root());
    }

    #[test]
    fn test_trainer_rejects_bad_sentences() {
        let mut trainer = trainer();
        let err = trainer.append(from_forms(Vec::<&str>::new())).unwrap_err();
        assert!(err.to_string().contains("empty"));

        let err = trainer
            .append(sentence(&["a", "b", "c"], &["X", "Y"]))
            .unwrap_err();
        assert_eq!(err.to_string(), "sentence 0: missing gold label at position 3");
    }

    #[test]
    fn test_train_without_data() {
        assert!(matches!(trainer().train(), Err(Error::NoTrainingData)));
    }

    #[test]
    fn test_following_predictions_still_learns_gold() {
        let mut trainer = trainer();
        trainer
            .append(sentence(&["the", "dog", "runs"], &["DT", "NN", "VBZ"]))
            .unwrap();
        trainer.set("algorithm", "perceptron").unwrap();
        trainer.set("lols.fixed", "0").unwrap();
        trainer.set("lols.decaying", "0").unwrap();
        assert_eq!(trainer.params().lols().gold_probability(1), 0.0);

        let (labels, features) = trainer.collect_features().unwrap();
        let mut optimizer = Optimizer::new(trainer.params(), features.len(), labels.len()).unwrap();
        let mut learner = Learner::Online(&mut optimizer);

        // zero weights predict the first label, DT, everywhere
        let acc = trainer
            .decode_sentence(0, 1, &labels, &features, &mut learner)
            .unwrap();
        assert_eq!(acc, Accuracy::new(1, 3));

        let weights = match &optimizer {
            Optimizer::Perceptron(p) => p.weights(),
            other => panic!("unexpected optimizer {:?}", other),
        };
        let dt = labels.get("DT").unwrap() as usize;
        for (word, tag) in [("dog", "NN"), ("runs", "VBZ")] {
            let row = features.get(&format!("0:{}", word)).unwrap() as usize;
            let gold = labels.get(tag).unwrap() as usize;
            assert!(weights.get(row, gold) > 0.0, "{}", word);
            assert!(weights.get(row, dt) < 0.0, "{}", word);
        }
        let the = features.get("0:the").unwrap() as usize;
        assert_eq!(weights.get(the, dt), 0.0);
    }

    #[test]
    fn test_sentence_rng_streams_differ() {
        use rand::Rng;

        let a: u64 = sentence_rng(1, 0, 0).gen();
        let b: u64 = sentence_rng(1, 0, 1).gen();
        let c: u64 = sentence_rng(1, 1, 0).gen();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, sentence_rng(1, 0, 0).gen::<u64>());
    }
}
