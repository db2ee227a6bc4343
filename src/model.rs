use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dictionary::Dictionary;
use crate::error::Result;
use crate::feature::FeatureTemplate;
use crate::optimizer::Optimizer;
use crate::state::Task;
use crate::tagger::Tagger;

/// A trained tagging model
///
/// Bundles everything decoding needs: the task, the feature template, the
/// label and feature maps, and the weights. The maps and the weights are
/// checked against each other whenever a model is assembled or read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    task: Task,
    template: FeatureTemplate,
    labels: Dictionary,
    features: Dictionary,
    optimizer: Optimizer,
}

impl Model {
    pub fn new(
        task: Task,
        template: FeatureTemplate,
        labels: Dictionary,
        features: Dictionary,
        optimizer: Optimizer,
    ) -> Result<Self> {
        optimizer.check_dimensions(features.len(), labels.len())?;
        Ok(Self {
            task,
            template,
            labels,
            features,
            optimizer,
        })
    }

    /// Read a model written by [`Model::to_writer`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let model: Self = serde_json::from_reader(reader)?;
        model
            .optimizer
            .check_dimensions(model.features.len(), model.labels.len())?;
        Ok(model)
    }

    pub fn from_slice(buf: &[u8]) -> Result<Self> {
        Self::from_reader(buf)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn template(&self) -> &FeatureTemplate {
        &self.template
    }

    pub fn labels(&self) -> &Dictionary {
        &self.labels
    }

    pub fn features(&self) -> &Dictionary {
        &self.features
    }

    pub fn optimizer(&self) -> &Optimizer {
        &self.optimizer
    }

    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    pub fn tagger(&self) -> Tagger<'_> {
        Tagger::new(
            self.task,
            &self.template,
            &self.labels,
            &self.features,
            &self.optimizer,
        )
    }
}
