use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::error::ExtractError;
use crate::core::model::{Block, Label};

/// Order of the values in [`feature_vector`].
pub const FEATURE_NAMES: [&str; 10] = [
    "area",
    "bottom",
    "centroid_x",
    "centroid_y",
    "comma_separated_numbers_present",
    "height",
    "left",
    "right",
    "is_text",
    "text_length",
];

pub fn feature_vector(block: &Block) -> [f32; 10] {
    [
        block.area as f32,
        block.bottom as f32,
        block.centroid_x,
        block.centroid_y,
        if block.comma_separated_numbers_present { 1.0 } else { 0.0 },
        block.height as f32,
        block.left as f32,
        block.right as f32,
        if block.is_text { 1.0 } else { 0.0 },
        block.text_length as f32,
    ]
}

/// Decides whether a block the rules left unlabelled is a row grouping.
pub trait GroupingScorer {
    fn is_grouping(&self, features: &[f32; 10]) -> bool;
}

impl<F> GroupingScorer for F
where
    F: Fn(&[f32; 10]) -> bool,
{
    fn is_grouping(&self, features: &[f32; 10]) -> bool {
        self(features)
    }
}

/// Logistic regression over [`FEATURE_NAMES`], stored as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogisticGroupingModel {
    pub weights: Vec<f32>,
    pub bias: f32,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

fn default_threshold() -> f32 {
    0.5
}

impl LogisticGroupingModel {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read grouping model {}", path.display()))?;
        let model: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse grouping model {}", path.display()))?;
        if model.weights.len() != FEATURE_NAMES.len() {
            return Err(ExtractError::Config(format!(
                "grouping model needs {} weights, found {}",
                FEATURE_NAMES.len(),
                model.weights.len()
            ))
            .into());
        }
        Ok(model)
    }

    pub fn probability(&self, features: &[f32; 10]) -> f32 {
        let z: f32 = self
            .weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f32>()
            + self.bias;
        1.0 / (1.0 + (-z).exp())
    }
}

impl GroupingScorer for LogisticGroupingModel {
    fn is_grouping(&self, features: &[f32; 10]) -> bool {
        self.probability(features) >= self.threshold
    }
}

/// Labels the remaining unlabelled blocks the scorer accepts as groupings.
pub fn apply_learned_grouping(mut blocks: Vec<Block>, scorer: &dyn GroupingScorer) -> Vec<Block> {
    for block in blocks.iter_mut().filter(|b| b.is_unlabeled()) {
        if scorer.is_grouping(&feature_vector(block)) {
            block.label = Some(Label::Grouping);
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn only_unlabelled_blocks_are_scored() {
        let mut titled = Block::new(1, 0, 0, 10, 10);
        titled.label = Some(Label::Title);
        let blocks = vec![titled, Block::new(2, 100, 0, 10, 10), Block::new(3, 5, 0, 10, 10)];

        let scorer = |f: &[f32; 10]| f[6] < 50.0;
        let labels: Vec<Option<Label>> = apply_learned_grouping(blocks, &scorer)
            .iter()
            .map(|b| b.label)
            .collect();

        assert_eq!(labels, vec![Some(Label::Title), None, Some(Label::Grouping)]);
    }

    #[test]
    fn loads_logistic_model() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("model.json");
        fs::write(
            &path,
            r#"{"weights": [0, 0, 0, 0, -5, 0, 0, 0, 5, 0], "bias": -1}"#,
        )?;
        let model = LogisticGroupingModel::load(&path)?;
        assert_eq!(model.threshold, 0.5);

        let mut label = Block::new(1, 0, 0, 10, 10);
        label.is_text = true;
        assert!(model.is_grouping(&feature_vector(&label)));
        assert!(!model.is_grouping(&feature_vector(&Block::new(2, 0, 0, 10, 10))));

        fs::write(&path, r#"{"weights": [1], "bias": 0}"#)?;
        assert!(LogisticGroupingModel::load(&path).is_err());
        Ok(())
    }
}
