//! Rule-based labelling of blocks and the passes that reshape the labelled set.

pub mod grouping;
pub mod postprocess;
pub mod rules;

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::core::config::{ClassifierSettings, PostProcessor};
use crate::core::model::Block;

pub use grouping::{GroupingScorer, LogisticGroupingModel};

/// Labelled blocks plus the `pos` of every block a merge pass folded away.
#[derive(Debug, Clone, Default)]
pub struct Classified {
    pub blocks: Vec<Block>,
    pub absorbed: BTreeSet<usize>,
}

pub struct BlockClassifier {
    settings: ClassifierSettings,
    scorer: Option<Box<dyn GroupingScorer>>,
}

impl BlockClassifier {
    pub fn new(settings: ClassifierSettings) -> Self {
        Self {
            settings,
            scorer: None,
        }
    }

    pub fn with_scorer(mut self, scorer: Box<dyn GroupingScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Runs the ordered rules, each against a snapshot of the labels so far.
    pub fn label(&self, mut blocks: Vec<Block>) -> Vec<Block> {
        for (name, rule) in rules::RULES {
            let assignments = rule(&blocks, &self.settings);
            debug!(rule = name, assigned = assignments.len(), "applied rule");
            let by_pos: HashMap<usize, _> = assignments.into_iter().collect();
            for block in blocks.iter_mut() {
                if let Some(label) = by_pos.get(&block.pos) {
                    block.label = Some(*label);
                }
            }
        }
        blocks
    }

    pub fn post_process(&self, blocks: Vec<Block>) -> Classified {
        let mut state = Classified {
            blocks,
            absorbed: BTreeSet::new(),
        };
        for step in &self.settings.post_processors {
            state = match step {
                PostProcessor::TableSegmentation => Classified {
                    blocks: postprocess::segment_tables(state.blocks),
                    absorbed: state.absorbed,
                },
                PostProcessor::HeaderCombination => {
                    let merged = postprocess::combine_headers(state.blocks, &state.absorbed);
                    let mut absorbed = state.absorbed;
                    absorbed.extend(merged.absorbed);
                    Classified {
                        blocks: merged.blocks,
                        absorbed,
                    }
                }
                PostProcessor::FalseHeaderRemoval => Classified {
                    blocks: postprocess::remove_false_headers(state.blocks, &self.settings),
                    absorbed: state.absorbed,
                },
                PostProcessor::HorizontalCombination => {
                    let merged = postprocess::combine_horizontal(
                        state.blocks,
                        self.settings.combine_tolerance,
                        &state.absorbed,
                    );
                    let mut absorbed = state.absorbed;
                    absorbed.extend(merged.absorbed);
                    Classified {
                        blocks: merged.blocks,
                        absorbed,
                    }
                }
                PostProcessor::LearnedGrouping => match &self.scorer {
                    Some(scorer) => Classified {
                        blocks: grouping::apply_learned_grouping(state.blocks, scorer.as_ref()),
                        absorbed: state.absorbed,
                    },
                    None => {
                        debug!("no grouping model configured, skipping learned grouping");
                        state
                    }
                },
            };
        }
        state
    }

    pub fn classify(&self, blocks: Vec<Block>) -> Classified {
        self.post_process(self.label(blocks))
    }
}
