use serde::{Deserialize, Serialize};

use super::features::FEATURE_LEN;
use super::forest::ForestModel;
use crate::catalog::Status;

/// Fitted disposition classifier plus its last evaluation score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    pub forest: ForestModel,
    pub trained: bool,
    /// Held-out accuracy measured right after fitting.
    pub accuracy: f32,
    /// Number of extracted samples the model was built from.
    pub sample_count: usize,
}

impl ClassifierModel {
    /// Class identifiers in label order, as stored in the forest.
    pub fn class_ids() -> Vec<String> {
        Status::ALL.iter().map(|s| s.as_str().to_string()).collect()
    }

    /// Validate the forest and its compatibility with the feature schema.
    pub fn validate(&self) -> Result<(), String> {
        self.forest.validate()?;
        if self.forest.feature_len_f32 != FEATURE_LEN {
            return Err(format!(
                "Unsupported feature_len_f32 {} (expected {FEATURE_LEN})",
                self.forest.feature_len_f32
            ));
        }
        if self.forest.classes != Self::class_ids() {
            return Err(format!(
                "Unexpected class list {:?} (expected {:?})",
                self.forest.classes,
                Self::class_ids()
            ));
        }
        if !(0.0..=1.0).contains(&self.accuracy) {
            return Err("accuracy must be within [0, 1]".to_string());
        }
        Ok(())
    }
}
