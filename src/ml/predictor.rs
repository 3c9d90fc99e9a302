//! Single-record prediction against the current classifier.

use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::artifact::{self, ModelIoError};
use super::classifier::ClassifierModel;
use super::features::{FEATURE_LEN, FeatureVector, SkipReason, decode_label};
use super::forest::argmax;
use super::metrics::round3;
use crate::catalog::{Annotation, Status};

/// Errors raised while predicting.
#[derive(Debug, Error, PartialEq)]
pub enum PredictError {
    /// No model has been trained (or restored) yet. This is an expected state.
    #[error("Model is not trained")]
    ModelNotTrained,
    /// The input could not be turned into a feature vector.
    #[error("Invalid prediction input: {0}")]
    InvalidInput(SkipReason),
    /// The model produced an index outside the label space.
    #[error("Model produced unknown class index {0}")]
    UnknownClass(usize),
}

/// Disposition predicted for one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: Status,
    /// Maximum class-membership probability in `[0, 1]`.
    pub confidence: f32,
    pub features_used: usize,
}

impl Prediction {
    /// Copy with the confidence rounded to three decimals for display.
    pub fn rounded(self) -> Self {
        Self {
            confidence: round3(self.confidence),
            ..self
        }
    }
}

impl From<Prediction> for Annotation {
    fn from(value: Prediction) -> Self {
        Annotation {
            prediction: value.prediction,
            confidence: value.confidence,
        }
    }
}

/// Loosely specified record used for ad-hoc predictions.
///
/// Missing attributes fall back to neutral values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictInput {
    #[serde(default)]
    pub period: Option<f64>,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub discovery_year: Option<f64>,
    #[serde(default)]
    pub habitable_zone: Option<bool>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl PredictInput {
    const DEFAULT_TEMPERATURE_K: f64 = 300.0;
    const DEFAULT_DISCOVERY_YEAR: f64 = 2015.0;

    pub fn to_features(&self) -> Result<FeatureVector, SkipReason> {
        FeatureVector::from_parts(
            self.period.unwrap_or(0.0),
            self.radius.unwrap_or(0.0),
            self.temperature.unwrap_or(Self::DEFAULT_TEMPERATURE_K),
            self.discovery_year.unwrap_or(Self::DEFAULT_DISCOVERY_YEAR),
            self.habitable_zone.unwrap_or(false),
            self.confidence,
        )
    }
}

/// Run `model` on one feature vector.
pub fn predict_with(
    model: &ClassifierModel,
    features: &FeatureVector,
) -> Result<Prediction, PredictError> {
    if !model.trained {
        return Err(PredictError::ModelNotTrained);
    }
    let proba = model.forest.predict_proba(features.as_slice());
    let class_idx = argmax(&proba);
    let prediction = decode_label(class_idx).ok_or(PredictError::UnknownClass(class_idx))?;
    let confidence = proba.get(class_idx).copied().unwrap_or(0.0).clamp(0.0, 1.0);
    Ok(Prediction {
        prediction,
        confidence,
        features_used: FEATURE_LEN,
    })
}

/// Holder of the process-wide classifier; replaced wholesale on each training run.
#[derive(Debug, Default)]
pub struct ModelSlot {
    current: RwLock<Option<Arc<ClassifierModel>>>,
}

impl ModelSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current model, if any.
    pub fn current(&self) -> Option<Arc<ClassifierModel>> {
        self.current
            .read()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    pub fn is_trained(&self) -> bool {
        self.current().is_some_and(|model| model.trained)
    }

    /// Accuracy of the current model, `0.0` when untrained.
    pub fn accuracy(&self) -> f32 {
        self.current().map(|model| model.accuracy).unwrap_or(0.0)
    }

    /// Publish `model`, discarding the previous one.
    pub fn replace(&self, model: ClassifierModel) -> Arc<ClassifierModel> {
        let model = Arc::new(model);
        let mut guard = self.current.write().unwrap_or_else(|err| err.into_inner());
        *guard = Some(Arc::clone(&model));
        model
    }

    /// Load a persisted model and publish it.
    pub fn restore(&self, path: &Path) -> Result<Arc<ClassifierModel>, ModelIoError> {
        let model = artifact::load(path)?;
        tracing::info!(
            "Restored classifier from {} (accuracy {:.3})",
            path.display(),
            model.accuracy
        );
        Ok(self.replace(model))
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction, PredictError> {
        let model = self.current().ok_or(PredictError::ModelNotTrained)?;
        predict_with(&model, features)
    }

    pub fn predict_input(&self, input: &PredictInput) -> Result<Prediction, PredictError> {
        let features = input.to_features().map_err(PredictError::InvalidInput)?;
        self.predict(&features)
    }
}
