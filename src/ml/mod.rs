//! Disposition classifier: feature extraction, training, persistence and prediction.

pub mod artifact;
mod classifier;
pub mod features;
pub mod forest;
pub mod metrics;
pub mod predictor;
pub mod trainer;

pub use artifact::ModelIoError;
pub use classifier::ClassifierModel;
pub use features::{ExtractedBatch, ExtractionSummary, FeatureVector, SkipReason, extract};
pub use predictor::{ModelSlot, PredictError, PredictInput, Prediction, predict_with};
pub use trainer::{TrainError, Trainer, TrainerOptions, TrainingResult, TrainingStatus};
