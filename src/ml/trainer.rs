//! Train, evaluate and persist the disposition classifier.

use std::path::PathBuf;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::artifact;
use super::classifier::ClassifierModel;
use super::features::{ExtractedBatch, ExtractionSummary, FEATURE_LEN, extract};
use super::forest::{TrainDataset, TrainOptions, train_forest};
use super::metrics::{ClassStats, ConfusionMatrix, accuracy, precision_recall_by_class, round3};
use super::predictor::ModelSlot;
use crate::catalog::CatalogRecord;

/// Smallest number of usable samples a training run accepts.
pub const MIN_TRAINING_SAMPLES: usize = 10;

/// Errors that abort a training run before a model is published.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrainError {
    /// Too few usable records; retry once more records are available.
    #[error("Insufficient data for training: {found} usable samples, need at least {required}")]
    InsufficientData { found: usize, required: usize },
    /// The forest could not be fitted on the extracted matrix.
    #[error("Model fit failed: {0}")]
    FitFailure(String),
}

/// Trainer configuration.
#[derive(Debug, Clone)]
pub struct TrainerOptions {
    pub forest: TrainOptions,
    /// Share of samples held out for evaluation.
    pub test_fraction: f64,
    /// Seed for the train/test shuffle.
    pub split_seed: u64,
    pub min_samples: usize,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            forest: TrainOptions::default(),
            test_fraction: 0.2,
            split_seed: 42,
            min_samples: MIN_TRAINING_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    Success,
    Error,
}

/// Structured outcome of a training run; failures never panic or propagate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    pub status: TrainingStatus,
    /// Held-out accuracy rounded to three decimals.
    pub accuracy: f32,
    /// Usable samples the model was built from.
    pub sample_count: usize,
    /// Records dropped by feature extraction.
    #[serde(default)]
    pub skipped: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub per_class: Vec<ClassStats>,
    /// Held-out confusion matrix (`rows = truth`, `cols = predicted`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub confusion: Vec<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<PathBuf>,
    /// Set when the model was published but could not be written to disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist_error: Option<String>,
}

impl TrainingResult {
    pub fn is_success(&self) -> bool {
        self.status == TrainingStatus::Success
    }

    fn failed(err: &TrainError, skipped: usize) -> Self {
        Self {
            status: TrainingStatus::Error,
            accuracy: 0.0,
            sample_count: 0,
            skipped,
            error: Some(err.to_string()),
            per_class: Vec::new(),
            confusion: Vec::new(),
            artifact_path: None,
            persist_error: None,
        }
    }
}

/// A fitted model with its evaluation, not yet published.
#[derive(Debug, Clone)]
pub struct FitReport {
    pub model: ClassifierModel,
    pub summary: ExtractionSummary,
    pub confusion: ConfusionMatrix,
    pub per_class: Vec<ClassStats>,
}

/// Fits forests from catalog records and publishes them into a [`ModelSlot`].
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    options: TrainerOptions,
    artifact_path: Option<PathBuf>,
}

impl Trainer {
    pub fn new(options: TrainerOptions, artifact_path: Option<PathBuf>) -> Self {
        Self {
            options,
            artifact_path,
        }
    }

    pub fn options(&self) -> &TrainerOptions {
        &self.options
    }

    /// Extract, split, fit and evaluate without touching shared state.
    pub fn fit(&self, records: &[CatalogRecord]) -> Result<FitReport, TrainError> {
        let batch = extract(records);
        self.fit_batch(batch)
    }

    fn fit_batch(&self, batch: ExtractedBatch) -> Result<FitReport, TrainError> {
        let required = self.options.min_samples.max(2);
        if batch.len() < required {
            return Err(TrainError::InsufficientData {
                found: batch.len(),
                required,
            });
        }
        let (train_idx, test_idx) =
            split_indices(batch.len(), self.options.test_fraction, self.options.split_seed);
        let classes = ClassifierModel::class_ids();
        let dataset = TrainDataset {
            feature_len_f32: FEATURE_LEN,
            classes: classes.clone(),
            x: train_idx
                .iter()
                .map(|&i| batch.features[i].as_slice().to_vec())
                .collect(),
            y: train_idx.iter().map(|&i| batch.labels[i]).collect(),
        };
        let forest = train_forest(&dataset, &self.options.forest).map_err(TrainError::FitFailure)?;

        let mut confusion = ConfusionMatrix::new(classes.len());
        for &i in &test_idx {
            let predicted = forest.predict_class_index(batch.features[i].as_slice());
            confusion.add(batch.labels[i], predicted);
        }
        let per_class = precision_recall_by_class(&confusion, &classes);
        let model = ClassifierModel {
            forest,
            trained: true,
            accuracy: accuracy(&confusion),
            sample_count: batch.len(),
        };
        Ok(FitReport {
            model,
            summary: batch.summary,
            confusion,
            per_class,
        })
    }

    /// Fit on `records`; on success publish into `slot`, then persist the artifact.
    ///
    /// A failed fit leaves `slot` untouched. A failed write does not undo the publish.
    pub fn train(&self, records: &[CatalogRecord], slot: &ModelSlot) -> TrainingResult {
        let batch = extract(records);
        let skipped = batch.summary.skipped_count();
        let report = match self.fit_batch(batch) {
            Ok(report) => report,
            Err(err) => {
                tracing::error!("Training failed: {err}");
                return TrainingResult::failed(&err, skipped);
            }
        };

        let confusion = report.confusion.rows();
        let per_class = report.per_class;
        let model = slot.replace(report.model);
        tracing::info!(
            "Classifier trained on {} samples ({} skipped); accuracy {:.3}",
            model.sample_count,
            skipped,
            model.accuracy
        );

        let mut persist_error = None;
        if let Some(path) = &self.artifact_path {
            match artifact::save(path, &model) {
                Ok(()) => tracing::info!("Model saved to {}", path.display()),
                Err(err) => {
                    tracing::warn!("Model trained but not persisted: {err}");
                    persist_error = Some(err.to_string());
                }
            }
        }

        TrainingResult {
            status: TrainingStatus::Success,
            accuracy: round3(model.accuracy),
            sample_count: model.sample_count,
            skipped,
            error: None,
            per_class,
            confusion,
            artifact_path: self.artifact_path.clone(),
            persist_error,
        }
    }
}

/// Shuffle `0..n` with a fixed seed and hold out `ceil(n * test_fraction)` indices.
///
/// Both partitions are non-empty whenever `n >= 2`.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    if n < 2 {
        return (indices, Vec::new());
    }
    let fraction = test_fraction.clamp(0.0, 1.0);
    let n_test = ((n as f64 * fraction - 1e-9).ceil() as usize).clamp(1, n - 1);
    let train = indices.split_off(n_test);
    (train, indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RecordGenerator;
    use tempfile::tempdir;

    fn quick_options() -> TrainerOptions {
        TrainerOptions {
            forest: TrainOptions {
                n_trees: 10,
                ..TrainOptions::default()
            },
            ..TrainerOptions::default()
        }
    }

    #[test]
    fn split_holds_out_fifth_without_overlap() {
        let (train, test) = split_indices(100, 0.2, 42);
        assert_eq!(test.len(), 20);
        assert_eq!(train.len(), 80);
        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
        assert_eq!(split_indices(100, 0.2, 42), (train, test));
    }

    #[test]
    fn split_rounds_test_share_up() {
        let (train, test) = split_indices(11, 0.2, 42);
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 8);
    }

    #[test]
    fn too_few_records_is_insufficient_data() {
        let records = RecordGenerator::with_seed(1).generate(9);
        let slot = ModelSlot::new();
        let result = Trainer::new(quick_options(), None).train(&records, &slot);
        assert_eq!(result.status, TrainingStatus::Error);
        assert_eq!(result.accuracy, 0.0);
        assert_eq!(result.sample_count, 0);
        assert!(result.error.is_some());
        assert!(!slot.is_trained());
    }

    #[test]
    fn successful_run_publishes_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("models").join("classifier_model.json");
        let records = RecordGenerator::with_seed(2).generate(120);
        let slot = ModelSlot::new();
        let trainer = Trainer::new(quick_options(), Some(path.clone()));
        let result = trainer.train(&records, &slot);
        assert!(result.is_success(), "{result:?}");
        assert!((0.0..=1.0).contains(&result.accuracy));
        assert_eq!(result.sample_count, 120);
        assert_eq!(result.per_class.len(), 3);
        assert_eq!(result.confusion.iter().flatten().sum::<u32>(), 24);
        assert!(result.persist_error.is_none());
        assert!(slot.is_trained());

        let restored = artifact::load(&path).unwrap();
        let current = slot.current().unwrap();
        assert_eq!(&restored, current.as_ref());
    }

    #[test]
    fn persist_failure_keeps_published_model() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"file").unwrap();
        let path = blocker.join("model.json");
        let records = RecordGenerator::with_seed(4).generate(60);
        let slot = ModelSlot::new();
        let result = Trainer::new(quick_options(), Some(path)).train(&records, &slot);
        assert!(result.is_success());
        assert!(result.persist_error.is_some());
        assert!(slot.is_trained());
    }

    #[test]
    fn failed_run_keeps_previous_model() {
        let slot = ModelSlot::new();
        let trainer = Trainer::new(quick_options(), None);
        let first = trainer.train(&RecordGenerator::with_seed(5).generate(50), &slot);
        assert!(first.is_success());
        let before = slot.current().unwrap();

        let second = trainer.train(&RecordGenerator::with_seed(6).generate(3), &slot);
        assert!(!second.is_success());
        let after = slot.current().unwrap();
        assert!(std::sync::Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn identical_input_gives_identical_accuracy() {
        let records = RecordGenerator::with_seed(8).generate(80);
        let trainer = Trainer::new(quick_options(), None);
        let a = trainer.fit(&records).unwrap();
        let b = trainer.fit(&records).unwrap();
        assert_eq!(a.model.accuracy, b.model.accuracy);
        assert_eq!(a.model, b.model);
    }
}
