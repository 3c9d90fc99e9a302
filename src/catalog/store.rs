//! Owner of the catalog and the classifier.
//!
//! Readers take an `Arc` snapshot of the published catalog and never wait on
//! training. Writers (initialize, refresh, train, restore) are serialized and
//! build the next catalog off to the side before publishing it in one swap.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::query::ListQuery;
use super::source::RecordSource;
use super::types::CatalogRecord;
use crate::ml::{
    ClassifierModel, FeatureVector, ModelIoError, ModelSlot, PredictError, PredictInput,
    Prediction, Trainer, TrainingResult, predict_with,
};

/// Lifecycle position of the published catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogState {
    /// Nothing generated yet.
    Uninitialized,
    /// Records present, no predictions from the current batch's training.
    Untrained,
    /// Every extractable record carries a prediction.
    Annotated,
}

/// Immutable published view of the catalog.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    records: Vec<CatalogRecord>,
    state: CatalogState,
    /// Incremented on every publish.
    generation: u64,
}

impl CatalogSnapshot {
    fn empty() -> Self {
        Self {
            records: Vec::new(),
            state: CatalogState::Uninitialized,
            generation: 0,
        }
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn state(&self) -> CatalogState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Counts from one annotation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSummary {
    pub annotated: usize,
    /// Records whose features could not be extracted; they keep their previous annotation.
    pub unchanged: usize,
}

/// Result of a refresh: the new batch was published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    /// Leading records of the new catalog.
    pub records: Vec<CatalogRecord>,
    /// Size of the whole new catalog.
    pub total: usize,
    pub training: TrainingResult,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefreshError {
    /// The source produced nothing; the previous catalog stays published.
    #[error("Record source '{source_label}' produced no records")]
    EmptyBatch { source_label: String },
}

/// Sizes used when (re)populating the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub batch_size: usize,
    /// How many records a refresh hands back to the caller.
    pub refresh_preview: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            batch_size: 150,
            refresh_preview: 50,
        }
    }
}

pub struct CatalogStore {
    source: Box<dyn RecordSource>,
    trainer: Trainer,
    options: StoreOptions,
    model: ModelSlot,
    published: RwLock<Arc<CatalogSnapshot>>,
    writer: Mutex<()>,
}

impl CatalogStore {
    /// Build an empty, untrained store. Nothing is generated until [`CatalogStore::initialize`].
    pub fn new(source: Box<dyn RecordSource>, trainer: Trainer, options: StoreOptions) -> Self {
        Self {
            source,
            trainer,
            options,
            model: ModelSlot::new(),
            published: RwLock::new(Arc::new(CatalogSnapshot::empty())),
            writer: Mutex::new(()),
        }
    }

    /// Current published catalog.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.published.read().unwrap_or_else(|err| err.into_inner()))
    }

    pub fn state(&self) -> CatalogState {
        self.snapshot().state()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Model currently used for annotation and prediction.
    pub fn current_model(&self) -> Option<Arc<ClassifierModel>> {
        self.model.current()
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_trained()
    }

    /// Held-out accuracy of the current model, `0.0` when untrained.
    pub fn model_accuracy(&self) -> f32 {
        self.model.accuracy()
    }

    /// Filtered, paginated listing of the published catalog.
    pub fn list(&self, query: &ListQuery) -> Vec<CatalogRecord> {
        query.apply(self.snapshot().records())
    }

    pub fn predict(&self, input: &PredictInput) -> Result<Prediction, PredictError> {
        self.model.predict_input(input)
    }

    /// Populate and train the catalog once; later calls do nothing and return `None`.
    pub fn initialize(&self) -> Option<TrainingResult> {
        let _writer = self.lock_writer();
        if self.state() != CatalogState::Uninitialized {
            return None;
        }
        let batch = self.source.produce(self.options.batch_size);
        tracing::info!(
            "Initializing catalog with {} records from {}",
            batch.len(),
            self.source.label()
        );
        Some(self.train_and_publish(batch))
    }

    /// Replace the whole catalog with a fresh batch, retrain and annotate it.
    ///
    /// An empty batch leaves the previous catalog and model in place.
    pub fn refresh(&self) -> Result<RefreshOutcome, RefreshError> {
        let _writer = self.lock_writer();
        let batch = self.source.produce(self.options.batch_size);
        if batch.is_empty() {
            tracing::warn!(
                "Refresh skipped: source {} produced no records",
                self.source.label()
            );
            return Err(RefreshError::EmptyBatch {
                source_label: self.source.label().to_string(),
            });
        }
        let training = self.train_and_publish(batch);
        let snapshot = self.snapshot();
        let preview = snapshot
            .records()
            .iter()
            .take(self.options.refresh_preview)
            .cloned()
            .collect();
        Ok(RefreshOutcome {
            records: preview,
            total: snapshot.len(),
            training,
        })
    }

    /// Retrain on the current catalog and re-annotate it on success.
    pub fn train_now(&self) -> TrainingResult {
        let _writer = self.lock_writer();
        let current = self.snapshot();
        let result = self.trainer.train(current.records(), &self.model);
        if result.is_success()
            && let Some(model) = self.model.current()
        {
            let (records, summary) = annotate(current.records(), &model);
            self.log_annotation(&summary);
            self.publish(records, CatalogState::Annotated);
        }
        result
    }

    /// Load a persisted model and re-annotate the current catalog with it.
    pub fn restore_model(&self, path: &Path) -> Result<AnnotationSummary, ModelIoError> {
        let _writer = self.lock_writer();
        let model = self.model.restore(path)?;
        let current = self.snapshot();
        if current.state() == CatalogState::Uninitialized {
            return Ok(AnnotationSummary::default());
        }
        let (records, summary) = annotate(current.records(), &model);
        self.log_annotation(&summary);
        self.publish(records, CatalogState::Annotated);
        Ok(summary)
    }

    fn train_and_publish(&self, batch: Vec<CatalogRecord>) -> TrainingResult {
        let result = self.trainer.train(&batch, &self.model);
        match self.model.current().filter(|_| result.is_success()) {
            Some(model) => {
                let (records, summary) = annotate(&batch, &model);
                self.log_annotation(&summary);
                self.publish(records, CatalogState::Annotated);
            }
            None => self.publish(batch, CatalogState::Untrained),
        }
        result
    }

    fn publish(&self, records: Vec<CatalogRecord>, state: CatalogState) {
        let mut guard = self.published.write().unwrap_or_else(|err| err.into_inner());
        let generation = guard.generation + 1;
        *guard = Arc::new(CatalogSnapshot {
            records,
            state,
            generation,
        });
        tracing::debug!("Published catalog generation {generation} ({state:?})");
    }

    fn log_annotation(&self, summary: &AnnotationSummary) {
        tracing::info!(
            "Annotated {} records ({} left unchanged)",
            summary.annotated,
            summary.unchanged
        );
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(|err| err.into_inner())
    }
}

/// Build an annotated copy of `records` using one model for every record.
///
/// Records that cannot be featurized are copied unchanged.
pub fn annotate(
    records: &[CatalogRecord],
    model: &ClassifierModel,
) -> (Vec<CatalogRecord>, AnnotationSummary) {
    let mut summary = AnnotationSummary::default();
    let annotated = records
        .iter()
        .map(|record| {
            let prediction = FeatureVector::from_record(record)
                .map_err(PredictError::InvalidInput)
                .and_then(|features| predict_with(model, &features));
            match prediction {
                Ok(prediction) => {
                    summary.annotated += 1;
                    record.with_annotation(prediction.into())
                }
                Err(err) => {
                    tracing::debug!("Keeping previous annotation for {}: {err}", record.name);
                    summary.unchanged += 1;
                    record.clone()
                }
            }
        })
        .collect();
    (annotated, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::generator::RecordGenerator;
    use crate::catalog::types::{Annotation, Status};
    use crate::ml::TrainerOptions;
    use crate::ml::forest::TrainOptions;

    struct FixedSource(Vec<CatalogRecord>);

    impl RecordSource for FixedSource {
        fn label(&self) -> &str {
            "fixed"
        }

        fn produce(&self, count: usize) -> Vec<CatalogRecord> {
            self.0.iter().take(count).cloned().collect()
        }
    }

    fn trainer() -> Trainer {
        Trainer::new(
            TrainerOptions {
                forest: TrainOptions {
                    n_trees: 10,
                    ..TrainOptions::default()
                },
                ..TrainerOptions::default()
            },
            None,
        )
    }

    fn store_with(source: Box<dyn RecordSource>, batch_size: usize) -> CatalogStore {
        CatalogStore::new(
            source,
            trainer(),
            StoreOptions {
                batch_size,
                refresh_preview: 5,
            },
        )
    }

    #[test]
    fn construction_has_no_side_effects() {
        let store = store_with(Box::new(RecordGenerator::with_seed(1)), 40);
        assert_eq!(store.state(), CatalogState::Uninitialized);
        assert!(store.is_empty());
        assert!(!store.is_trained());
    }

    #[test]
    fn initialize_is_idempotent() {
        let store = store_with(Box::new(RecordGenerator::with_seed(1)), 40);
        let first = store.initialize().unwrap();
        assert!(first.is_success());
        assert_eq!(store.state(), CatalogState::Annotated);
        let generation = store.snapshot().generation();
        assert!(store.initialize().is_none());
        assert_eq!(store.snapshot().generation(), generation);
    }

    #[test]
    fn small_batch_stays_untrained() {
        let store = store_with(Box::new(RecordGenerator::with_seed(2)), 6);
        let result = store.initialize().unwrap();
        assert!(!result.is_success());
        assert_eq!(store.state(), CatalogState::Untrained);
        assert_eq!(store.len(), 6);
        assert!(store.list(&ListQuery::default()).iter().all(|r| r.annotation.is_none()));
    }

    #[test]
    fn failed_training_keeps_existing_annotations() {
        let records = RecordGenerator::with_seed(3).generate(30);
        let store = store_with(Box::new(FixedSource(records)), 30);
        assert!(store.initialize().unwrap().is_success());
        let before = store.list(&ListQuery::page(100, 0));

        // Same catalog, but the trainer now demands more samples than exist.
        let strict = CatalogStore {
            trainer: Trainer::new(
                TrainerOptions {
                    min_samples: 1_000,
                    ..TrainerOptions::default()
                },
                None,
            ),
            ..store
        };
        let result = strict.train_now();
        assert!(!result.is_success());
        assert_eq!(strict.list(&ListQuery::page(100, 0)), before);
        assert_eq!(strict.state(), CatalogState::Annotated);
    }

    #[test]
    fn empty_refresh_keeps_previous_catalog() {
        let store = store_with(Box::new(FixedSource(Vec::new())), 30);
        assert_eq!(
            store.refresh(),
            Err(RefreshError::EmptyBatch {
                source_label: "fixed".into()
            })
        );
        assert_eq!(store.state(), CatalogState::Uninitialized);
    }

    #[test]
    fn refresh_returns_preview_of_new_batch() {
        let store = store_with(Box::new(RecordGenerator::with_seed(4)), 40);
        store.initialize();
        let outcome = store.refresh().unwrap();
        assert_eq!(outcome.records.len(), 5);
        assert_eq!(outcome.total, 40);
        assert!(outcome.training.is_success());
        assert_eq!(outcome.records, store.list(&ListQuery::page(5, 0)));
    }

    #[test]
    fn annotation_keeps_previous_values_for_bad_records() {
        let store = store_with(Box::new(RecordGenerator::with_seed(5)), 40);
        store.initialize();
        let model = store.current_model().unwrap();

        let mut records = store.list(&ListQuery::page(3, 0));
        let previous = Annotation {
            prediction: Status::Candidate,
            confidence: 0.42,
        };
        records[1].period = f64::NAN;
        records[1].annotation = Some(previous);
        let (annotated, summary) = annotate(&records, &model);
        assert_eq!(summary, AnnotationSummary { annotated: 2, unchanged: 1 });
        assert_eq!(annotated[1].annotation, Some(previous));
        assert!(annotated[0].annotation.is_some());
        assert_eq!(annotated[0].status, records[0].status);
    }

    #[test]
    fn readers_hold_stable_snapshots_across_publishes() {
        let store = store_with(Box::new(RecordGenerator::with_seed(6)), 40);
        store.initialize();
        let held = store.snapshot();
        let held_records = held.records().to_vec();
        store.refresh().unwrap();
        assert_eq!(held.records(), held_records.as_slice());
        assert!(store.snapshot().generation() > held.generation());
    }

    #[test]
    fn restore_model_reannotates_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let source = RecordGenerator::with_seed(7);
        let records = source.generate(50);
        let report = trainer().fit(&records).unwrap();
        crate::ml::artifact::save(&path, &report.model).unwrap();

        let store = store_with(Box::new(FixedSource(records)), 8);
        store.initialize();
        assert_eq!(store.state(), CatalogState::Untrained);
        let summary = store.restore_model(&path).unwrap();
        assert_eq!(summary.annotated, 8);
        assert_eq!(store.state(), CatalogState::Annotated);
        assert!(store.list(&ListQuery::default()).iter().all(|r| r.annotation.is_some()));
    }
}
