mod support;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use nebulax::catalog::{
    CatalogState, CatalogStore, ListQuery, MAX_LIST_LIMIT, Mission, RecordGenerator, RefreshError,
    Status,
};
use nebulax::ml::features::{decode_label, encode_label};
use nebulax::ml::{PredictError, PredictInput, Trainer, TrainingStatus};
use support::fixtures::{NumberedBatches, ScriptedSource, quick_trainer, store_with};

fn sample_input() -> PredictInput {
    PredictInput {
        period: Some(37.2),
        radius: Some(1.3),
        temperature: Some(288.0),
        discovery_year: Some(2016.0),
        habitable_zone: Some(true),
        confidence: None,
    }
}

#[test]
fn batches_of_ten_or_more_train_successfully() {
    for size in [10usize, 11, 17, 40, 150] {
        let store = store_with(RecordGenerator::with_seed(size as u64), size);
        store.initialize();
        let result = store.train_now();
        assert_eq!(result.status, TrainingStatus::Success, "size {size}: {result:?}");
        assert!((0.0..=1.0).contains(&result.accuracy), "size {size}");
        assert_eq!(result.sample_count, size);
    }
}

#[test]
fn batches_under_ten_fail_without_a_model() {
    for size in 0usize..10 {
        let store = store_with(RecordGenerator::with_seed(size as u64), size);
        let initial = store.initialize().expect("first initialize runs");
        assert!(!initial.is_success());
        let result = store.train_now();
        assert_eq!(result.status, TrainingStatus::Error, "size {size}");
        assert_eq!(result.accuracy, 0.0);
        assert_eq!(result.sample_count, 0);
        assert!(result.error.is_some());
        assert!(!store.is_trained());
        assert_eq!(store.state(), CatalogState::Untrained);
    }
}

#[test]
fn label_mapping_round_trips() {
    for status in Status::ALL {
        assert_eq!(decode_label(encode_label(status)), Some(status));
    }
}

#[test]
fn initialize_is_idempotent() {
    let store = store_with(NumberedBatches::new(1), 30);
    assert_eq!(store.state(), CatalogState::Uninitialized);
    assert!(store.is_empty());
    assert!(store.initialize().is_some());
    let generation = store.snapshot().generation();
    assert!(store.initialize().is_none());
    assert_eq!(store.snapshot().generation(), generation);
    assert_eq!(store.len(), 30);
}

#[test]
fn pages_reconstruct_filtered_catalog() {
    let store = store_with(RecordGenerator::with_seed(77), 230);
    store.initialize();
    let all = store.list(&ListQuery::page(MAX_LIST_LIMIT, 0));
    for query in [
        ListQuery::default(),
        ListQuery::default().with_mission(Mission::Kepler),
        ListQuery::default().with_status(Status::Candidate),
    ] {
        let expected: Vec<_> = all.iter().filter(|r| query.matches(r)).cloned().collect();
        let n = expected.len();
        for limit in [1usize, 7, 50] {
            let mut collected = Vec::new();
            let mut offset = 0;
            while offset <= n {
                let page = store.list(&ListQuery {
                    limit,
                    offset,
                    ..query
                });
                assert_eq!(page.len(), limit.min(n.saturating_sub(offset)));
                collected.extend(page);
                offset += limit;
            }
            assert_eq!(collected, expected, "limit {limit}");
        }
    }
}

#[test]
fn annotation_pairs_prediction_with_confidence() {
    let store = store_with(RecordGenerator::with_seed(5), 120);
    store.initialize();
    for record in store.list(&ListQuery::page(MAX_LIST_LIMIT, 0)) {
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json.get("prediction").is_some(),
            json.get("confidence").is_some(),
            "{json}"
        );
        let confidence = record.annotation.expect("annotated").confidence;
        assert!((0.0..=1.0).contains(&confidence));
    }
}

#[test]
fn predictions_are_deterministic() {
    let store = store_with(RecordGenerator::with_seed(6), 90);
    store.initialize();
    let first = store.predict(&sample_input()).unwrap();
    let second = store.predict(&sample_input()).unwrap();
    assert_eq!(first.prediction, second.prediction);
    assert_eq!(first.confidence.to_bits(), second.confidence.to_bits());
    assert_eq!(first.features_used, 6);
}

#[test]
fn five_hundred_records_are_all_annotated() {
    let store = store_with(RecordGenerator::with_seed(500), 500);
    store.initialize();
    let result = store.train_now();
    assert!(result.is_success(), "{result:?}");
    assert!(result.sample_count >= 475 && result.sample_count <= 500);
    let listed = store.list(&ListQuery::page(500, 0));
    assert_eq!(listed.len(), 500);
    assert!(listed.iter().all(|record| record.prediction().is_some()));
    assert_eq!(store.state(), CatalogState::Annotated);
}

#[test]
fn predict_before_training_is_not_trained() {
    let store = store_with(RecordGenerator::with_seed(1), 50);
    assert_eq!(
        store.predict(&sample_input()),
        Err(PredictError::ModelNotTrained)
    );
}

#[test]
fn refresh_replaces_the_whole_catalog() {
    let store = store_with(NumberedBatches::new(11), 60);
    store.initialize();
    let first = store.refresh().unwrap();
    let first_names: HashSet<String> = store
        .list(&ListQuery::page(MAX_LIST_LIMIT, 0))
        .into_iter()
        .map(|record| record.name)
        .collect();
    assert_eq!(first.total, 60);

    let second = store.refresh().unwrap();
    assert!(second.training.is_success());
    assert_eq!(second.records.len(), 50);
    let second_catalog = store.list(&ListQuery::page(MAX_LIST_LIMIT, 0));
    assert_eq!(second_catalog.len(), 60);
    assert!(
        second_catalog
            .iter()
            .all(|record| !first_names.contains(&record.name))
    );
}

#[test]
fn empty_refresh_keeps_previous_catalog_and_model() {
    let batch = RecordGenerator::with_seed(3).generate(40);
    let store = store_with(ScriptedSource::new(vec![batch]), 40);
    store.initialize();
    let before = store.snapshot();
    let model_before = store.current_model().unwrap();

    let err = store.refresh().unwrap_err();
    assert_eq!(
        err,
        RefreshError::EmptyBatch {
            source_label: "scripted".to_string()
        }
    );
    assert!(Arc::ptr_eq(&before, &store.snapshot()));
    assert!(Arc::ptr_eq(&model_before, &store.current_model().unwrap()));
    assert_eq!(store.list(&ListQuery::default()).len(), 40);
}

#[test]
fn readers_never_see_a_mixed_catalog() {
    let store = Arc::new(store_with(NumberedBatches::new(21), 120));
    store.initialize();
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut observed = 0usize;
                while !done.load(Ordering::SeqCst) || observed == 0 {
                    let snapshot = store.snapshot();
                    let records = snapshot.records();
                    assert_eq!(records.len(), 120);
                    let batch = records[0].name.split('/').next().unwrap().to_string();
                    for record in records {
                        assert!(record.name.starts_with(&format!("{batch}/")));
                        assert!(record.prediction().is_some());
                    }
                    observed += 1;
                }
                observed
            })
        })
        .collect();

    for _ in 0..3 {
        assert!(store.refresh().unwrap().training.is_success());
    }
    done.store(true, Ordering::SeqCst);
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }
    assert_eq!(store.snapshot().generation(), 4);
}

#[test]
fn restored_model_reproduces_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = dir.path().join("models").join("classifier_model.json");
    let options = quick_trainer().options().clone();

    let trained = CatalogStore::new(
        Box::new(RecordGenerator::with_seed(8)),
        Trainer::new(options.clone(), Some(artifact.clone())),
        Default::default(),
    );
    let result = trained.initialize().unwrap();
    assert!(result.is_success());
    assert!(artifact.is_file());

    let fresh = store_with(RecordGenerator::with_seed(9), 20);
    fresh.initialize();
    let summary = fresh.restore_model(&artifact).unwrap();
    assert_eq!(summary.annotated, 20);
    assert_eq!(
        fresh.predict(&sample_input()).unwrap(),
        trained.predict(&sample_input()).unwrap()
    );
}
