use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use nebulax::catalog::{CatalogRecord, CatalogStore, RecordGenerator, RecordSource, StoreOptions};
use nebulax::ml::forest::TrainOptions;
use nebulax::ml::{Trainer, TrainerOptions};

/// Small forest so integration tests stay fast.
pub fn quick_trainer() -> Trainer {
    Trainer::new(
        TrainerOptions {
            forest: TrainOptions {
                n_trees: 15,
                ..TrainOptions::default()
            },
            ..TrainerOptions::default()
        },
        None,
    )
}

pub fn store_with(source: impl RecordSource + 'static, batch_size: usize) -> CatalogStore {
    CatalogStore::new(
        Box::new(source),
        quick_trainer(),
        StoreOptions {
            batch_size,
            refresh_preview: 50,
        },
    )
}

/// Seeded synthetic batches whose names carry the batch number.
pub struct NumberedBatches {
    seed: u64,
    batch: AtomicU64,
}

impl NumberedBatches {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            batch: AtomicU64::new(0),
        }
    }
}

impl RecordSource for NumberedBatches {
    fn label(&self) -> &str {
        "numbered"
    }

    fn produce(&self, count: usize) -> Vec<CatalogRecord> {
        let batch = self.batch.fetch_add(1, Ordering::SeqCst);
        RecordGenerator::with_seed(self.seed + batch)
            .generate(count)
            .into_iter()
            .map(|mut record| {
                record.name = format!("b{batch}/{}", record.name);
                record
            })
            .collect()
    }
}

/// Hands out prepared batches in order, then empty batches.
pub struct ScriptedSource {
    batches: Mutex<VecDeque<Vec<CatalogRecord>>>,
}

impl ScriptedSource {
    pub fn new(batches: Vec<Vec<CatalogRecord>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
        }
    }
}

impl RecordSource for ScriptedSource {
    fn label(&self) -> &str {
        "scripted"
    }

    fn produce(&self, _count: usize) -> Vec<CatalogRecord> {
        self.batches.lock().unwrap().pop_front().unwrap_or_default()
    }
}
