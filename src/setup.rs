//! Wire settings into a ready-to-initialize [`CatalogStore`].

use crate::catalog::{CatalogStore, RecordGenerator, RecordSource};
use crate::config::{ConfigError, Settings};
use crate::ingest::{ArchiveClient, ArchiveSource};
use crate::ml::Trainer;

/// Record source selected by `[catalog] source`.
pub fn build_source(settings: &Settings) -> Box<dyn RecordSource> {
    match settings.catalog.source.archive_kind() {
        Some(kind) => Box::new(ArchiveSource::new(ArchiveClient::new(&settings.archive), kind)),
        None => match settings.catalog.seed {
            Some(seed) => Box::new(RecordGenerator::with_seed(seed)),
            None => Box::new(RecordGenerator::new()),
        },
    }
}

/// Build a store from settings.
///
/// With `persist_models` set, every successful training run writes the configured
/// artifact; otherwise models live in memory only. Nothing is fetched or trained until
/// [`CatalogStore::initialize`].
pub fn build_store(settings: &Settings, persist_models: bool) -> Result<CatalogStore, ConfigError> {
    let artifact_path = if persist_models {
        Some(settings.model.resolved_artifact_path()?)
    } else {
        None
    };
    let trainer = Trainer::new(settings.training.trainer_options(), artifact_path);
    let source = build_source(settings);
    tracing::debug!("Catalog source: {}", source.label());
    Ok(CatalogStore::new(
        source,
        trainer,
        settings.catalog.store_options(),
    ))
}
