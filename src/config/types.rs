use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::defaults::*;
use crate::catalog::StoreOptions;
use crate::ingest::SourceKind;
use crate::ml::TrainerOptions;
use crate::ml::forest::TrainOptions;

/// Errors that may occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    #[error("No suitable config directory found")]
    NoConfigDir,
}

/// Where catalog batches come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceSelection {
    /// Randomly generated records.
    Synthetic,
    Confirmed,
    Kepler,
    K2,
    Tess,
}

impl SourceSelection {
    /// Archive table behind this selection, `None` for synthetic data.
    pub fn archive_kind(&self) -> Option<SourceKind> {
        match self {
            Self::Synthetic => None,
            Self::Confirmed => Some(SourceKind::Confirmed),
            Self::Kepler => Some(SourceKind::Kepler),
            Self::K2 => Some(SourceKind::K2),
            Self::Tess => Some(SourceKind::Tess),
        }
    }
}

/// Contents of `nebulax.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub training: TrainingSettings,
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub archive: ArchiveSettings,
}

impl Settings {
    /// Clamp out-of-range values back into their usable ranges.
    pub fn normalized(mut self) -> Self {
        let catalog = &mut self.catalog;
        catalog.batch_size = catalog.batch_size.clamp(1, MAX_BATCH_SIZE);
        catalog.refresh_preview = catalog.refresh_preview.min(catalog.batch_size);

        let training = &mut self.training;
        training.n_trees = training.n_trees.clamp(1, MAX_TREES);
        training.max_depth = training.max_depth.clamp(1, MAX_DEPTH);
        training.min_samples_split = training.min_samples_split.max(2);
        training.test_fraction = clamp_test_fraction(training.test_fraction);
        training.min_samples = training.min_samples.max(2);

        let archive = &mut self.archive;
        archive.timeout_secs = clamp_timeout_secs(archive.timeout_secs);
        archive.max_response_bytes = clamp_response_bytes(archive.max_response_bytes);
        if archive.base_url.trim().is_empty() {
            archive.base_url = default_base_url();
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_source")]
    pub source: SourceSelection,
    /// Records fetched by each initialize/refresh.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Records echoed back by a refresh.
    #[serde(default = "default_refresh_preview")]
    pub refresh_preview: usize,
    /// Fixed seed for the synthetic generator; random when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            source: default_source(),
            batch_size: default_batch_size(),
            refresh_preview: default_refresh_preview(),
            seed: None,
        }
    }
}

impl CatalogSettings {
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            batch_size: self.batch_size,
            refresh_preview: self.refresh_preview,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    #[serde(default = "default_n_trees")]
    pub n_trees: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    /// Held-out share of usable samples.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Seeds both the split shuffle and the forest.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            n_trees: default_n_trees(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            min_samples: default_min_samples(),
        }
    }
}

impl TrainingSettings {
    pub fn trainer_options(&self) -> TrainerOptions {
        TrainerOptions {
            forest: TrainOptions {
                n_trees: self.n_trees,
                max_depth: self.max_depth,
                min_samples_split: self.min_samples_split,
                max_features: None,
                seed: self.seed,
            },
            test_fraction: self.test_fraction,
            split_seed: self.seed,
            min_samples: self.min_samples,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelSettings {
    /// Where trained models are written; `<app root>/models/classifier_model.json` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

impl ArchiveSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
