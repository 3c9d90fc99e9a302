//! Fixed-schema feature extraction for catalog records.
//!
//! Every record maps to the same six values, in this order:
//! `[period, radius, temperature, discovery_year, habitable_zone, confidence]`.
//! The same mapping is used at training and prediction time.

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogRecord, Status};

/// Number of values in a feature vector.
pub const FEATURE_LEN: usize = 6;

/// Stand-in for a record without any confidence value.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Feature names, aligned with [`FeatureVector`] positions.
pub const FEATURE_NAMES: [&str; FEATURE_LEN] = [
    "period",
    "radius",
    "temperature",
    "discovery_year",
    "habitable_zone",
    "confidence",
];

/// Six-value numeric view of a record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f32; FEATURE_LEN]);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Build a vector from raw attribute values.
    ///
    /// Fails on the first attribute that does not resolve to a finite number.
    pub fn from_parts(
        period: f64,
        radius: f64,
        temperature: f64,
        discovery_year: f64,
        habitable_zone: bool,
        confidence: Option<f32>,
    ) -> Result<Self, SkipReason> {
        let confidence = confidence.unwrap_or(DEFAULT_CONFIDENCE);
        let values = [
            period as f32,
            radius as f32,
            temperature as f32,
            discovery_year as f32,
            if habitable_zone { 1.0 } else { 0.0 },
            confidence,
        ];
        if let Some(index) = values.iter().position(|value| !value.is_finite()) {
            return Err(SkipReason::NonFinite {
                feature: FEATURE_NAMES[index],
            });
        }
        Ok(Self(values))
    }

    pub fn from_record(record: &CatalogRecord) -> Result<Self, SkipReason> {
        Self::from_parts(
            record.period,
            record.radius,
            f64::from(record.temperature),
            f64::from(record.discovery_year),
            record.habitable_zone,
            record.confidence(),
        )
    }
}

/// Why a record was left out of a feature batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The named feature was NaN or infinite.
    NonFinite { feature: &'static str },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFinite { feature } => write!(f, "{feature} is not a finite number"),
        }
    }
}

/// Records that were skipped, by input position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionSummary {
    pub extracted: usize,
    pub skipped: Vec<(usize, SkipReason)>,
}

impl ExtractionSummary {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Feature matrix and label vector built from a batch of records.
#[derive(Debug, Clone, Default)]
pub struct ExtractedBatch {
    pub features: Vec<FeatureVector>,
    /// Class indices aligned with `features`.
    pub labels: Vec<usize>,
    pub summary: ExtractionSummary,
}

impl ExtractedBatch {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Extract features and labels, preserving the order of kept records.
pub fn extract(records: &[CatalogRecord]) -> ExtractedBatch {
    let mut batch = ExtractedBatch {
        features: Vec::with_capacity(records.len()),
        labels: Vec::with_capacity(records.len()),
        summary: ExtractionSummary::default(),
    };
    for (index, record) in records.iter().enumerate() {
        match FeatureVector::from_record(record) {
            Ok(features) => {
                batch.features.push(features);
                batch.labels.push(encode_label(record.status));
            }
            Err(reason) => {
                tracing::debug!("Skipping record {} ({}): {reason}", index, record.name);
                batch.summary.skipped.push((index, reason));
            }
        }
    }
    batch.summary.extracted = batch.features.len();
    if !batch.summary.skipped.is_empty() {
        tracing::warn!(
            "Feature extraction skipped {} of {} records",
            batch.summary.skipped_count(),
            records.len()
        );
    }
    batch
}

pub fn encode_label(status: Status) -> usize {
    status.label_index()
}

pub fn decode_label(index: usize) -> Option<Status> {
    Status::from_label_index(index)
}
