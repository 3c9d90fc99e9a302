use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Observational program a catalog record originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mission {
    Kepler,
    K2,
    #[serde(rename = "TESS")]
    Tess,
}

impl Mission {
    /// Every mission, in a stable order.
    pub const ALL: [Mission; 3] = [Mission::Kepler, Mission::K2, Mission::Tess];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kepler => "Kepler",
            Self::K2 => "K2",
            Self::Tess => "TESS",
        }
    }
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mission {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "kepler" => Ok(Self::Kepler),
            "k2" => Ok(Self::K2),
            "tess" => Ok(Self::Tess),
            other => Err(format!("Unknown mission: {other}")),
        }
    }
}

/// Disposition of a candidate object.
///
/// The variant order defines the label encoding used by the classifier
/// (`Confirmed = 0`, `Candidate = 1`, `FalsePositive = 2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Confirmed,
    Candidate,
    #[serde(rename = "False Positive")]
    FalsePositive,
}

impl Status {
    /// Every status, ordered by label index.
    pub const ALL: [Status; 3] = [Status::Confirmed, Status::Candidate, Status::FalsePositive];

    /// Number of classes in the label space.
    pub const COUNT: usize = Self::ALL.len();

    /// Encode the status as a class index.
    pub fn label_index(&self) -> usize {
        match self {
            Self::Confirmed => 0,
            Self::Candidate => 1,
            Self::FalsePositive => 2,
        }
    }

    /// Decode a class index produced by [`Status::label_index`].
    pub fn from_label_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "Confirmed",
            Self::Candidate => "Candidate",
            Self::FalsePositive => "False Positive",
        }
    }

    /// Map an archive disposition string (`CONFIRMED`, `false positive`, ...).
    ///
    /// Unknown dispositions fall back to `Candidate`.
    pub fn from_disposition(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "CONFIRMED" => Self::Confirmed,
            "FALSE POSITIVE" | "FALSE_POSITIVE" | "FP" => Self::FalsePositive,
            _ => Self::Candidate,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace(['_', '-'], " ").as_str() {
            "confirmed" => Ok(Self::Confirmed),
            "candidate" => Ok(Self::Candidate),
            "false positive" => Ok(Self::FalsePositive),
            other => Err(format!("Unknown status: {other}")),
        }
    }
}

/// Model output stamped onto a record by the annotation pass.
///
/// Prediction and confidence only ever travel together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub prediction: Status,
    /// Maximum class-membership probability in `[0, 1]`.
    pub confidence: f32,
}

/// One candidate object in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub name: String,
    /// Orbital period in days.
    pub period: f64,
    /// Planet radius in Earth radii.
    pub radius: f64,
    /// Equilibrium temperature in Kelvin.
    pub temperature: i32,
    pub habitable_zone: bool,
    /// Detection technique.
    pub method: String,
    pub mission: Mission,
    pub discovery_year: i32,
    /// Supervised label; never written by annotation.
    pub status: Status,
    /// Source-provided score used as the sixth feature when no annotation exists yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_score: Option<f32>,
    #[serde(default, flatten, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
}

impl CatalogRecord {
    pub fn prediction(&self) -> Option<Status> {
        self.annotation.map(|annotation| annotation.prediction)
    }

    /// Confidence currently attached to the record, if any.
    ///
    /// A model annotation wins over the source score.
    pub fn confidence(&self) -> Option<f32> {
        self.annotation
            .map(|annotation| annotation.confidence)
            .or(self.source_score)
    }

    /// Return a copy of this record carrying `annotation`.
    pub fn with_annotation(&self, annotation: Annotation) -> Self {
        Self {
            annotation: Some(annotation),
            ..self.clone()
        }
    }
}
