//! Row shapes of the supported archive tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::lenient;

/// Archive table a batch of rows comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Confirmed planets table.
    Confirmed,
    /// Kepler objects of interest (cumulative table).
    Kepler,
    K2,
    /// TESS objects of interest.
    Tess,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Confirmed,
        SourceKind::Kepler,
        SourceKind::K2,
        SourceKind::Tess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Kepler => "kepler",
            Self::K2 => "k2",
            Self::Tess => "tess",
        }
    }

    /// Query string selecting this table in JSON format.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Confirmed => "?table=exoplanets&format=json",
            Self::Kepler => "?table=cumulative&format=json&where=koi_disposition!=''",
            Self::K2 => "?table=k2planets&format=json",
            Self::Tess => "?table=toi&format=json&where=tess_disposition like 'Candidate'",
        }
    }

    /// Parse one JSON row into this table's shape.
    pub fn parse_row(&self, value: Value) -> Result<RawRecord, serde_json::Error> {
        Ok(match self {
            Self::Confirmed => RawRecord::Confirmed(serde_json::from_value(value)?),
            Self::Kepler => RawRecord::Kepler(serde_json::from_value(value)?),
            Self::K2 => RawRecord::K2(serde_json::from_value(value)?),
            Self::Tess => RawRecord::Tess(serde_json::from_value(value)?),
        })
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Ok(Self::Confirmed),
            "kepler" => Ok(Self::Kepler),
            "k2" => Ok(Self::K2),
            "tess" => Ok(Self::Tess),
            other => Err(format!("Unknown archive source: {other}")),
        }
    }
}

/// One archive row in its source-specific shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Confirmed(ConfirmedRow),
    Kepler(KeplerRow),
    K2(K2Row),
    Tess(TessRow),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfirmedRow {
    #[serde(default, deserialize_with = "lenient::text")]
    pub pl_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub pl_orbper: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub pl_rade: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub pl_eqt: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub pl_insol: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub pl_discmethod: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub pl_facility: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub pl_disc: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub disc_year: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct KeplerRow {
    #[serde(default, deserialize_with = "lenient::text")]
    pub kepoi_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub koi_disposition: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub koi_period: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub koi_prad: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub koi_teq: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub koi_insol: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub koi_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct K2Row {
    #[serde(default, deserialize_with = "lenient::text")]
    pub pl_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub disposition: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub pl_orbper: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub orbital_period: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub pl_rade: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub planet_radius: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub pl_eqt: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub equilibrium_temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub insolation_flux: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub pl_insol: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub disc_year: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TessRow {
    #[serde(default, deserialize_with = "lenient::text")]
    pub toiid: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub period: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub planet_radius: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub planet_teq: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub insol: Option<f64>,
}
