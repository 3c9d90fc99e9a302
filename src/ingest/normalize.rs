//! Map archive rows onto catalog records.

use std::fmt;

use rand::Rng;
use rand::seq::IndexedRandom;

use super::shapes::{ConfirmedRow, K2Row, KeplerRow, RawRecord, TessRow};
use crate::catalog::{CatalogRecord, Mission, MissionProfile, Status};

const RADIUS_BAND_EARTH: (f64, f64) = (0.5, 2.5);
const INSOLATION_BAND_EARTH: (f64, f64) = (0.3, 1.5);
const TEMPERATURE_BAND_K: (f64, f64) = (200.0, 350.0);

const DEFAULT_TEMPERATURE_K: i32 = 300;
const DEFAULT_METHOD: &str = "Transit";

/// Habitable-zone test shared by every archive source.
///
/// Needs a rocky radius, then a temperate insolation when known, else a
/// temperate equilibrium temperature.
pub fn habitable_zone(radius: f64, temperature: Option<f64>, insolation: Option<f64>) -> bool {
    if !within(radius, RADIUS_BAND_EARTH) {
        return false;
    }
    match insolation.filter(|s| *s > 0.0) {
        Some(flux) => within(flux, INSOLATION_BAND_EARTH),
        None => temperature.is_some_and(|t| within(t, TEMPERATURE_BAND_K)),
    }
}

fn within(value: f64, (low, high): (f64, f64)) -> bool {
    value > low && value < high
}

/// Why a row was left out of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingPeriod,
    MissingRadius,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPeriod => f.write_str("missing orbital period"),
            Self::MissingRadius => f.write_str("missing planet radius"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeSummary {
    pub kept: usize,
    pub missing_period: usize,
    pub missing_radius: usize,
}

impl NormalizeSummary {
    pub fn dropped(&self) -> usize {
        self.missing_period + self.missing_radius
    }
}

/// Normalize one row. Rows without a positive period or radius are dropped.
pub fn normalize<R: Rng>(raw: &RawRecord, rng: &mut R) -> Result<CatalogRecord, DropReason> {
    match raw {
        RawRecord::Confirmed(row) => Ok(from_confirmed(row, rng)),
        RawRecord::Kepler(row) => from_kepler(row),
        RawRecord::K2(row) => from_k2(row, rng),
        RawRecord::Tess(row) => from_tess(row),
    }
}

pub fn normalize_batch<R: Rng>(
    rows: &[RawRecord],
    rng: &mut R,
) -> (Vec<CatalogRecord>, NormalizeSummary) {
    let mut summary = NormalizeSummary::default();
    let mut records = Vec::with_capacity(rows.len());
    for raw in rows {
        match normalize(raw, rng) {
            Ok(record) => records.push(record),
            Err(DropReason::MissingPeriod) => summary.missing_period += 1,
            Err(DropReason::MissingRadius) => summary.missing_radius += 1,
        }
    }
    summary.kept = records.len();
    if summary.dropped() > 0 {
        tracing::debug!(
            "Dropped {} archive rows ({} without period, {} without radius)",
            summary.dropped(),
            summary.missing_period,
            summary.missing_radius
        );
    }
    (records, summary)
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

fn required(period: Option<f64>, radius: Option<f64>) -> Result<(f64, f64), DropReason> {
    let period = positive(period).ok_or(DropReason::MissingPeriod)?;
    let radius = positive(radius).ok_or(DropReason::MissingRadius)?;
    Ok((period, radius))
}

fn year(value: Option<f64>, fallback: i32) -> i32 {
    positive(value).map_or(fallback, |y| y as i32)
}

fn score(value: Option<f64>, fallback: f32) -> f32 {
    value.map_or(fallback, |s| s.clamp(0.0, 1.0) as f32)
}

/// Mission inferred from a designation, then from the discovery facility.
fn detect_mission(name: &str, facility: Option<&str>) -> Option<Mission> {
    let by_name = name.to_ascii_lowercase();
    if by_name.contains("k2") || by_name.contains("epic") {
        return Some(Mission::K2);
    }
    if by_name.contains("kepler") || by_name.contains("koi") {
        return Some(Mission::Kepler);
    }
    if by_name.contains("tess") || by_name.contains("toi") {
        return Some(Mission::Tess);
    }
    let facility = facility?.to_ascii_lowercase();
    if facility.contains("k2") {
        Some(Mission::K2)
    } else if facility.contains("kepler") {
        Some(Mission::Kepler)
    } else if facility.contains("tess") || facility.contains("transiting exoplanet") {
        Some(Mission::Tess)
    } else {
        None
    }
}

fn from_confirmed<R: Rng>(row: &ConfirmedRow, rng: &mut R) -> CatalogRecord {
    let name = row
        .pl_name
        .clone()
        .unwrap_or_else(|| format!("NASA-{}", rng.random_range(10_000..=99_999)));
    let mission = detect_mission(&name, row.pl_facility.as_deref())
        .or_else(|| Mission::ALL.choose(rng).copied())
        .unwrap_or(Mission::Kepler);
    let profile = MissionProfile::for_mission(mission);
    let period = positive(row.pl_orbper).unwrap_or_else(|| profile.sample_period(rng));
    let radius = positive(row.pl_rade).unwrap_or_else(|| profile.sample_radius(rng));
    let temperature = positive(row.pl_eqt)
        .map(|t| t.round() as i32)
        .unwrap_or_else(|| profile.sample_temperature(rng));
    CatalogRecord {
        habitable_zone: habitable_zone(radius, positive(row.pl_eqt), row.pl_insol),
        name,
        period,
        radius,
        temperature,
        method: row
            .pl_discmethod
            .clone()
            .unwrap_or_else(|| DEFAULT_METHOD.to_string()),
        mission,
        discovery_year: year(row.pl_disc.or(row.disc_year), 2015),
        status: Status::Confirmed,
        source_score: None,
        annotation: None,
    }
}

fn from_kepler(row: &KeplerRow) -> Result<CatalogRecord, DropReason> {
    let (period, radius) = required(row.koi_period, row.koi_prad)?;
    let temperature = positive(row.koi_teq).map_or(DEFAULT_TEMPERATURE_K, |t| t.round() as i32);
    Ok(CatalogRecord {
        name: format!("Kepler-{}", row.kepoi_name.as_deref().unwrap_or("Unknown")),
        period,
        radius,
        temperature,
        habitable_zone: habitable_zone(radius, positive(row.koi_teq), row.koi_insol),
        method: DEFAULT_METHOD.to_string(),
        mission: Mission::Kepler,
        discovery_year: 2014,
        status: row
            .koi_disposition
            .as_deref()
            .map_or(Status::Candidate, Status::from_disposition),
        source_score: Some(score(row.koi_score, 0.5)),
        annotation: None,
    })
}

fn from_k2<R: Rng>(row: &K2Row, rng: &mut R) -> Result<CatalogRecord, DropReason> {
    let (period, radius) = required(
        row.pl_orbper.or(row.orbital_period),
        row.pl_rade.or(row.planet_radius),
    )?;
    let measured_temperature = positive(row.pl_eqt.or(row.equilibrium_temperature));
    let temperature = measured_temperature.map_or(DEFAULT_TEMPERATURE_K, |t| t.round() as i32);
    let name = row
        .pl_name
        .clone()
        .unwrap_or_else(|| format!("K2-{}", rng.random_range(1..=300)));
    Ok(CatalogRecord {
        name,
        period,
        radius,
        temperature,
        habitable_zone: habitable_zone(
            radius,
            measured_temperature,
            row.insolation_flux.or(row.pl_insol),
        ),
        method: DEFAULT_METHOD.to_string(),
        mission: Mission::K2,
        discovery_year: year(row.disc_year, 2016),
        status: row
            .disposition
            .as_deref()
            .map_or(Status::Candidate, Status::from_disposition),
        source_score: Some(score(row.confidence, 0.7)),
        annotation: None,
    })
}

fn from_tess(row: &TessRow) -> Result<CatalogRecord, DropReason> {
    let (period, radius) = required(row.period, row.planet_radius)?;
    let temperature = positive(row.planet_teq).map_or(DEFAULT_TEMPERATURE_K, |t| t.round() as i32);
    Ok(CatalogRecord {
        name: format!("TESS-{}", row.toiid.as_deref().unwrap_or("Unknown")),
        period,
        radius,
        temperature,
        habitable_zone: habitable_zone(radius, positive(row.planet_teq), row.insol),
        method: DEFAULT_METHOD.to_string(),
        mission: Mission::Tess,
        discovery_year: 2018,
        status: Status::Candidate,
        source_score: Some(0.7),
        annotation: None,
    })
}
