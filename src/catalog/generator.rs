//! Synthetic catalog records with mission-aware attribute distributions.

use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use super::source::RecordSource;
use super::types::{CatalogRecord, Mission, Status};

/// Probability threshold above which a synthetic record lands in the habitable zone.
const HABITABLE_ZONE_DRAW: f64 = 0.8;

/// Detection techniques drawn for synthetic records.
const METHODS: &[&str] = &["Transit", "Radial Velocity", "Microlensing"];

/// Retries before a colliding name gets an index suffix.
const NAME_ATTEMPTS: usize = 8;

/// Plausible attribute ranges for one mission.
#[derive(Debug, Clone)]
pub struct MissionProfile {
    pub mission: Mission,
    pub discovery_years: RangeInclusive<i32>,
    pub period_days: RangeInclusive<f64>,
    pub radius_earth: RangeInclusive<f64>,
    pub temperature_k: RangeInclusive<i32>,
}

impl MissionProfile {
    /// Profile used for synthetic records and for filling missing archive values.
    pub fn for_mission(mission: Mission) -> Self {
        match mission {
            Mission::Kepler => Self {
                mission,
                discovery_years: 2009..=2018,
                period_days: 0.5..=500.0,
                radius_earth: 0.5..=20.0,
                temperature_k: 200..=2200,
            },
            Mission::K2 => Self {
                mission,
                discovery_years: 2014..=2019,
                period_days: 0.5..=80.0,
                radius_earth: 0.5..=15.0,
                temperature_k: 300..=2500,
            },
            Mission::Tess => Self {
                mission,
                discovery_years: 2018..=2024,
                period_days: 0.3..=40.0,
                radius_earth: 0.6..=25.0,
                temperature_k: 250..=2800,
            },
        }
    }

    pub fn sample_period<R: Rng>(&self, rng: &mut R) -> f64 {
        round2(rng.random_range(self.period_days.clone()))
    }

    pub fn sample_radius<R: Rng>(&self, rng: &mut R) -> f64 {
        round2(rng.random_range(self.radius_earth.clone()))
    }

    pub fn sample_temperature<R: Rng>(&self, rng: &mut R) -> i32 {
        rng.random_range(self.temperature_k.clone())
    }

    pub fn sample_discovery_year<R: Rng>(&self, rng: &mut R) -> i32 {
        rng.random_range(self.discovery_years.clone())
    }

    /// Draw a designation following the mission's naming convention.
    pub fn sample_name<R: Rng>(&self, rng: &mut R) -> String {
        match self.mission {
            Mission::Kepler => {
                let letter = planet_letter(rng);
                format!("Kepler-{} {letter}", rng.random_range(1000..=9999))
            }
            Mission::K2 => {
                let letter = planet_letter(rng);
                format!("K2-{} {letter}", rng.random_range(1..=400))
            }
            Mission::Tess => format!(
                "TOI-{}.{:02}",
                rng.random_range(100..=6999),
                rng.random_range(1..=3)
            ),
        }
    }
}

fn planet_letter<R: Rng>(rng: &mut R) -> char {
    char::from(b'b' + rng.random_range(0..5u8))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Produce `count` synthetic records from `rng`.
///
/// Names are unique within the returned batch.
pub fn generate_with<R: Rng>(rng: &mut R, count: usize) -> Vec<CatalogRecord> {
    let mut used = HashSet::with_capacity(count);
    let mut records = Vec::with_capacity(count);
    for index in 0..count {
        let mission = *Mission::ALL.choose(rng).unwrap_or(&Mission::Kepler);
        let profile = MissionProfile::for_mission(mission);
        let name = unique_name(&profile, rng, &mut used, index);
        let method = METHODS.choose(rng).copied().unwrap_or("Transit");
        let status = *Status::ALL.choose(rng).unwrap_or(&Status::Candidate);
        records.push(CatalogRecord {
            name,
            period: profile.sample_period(rng),
            radius: profile.sample_radius(rng),
            temperature: profile.sample_temperature(rng),
            habitable_zone: rng.random::<f64>() > HABITABLE_ZONE_DRAW,
            method: method.to_string(),
            mission,
            discovery_year: profile.sample_discovery_year(rng),
            status,
            source_score: None,
            annotation: None,
        });
    }
    records
}

fn unique_name<R: Rng>(
    profile: &MissionProfile,
    rng: &mut R,
    used: &mut HashSet<String>,
    index: usize,
) -> String {
    for _ in 0..NAME_ATTEMPTS {
        let candidate = profile.sample_name(rng);
        if used.insert(candidate.clone()) {
            return candidate;
        }
    }
    let fallback = format!("{}-{index}", profile.sample_name(rng));
    used.insert(fallback.clone());
    fallback
}

/// Record source backed by a seeded random generator.
pub struct RecordGenerator {
    rng: Mutex<StdRng>,
}

impl RecordGenerator {
    /// Generator seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Generator with a reproducible value stream.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn generate(&self, count: usize) -> Vec<CatalogRecord> {
        let mut rng = self.rng.lock().unwrap_or_else(|err| err.into_inner());
        generate_with(&mut *rng, count)
    }
}

impl Default for RecordGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordSource for RecordGenerator {
    fn label(&self) -> &str {
        "synthetic"
    }

    fn produce(&self, count: usize) -> Vec<CatalogRecord> {
        self.generate(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_count_yields_empty_batch() {
        assert!(RecordGenerator::with_seed(1).generate(0).is_empty());
    }

    #[test]
    fn attributes_follow_mission_profile() {
        let records = RecordGenerator::with_seed(7).generate(300);
        assert_eq!(records.len(), 300);
        for record in &records {
            let profile = MissionProfile::for_mission(record.mission);
            assert!(profile.period_days.contains(&record.period), "{record:?}");
            assert!(profile.radius_earth.contains(&record.radius), "{record:?}");
            assert!(profile.temperature_k.contains(&record.temperature));
            assert!(profile.discovery_years.contains(&record.discovery_year));
            assert!(record.annotation.is_none());
            assert!(record.source_score.is_none());
            let prefix = match record.mission {
                Mission::Kepler => "Kepler-",
                Mission::K2 => "K2-",
                Mission::Tess => "TOI-",
            };
            assert!(record.name.starts_with(prefix), "{}", record.name);
        }
    }

    #[test]
    fn names_are_unique_within_batch() {
        let records = RecordGenerator::with_seed(3).generate(2_000);
        let names: HashSet<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names.len(), records.len());
    }

    #[test]
    fn every_mission_and_status_appears() {
        let records = RecordGenerator::with_seed(11).generate(500);
        for mission in Mission::ALL {
            assert!(records.iter().any(|r| r.mission == mission));
        }
        for status in Status::ALL {
            assert!(records.iter().any(|r| r.status == status));
        }
        assert!(records.iter().any(|r| r.habitable_zone));
        assert!(records.iter().any(|r| !r.habitable_zone));
    }

    #[test]
    fn seeded_generators_repeat() {
        let a = RecordGenerator::with_seed(42).generate(20);
        let b = RecordGenerator::with_seed(42).generate(20);
        assert_eq!(a, b);
    }
}
