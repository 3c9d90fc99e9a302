//! Quick-look light-curve scoring based on flux variance.

use serde::{Deserialize, Serialize};

/// Fewest usable points that produce a non-zero score.
pub const MIN_POINTS: usize = 10;

const VARIANCE_TRANSIT_THRESHOLD: f64 = 0.001;
const CONFIDENCE_CEILING: f64 = 0.9;
const CONFIDENCE_FLOOR: f64 = 0.3;
const VARIANCE_PENALTY: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightCurvePoint {
    pub time: f64,
    pub flux: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightCurveAnalysis {
    pub transits: u32,
    /// Rounded to two decimals.
    pub confidence: f64,
}

impl LightCurveAnalysis {
    const EMPTY: Self = Self {
        transits: 0,
        confidence: 0.0,
    };
}

/// Score a light curve. Points with non-finite flux are ignored.
pub fn analyze_lightcurve(points: &[LightCurvePoint]) -> LightCurveAnalysis {
    let fluxes: Vec<f64> = points
        .iter()
        .map(|point| point.flux)
        .filter(|flux| flux.is_finite())
        .collect();
    if fluxes.len() < MIN_POINTS {
        return LightCurveAnalysis::EMPTY;
    }
    let variance = population_variance(&fluxes);
    let confidence = (CONFIDENCE_CEILING - variance * VARIANCE_PENALTY).max(CONFIDENCE_FLOOR);
    LightCurveAnalysis {
        transits: u32::from(variance > VARIANCE_TRANSIT_THRESHOLD),
        confidence: (confidence * 100.0).round() / 100.0,
    }
}

fn population_variance(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(fluxes: &[f64]) -> Vec<LightCurvePoint> {
        fluxes
            .iter()
            .enumerate()
            .map(|(i, &flux)| LightCurvePoint {
                time: i as f64 * 0.02,
                flux,
            })
            .collect()
    }

    #[test]
    fn short_curves_score_zero() {
        let analysis = analyze_lightcurve(&curve(&[1.0; 9]));
        assert_eq!(analysis.transits, 0);
        assert_eq!(analysis.confidence, 0.0);
        assert_eq!(analyze_lightcurve(&[]), LightCurveAnalysis::EMPTY);
    }

    #[test]
    fn flat_curve_has_no_transit_and_high_confidence() {
        let analysis = analyze_lightcurve(&curve(&[1.0; 20]));
        assert_eq!(analysis.transits, 0);
        assert_eq!(analysis.confidence, 0.9);
    }

    #[test]
    fn dip_raises_variance_and_flags_transit() {
        let mut fluxes = vec![1.0; 20];
        for flux in &mut fluxes[8..12] {
            *flux = 0.9;
        }
        // mean 0.98, variance 0.0016
        let analysis = analyze_lightcurve(&curve(&fluxes));
        assert_eq!(analysis.transits, 1);
        assert_eq!(analysis.confidence, 0.89);
    }

    #[test]
    fn confidence_is_floored() {
        let fluxes: Vec<f64> = (0..10).map(|i| if i % 2 == 0 { 0.0 } else { 2.0 }).collect();
        let analysis = analyze_lightcurve(&curve(&fluxes));
        assert_eq!(analysis.transits, 1);
        assert_eq!(analysis.confidence, 0.3);
    }

    #[test]
    fn non_finite_flux_is_ignored() {
        let mut fluxes = vec![1.0; 10];
        fluxes.push(f64::NAN);
        assert_eq!(analyze_lightcurve(&curve(&fluxes)).confidence, 0.9);
        fluxes.truncate(9);
        fluxes.push(f64::INFINITY);
        assert_eq!(analyze_lightcurve(&curve(&fluxes)), LightCurveAnalysis::EMPTY);
    }
}
