use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::debug;

use crate::catalog::{Substance, TemperatureRange};
use crate::density::{substance_density, volume, water_density, DEFAULT_MASS_KG, WATER_PEAK_TEMP_C};

/// Tolerance when deciding whether `max` is reached by exact stepping
const STEP_EPSILON: f64 = 1e-9;

/// Upper bound on the number of samples in one series
pub const MAX_POINTS: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub temperature: f64,
    pub water_density: f64,
    pub substance_density: f64,
}

impl Sample {
    pub fn at(substance: &Substance, t: f64) -> Self {
        Sample {
            temperature: t,
            water_density: water_density(t),
            substance_density: substance_density(substance, t),
        }
    }

    pub fn water_volume(&self) -> f64 {
        volume(self.water_density, DEFAULT_MASS_KG)
    }

    pub fn substance_volume(&self) -> f64 {
        volume(self.substance_density, DEFAULT_MASS_KG)
    }
}

/// Chart-ready comparison curve for one substance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleSeries {
    pub substance_id: &'static str,
    pub range: TemperatureRange,
    pub step: f64,
    /// x position of the water density peak marker
    pub peak_marker: f64,
    pub samples: Vec<Sample>,
}

impl SampleSeries {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("step must be a positive finite number, got {0}")]
    InvalidStep(f64),
    #[error("range is inverted or not finite: {min}..{max}")]
    InvalidRange { min: f64, max: f64 },
    #[error("stepping by {step} over {min}..{max} exceeds {MAX_POINTS} points")]
    TooManyPoints { min: f64, max: f64, step: f64 },
}

/// Number of points produced when stepping from `min` toward `max`.
pub fn point_count(range: TemperatureRange, step: f64) -> Result<usize, SeriesError> {
    let intervals = ((range.max - range.min) / step + STEP_EPSILON).floor();
    if !intervals.is_finite() || intervals >= MAX_POINTS as f64 {
        return Err(SeriesError::TooManyPoints {
            min: range.min,
            max: range.max,
            step,
        });
    }
    Ok(intervals as usize + 1)
}

/// Samples the water/substance comparison across `range`.
///
/// Temperatures are computed as `min + i * step` so the grid does not drift,
/// and a final point within rounding of `max` is pinned to `max` exactly.
pub fn generate_series(
    substance: &Substance,
    range: TemperatureRange,
    step: f64,
) -> Result<SampleSeries, SeriesError> {
    if !step.is_finite() || step <= 0.0 {
        return Err(SeriesError::InvalidStep(step));
    }
    if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
        return Err(SeriesError::InvalidRange { min: range.min, max: range.max });
    }

    let count = point_count(range, step)?;
    let samples = (0..count)
        .map(|i| {
            let mut t = range.min + i as f64 * step;
            if (t - range.max).abs() < STEP_EPSILON * step.max(1.0) {
                t = range.max;
            }
            Sample::at(substance, t)
        })
        .collect();

    Ok(SampleSeries {
        substance_id: substance.id,
        range,
        step,
        peak_marker: WATER_PEAK_TEMP_C,
        samples,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    substance_id: &'static str,
    min_bits: u64,
    max_bits: u64,
    step_bits: u64,
}

impl SeriesKey {
    fn new(substance: &Substance, range: TemperatureRange, step: f64) -> Self {
        SeriesKey {
            substance_id: substance.id,
            min_bits: range.min.to_bits(),
            max_bits: range.max.to_bits(),
            step_bits: step.to_bits(),
        }
    }
}

static SERIES_CACHE: Lazy<RwLock<HashMap<SeriesKey, Arc<SampleSeries>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Memoized `generate_series`. Substances are immutable, so the id together
/// with the range and step fully determines the output.
pub fn cached_series(
    substance: &Substance,
    range: TemperatureRange,
    step: f64,
) -> Result<Arc<SampleSeries>, SeriesError> {
    let key = SeriesKey::new(substance, range, step);
    if let Ok(cache) = SERIES_CACHE.read() {
        if let Some(hit) = cache.get(&key) {
            debug!(substance = substance.id, "series cache hit");
            return Ok(Arc::clone(hit));
        }
    }

    let series = Arc::new(generate_series(substance, range, step)?);
    debug!(substance = substance.id, points = series.len(), "series generated");
    match SERIES_CACHE.write() {
        // another caller may have filled the slot first; keep theirs
        Ok(mut cache) => Ok(Arc::clone(cache.entry(key).or_insert(series))),
        Err(_) => Ok(series),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{substance_by_id, SUBSTANCES, TEMPERATURE_RANGE, TEMPERATURE_STEP};

    #[test]
    fn test_reference_configuration() {
        let series = generate_series(&SUBSTANCES[0], TEMPERATURE_RANGE, TEMPERATURE_STEP).unwrap();
        assert_eq!(series.len(), 51);
        assert_eq!(series.first().unwrap().temperature, -5.0);
        assert_eq!(series.last().unwrap().temperature, 20.0);
        assert_eq!(series.substance_id, "ethanol");
        assert_eq!(series.peak_marker, 4.0);
    }

    #[test]
    fn test_point_count_formula() {
        let cases = [
            (TemperatureRange { min: 0.0, max: 1.0 }, 0.1, 11),
            (TemperatureRange { min: 0.0, max: 1.0 }, 0.3, 4),
            (TemperatureRange { min: 2.0, max: 2.0 }, 0.5, 1),
            (TemperatureRange { min: -5.0, max: 20.0 }, 1.0, 26),
        ];
        let s = substance_by_id("generic").unwrap();
        for (range, step, expected) in cases {
            let series = generate_series(s, range, step).unwrap();
            assert_eq!(series.len(), expected, "{range:?} step {step}");
            assert_eq!(series.first().unwrap().temperature, range.min);
        }
    }

    #[test]
    fn test_last_point_pinned_to_max() {
        let range = TemperatureRange { min: 0.0, max: 1.0 };
        let series = generate_series(&SUBSTANCES[1], range, 0.1).unwrap();
        assert_eq!(series.last().unwrap().temperature, 1.0);
    }

    #[test]
    fn test_samples_match_density_model() {
        let oil = substance_by_id("oil").unwrap();
        let series = generate_series(oil, TEMPERATURE_RANGE, TEMPERATURE_STEP).unwrap();
        for sample in &series.samples {
            assert_eq!(sample.water_density, water_density(sample.temperature));
            assert_eq!(sample.substance_density, substance_density(oil, sample.temperature));
        }
        let peak = series
            .samples
            .iter()
            .max_by(|a, b| a.water_density.total_cmp(&b.water_density))
            .unwrap();
        assert_eq!(peak.temperature, 4.0);
    }

    #[test]
    fn test_sample_volumes() {
        let sample = Sample::at(&SUBSTANCES[0], 4.0);
        assert!((sample.water_volume() - 1.0).abs() < 1e-12);
        assert!(sample.substance_volume() > sample.water_volume());
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let s = &SUBSTANCES[0];
        assert_eq!(
            generate_series(s, TEMPERATURE_RANGE, 0.0),
            Err(SeriesError::InvalidStep(0.0))
        );
        assert!(generate_series(s, TEMPERATURE_RANGE, f64::NAN).is_err());
        assert!(matches!(
            generate_series(s, TemperatureRange { min: 5.0, max: 1.0 }, 0.5),
            Err(SeriesError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_rejects_unbounded_count() {
        let s = &SUBSTANCES[0];
        let huge = TemperatureRange { min: 0.0, max: 1e300 };
        assert!(matches!(
            generate_series(s, huge, 1e-10),
            Err(SeriesError::TooManyPoints { .. })
        ));
        let wide = TemperatureRange { min: -1e308, max: 1e308 };
        assert!(matches!(
            generate_series(s, wide, 1.0),
            Err(SeriesError::TooManyPoints { .. })
        ));
        assert!(generate_series(s, TemperatureRange { min: 0.0, max: 1.0 }, 1e-7).is_err());

        let at_cap = TemperatureRange { min: 0.0, max: (MAX_POINTS - 1) as f64 };
        assert_eq!(point_count(at_cap, 1.0), Ok(MAX_POINTS));
    }

    #[test]
    fn test_cache_returns_same_series() {
        let mercury = substance_by_id("mercury").unwrap();
        let a = cached_series(mercury, TEMPERATURE_RANGE, TEMPERATURE_STEP).unwrap();
        let b = cached_series(mercury, TEMPERATURE_RANGE, TEMPERATURE_STEP).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let other = cached_series(&SUBSTANCES[3], TEMPERATURE_RANGE, TEMPERATURE_STEP).unwrap();
        assert_eq!(other.substance_id, "generic");
        assert_eq!(*a, generate_series(mercury, TEMPERATURE_RANGE, TEMPERATURE_STEP).unwrap());
    }
}
