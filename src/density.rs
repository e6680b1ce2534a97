/// Density model for water and the linear reference substances.
/// All densities are in kg/m³, temperatures in °C.

use serde::Serialize;

use crate::catalog::Substance;

/// Temperature at which the simplified water curve peaks
pub const WATER_PEAK_TEMP_C: f64 = 4.0;

/// Water density at the peak
pub const WATER_PEAK_DENSITY: f64 = 1000.0;

/// Curvature of the parabola around the peak
const WATER_CURVATURE: f64 = 0.008;

/// Ice density, used for every temperature below freezing
pub const ICE_DENSITY: f64 = 916.7;

/// Mass used when converting densities to volumes (kg)
pub const DEFAULT_MASS_KG: f64 = 1000.0;

/// Density of water at temperature `t`.
///
/// Below 0°C the value jumps to the ice constant. The step at 0 models the
/// phase change and is not smoothed.
pub fn water_density(t: f64) -> f64 {
    if t < 0.0 {
        return ICE_DENSITY;
    }
    WATER_PEAK_DENSITY - WATER_CURVATURE * (t - WATER_PEAK_TEMP_C).powi(2)
}

/// Density of a reference substance, falling linearly as it warms.
/// No floor is applied.
pub fn substance_density(substance: &Substance, t: f64) -> f64 {
    substance.base_density - substance.expansion_coeff * t
}

/// Volume occupied by `mass` kg at the given density (m³)
pub fn volume(density: f64, mass: f64) -> f64 {
    mass / density
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WaterPhase {
    Ice,
    Liquid,
}

impl WaterPhase {
    pub fn at(t: f64) -> Self {
        if t < 0.0 {
            WaterPhase::Ice
        } else {
            WaterPhase::Liquid
        }
    }

    pub fn is_ice(self) -> bool {
        self == WaterPhase::Ice
    }
}
