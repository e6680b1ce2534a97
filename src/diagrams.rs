/// Layout data for the molecule-spacing and lake cross-section diagrams.
/// Coordinates are in a 300x300 viewbox; drawing is left to the front end.

use serde::Serialize;

use crate::density::{water_density, WATER_PEAK_DENSITY, WATER_PEAK_TEMP_C};

const GRID_ROWS: usize = 5;
const GRID_COLS: usize = 5;
const GRID_ORIGIN: f64 = 50.0;
const BASE_SPACING: f64 = 30.0;
const SPREAD_GAIN: f64 = 1.5;
const CRYSTAL_RADIUS: f64 = 8.0;
const LIQUID_RADIUS: f64 = 6.0;

/// Reference density the water molecule view is scaled against
pub const WATER_REFERENCE_DENSITY: f64 = WATER_PEAK_DENSITY;
/// Reference density the comparison substance view is scaled against
pub const SUBSTANCE_REFERENCE_DENSITY: f64 = 900.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoleculeLayout {
    /// Lower density spreads the grid further apart, never below 1
    pub spread: f64,
    pub spacing: f64,
    pub radius: f64,
    pub crystalline: bool,
    pub positions: Vec<[f64; 2]>,
}

pub fn molecule_layout(density: f64, reference_density: f64, crystalline: bool) -> MoleculeLayout {
    let spread = (reference_density / density * SPREAD_GAIN).max(1.0);
    let spacing = BASE_SPACING * spread;
    let positions = (0..GRID_ROWS)
        .flat_map(|row| {
            (0..GRID_COLS).map(move |col| {
                [GRID_ORIGIN + col as f64 * spacing, GRID_ORIGIN + row as f64 * spacing]
            })
        })
        .collect();

    MoleculeLayout {
        spread,
        spacing,
        radius: if crystalline { CRYSTAL_RADIUS } else { LIQUID_RADIUS },
        crystalline,
        positions,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LakeLayer {
    /// 0 at the surface, 1 at the bottom
    pub depth_fraction: f64,
    pub temperature: f64,
    pub density: f64,
    pub is_ice: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LakeProfile {
    pub surface_temperature: f64,
    pub frozen_over: bool,
    /// Empty while the lake still circulates
    pub layers: Vec<LakeLayer>,
}

/// Winter cross-section for a given surface temperature.
///
/// Once the surface reaches 0°C the column stratifies: ice on top, the
/// densest 4°C water at the bottom.
pub fn lake_profile(surface_temperature: f64) -> LakeProfile {
    let frozen_over = surface_temperature <= 0.0;
    let layers = if frozen_over {
        let steps = WATER_PEAK_TEMP_C as usize;
        (0..=steps)
            .map(|i| {
                let t = i as f64;
                LakeLayer {
                    depth_fraction: t / WATER_PEAK_TEMP_C,
                    temperature: t,
                    density: water_density(t),
                    is_ice: i == 0,
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    LakeProfile {
        surface_temperature,
        frozen_over,
        layers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::ICE_DENSITY;

    #[test]
    fn test_molecule_spread_floor() {
        let layout = molecule_layout(1000.0, WATER_REFERENCE_DENSITY, false);
        assert_eq!(layout.spread, 1.5);
        assert_eq!(layout.positions.len(), 25);
        assert_eq!(layout.positions[0], [50.0, 50.0]);
        assert_eq!(layout.positions[24], [50.0 + 4.0 * 45.0, 50.0 + 4.0 * 45.0]);

        let dense = molecule_layout(13593.0, SUBSTANCE_REFERENCE_DENSITY, false);
        assert_eq!(dense.spread, 1.0);
        assert_eq!(dense.spacing, 30.0);
    }

    #[test]
    fn test_ice_spreads_wider_than_peak_water() {
        let ice = molecule_layout(ICE_DENSITY, WATER_REFERENCE_DENSITY, true);
        let peak = molecule_layout(1000.0, WATER_REFERENCE_DENSITY, false);
        assert!(ice.spacing > peak.spacing);
        assert_eq!(ice.radius, 8.0);
        assert_eq!(peak.radius, 6.0);
    }

    #[test]
    fn test_lake_frozen_layers() {
        let lake = lake_profile(0.0);
        assert!(lake.frozen_over);
        assert_eq!(lake.layers.len(), 5);
        assert!(lake.layers[0].is_ice);
        let bottom = lake.layers.last().unwrap();
        assert_eq!(bottom.temperature, 4.0);
        assert_eq!(bottom.depth_fraction, 1.0);
        assert_eq!(bottom.density, 1000.0);
        for pair in lake.layers.windows(2) {
            assert!(pair[1].density > pair[0].density);
        }
    }

    #[test]
    fn test_lake_open_water() {
        let lake = lake_profile(0.5);
        assert!(!lake.frozen_over);
        assert!(lake.layers.is_empty());
        assert!(lake_profile(-3.0).frozen_over);
    }
}
