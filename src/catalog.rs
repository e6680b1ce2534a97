use serde::Serialize;

/// A comparison liquid with a simplified linear density model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Substance {
    pub id: &'static str,
    pub name: &'static str,
    /// kg/m³ at 0°C
    pub base_density: f64,
    /// kg/m³ lost per degree of warming
    pub expansion_coeff: f64,
    pub color: &'static str,
}

/// Closed temperature interval in °C
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
}

impl TemperatureRange {
    pub fn clamp(&self, t: f64) -> f64 {
        t.clamp(self.min, self.max)
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.min && t <= self.max
    }
}

pub const TEMPERATURE_RANGE: TemperatureRange = TemperatureRange { min: -5.0, max: 20.0 };
pub const TEMPERATURE_STEP: f64 = 0.5;
pub const DEFAULT_TEMP: f64 = 10.0;

pub const SUBSTANCES: [Substance; 4] = [
    Substance { id: "ethanol", name: "Etanol (Sprit)", base_density: 806.0, expansion_coeff: 1.1, color: "#f59e0b" },
    Substance { id: "oil", name: "Matolja", base_density: 920.0, expansion_coeff: 0.7, color: "#84cc16" },
    Substance { id: "mercury", name: "Kvicksilver", base_density: 13593.0, expansion_coeff: 2.4, color: "#94a3b8" },
    Substance { id: "generic", name: "Standardämne", base_density: 900.0, expansion_coeff: 0.5, color: "#fbbf24" },
];

pub fn default_substance() -> &'static Substance {
    &SUBSTANCES[0]
}

pub fn substance_by_id(id: &str) -> Option<&'static Substance> {
    SUBSTANCES.iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_unique() {
        let ids: HashSet<&str> = SUBSTANCES.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), SUBSTANCES.len());
    }

    #[test]
    fn test_catalog_invariants() {
        for s in &SUBSTANCES {
            assert!(s.base_density > 0.0, "{}", s.id);
            assert!(s.expansion_coeff > 0.0, "{}", s.id);
            // stays positive across the whole slider range
            assert!(s.base_density - s.expansion_coeff * TEMPERATURE_RANGE.max > 0.0);
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(substance_by_id("oil").map(|s| s.base_density), Some(920.0));
        assert!(substance_by_id("plutonium").is_none());
        assert_eq!(default_substance().id, "ethanol");
    }

    #[test]
    fn test_substance_serializes_camel_case() {
        let json = serde_json::to_value(&SUBSTANCES[2]).unwrap();
        assert_eq!(json["id"], "mercury");
        assert_eq!(json["baseDensity"], 13593.0);
        assert_eq!(json["expansionCoeff"], 2.4);
        assert!(json.get("base_density").is_none());
    }

    #[test]
    fn test_range_clamp() {
        assert_eq!(TEMPERATURE_RANGE.clamp(-40.0), -5.0);
        assert_eq!(TEMPERATURE_RANGE.clamp(99.0), 20.0);
        assert_eq!(TEMPERATURE_RANGE.clamp(3.5), 3.5);
        assert!(TEMPERATURE_RANGE.contains(DEFAULT_TEMP));
    }
}
